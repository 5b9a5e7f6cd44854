use std::{future::Future, sync::Once};
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use crate::error::ViewerError;
use crate::scroll::ScrollMetrics;


static LOGGING: Once = Once::new();


/// Enable better error messages if our code ever panics
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}


/// Routes `tracing` events to the browser console.
/// Only the first call takes effect, later levels are ignored.
pub fn init_logging(level: tracing::Level) {
    LOGGING.call_once(|| {
        let config = tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(level)
            .build();
        tracing_wasm::set_as_global_default_with_config(config);
    });
}


/// Executes an async Future on the current thread
#[inline(always)]
pub fn execute_future<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}


/// Looks up the page's drawing surface by element id
pub fn find_canvas(id: &str) -> Result<HtmlCanvasElement, ViewerError> {
    let document = web_sys::window()
        .ok_or(ViewerError::NoWindow)?
        .document()
        .ok_or(ViewerError::NoDocument)?;
    document
        .get_element_by_id(id)
        .and_then(|element| element.dyn_into::<HtmlCanvasElement>().ok())
        .ok_or_else(|| ViewerError::CanvasNotFound(id.to_string()))
}


/// Reads the current vertical scroll state of the page.
/// Anything the browser cannot report reads as zero.
pub fn scroll_metrics() -> ScrollMetrics {
    let Some(window) = web_sys::window() else {
        return ScrollMetrics::new(0.0, 0.0, 0.0);
    };
    let offset = window.scroll_y().unwrap_or(0.0);
    let viewport_height = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let document_height = window
        .document()
        .and_then(|d| d.document_element())
        .map(|e| e.scroll_height() as f64)
        .unwrap_or(0.0);
    ScrollMetrics::new(offset, document_height, viewport_height)
}


/// Check if a float is zero
#[inline(always)]
pub fn is_float_zero(x: f32, threshold: f32) -> bool {
    x.abs() < threshold
}
