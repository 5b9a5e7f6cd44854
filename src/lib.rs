//! Scroll-scrubbed glTF viewer for the browser.
//!
//! A page calls one of the exported entry points once the wasm module is
//! initialised. The chosen subject is drawn into the page's canvas and, for
//! animated assets, the first clip follows the page's vertical scroll.

use wasm_bindgen::prelude::*;

pub mod animation;
pub mod config;
pub mod error;
pub mod fetch;
pub mod renderer;
pub mod scene;
pub mod scroll;
pub mod state;
pub mod utils;

pub use config::ViewerConfig;
pub use error::ViewerError;


#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
}


fn launch(config: ViewerConfig) -> Result<(), JsValue> {
    utils::init_logging(config.log_level());
    tracing::info!("launch(): {:?}", config.subject);
    renderer::main(config).map_err(|e| {
        tracing::error!("launch(): {}", e);
        JsValue::from(e)
    })
}


/// The flower page: `Flower11/Flower11.gltf` scrubbed by scroll
#[wasm_bindgen]
pub fn run() -> Result<(), JsValue> {
    launch(ViewerConfig::flower())
}


/// The spinning cube test scene
#[wasm_bindgen(js_name = runCube)]
pub fn run_cube() -> Result<(), JsValue> {
    launch(ViewerConfig::cube())
}


/// Like [run], with any subset of [ViewerConfig] overridden from JSON
#[wasm_bindgen(js_name = runWithConfig)]
pub fn run_with_config(json: &str) -> Result<(), JsValue> {
    let config = ViewerConfig::from_json(json)?;
    launch(config)
}
