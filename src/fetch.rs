use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{ReadableStreamDefaultReader, Response};

use crate::error::ViewerError;


/// Bytes received so far for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    /// From `Content-Length`, when the server sent one
    pub total: Option<u64>,
}

impl Progress {
    /// Completion in 0..=1, or `None` when the total is unknown
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.loaded as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }
}


/// GETs `url`, streaming the body so that `on_progress` sees every chunk
pub async fn fetch_bytes(
    url: &str,
    mut on_progress: impl FnMut(Progress),
) -> Result<Vec<u8>, ViewerError> {
    let window = web_sys::window().ok_or(ViewerError::NoWindow)?;

    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| ViewerError::fetch(url, e))?;
    let response: Response = response
        .dyn_into()
        .map_err(|e| ViewerError::fetch(url, e))?;

    if !response.ok() {
        return Err(ViewerError::Http {
            url: url.to_string(),
            status: response.status(),
            status_text: response.status_text(),
        });
    }

    let total = response.headers()
        .get("content-length")
        .ok()
        .flatten()
        .and_then(|v| v.parse::<u64>().ok());

    let Some(body) = response.body() else {
        // no readable stream, take the body in one piece
        let promise = response.array_buffer().map_err(|e| ViewerError::fetch(url, e))?;
        let buffer = JsFuture::from(promise).await.map_err(|e| ViewerError::fetch(url, e))?;
        let bytes = Uint8Array::new(&buffer).to_vec();
        on_progress(Progress { loaded: bytes.len() as u64, total });
        return Ok(bytes);
    };

    let reader: ReadableStreamDefaultReader = body
        .get_reader()
        .dyn_into()
        .map_err(|e| ViewerError::fetch(url, e))?;

    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    loop {
        let chunk = JsFuture::from(reader.read())
            .await
            .map_err(|e| ViewerError::fetch(url, e))?;
        let done = Reflect::get(&chunk, &JsValue::from_str("done"))
            .map_err(|e| ViewerError::fetch(url, e))?
            .as_bool()
            .unwrap_or(true);
        if done {
            break;
        }
        let value = Reflect::get(&chunk, &JsValue::from_str("value"))
            .map_err(|e| ViewerError::fetch(url, e))?;
        bytes.extend_from_slice(&Uint8Array::new(&value).to_vec());
        on_progress(Progress { loaded: bytes.len() as u64, total });
    }

    Ok(bytes)
}
