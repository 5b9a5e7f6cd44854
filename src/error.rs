use thiserror::Error;
use wasm_bindgen::JsValue;


/// Startup and asset-load faults
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("no browser window available")]
    NoWindow,

    #[error("window has no document")]
    NoDocument,

    #[error("canvas element #{0} not found")]
    CanvasNotFound(String),

    #[error("failed to create render window: {0}")]
    Window(String),

    #[error("fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("HTTP {status} {status_text} for {url}")]
    Http {
        url: String,
        status: u16,
        status_text: String,
    },

    #[error("invalid glTF document: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("invalid data URI: {0}")]
    DataUri(String),

    #[error("failed to decode asset: {0}")]
    Asset(String),

    #[error("renderer error: {0}")]
    Renderer(String),

    #[error("invalid viewer config: {0}")]
    Config(#[from] serde_json::Error),
}

impl ViewerError {
    /// Wraps a rejected JS promise or failed cast for `url`
    pub(crate) fn fetch(url: &str, reason: impl std::fmt::Debug) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: format!("{:?}", reason),
        }
    }
}

impl From<ViewerError> for JsValue {
    fn from(e: ViewerError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
