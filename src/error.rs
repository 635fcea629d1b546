//! Error types for the Hanja reader module

use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::overlay::OverlayError;

/// Module-wide result type
pub type Result<T> = std::result::Result<T, ReaderError>;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),
}

impl From<ReaderError> for JsValue {
    fn from(e: ReaderError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

/// Best-effort string form of a thrown JS value
pub(crate) fn describe_js(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
