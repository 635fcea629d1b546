//! Configuration for the Hanja reader module

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::annotate::AnnotationOptions;
use crate::error::{ReaderError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReaderConfig {
    pub annotation: AnnotationOptions,
    pub overlay: OverlayConfig,
    /// `tracing` filter directive
    pub log_level: String,
}

/// Presentation of the selection toast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Element id of the fixed host container
    pub host_id: String,
    pub copy_label: String,
    pub close_label: String,
    /// Badge text shown after a successful copy
    pub copied_label: String,
    /// Tooltip on the text content
    pub content_title: String,
    /// Distance from the right and bottom viewport edges
    pub offset_px: u32,
    pub max_width_px: u32,
    pub max_content_height_px: u32,
    /// Time before the badge starts fading out
    pub badge_visible_ms: u32,
    pub badge_fade_ms: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            annotation: AnnotationOptions::default(),
            overlay: OverlayConfig::default(),
            log_level: "hanja_reader=info".to_string(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            host_id: "hra-toast-host".to_string(),
            copy_label: "복사".to_string(),
            close_label: "닫기".to_string(),
            copied_label: "복사됨".to_string(),
            content_title: "클릭하면 복사됩니다".to_string(),
            offset_px: 24,
            max_width_px: 640,
            max_content_height_px: 160,
            badge_visible_ms: 700,
            badge_fade_ms: 150,
        }
    }
}

impl ReaderConfig {
    /// Read the config object handed to the JS constructor.
    ///
    /// `undefined` and `null` select the defaults.
    pub fn from_js(value: JsValue) -> Result<Self> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        serde_wasm_bindgen::from_value(value).map_err(|e| ReaderError::Config(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ReaderError::Config(e.to_string()))
    }
}
