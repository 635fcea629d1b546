//! Hanja Reader
//!
//! A WASM module for the PDF reader's text selection popup that provides:
//! - Hanja reading annotation (`漢字` -> `漢字(한자)`)
//! - A dismissible toast showing the annotated selection, with copy
//!
//! The host plugin forwards selection events to [`HanjaReader`] and calls
//! `teardown`/`shutdown` when readers or windows close.

use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::prelude::*;

pub mod annotate;
pub mod config;
pub mod error;
pub mod logging;
pub mod overlay;
pub mod reader;

// Re-export common types
pub use annotate::{annotate, AnnotationOptions, ReadingMap};
pub use config::{OverlayConfig, ReaderConfig};
pub use error::{ReaderError, Result};
pub use overlay::{OverlayController, OverlayState, ViewKey};
pub use reader::{ReaderContext, SelectionEvent};

use overlay::dom::{BrowserSpawner, DomView};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in debug mode
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Hanja reader - one instance per plugin lifetime
#[wasm_bindgen]
pub struct HanjaReader {
    context: ReaderContext<DomView>,
}

#[wasm_bindgen]
impl HanjaReader {
    /// Create a reader. `config` may be omitted for the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> std::result::Result<HanjaReader, JsValue> {
        let config = ReaderConfig::from_js(config)?;
        logging::init(&config.log_level);

        let readings = ReadingMap::bundled();
        tracing::info!("Hanja reader ready with {} readings", readings.len());

        Ok(Self {
            context: ReaderContext::new(config, readings, Rc::new(BrowserSpawner)),
        })
    }

    /// Handle a selection popup event.
    ///
    /// Accepts `{ view, selectedText }` or the reader's own
    /// `{ reader, params: { annotation: { text } } }`. Returns whether a
    /// toast is now showing.
    #[wasm_bindgen(js_name = "onSelectionEvent")]
    pub fn on_selection_event(&self, event: JsValue) -> bool {
        let event = selection_event_from_js(&event);
        self.context.on_selection_event(event) == OverlayState::Visible
    }

    /// Dismiss the toast of a reader or window
    #[wasm_bindgen(js_name = "teardown")]
    pub fn teardown(&self, view: JsValue) -> bool {
        match DomView::from_host(&view) {
            Some(view) => self.context.teardown(&view),
            None => false,
        }
    }

    /// Dismiss every toast and ignore further events
    #[wasm_bindgen(js_name = "shutdown")]
    pub fn shutdown(&self) {
        self.context.shutdown();
    }

    /// Annotate text with the configured options
    #[wasm_bindgen(js_name = "annotate")]
    pub fn annotate(&self, text: &str) -> String {
        self.context.annotate(text)
    }

    #[wasm_bindgen(js_name = "isVisible")]
    pub fn is_visible(&self, view: JsValue) -> bool {
        DomView::from_host(&view).is_some_and(|view| self.context.is_visible(&view))
    }
}

/// Annotate `text` without a reader instance.
///
/// `map` defaults to the bundled dictionary, `options` to the defaults.
/// Unusable arguments fall back instead of throwing.
#[wasm_bindgen(js_name = "annotateHanja")]
pub fn annotate_hanja(text: &str, map: JsValue, options: JsValue) -> String {
    let options = if is_absent(&options) {
        AnnotationOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options).unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid annotation options: {}", e);
            AnnotationOptions::default()
        })
    };

    if is_absent(&map) {
        return annotate(text, ReadingMap::bundled(), &options);
    }
    let readings = serde_wasm_bindgen::from_value::<serde_json::Value>(map)
        .map_err(|e| e.to_string())
        .and_then(|value| ReadingMap::from_value(value).map_err(|e| e.to_string()))
        .unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid reading map: {}", e);
            ReadingMap::default()
        });
    annotate(text, &readings, &options)
}

fn is_absent(value: &JsValue) -> bool {
    value.is_undefined() || value.is_null()
}

/// Follow `path` through nested objects
fn get_path(value: &JsValue, path: &[&str]) -> Option<JsValue> {
    let mut current = value.clone();
    for key in path {
        if !current.is_object() {
            return None;
        }
        current = Reflect::get(&current, &JsValue::from_str(key)).ok()?;
    }
    (!is_absent(&current)).then_some(current)
}

fn selection_event_from_js(event: &JsValue) -> SelectionEvent<DomView> {
    let selected_text = get_path(event, &["selectedText"])
        .or_else(|| get_path(event, &["params", "annotation", "text"]))
        .and_then(|text| text.as_string());
    let view = get_path(event, &["view"])
        .or_else(|| get_path(event, &["reader"]))
        .and_then(|view| DomView::from_host(&view));

    SelectionEvent {
        view,
        selected_text,
    }
}
