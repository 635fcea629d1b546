//! DOM implementation of the overlay seam
//!
//! Mounts the toast into the reader's iframe document with web-sys. The
//! reader iframe lives in another JS realm, so host objects are cast with
//! `unchecked_into` after a shape check rather than `dyn_into`.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, Element, Event, EventTarget, HtmlButtonElement, HtmlDocument, HtmlElement,
    HtmlTextAreaElement, Window,
};

use super::clipboard::{Clipboard, ClipboardError};
use super::{ActionSink, OverlayAction, OverlayError, OverlayPanel, Spawn, ViewKey, ViewSurface};
use crate::config::OverlayConfig;
use crate::error::describe_js;

/// Attribute stamped on a document's root element to identify its view
pub const VIEW_KEY_ATTRIBUTE: &str = "data-hanja-reader-view";

static NEXT_VIEW: AtomicU64 = AtomicU64::new(1);

const BUTTON_BG: &str = "#3a3a3c";
const BUTTON_HOVER_BG: &str = "#4a4a4d";

impl From<JsValue> for OverlayError {
    fn from(value: JsValue) -> Self {
        OverlayError::Dom(describe_js(&value))
    }
}

/// Runs tasks on the browser microtask queue
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSpawner;

impl Spawn for BrowserSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

/// A reader document view
#[derive(Debug, Clone)]
pub struct DomView {
    window: Window,
}

impl DomView {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    /// Resolve a host reader object, or a bare window, to a view.
    ///
    /// Returns `None` when the reader has no iframe window (closed tab).
    pub fn from_host(value: &JsValue) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let iframe = Reflect::get(value, &JsValue::from_str("_iframeWindow")).ok()?;
        if iframe.is_object() {
            return Some(Self::new(iframe.unchecked_into()));
        }

        // Already a window
        let document = Reflect::get(value, &JsValue::from_str("document")).ok()?;
        if document.is_object() {
            return Some(Self::new(value.clone().unchecked_into()));
        }
        None
    }

    fn document(&self) -> Option<Document> {
        self.window.document()
    }
}

fn mount_root(document: &Document) -> Option<Element> {
    document
        .body()
        .map(Element::from)
        .or_else(|| document.document_element())
}

fn set_styles(element: &HtmlElement, styles: &[(&str, &str)]) -> Result<(), JsValue> {
    let style = element.style();
    for (name, value) in styles {
        style.set_property(name, value)?;
    }
    Ok(())
}

fn create_html(document: &Document, tag: &str) -> Result<HtmlElement, JsValue> {
    Ok(document.create_element(tag)?.unchecked_into())
}

fn selection_collapsed(window: &Window) -> bool {
    match window.get_selection() {
        Ok(Some(selection)) => {
            selection.is_collapsed() || String::from(selection.to_string()).trim().is_empty()
        }
        _ => true,
    }
}

fn clamp_ms(ms: u32) -> i32 {
    i32::try_from(ms).unwrap_or(i32::MAX)
}

struct Listener {
    target: EventTarget,
    event: &'static str,
    capture: bool,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn detach(&self) {
        let _ = self.target.remove_event_listener_with_callback_and_bool(
            self.event,
            self.callback.as_ref().unchecked_ref(),
            self.capture,
        );
    }
}

/// The mounted toast
pub struct DomPanel {
    window: Window,
    host: HtmlElement,
    toast: HtmlElement,
    listeners: Vec<Listener>,
}

impl DomPanel {
    fn listen(
        &mut self,
        target: &EventTarget,
        event: &'static str,
        capture: bool,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), JsValue> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target.add_event_listener_with_callback_and_bool(
            event,
            callback.as_ref().unchecked_ref(),
            capture,
        )?;
        self.listeners.push(Listener {
            target: target.clone(),
            event,
            capture,
            callback,
        });
        Ok(())
    }

    fn make_button(&mut self, document: &Document, label: &str) -> Result<HtmlButtonElement, JsValue> {
        let button: HtmlButtonElement = document.create_element("button")?.unchecked_into();
        button.set_type("button");
        button.set_text_content(Some(label));
        set_styles(
            &button,
            &[
                ("font-size", "12px"),
                ("padding", "6px 10px"),
                ("border-radius", "8px"),
                ("border", "none"),
                ("background", BUTTON_BG),
                ("color", "#fff"),
                ("cursor", "pointer"),
            ],
        )?;

        let hovered = button.clone();
        self.listen(&button, "mouseenter", false, move |_| {
            let _ = hovered.style().set_property("background", BUTTON_HOVER_BG);
        })?;
        let left = button.clone();
        self.listen(&button, "mouseleave", false, move |_| {
            let _ = left.style().set_property("background", BUTTON_BG);
        })?;
        Ok(button)
    }

    fn build(
        &mut self,
        document: &Document,
        root: &Element,
        text: &str,
        config: &OverlayConfig,
        sink: ActionSink,
    ) -> Result<(), JsValue> {
        let offset = format!("{}px", config.offset_px);
        self.host.set_id(&config.host_id);
        set_styles(
            &self.host,
            &[
                ("position", "fixed"),
                ("right", offset.as_str()),
                ("bottom", offset.as_str()),
                ("z-index", "2147483647"),
                ("display", "flex"),
                ("flex-direction", "column"),
                ("gap", "10px"),
                // only the toast itself takes pointer events
                ("pointer-events", "none"),
            ],
        )?;

        let max_width = format!("{}px", config.max_width_px);
        set_styles(
            &self.toast,
            &[
                ("pointer-events", "auto"),
                ("max-width", max_width.as_str()),
                ("background", "rgba(28,28,30,0.96)"),
                ("color", "#fff"),
                ("backdrop-filter", "blur(4px)"),
                ("padding", "12px 14px"),
                ("border-radius", "12px"),
                ("box-shadow", "0 8px 24px rgba(0,0,0,.35)"),
                ("display", "flex"),
                ("gap", "12px"),
                ("align-items", "flex-start"),
                ("font-size", "13px"),
                ("position", "relative"),
            ],
        )?;

        let content = create_html(document, "div")?;
        let max_height = format!("{}px", config.max_content_height_px);
        set_styles(
            &content,
            &[
                ("user-select", "text"),
                ("white-space", "pre-wrap"),
                ("max-height", max_height.as_str()),
                ("overflow", "auto"),
                ("outline", "none"),
            ],
        )?;
        content.set_title(&config.content_title);
        content.set_text_content(Some(text));
        let on_content = sink.clone();
        self.listen(&content, "click", false, move |_| on_content(OverlayAction::Copy))?;

        let actions = create_html(document, "div")?;
        set_styles(
            &actions,
            &[("display", "flex"), ("gap", "8px"), ("margin-left", "auto")],
        )?;

        let copy = self.make_button(document, &config.copy_label)?;
        let on_copy = sink.clone();
        self.listen(&copy, "click", false, move |_| on_copy(OverlayAction::Copy))?;

        let close = self.make_button(document, &config.close_label)?;
        let on_close = sink.clone();
        self.listen(&close, "click", false, move |_| on_close(OverlayAction::Close))?;

        actions.append_child(&copy)?;
        actions.append_child(&close)?;
        self.toast.append_child(&content)?;
        self.toast.append_child(&actions)?;
        self.host.append_child(&self.toast)?;

        let window = self.window.clone();
        self.listen(document, "selectionchange", true, move |_| {
            sink(OverlayAction::SelectionChanged {
                collapsed: selection_collapsed(&window),
            })
        })?;

        root.append_child(&self.host)?;
        Ok(())
    }

    fn try_flash_badge(&self, label: &str, config: &OverlayConfig) -> Result<(), JsValue> {
        let document = self
            .window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;

        let badge = create_html(&document, "span")?;
        badge.set_text_content(Some(label));
        let transition = format!("opacity {}ms ease", config.badge_fade_ms);
        set_styles(
            &badge,
            &[
                ("position", "absolute"),
                ("right", "10px"),
                ("bottom", "8px"),
                ("background", "rgba(60,60,62,.9)"),
                ("padding", "2px 8px"),
                ("border-radius", "9999px"),
                ("font-size", "11px"),
                ("opacity", "0"),
                ("transition", transition.as_str()),
                ("pointer-events", "none"),
            ],
        )?;
        self.toast.append_child(&badge)?;

        let shown = badge.clone();
        let fade_in = Closure::once_into_js(move || {
            let _ = shown.style().set_property("opacity", "1");
        });
        if self
            .window
            .request_animation_frame(fade_in.unchecked_ref())
            .is_err()
        {
            self.window
                .set_timeout_with_callback_and_timeout_and_arguments_0(fade_in.unchecked_ref(), 0)?;
        }

        let window = self.window.clone();
        let fade_ms = clamp_ms(config.badge_fade_ms);
        let fade_out = Closure::once_into_js(move || {
            let _ = badge.style().set_property("opacity", "0");
            let remove = Closure::once_into_js(move || badge.remove());
            let _ = window
                .set_timeout_with_callback_and_timeout_and_arguments_0(remove.unchecked_ref(), fade_ms);
        });
        self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            fade_out.unchecked_ref(),
            clamp_ms(config.badge_visible_ms),
        )?;
        Ok(())
    }
}

impl OverlayPanel for DomPanel {
    fn flash_badge(&self, label: &str, config: &OverlayConfig) {
        if let Err(e) = self.try_flash_badge(label, config) {
            tracing::debug!("Copy badge not shown: {}", describe_js(&e));
        }
    }

    fn unmount(self) {
        for listener in &self.listeners {
            listener.detach();
        }
        self.host.remove();

        // A listener may be the caller of this teardown; free closures after it returns
        let listeners = self.listeners;
        wasm_bindgen_futures::spawn_local(async move {
            drop(listeners);
        });
    }
}

/// Clipboard of a reader window
#[derive(Debug, Clone)]
pub struct DomClipboard {
    window: Window,
}

/// An element removed from the document when dropped
struct TransientElement(Element);

impl Drop for TransientElement {
    fn drop(&mut self) {
        self.0.remove();
    }
}

#[async_trait(?Send)]
impl Clipboard for DomClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let navigator = self.window.navigator();
        let clipboard = Reflect::get(&navigator, &JsValue::from_str("clipboard"))
            .map_err(|_| ClipboardError::Unavailable)?;
        if !clipboard.is_object() {
            return Err(ClipboardError::Unavailable);
        }
        let write = Reflect::get(&clipboard, &JsValue::from_str("writeText"))
            .map_err(|_| ClipboardError::Unavailable)?;
        if !write.is_function() {
            return Err(ClipboardError::Unavailable);
        }
        let write: Function = write.unchecked_into();

        let pending = write
            .call1(&clipboard, &JsValue::from_str(text))
            .map_err(|e| ClipboardError::Rejected(describe_js(&e)))?;
        let resolved = JsFuture::from(Promise::resolve(&pending))
            .await
            .map_err(|e| ClipboardError::Rejected(describe_js(&e)))?;

        // writeText resolves to undefined; only an explicit falsy result is a refusal
        if resolved.is_undefined() || resolved.is_truthy() {
            Ok(())
        } else {
            Err(ClipboardError::Rejected(describe_js(&resolved)))
        }
    }

    fn legacy_copy(&self, text: &str) -> Result<bool, ClipboardError> {
        let command = |e: JsValue| ClipboardError::CommandFailed(describe_js(&e));

        let document = self.window.document().ok_or(ClipboardError::Unavailable)?;
        let root = mount_root(&document).ok_or(ClipboardError::Unavailable)?;

        let area = TransientElement(document.create_element("textarea").map_err(command)?);
        let textarea: &HtmlTextAreaElement = area.0.unchecked_ref();
        textarea.set_value(text);
        set_styles(
            textarea,
            &[
                ("position", "fixed"),
                ("top", "0"),
                ("left", "-9999px"),
                ("opacity", "0"),
                ("pointer-events", "none"),
            ],
        )
        .map_err(command)?;
        root.append_child(&area.0).map_err(command)?;

        textarea.select();
        let html: &HtmlDocument = document.unchecked_ref();
        html.exec_command("copy").map_err(command)
    }
}

impl ViewSurface for DomView {
    type Panel = DomPanel;
    type Clipboard = DomClipboard;

    fn key(&self) -> ViewKey {
        let Some(root) = self.document().and_then(|d| d.document_element()) else {
            return ViewKey::new("detached");
        };
        if let Some(existing) = root.get_attribute(VIEW_KEY_ATTRIBUTE) {
            return ViewKey::new(existing);
        }
        let key = format!("view-{}", NEXT_VIEW.fetch_add(1, Ordering::Relaxed));
        if let Err(e) = root.set_attribute(VIEW_KEY_ATTRIBUTE, &key) {
            tracing::warn!("Could not tag view {}: {}", key, describe_js(&e));
        }
        ViewKey::new(key)
    }

    fn existing_key(&self) -> Option<ViewKey> {
        let root = self.document()?.document_element()?;
        root.get_attribute(VIEW_KEY_ATTRIBUTE).map(ViewKey::new)
    }

    fn is_live(&self) -> bool {
        self.document().and_then(|d| mount_root(&d)).is_some()
    }

    fn clipboard(&self) -> DomClipboard {
        DomClipboard {
            window: self.window.clone(),
        }
    }

    fn mount(
        &self,
        text: &str,
        config: &OverlayConfig,
        sink: ActionSink,
    ) -> Result<DomPanel, OverlayError> {
        let document = self.document().ok_or(OverlayError::NoMountPoint)?;
        let root = mount_root(&document).ok_or(OverlayError::NoMountPoint)?;

        // Left behind by an earlier module instance
        if let Some(stale) = document.get_element_by_id(&config.host_id) {
            stale.remove();
        }

        let mut panel = DomPanel {
            window: self.window.clone(),
            host: create_html(&document, "div")?,
            toast: create_html(&document, "div")?,
            listeners: Vec::new(),
        };
        match panel.build(&document, &root, text, config, sink) {
            Ok(()) => Ok(panel),
            Err(e) => {
                panel.unmount();
                Err(e.into())
            }
        }
    }
}
