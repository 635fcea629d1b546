//! In-memory host fakes for overlay and reader tests

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use futures::executor::LocalSpawner;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

use super::clipboard::{Clipboard, ClipboardError};
use super::{ActionSink, OverlayAction, OverlayError, OverlayPanel, Spawn, ViewKey, ViewSurface};
use crate::config::OverlayConfig;

impl Spawn for LocalSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawn_local(task).expect("local pool is running");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOutcome {
    Succeed,
    /// The copy command ran but reported `false`
    Refuse,
    Fail,
    Missing,
}

#[derive(Debug)]
pub struct ClipState {
    pub primary: ClipOutcome,
    pub legacy: ClipOutcome,
    pub written: Vec<String>,
    pub legacy_calls: usize,
}

#[derive(Debug, Clone)]
pub struct FakeClipboard {
    pub state: Rc<RefCell<ClipState>>,
}

impl Default for FakeClipboard {
    fn default() -> Self {
        Self::with(ClipOutcome::Succeed, ClipOutcome::Succeed)
    }
}

impl FakeClipboard {
    pub fn with(primary: ClipOutcome, legacy: ClipOutcome) -> Self {
        Self {
            state: Rc::new(RefCell::new(ClipState {
                primary,
                legacy,
                written: Vec::new(),
                legacy_calls: 0,
            })),
        }
    }
}

#[async_trait(?Send)]
impl Clipboard for FakeClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut state = self.state.borrow_mut();
        match state.primary {
            ClipOutcome::Succeed => {
                state.written.push(text.to_string());
                Ok(())
            }
            ClipOutcome::Refuse => Err(ClipboardError::Rejected("false".to_string())),
            ClipOutcome::Fail => Err(ClipboardError::Rejected("NotAllowedError".to_string())),
            ClipOutcome::Missing => Err(ClipboardError::Unavailable),
        }
    }

    fn legacy_copy(&self, text: &str) -> Result<bool, ClipboardError> {
        let mut state = self.state.borrow_mut();
        state.legacy_calls += 1;
        match state.legacy {
            ClipOutcome::Succeed => {
                state.written.push(text.to_string());
                Ok(true)
            }
            ClipOutcome::Refuse => Ok(false),
            ClipOutcome::Fail | ClipOutcome::Missing => {
                Err(ClipboardError::CommandFailed("execCommand threw".to_string()))
            }
        }
    }
}

#[derive(Default)]
pub struct FakeDocument {
    next_panel: u64,
    /// `(panel id, text)` of mounted panels
    mounted: Vec<(u64, String)>,
    /// Every sink ever handed to a panel, oldest first
    sinks: Vec<(u64, ActionSink)>,
    listeners: usize,
    badges: Vec<String>,
    fail_next_mount: bool,
}

/// A document view backed by [`FakeDocument`]
#[derive(Clone)]
pub struct FakeView {
    key: ViewKey,
    keyed: Rc<Cell<bool>>,
    live: bool,
    doc: Rc<RefCell<FakeDocument>>,
    clipboard: FakeClipboard,
}

impl FakeView {
    pub fn new(key: &str) -> Self {
        Self {
            key: ViewKey::new(key),
            keyed: Rc::default(),
            live: true,
            doc: Rc::default(),
            clipboard: FakeClipboard::default(),
        }
    }

    /// A view whose document has gone away
    pub fn detached(key: &str) -> Self {
        Self {
            live: false,
            ..Self::new(key)
        }
    }

    pub fn set_clipboard(&self, primary: ClipOutcome, legacy: ClipOutcome) {
        let mut state = self.clipboard.state.borrow_mut();
        state.primary = primary;
        state.legacy = legacy;
    }

    pub fn fail_next_mount(&self) {
        self.doc.borrow_mut().fail_next_mount = true;
    }

    /// Whether a key was ever assigned to this view
    pub fn is_keyed(&self) -> bool {
        self.keyed.get()
    }

    pub fn mounted_texts(&self) -> Vec<String> {
        self.doc.borrow().mounted.iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn listener_count(&self) -> usize {
        self.doc.borrow().listeners
    }

    pub fn badges(&self) -> Vec<String> {
        self.doc.borrow().badges.clone()
    }

    pub fn clipboard_writes(&self) -> Vec<String> {
        self.clipboard.state.borrow().written.clone()
    }

    pub fn legacy_copies(&self) -> usize {
        self.clipboard.state.borrow().legacy_calls
    }

    /// Sink of the panel currently mounted
    pub fn current_sink(&self) -> Option<ActionSink> {
        let doc = self.doc.borrow();
        let (id, _) = doc.mounted.last()?;
        doc.sinks
            .iter()
            .find(|(panel, _)| panel == id)
            .map(|(_, sink)| Rc::clone(sink))
    }

    /// Deliver `action` from the mounted panel
    pub fn fire(&self, action: OverlayAction) {
        let sink = self.current_sink().expect("a panel is mounted");
        sink(action);
    }

    /// Deliver `action` from the most recently created panel, mounted or not
    pub fn fire_last(&self, action: OverlayAction) {
        let sink = self
            .doc
            .borrow()
            .sinks
            .last()
            .map(|(_, sink)| Rc::clone(sink))
            .expect("a panel was mounted");
        sink(action);
    }
}

pub struct FakePanel {
    id: u64,
    doc: Rc<RefCell<FakeDocument>>,
}

impl ViewSurface for FakeView {
    type Panel = FakePanel;
    type Clipboard = FakeClipboard;

    fn key(&self) -> ViewKey {
        self.keyed.set(true);
        self.key.clone()
    }

    fn existing_key(&self) -> Option<ViewKey> {
        self.keyed.get().then(|| self.key.clone())
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn clipboard(&self) -> FakeClipboard {
        self.clipboard.clone()
    }

    fn mount(
        &self,
        text: &str,
        _config: &OverlayConfig,
        sink: ActionSink,
    ) -> Result<FakePanel, OverlayError> {
        let mut doc = self.doc.borrow_mut();
        if std::mem::take(&mut doc.fail_next_mount) {
            return Err(OverlayError::Dom("appendChild failed".to_string()));
        }
        doc.next_panel += 1;
        let id = doc.next_panel;
        doc.mounted.push((id, text.to_string()));
        doc.sinks.push((id, sink));
        doc.listeners += 1;

        Ok(FakePanel {
            id,
            doc: Rc::clone(&self.doc),
        })
    }
}

impl OverlayPanel for FakePanel {
    fn flash_badge(&self, label: &str, _config: &OverlayConfig) {
        self.doc.borrow_mut().badges.push(label.to_string());
    }

    fn unmount(self) {
        let mut doc = self.doc.borrow_mut();
        doc.mounted.retain(|(id, _)| *id != self.id);
        doc.listeners -= 1;
    }
}
