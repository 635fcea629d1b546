//! Selection toast overlay
//!
//! Shows annotated text in a floating panel at the bottom-right of a
//! document view. Each view has at most one live session; showing new text
//! tears the previous session down first. A session ends on the close
//! button, when the view's selection collapses, or when superseded.
//!
//! The controller only talks to the document through [`ViewSurface`] and
//! [`OverlayPanel`], so the state machine runs the same against the DOM
//! ([`dom`]) and against in-memory fakes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;
use thiserror::Error;

use crate::config::OverlayConfig;

pub mod clipboard;
pub mod dom;
#[cfg(test)]
pub(crate) mod testing;

use clipboard::{copy_text, Clipboard};

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Document view has no mount point")]
    NoMountPoint,

    #[error("DOM operation failed: {0}")]
    Dom(String),
}

/// Identity of a document view
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey(String);

impl ViewKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User or document events a mounted panel reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayAction {
    /// Copy button or a click on the text
    Copy,
    /// Close button
    Close,
    /// The view's selection changed
    SelectionChanged { collapsed: bool },
}

/// Callback a panel uses to report [`OverlayAction`]s
pub type ActionSink = Rc<dyn Fn(OverlayAction)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Absent,
    Visible,
}

/// A document view the overlay can be mounted into
pub trait ViewSurface {
    type Panel: OverlayPanel + 'static;
    type Clipboard: Clipboard + Clone + 'static;

    /// Key of the view, assigning one on first use
    fn key(&self) -> ViewKey;

    /// Key assigned earlier by [`key`](Self::key), if any. Never assigns.
    fn existing_key(&self) -> Option<ViewKey>;

    /// Whether the view still has a document to render into
    fn is_live(&self) -> bool;

    fn clipboard(&self) -> Self::Clipboard;

    /// Mount the panel showing `text` and wire its events to `sink`.
    ///
    /// On error nothing may be left mounted.
    fn mount(
        &self,
        text: &str,
        config: &OverlayConfig,
        sink: ActionSink,
    ) -> Result<Self::Panel, OverlayError>;
}

/// A mounted panel
pub trait OverlayPanel {
    /// Show the short-lived copy confirmation badge
    fn flash_badge(&self, label: &str, config: &OverlayConfig);

    /// Remove the panel and every listener it registered
    fn unmount(self);
}

/// Runs a task on the host's event loop
pub trait Spawn {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

struct Session<P> {
    generation: u64,
    text: Rc<str>,
    panel: P,
}

struct Sessions<P> {
    next_generation: u64,
    live: HashMap<ViewKey, Session<P>>,
}

impl<P> Sessions<P> {
    fn take(&mut self, key: &ViewKey, generation: Option<u64>) -> Option<Session<P>> {
        let current = self.live.get(key)?.generation;
        if generation.is_some_and(|g| g != current) {
            return None;
        }
        self.live.remove(key)
    }
}

/// Per-view overlay state machine
pub struct OverlayController<V: ViewSurface> {
    sessions: Rc<RefCell<Sessions<V::Panel>>>,
    config: Rc<OverlayConfig>,
    spawner: Rc<dyn Spawn>,
}

impl<V: ViewSurface> Clone for OverlayController<V> {
    fn clone(&self) -> Self {
        Self {
            sessions: Rc::clone(&self.sessions),
            config: Rc::clone(&self.config),
            spawner: Rc::clone(&self.spawner),
        }
    }
}

impl<V: ViewSurface> OverlayController<V> {
    pub fn new(config: OverlayConfig, spawner: Rc<dyn Spawn>) -> Self {
        Self {
            sessions: Rc::new(RefCell::new(Sessions {
                next_generation: 0,
                live: HashMap::new(),
            })),
            config: Rc::new(config),
            spawner,
        }
    }

    /// Show `text` in `view`, replacing any session the view already has.
    ///
    /// A view without a live document is ignored.
    pub fn show(&self, view: &V, text: &str) -> Result<OverlayState, OverlayError> {
        if !view.is_live() {
            tracing::debug!("Ignoring show for a view without a document");
            return Ok(OverlayState::Absent);
        }

        let key = view.key();
        self.dismiss(&key);

        let generation = {
            let mut sessions = self.sessions.borrow_mut();
            sessions.next_generation += 1;
            sessions.next_generation
        };
        let text: Rc<str> = Rc::from(text);
        let sink = self.action_sink(key.clone(), generation, Rc::clone(&text), view.clipboard());

        let panel = view.mount(&text, &self.config, sink)?;

        tracing::debug!("Overlay session {} shown in view {}", generation, key);
        let replaced = self.sessions.borrow_mut().live.insert(
            key,
            Session {
                generation,
                text,
                panel,
            },
        );
        if let Some(old) = replaced {
            old.panel.unmount();
        }

        Ok(OverlayState::Visible)
    }

    /// Tear down the session of `key`. Returns whether one was live.
    pub fn dismiss(&self, key: &ViewKey) -> bool {
        Self::dismiss_session(&self.sessions, key, None)
    }

    /// Tear down every live session
    pub fn dismiss_all(&self) -> usize {
        let drained: Vec<Session<V::Panel>> = {
            let mut sessions = self.sessions.borrow_mut();
            sessions.live.drain().map(|(_, s)| s).collect()
        };
        let count = drained.len();
        for session in drained {
            session.panel.unmount();
        }
        count
    }

    pub fn state(&self, key: &ViewKey) -> OverlayState {
        if self.sessions.borrow().live.contains_key(key) {
            OverlayState::Visible
        } else {
            OverlayState::Absent
        }
    }

    /// Text shown by the live session of `key`
    pub fn text(&self, key: &ViewKey) -> Option<String> {
        self.sessions
            .borrow()
            .live
            .get(key)
            .map(|s| s.text.to_string())
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.borrow().live.len()
    }

    fn dismiss_session(
        sessions: &RefCell<Sessions<V::Panel>>,
        key: &ViewKey,
        generation: Option<u64>,
    ) -> bool {
        // Release the borrow before unmounting: panel teardown may run host code
        let taken = sessions.borrow_mut().take(key, generation);
        match taken {
            Some(session) => {
                tracing::debug!("Overlay session {} dismissed in view {}", session.generation, key);
                session.panel.unmount();
                true
            }
            None => false,
        }
    }

    fn action_sink(
        &self,
        key: ViewKey,
        generation: u64,
        text: Rc<str>,
        clipboard: V::Clipboard,
    ) -> ActionSink {
        let sessions: Weak<RefCell<Sessions<V::Panel>>> = Rc::downgrade(&self.sessions);
        let config = Rc::clone(&self.config);
        let spawner = Rc::clone(&self.spawner);

        Rc::new(move |action: OverlayAction| {
            let Some(live) = sessions.upgrade() else {
                return;
            };
            match action {
                OverlayAction::Close | OverlayAction::SelectionChanged { collapsed: true } => {
                    Self::dismiss_session(&live, &key, Some(generation));
                }
                OverlayAction::SelectionChanged { collapsed: false } => {}
                OverlayAction::Copy => {
                    let sessions = sessions.clone();
                    let key = key.clone();
                    let text = Rc::clone(&text);
                    let clipboard = clipboard.clone();
                    let config = Rc::clone(&config);
                    spawner.spawn(Box::pin(async move {
                        if !copy_text(&clipboard, &text).await {
                            tracing::debug!("Copy failed in view {}", key);
                            return;
                        }
                        let Some(live) = sessions.upgrade() else {
                            return;
                        };
                        let current = live.borrow();
                        match current.live.get(&key) {
                            Some(session) if session.generation == generation => {
                                session.panel.flash_badge(&config.copied_label, &config);
                            }
                            _ => tracing::debug!("Copied after session {} ended", generation),
                        };
                    }));
                }
            }
        })
    }
}
