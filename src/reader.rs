//! Reader context
//!
//! Owns everything one module instance needs: the reading dictionary, the
//! annotation options and the overlay controller. The host calls
//! [`ReaderContext::on_selection_event`] for each text selection popup and
//! [`ReaderContext::teardown`] when a reader closes.

use std::cell::Cell;
use std::rc::Rc;

use crate::annotate::{annotate, AnnotationOptions, ReadingMap};
use crate::config::ReaderConfig;
use crate::error::Result;
use crate::overlay::{OverlayController, OverlayState, Spawn, ViewSurface};

/// A text selection in a document view, as delivered by the host
#[derive(Debug, Clone)]
pub struct SelectionEvent<V> {
    pub view: Option<V>,
    pub selected_text: Option<String>,
}

impl<V> SelectionEvent<V> {
    pub fn new(view: V, selected_text: impl Into<String>) -> Self {
        Self {
            view: Some(view),
            selected_text: Some(selected_text.into()),
        }
    }
}

pub struct ReaderContext<V: ViewSurface> {
    readings: &'static ReadingMap,
    options: AnnotationOptions,
    overlay: OverlayController<V>,
    alive: Cell<bool>,
}

impl<V: ViewSurface> ReaderContext<V> {
    pub fn new(config: ReaderConfig, readings: &'static ReadingMap, spawner: Rc<dyn Spawn>) -> Self {
        Self {
            readings,
            options: config.annotation,
            overlay: OverlayController::new(config.overlay, spawner),
            alive: Cell::new(true),
        }
    }

    pub fn overlay(&self) -> &OverlayController<V> {
        &self.overlay
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Annotate `text` with this context's dictionary and options
    pub fn annotate(&self, text: &str) -> String {
        annotate(text, self.readings, &self.options)
    }

    /// Handle a selection popup event. Never fails; errors are logged.
    pub fn on_selection_event(&self, event: SelectionEvent<V>) -> OverlayState {
        match self.handle_selection(event) {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("Selection handler failed: {}", e);
                OverlayState::Absent
            }
        }
    }

    fn handle_selection(&self, event: SelectionEvent<V>) -> Result<OverlayState> {
        if !self.is_alive() {
            tracing::debug!("Selection event after shutdown ignored");
            return Ok(OverlayState::Absent);
        }
        let text = match event.selected_text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => return Ok(OverlayState::Absent),
        };
        let Some(view) = event.view else {
            tracing::debug!("Selection event without a view ignored");
            return Ok(OverlayState::Absent);
        };

        let annotated = self.annotate(text);
        Ok(self.overlay.show(&view, &annotated)?)
    }

    /// Dismiss the overlay of `view`, if any
    pub fn teardown(&self, view: &V) -> bool {
        view.existing_key().is_some_and(|key| self.overlay.dismiss(&key))
    }

    /// Whether `view` is showing an overlay
    pub fn is_visible(&self, view: &V) -> bool {
        view.existing_key()
            .is_some_and(|key| self.overlay.state(&key) == OverlayState::Visible)
    }

    /// Stop handling events and dismiss every overlay
    pub fn shutdown(&self) {
        if self.alive.replace(false) {
            let dismissed = self.overlay.dismiss_all();
            tracing::info!("Hanja reader shut down, {} overlay(s) dismissed", dismissed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::testing::FakeView;
    use futures::executor::LocalPool;

    fn context(pool: &LocalPool) -> ReaderContext<FakeView> {
        ReaderContext::new(
            ReaderConfig::default(),
            ReadingMap::bundled(),
            Rc::new(pool.spawner()),
        )
    }

    #[test]
    fn test_selection_shows_annotated_text() {
        let pool = LocalPool::new();
        let reader = context(&pool);
        let view = FakeView::new("reader-1");

        let state = reader.on_selection_event(SelectionEvent::new(view.clone(), "大韓民國 憲法"));

        assert_eq!(state, OverlayState::Visible);
        assert_eq!(view.mounted_texts(), vec!["大韓民國(대한민국) 憲法(헌법)".to_string()]);
    }

    #[test]
    fn test_common_words_fully_annotated() {
        let pool = LocalPool::new();
        let mut config = ReaderConfig::default();
        config.annotation.all_required = true;
        let reader: ReaderContext<FakeView> =
            ReaderContext::new(config, ReadingMap::bundled(), Rc::new(pool.spawner()));

        assert_eq!(reader.annotate("學校"), "學校(학교)");
        assert_eq!(
            reader.annotate("大學校 先生님의 敎育"),
            "大學校(대학교) 先生(선생)님의 敎育(교육)"
        );
        assert_eq!(reader.annotate("新聞 社會 經濟"), "新聞(신문) 社會(사회) 經濟(경제)");
    }

    #[test]
    fn test_plain_text_still_shown() {
        let pool = LocalPool::new();
        let reader = context(&pool);
        let view = FakeView::new("reader-1");

        reader.on_selection_event(SelectionEvent::new(view.clone(), "no hanja here"));
        assert_eq!(view.mounted_texts(), vec!["no hanja here".to_string()]);
    }

    #[test]
    fn test_empty_or_missing_text_is_ignored() {
        let pool = LocalPool::new();
        let reader = context(&pool);
        let view = FakeView::new("reader-1");

        assert_eq!(
            reader.on_selection_event(SelectionEvent::new(view.clone(), "")),
            OverlayState::Absent
        );
        let missing = SelectionEvent {
            view: Some(view.clone()),
            selected_text: None,
        };
        assert_eq!(reader.on_selection_event(missing), OverlayState::Absent);
        assert!(view.mounted_texts().is_empty());
    }

    #[test]
    fn test_missing_view_is_ignored() {
        let pool = LocalPool::new();
        let reader = context(&pool);
        let event: SelectionEvent<FakeView> = SelectionEvent {
            view: None,
            selected_text: Some("漢字".to_string()),
        };

        assert_eq!(reader.on_selection_event(event), OverlayState::Absent);
        assert_eq!(reader.overlay().live_sessions(), 0);
    }

    #[test]
    fn test_mount_failure_is_swallowed() {
        let pool = LocalPool::new();
        let reader = context(&pool);
        let view = FakeView::new("reader-1");
        view.fail_next_mount();

        let state = reader.on_selection_event(SelectionEvent::new(view.clone(), "漢字"));
        assert_eq!(state, OverlayState::Absent);

        // The next event recovers
        reader.on_selection_event(SelectionEvent::new(view.clone(), "漢字"));
        assert_eq!(view.mounted_texts(), vec!["漢字(한자)".to_string()]);
    }

    #[test]
    fn test_teardown() {
        let pool = LocalPool::new();
        let reader = context(&pool);
        let view = FakeView::new("reader-1");
        reader.on_selection_event(SelectionEvent::new(view.clone(), "漢字"));

        assert!(reader.teardown(&view));
        assert!(!reader.teardown(&view));
        assert!(view.mounted_texts().is_empty());
    }

    #[test]
    fn test_queries_do_not_assign_view_keys() {
        let pool = LocalPool::new();
        let reader = context(&pool);
        let view = FakeView::new("reader-1");

        assert!(!reader.is_visible(&view));
        assert!(!reader.teardown(&view));
        assert!(!view.is_keyed());

        reader.on_selection_event(SelectionEvent::new(view.clone(), "漢字"));
        assert!(view.is_keyed());
        assert!(reader.is_visible(&view));
        assert!(reader.teardown(&view));
        assert!(!reader.is_visible(&view));
    }

    #[test]
    fn test_shutdown_stops_handling() {
        let pool = LocalPool::new();
        let reader = context(&pool);
        let view = FakeView::new("reader-1");
        reader.on_selection_event(SelectionEvent::new(view.clone(), "漢字"));

        reader.shutdown();
        reader.shutdown();
        assert!(!reader.is_alive());
        assert!(view.mounted_texts().is_empty());

        reader.on_selection_event(SelectionEvent::new(view.clone(), "漢字"));
        assert!(view.mounted_texts().is_empty());
    }

    #[test]
    fn test_custom_annotation_options() {
        let pool = LocalPool::new();
        let mut config = ReaderConfig::default();
        config.annotation.open = "[".to_string();
        config.annotation.close = "]".to_string();
        config.annotation.sep = "·".to_string();
        let reader: ReaderContext<FakeView> =
            ReaderContext::new(config, ReadingMap::bundled(), Rc::new(pool.spawner()));

        assert_eq!(reader.annotate("漢字"), "漢字[한·자]");
    }
}
