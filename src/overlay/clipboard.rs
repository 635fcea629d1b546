//! Clipboard copy with a legacy fallback
//!
//! The async clipboard API is tried first. When it is missing or rejects,
//! the text is copied through a transient selection instead.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard API is not available")]
    Unavailable,

    #[error("Clipboard write was rejected: {0}")]
    Rejected(String),

    #[error("Copy command failed: {0}")]
    CommandFailed(String),
}

/// Clipboard primitives offered by a document view
#[async_trait(?Send)]
pub trait Clipboard {
    /// Write through the asynchronous clipboard API
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;

    /// Select-and-copy through a transient element.
    ///
    /// Returns the result of the copy command.
    fn legacy_copy(&self, text: &str) -> Result<bool, ClipboardError>;
}

/// Copy `text`, falling back to the legacy path. Never fails loudly.
pub async fn copy_text<C>(clipboard: &C, text: &str) -> bool
where
    C: Clipboard + ?Sized,
{
    match clipboard.write_text(text).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Clipboard write failed ({}), trying legacy copy", e);
            match clipboard.legacy_copy(text) {
                Ok(copied) => copied,
                Err(e) => {
                    tracing::debug!("Legacy copy failed: {}", e);
                    false
                }
            }
        }
    }
}
