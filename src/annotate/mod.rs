//! Hanja reading annotation
//!
//! Finds runs of CJK ideographs in plain text and appends their readings
//! after each run, e.g. `漢字` becomes `漢字(한자)`.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub mod dictionary;

pub use dictionary::{DictionaryError, ReadingMap};

/// Extension A, basic block, compatibility ideographs.
static IDEOGRAPH_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{3400}-\x{4DBF}\x{4E00}-\x{9FFF}\x{F900}-\x{FAFF}]+").unwrap()
});

/// How readings are attached to an ideograph run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnotationOptions {
    /// Inserted before the readings
    pub open: String,
    /// Inserted after the readings
    pub close: String,
    /// Joins the readings of a multi-character run
    pub sep: String,
    /// Only annotate a run when every character has a reading
    pub all_required: bool,
}

impl Default for AnnotationOptions {
    fn default() -> Self {
        Self {
            open: "(".to_string(),
            close: ")".to_string(),
            sep: String::new(),
            all_required: false,
        }
    }
}

/// Whether `c` falls in one of the Hanja code-point ranges
pub fn is_ideograph(c: char) -> bool {
    matches!(
        c as u32,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF
    )
}

/// Maximal ideograph runs in `text`, in order
pub fn ideograph_runs(text: &str) -> impl Iterator<Item = &str> {
    IDEOGRAPH_RUN.find_iter(text).map(|m| m.as_str())
}

/// Annotate every qualifying ideograph run in `text` with its readings.
///
/// Unknown characters contribute an empty reading, so a partially known
/// run joined with a non-empty `sep` can contain empty segments
/// (`漢丁字` -> `漢丁字(한--자)`). Everything outside the runs is copied
/// through untouched.
pub fn annotate(text: &str, readings: &ReadingMap, options: &AnnotationOptions) -> String {
    let annotated: Cow<'_, str> = IDEOGRAPH_RUN.replace_all(text, |caps: &Captures| {
        let run = &caps[0];
        annotate_run(run, readings, options).unwrap_or_else(|| run.to_string())
    });
    annotated.into_owned()
}

fn annotate_run(run: &str, readings: &ReadingMap, options: &AnnotationOptions) -> Option<String> {
    let parts: Vec<&str> = run.chars().map(|c| readings.reading_or_empty(c)).collect();

    let qualifies = if options.all_required {
        parts.iter().all(|r| !r.is_empty())
    } else {
        parts.iter().any(|r| !r.is_empty())
    };
    if !qualifies {
        return None;
    }

    Some(format!(
        "{}{}{}{}",
        run,
        options.open,
        parts.join(options.sep.as_str()),
        options.close
    ))
}
