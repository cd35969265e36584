#![forbid(unsafe_code)]

//! Note-extraction ingest.
//!
//! A collaborator (typically a browser extension watching a slide deck) posts
//! one [`SlideNotes`] payload per slide change. The engine only ever consumes
//! the notes text; the other fields drive caching in [`SlideTracker`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors from decoding or using a slide payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The payload is not valid JSON for [`SlideNotes`].
    Malformed(String),
    /// The slide has no speaker notes.
    EmptyNotes,
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Malformed(msg) => write!(f, "malformed slide payload: {msg}"),
            IngestError::EmptyNotes => write!(f, "slide has no notes"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<serde_json::Error> for IngestError {
    fn from(e: serde_json::Error) -> Self {
        IngestError::Malformed(e.to_string())
    }
}

/// A slide-change message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlideNotes {
    pub presentation_id: String,
    pub slide_id: String,
    pub slide_number: i32,
    pub title: String,
    /// Viewer mode reported by the deck (`"edit"`, `"present"`, ...).
    pub mode: String,
    /// Sender clock, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Speaker notes, when the sender could read them.
    pub notes: Option<String>,
    pub url: Option<String>,
}

impl SlideNotes {
    /// Decode a JSON payload.
    pub fn from_json(payload: &str) -> Result<Self, IngestError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Cache key for this slide.
    pub fn key(&self) -> String {
        slide_key(&self.presentation_id, &self.slide_id)
    }
}

fn slide_key(presentation_id: &str, slide_id: &str) -> String {
    format!("{presentation_id}:{slide_id}")
}

/// Result of observing a slide change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideUpdate {
    /// The observed slide.
    pub slide: SlideNotes,
    /// Notes from the payload, or from the cache when the payload had none.
    pub notes: Option<String>,
    /// Whether this slide belongs to a different presentation than the last one.
    pub presentation_changed: bool,
}

impl SlideUpdate {
    /// Notes text to load, or [`IngestError::EmptyNotes`] if there is none.
    pub fn text(&self) -> Result<&str, IngestError> {
        match self.notes.as_deref() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(IngestError::EmptyNotes),
        }
    }
}

/// Tracks the current slide and caches notes per slide.
///
/// Switching presentation clears the cache.
#[derive(Debug, Default)]
pub struct SlideTracker {
    presentation_id: Option<String>,
    current: Option<SlideNotes>,
    cache: HashMap<String, String>,
}

impl SlideTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a slide change.
    pub fn observe(&mut self, slide: SlideNotes) -> SlideUpdate {
        let presentation_changed = self.presentation_id.as_deref() != Some(&slide.presentation_id);
        if presentation_changed {
            tracing::debug!(
                presentation_id = %slide.presentation_id,
                dropped = self.cache.len(),
                "presentation changed; clearing notes cache"
            );
            self.cache.clear();
            self.presentation_id = Some(slide.presentation_id.clone());
        }

        let key = slide.key();
        let notes = match &slide.notes {
            Some(text) => {
                self.cache.insert(key, text.clone());
                Some(text.clone())
            }
            None => self.cache.get(&key).cloned(),
        };
        tracing::trace!(slide_number = slide.slide_number, cached = notes.is_some(), "slide observed");

        self.current = Some(slide.clone());
        SlideUpdate {
            slide,
            notes,
            presentation_changed,
        }
    }

    /// Store notes fetched out of band (for example a prefetch of the whole deck).
    ///
    /// Ignored unless `presentation_id` is the current presentation.
    pub fn insert_notes(&mut self, presentation_id: &str, slide_id: &str, notes: impl Into<String>) -> bool {
        if self.presentation_id.as_deref() != Some(presentation_id) {
            return false;
        }
        self.cache.insert(slide_key(presentation_id, slide_id), notes.into());
        true
    }

    /// Cached notes for a slide of the current presentation.
    pub fn cached(&self, slide_id: &str) -> Option<&str> {
        let presentation_id = self.presentation_id.as_deref()?;
        self.cache
            .get(&slide_key(presentation_id, slide_id))
            .map(String::as_str)
    }

    /// The last observed slide.
    pub fn current(&self) -> Option<&SlideNotes> {
        self.current.as_ref()
    }

    /// Forget the current presentation and its cached notes.
    pub fn invalidate_presentation(&mut self) {
        self.presentation_id = None;
        self.current = None;
        self.cache.clear();
    }

    /// Number of cached slides.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(presentation: &str, slide: &str, notes: Option<&str>) -> SlideNotes {
        SlideNotes {
            presentation_id: presentation.into(),
            slide_id: slide.into(),
            notes: notes.map(Into::into),
            ..SlideNotes::default()
        }
    }

    #[test]
    fn decodes_camel_case_payload() {
        let payload = r#"{
            "presentationId": "deck-1",
            "slideId": "g123",
            "slideNumber": 4,
            "title": "Roadmap",
            "mode": "present",
            "timestamp": 1700000000000,
            "notes": "Open with the [time 00:30] numbers"
        }"#;
        let notes = SlideNotes::from_json(payload).unwrap();
        assert_eq!(notes.presentation_id, "deck-1");
        assert_eq!(notes.slide_number, 4);
        assert_eq!(notes.url, None);
        assert_eq!(notes.key(), "deck-1:g123");
    }

    #[test]
    fn malformed_payload_is_reported() {
        let err = SlideNotes::from_json("{not json").unwrap_err();
        assert!(matches!(err, IngestError::Malformed(_)));
        assert!(matches!(
            SlideNotes::from_json(r#"{"slideNumber": "four"}"#),
            Err(IngestError::Malformed(_))
        ));
    }

    #[test]
    fn cached_notes_fill_missing_payload_notes() {
        let mut tracker = SlideTracker::new();
        let first = tracker.observe(slide("deck", "s1", Some("hello there")));
        assert!(first.presentation_changed);
        assert_eq!(first.text(), Ok("hello there"));

        let again = tracker.observe(slide("deck", "s1", None));
        assert!(!again.presentation_changed);
        assert_eq!(again.notes.as_deref(), Some("hello there"));
    }

    #[test]
    fn presentation_change_clears_cache() {
        let mut tracker = SlideTracker::new();
        tracker.observe(slide("a", "s1", Some("one")));
        assert!(tracker.insert_notes("a", "s2", "two"));
        assert!(!tracker.insert_notes("other", "s2", "nope"));
        assert_eq!(tracker.cached_len(), 2);

        let update = tracker.observe(slide("b", "s1", None));
        assert!(update.presentation_changed);
        assert_eq!(update.notes, None);
        assert_eq!(update.text(), Err(IngestError::EmptyNotes));
        assert_eq!(tracker.cached_len(), 0);
        assert_eq!(tracker.cached("s2"), None);
    }

    #[test]
    fn blank_notes_are_empty() {
        let mut tracker = SlideTracker::new();
        let update = tracker.observe(slide("a", "s1", Some("  \n ")));
        assert_eq!(update.text(), Err(IngestError::EmptyNotes));
    }

    #[test]
    fn invalidate_forgets_everything() {
        let mut tracker = SlideTracker::new();
        tracker.observe(slide("a", "s1", Some("x")));
        tracker.invalidate_presentation();
        assert!(tracker.current().is_none());
        assert!(tracker.observe(slide("a", "s1", None)).presentation_changed);
    }
}
