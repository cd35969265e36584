#![forbid(unsafe_code)]

//! Parsed units of a cue document.

/// One parsed unit of the document, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A whitespace-delimited word that advances the pacing cursor.
    Word(String),
    /// A `[note ...]` annotation, kept verbatim.
    NoteMarker {
        /// Annotation text with surrounding whitespace trimmed.
        text: String,
        /// Number of whitespace-delimited words in `text`.
        word_count: usize,
    },
    /// A `[time ...]` schedule point, seconds from document start.
    ///
    /// Never earlier than the previous marker in the same document.
    TimeMarker(u32),
    /// Blank-line boundary between paragraphs.
    ParagraphBreak,
    /// Line boundary within a paragraph.
    LineBreak,
}

impl Segment {
    /// Create a note marker, counting its words.
    pub fn note(text: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = text.split_whitespace().count();
        Self::NoteMarker { text, word_count }
    }

    /// The word text, if this is a word.
    #[inline]
    #[must_use]
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Self::Word(w) => Some(w),
            _ => None,
        }
    }

    /// Whether this segment is a break (line or paragraph).
    #[inline]
    #[must_use]
    pub fn is_break(&self) -> bool {
        matches!(self, Self::ParagraphBreak | Self::LineBreak)
    }
}

/// Position of one pacing word in the timeline index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimelineEntry {
    /// Index into [`CueDocument::segments`](crate::CueDocument::segments).
    pub segment: usize,
    /// Word offset inside the segment (non-zero only for note words when notes are paced).
    pub part: usize,
}

/// A run of pacing words between two schedule points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingSpan {
    /// Ordinal of the first pacing word in the span.
    pub first_word: usize,
    /// Number of pacing words in the span (may be zero).
    pub word_count: usize,
    /// Schedule time at which the span starts.
    pub start_seconds: f64,
    /// Schedule time at which the span must be finished, if a marker closes it.
    ///
    /// `None` for the trailing span, which runs at the uniform reading rate.
    pub end_seconds: Option<f64>,
}

impl PacingSpan {
    /// Ordinal one past the last word in the span.
    #[inline]
    #[must_use]
    pub fn end_word(&self) -> usize {
        self.first_word + self.word_count
    }

    /// Scheduled length in seconds, if bounded.
    #[must_use]
    pub fn duration_seconds(&self) -> Option<f64> {
        self.end_seconds.map(|end| end - self.start_seconds)
    }
}

/// Timing overview of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSummary {
    /// Pacing spans in document order. Always at least one.
    pub spans: Vec<PacingSpan>,
    /// Whether any time marker is present.
    pub has_timing: bool,
    /// Scheduled length of the whole document, when every word is covered by a
    /// marker-bounded span.
    pub total_duration_seconds: Option<u32>,
}
