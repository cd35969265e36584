#![forbid(unsafe_code)]

//! Parsed cue documents and their timeline index.
//!
//! A [`CueDocument`] is immutable once built. It holds the segment list in
//! source order, a dense timeline index mapping each pacing word ordinal to
//! its segment, and the pacing spans derived from time markers.
//!
//! # Example
//! ```
//! use cuecard_core::PacingConfig;
//! use cuecard_text::parse;
//!
//! let doc = parse("Hello world\n\n[time 00:10]\nSecond line here", &PacingConfig::new(120));
//! assert_eq!(doc.total_words(), 5);
//! assert!(doc.timing().has_timing);
//! assert_eq!(doc.timing().spans[0].word_count, 2);
//! ```

use std::fmt::Write as _;

use cuecard_core::{NotePacing, PacingConfig};

use crate::parser::parse_segments;
use crate::segment::{PacingSpan, Segment, TimelineEntry, TimingSummary};

/// Parse annotated text into a document.
///
/// Never fails: malformed tags are kept as literal words.
#[must_use]
pub fn parse(raw: &str, config: &PacingConfig) -> CueDocument {
    let doc = CueDocument::from_segments(parse_segments(raw), config.note_pacing);
    tracing::debug!(
        bytes = raw.len(),
        segments = doc.segments.len(),
        total_words = doc.total_words(),
        spans = doc.timing.spans.len(),
        has_timing = doc.timing.has_timing,
        "cue document parsed"
    );
    doc
}

/// An immutable, parsed cue document.
#[derive(Debug, Clone, PartialEq)]
pub struct CueDocument {
    segments: Vec<Segment>,
    timeline: Vec<TimelineEntry>,
    word_count: usize,
    timing: TimingSummary,
    note_pacing: NotePacing,
}

impl Default for CueDocument {
    fn default() -> Self {
        Self::from_segments(Vec::new(), NotePacing::default())
    }
}

impl CueDocument {
    /// Build a document from already-parsed segments.
    ///
    /// Time markers must already be non-decreasing; the parser guarantees this.
    #[must_use]
    pub fn from_segments(segments: Vec<Segment>, note_pacing: NotePacing) -> Self {
        let mut timeline = Vec::new();
        let mut word_count = 0;
        let mut spans = Vec::new();
        let mut span_first = 0;
        let mut span_start = 0.0;
        let mut last_marker = None;

        for (idx, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Word(_) => {
                    timeline.push(TimelineEntry {
                        segment: idx,
                        part: 0,
                    });
                    word_count += 1;
                }
                Segment::NoteMarker {
                    word_count: note_words,
                    ..
                } if note_pacing == NotePacing::Include => {
                    timeline.extend((0..*note_words).map(|part| TimelineEntry { segment: idx, part }));
                }
                Segment::TimeMarker(target) => {
                    let end = f64::from(*target);
                    spans.push(PacingSpan {
                        first_word: span_first,
                        word_count: timeline.len() - span_first,
                        start_seconds: span_start,
                        end_seconds: Some(end),
                    });
                    span_first = timeline.len();
                    span_start = end;
                    last_marker = Some(*target);
                }
                _ => {}
            }
        }

        let trailing = PacingSpan {
            first_word: span_first,
            word_count: timeline.len() - span_first,
            start_seconds: span_start,
            end_seconds: None,
        };
        let total_duration_seconds = last_marker.filter(|_| trailing.word_count == 0);
        spans.push(trailing);

        Self {
            segments,
            timeline,
            word_count,
            timing: TimingSummary {
                spans,
                has_timing: last_marker.is_some(),
                total_duration_seconds,
            },
            note_pacing,
        }
    }

    /// Segments in source order.
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Timeline index: one entry per pacing word.
    #[inline]
    #[must_use]
    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    /// Number of pacing slots (words, plus note words when notes are paced).
    #[inline]
    #[must_use]
    pub fn total_words(&self) -> usize {
        self.timeline.len()
    }

    /// Number of `Word` segments.
    #[inline]
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Whether the document has no pacing words.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// How note words are treated by pacing.
    #[inline]
    #[must_use]
    pub fn note_pacing(&self) -> NotePacing {
        self.note_pacing
    }

    /// Spans and schedule overview.
    #[inline]
    #[must_use]
    pub fn timing(&self) -> &TimingSummary {
        &self.timing
    }

    /// Whether any time marker is present.
    #[inline]
    #[must_use]
    pub fn has_time_markers(&self) -> bool {
        self.timing.has_timing
    }

    /// Word texts in source order, excluding notes and tags.
    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().filter_map(Segment::as_word)
    }

    /// Re-serialize with canonical tags, keeping line and paragraph breaks.
    ///
    /// Parsing the result yields the same segments.
    #[must_use]
    pub fn to_source(&self) -> String {
        self.render(|out, text| {
            let _ = write!(out, "[note {text}]");
        })
    }

    /// Display markup: notes become `<note>text</note>`, everything else as in
    /// [`to_source`](Self::to_source).
    #[must_use]
    pub fn to_markup(&self) -> String {
        self.render(|out, text| {
            let _ = write!(out, "<note>{text}</note>");
        })
    }

    fn render(&self, mut note: impl FnMut(&mut String, &str)) -> String {
        let mut out = String::new();
        let mut line_start = true;
        for segment in &self.segments {
            match segment {
                Segment::ParagraphBreak => {
                    out.push_str("\n\n");
                    line_start = true;
                    continue;
                }
                Segment::LineBreak => {
                    out.push('\n');
                    line_start = true;
                    continue;
                }
                _ => {}
            }
            if !line_start {
                out.push(' ');
            }
            line_start = false;
            match segment {
                Segment::Word(w) => out.push_str(w),
                Segment::NoteMarker { text, .. } => note(&mut out, text),
                Segment::TimeMarker(t) => {
                    let _ = write!(out, "[time {:02}:{:02}]", t / 60, t % 60);
                }
                Segment::ParagraphBreak | Segment::LineBreak => {}
            }
        }
        out
    }
}
