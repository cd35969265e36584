#![forbid(unsafe_code)]

//! Pure projections from (document, elapsed time, pacing) to presentation state.
//!
//! Nothing here mutates its inputs or touches a clock, so render callbacks may
//! call these functions concurrently on shared snapshots.
//!
//! # Pacing
//!
//! Without time markers the cursor advances uniformly at
//! [`PacingConfig::words_per_second`]. With markers, each span between two
//! consecutive markers is stretched so its words exactly fill the scheduled
//! interval; words after the last marker continue at the uniform rate.
//!
//! # Invariants
//!
//! 1. [`pacing_position`] is continuous and non-decreasing in `elapsed`.
//! 2. [`current_word_index`] lies in `[0, total_words - 1]` for non-empty documents.
//! 3. [`highlight_progress`] is negative infinity before playback has started.

use cuecard_core::{PacingConfig, PlaybackState, highlight_alpha};

use crate::document::CueDocument;
use crate::layout::LayoutMap;
use crate::segment::Segment;

/// Fraction of the viewport above the current word after auto-scroll.
pub const SCROLL_ANCHOR_FRACTION: f32 = 1.0 / 3.0;

fn sanitize_elapsed(elapsed: f64) -> f64 {
    if elapsed.is_nan() || elapsed < 0.0 {
        0.0
    } else {
        elapsed
    }
}

/// Continuous word position at `elapsed` seconds, in `[0, total_words]`.
#[must_use]
pub fn pacing_position(doc: &CueDocument, elapsed: f64, pacing: &PacingConfig) -> f64 {
    let total = doc.total_words() as f64;
    if total == 0.0 {
        return 0.0;
    }
    let t = sanitize_elapsed(elapsed);
    let wps = pacing.words_per_second();

    let position = if doc.has_time_markers() {
        let mut pos = total;
        for span in &doc.timing().spans {
            match span.end_seconds {
                Some(end) if t >= end => continue,
                Some(end) => {
                    let frac = (t - span.start_seconds) / (end - span.start_seconds);
                    pos = span.first_word as f64 + frac.clamp(0.0, 1.0) * span.word_count as f64;
                }
                None => {
                    pos = span.first_word as f64 + (t - span.start_seconds).max(0.0) * wps;
                }
            }
            break;
        }
        pos
    } else {
        t * wps
    };

    position.clamp(0.0, total)
}

/// Index of the word being read at `elapsed`.
///
/// Returns 0 for an empty document.
#[must_use]
pub fn current_word_index(doc: &CueDocument, elapsed: f64, pacing: &PacingConfig) -> usize {
    let total = doc.total_words();
    if total == 0 {
        return 0;
    }
    let pos = pacing_position(doc, elapsed, pacing).floor() as usize;
    pos.min(total - 1)
}

/// Continuous highlight cursor for the given playback snapshot.
///
/// Before playback has started (not playing, elapsed zero) this is negative
/// infinity so every word renders at the floor alpha.
#[must_use]
pub fn highlight_progress(doc: &CueDocument, state: &PlaybackState, pacing: &PacingConfig) -> f64 {
    if !state.is_playing && state.elapsed_seconds == 0.0 {
        return f64::NEG_INFINITY;
    }
    pacing_position(doc, state.elapsed_seconds, pacing)
}

/// Highlight alpha of the word at `ordinal` for a given cursor.
#[inline]
#[must_use]
pub fn word_alpha(progress: f64, ordinal: usize) -> f64 {
    highlight_alpha(progress - ordinal as f64)
}

/// Alpha for every pacing word, indexed by ordinal.
#[must_use]
pub fn word_alphas(doc: &CueDocument, progress: f64) -> Vec<f64> {
    (0..doc.total_words())
        .map(|i| word_alpha(progress, i))
        .collect()
}

/// What a projected token represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A body word.
    Word,
    /// A note annotation, rendered smaller.
    Note,
    /// Line boundary.
    LineBreak,
    /// Paragraph boundary.
    ParagraphBreak,
}

/// One renderable token with its highlight alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenView<'a> {
    /// Token kind.
    pub kind: TokenKind,
    /// Display text; empty for breaks.
    pub text: &'a str,
    /// Pacing ordinal when the token occupies a pacing slot.
    pub ordinal: Option<usize>,
    /// Highlight alpha in `[0.3, 1.0]`; breaks are always opaque.
    pub alpha: f64,
}

/// Project every displayable segment to a token with alpha.
///
/// Time markers are not displayed. Notes that do not occupy pacing slots take
/// the alpha of the next word position so they light up as the reader reaches
/// them.
#[must_use]
pub fn project_tokens(doc: &CueDocument, progress: f64) -> Vec<TokenView<'_>> {
    let paced_notes = doc.note_pacing() == cuecard_core::NotePacing::Include;
    let mut next = 0usize;
    let mut out = Vec::with_capacity(doc.segments().len());

    for segment in doc.segments() {
        let token = match segment {
            Segment::Word(w) => {
                let ordinal = next;
                next += 1;
                TokenView {
                    kind: TokenKind::Word,
                    text: w,
                    ordinal: Some(ordinal),
                    alpha: word_alpha(progress, ordinal),
                }
            }
            Segment::NoteMarker { text, word_count } => {
                let ordinal = next;
                if paced_notes {
                    next += word_count;
                }
                TokenView {
                    kind: TokenKind::Note,
                    text,
                    ordinal: (paced_notes && *word_count > 0).then_some(ordinal),
                    alpha: word_alpha(progress, ordinal),
                }
            }
            Segment::LineBreak => TokenView {
                kind: TokenKind::LineBreak,
                text: "",
                ordinal: None,
                alpha: 1.0,
            },
            Segment::ParagraphBreak => TokenView {
                kind: TokenKind::ParagraphBreak,
                text: "",
                ordinal: None,
                alpha: 1.0,
            },
            Segment::TimeMarker(_) => continue,
        };
        out.push(token);
    }
    out
}

/// Scroll offset placing word `index` about a third of the way down the viewport.
///
/// Clamped to `[0, content_height - viewport_height]` (zero when the content fits).
#[must_use]
pub fn scroll_target(layout: &LayoutMap, index: usize, viewport_height: f32) -> f32 {
    let viewport = if viewport_height.is_finite() {
        viewport_height.max(0.0)
    } else {
        0.0
    };
    let top = layout.top_of(index).unwrap_or(0.0);
    let max_offset = (layout.content_height() - viewport).max(0.0);
    (top - viewport * SCROLL_ANCHOR_FRACTION).clamp(0.0, max_offset)
}

/// Continuous scroll speed for a span, in pixels per second.
///
/// Timed spans scroll their height over their duration; untimed or
/// zero-length spans use `default_speed`.
#[must_use]
pub fn scroll_speed(span_height: f32, duration_seconds: Option<f64>, default_speed: f32) -> f32 {
    match duration_seconds {
        Some(d) if d.is_finite() && d > 0.0 => (f64::from(span_height) / d) as f32,
        _ => default_speed,
    }
}
