#![forbid(unsafe_code)]

//! Vertical word positions for auto-scroll.
//!
//! Hosts that run a real text layout report each pacing word's top offset via
//! [`LayoutMap::from_tops`]. Headless hosts and tests use
//! [`LayoutMap::estimate`], a greedy word wrap over a monospace-ish advance.

use unicode_width::UnicodeWidthStr;

use crate::document::CueDocument;
use crate::segment::{PacingSpan, Segment};

/// Advance of one terminal column, as a fraction of the font size.
pub const CHAR_ADVANCE_EM: f32 = 0.55;
/// Line height, as a multiple of the font size.
pub const LINE_HEIGHT_EM: f32 = 1.5;
/// Extra gap after a paragraph, as a fraction of the line height.
pub const PARAGRAPH_GAP_LINES: f32 = 0.5;
/// Notes render smaller than body text.
pub const NOTE_SCALE: f32 = 0.85;

const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Top offset of every pacing word plus the total content height.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutMap {
    word_tops: Vec<f32>,
    content_height: f32,
}

impl LayoutMap {
    /// Build from host-measured word tops.
    ///
    /// Non-finite tops are treated as zero; the content height is raised to at
    /// least the largest top.
    #[must_use]
    pub fn from_tops(word_tops: Vec<f32>, content_height: f32) -> Self {
        let word_tops: Vec<f32> = word_tops
            .into_iter()
            .map(|t| if t.is_finite() { t.max(0.0) } else { 0.0 })
            .collect();
        let max_top = word_tops.iter().copied().fold(0.0_f32, f32::max);
        let content_height = if content_height.is_finite() {
            content_height.max(max_top)
        } else {
            max_top
        };
        Self {
            word_tops,
            content_height,
        }
    }

    /// Estimate a layout for `doc` at `font_size` wrapped to `width` pixels.
    ///
    /// A non-positive or non-finite `width` disables wrapping.
    #[must_use]
    pub fn estimate(doc: &CueDocument, font_size: f32, width: f32) -> Self {
        let font = if font_size.is_finite() && font_size > 0.0 {
            font_size
        } else {
            DEFAULT_FONT_SIZE
        };
        let max_x = if width.is_finite() && width > 0.0 {
            width
        } else {
            f32::INFINITY
        };
        let advance = font * CHAR_ADVANCE_EM;
        let line_h = font * LINE_HEIGHT_EM;

        let mut cursor = Cursor {
            x: 0.0,
            y: 0.0,
            max_x,
            space: advance,
            line_h,
        };
        let mut tops = Vec::with_capacity(doc.total_words());
        let mut any_content = false;
        let paced_notes = doc.note_pacing() == cuecard_core::NotePacing::Include;

        for segment in doc.segments() {
            match segment {
                Segment::Word(w) => {
                    tops.push(cursor.place(w.width() as f32 * advance));
                    any_content = true;
                }
                Segment::NoteMarker { text, .. } => {
                    for word in text.split_whitespace() {
                        let top = cursor.place(word.width() as f32 * advance * NOTE_SCALE);
                        if paced_notes {
                            tops.push(top);
                        }
                    }
                    any_content = true;
                }
                Segment::LineBreak => cursor.newline(0.0),
                Segment::ParagraphBreak => cursor.newline(line_h * PARAGRAPH_GAP_LINES),
                Segment::TimeMarker(_) => {}
            }
        }

        let content_height = if any_content { cursor.y + line_h } else { 0.0 };
        Self {
            word_tops: tops,
            content_height,
        }
    }

    /// Top offset of the word at `ordinal`.
    #[inline]
    #[must_use]
    pub fn top_of(&self, ordinal: usize) -> Option<f32> {
        self.word_tops.get(ordinal).copied()
    }

    /// Total content height.
    #[inline]
    #[must_use]
    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    /// Number of words with a known position.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.word_tops.len()
    }

    /// Whether no word positions are known.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.word_tops.is_empty()
    }

    /// Vertical extent covered by a pacing span.
    #[must_use]
    pub fn span_height(&self, span: &PacingSpan) -> f32 {
        let Some(start) = self.top_of(span.first_word) else {
            return 0.0;
        };
        let end = self.top_of(span.end_word()).unwrap_or(self.content_height);
        (end - start).max(0.0)
    }
}

struct Cursor {
    x: f32,
    y: f32,
    max_x: f32,
    space: f32,
    line_h: f32,
}

impl Cursor {
    /// Place a word of `w` pixels, wrapping first when it does not fit.
    fn place(&mut self, w: f32) -> f32 {
        let gap = if self.x > 0.0 { self.space } else { 0.0 };
        if self.x > 0.0 && self.x + gap + w > self.max_x {
            self.newline(0.0);
            self.x = w;
        } else {
            self.x += gap + w;
        }
        self.y
    }

    fn newline(&mut self, extra: f32) {
        self.x = 0.0;
        self.y += self.line_h + extra;
    }
}
