#![forbid(unsafe_code)]

//! Pacing and presentation settings for a playback session.
//!
//! A [`PacingConfig`] is fixed for the lifetime of a session. Replacing it means
//! re-parsing the document so the timeline index (and therefore the word count
//! used for pacing) is derived again.

use serde::{Deserialize, Serialize};

use crate::geometry::Size;

/// Lowest accepted reading rate.
pub const MIN_WORDS_PER_MINUTE: u32 = 1;
/// Highest accepted reading rate.
pub const MAX_WORDS_PER_MINUTE: u32 = 1000;

/// Aspect ratio of the mirror surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9 landscape.
    #[default]
    #[serde(rename = "16:9")]
    Widescreen,
    /// 4:3 landscape.
    #[serde(rename = "4:3")]
    Standard,
    /// 1:1 square.
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    /// Ratio as `(width, height)` terms.
    #[must_use]
    pub const fn terms(self) -> (u32, u32) {
        match self {
            Self::Widescreen => (16, 9),
            Self::Standard => (4, 3),
            Self::Square => (1, 1),
        }
    }

    /// Surface size for this ratio, `preferred_width` wide when the display allows it.
    #[must_use]
    pub fn fit(self, preferred_width: u32, display: Size) -> Size {
        let (num, den) = self.terms();
        display.fit_ratio(num, den, preferred_width)
    }
}

/// Whether words inside `[note ...]` annotations advance the pacing cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotePacing {
    /// Notes are displayed but never gate progress.
    #[default]
    Exclude,
    /// Every word of a note occupies a pacing slot like an ordinary word.
    Include,
}

/// Reading pace and presentation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PacingConfig {
    /// Uniform reading rate, used wherever no time marker bounds a span.
    pub words_per_minute: u32,
    /// Aspect ratio of the mirror surface.
    pub aspect_ratio: AspectRatio,
    /// Font size in logical points, used by layout estimation.
    pub font_size: f32,
    /// Dark presentation palette.
    #[serde(rename = "isDarkMode")]
    pub dark_mode: bool,
    /// Note word handling.
    pub note_pacing: NotePacing,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 150,
            aspect_ratio: AspectRatio::Widescreen,
            font_size: 16.0,
            dark_mode: true,
            note_pacing: NotePacing::Exclude,
        }
    }
}

impl PacingConfig {
    /// Config with the given reading rate and defaults elsewhere.
    #[must_use]
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute,
            ..Self::default()
        }
    }

    /// Set the aspect ratio (builder).
    #[must_use]
    pub fn aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Set the font size (builder).
    #[must_use]
    pub fn font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    /// Set dark mode (builder).
    #[must_use]
    pub fn dark_mode(mut self, dark_mode: bool) -> Self {
        self.dark_mode = dark_mode;
        self
    }

    /// Set note pacing (builder).
    #[must_use]
    pub fn note_pacing(mut self, note_pacing: NotePacing) -> Self {
        self.note_pacing = note_pacing;
        self
    }

    /// Reading rate clamped into the accepted range.
    #[must_use]
    pub fn effective_wpm(&self) -> u32 {
        self.words_per_minute
            .clamp(MIN_WORDS_PER_MINUTE, MAX_WORDS_PER_MINUTE)
    }

    /// Reading rate in words per second.
    #[must_use]
    pub fn words_per_second(&self) -> f64 {
        f64::from(self.effective_wpm()) / 60.0
    }

    /// Font size with non-finite or non-positive values replaced by the default.
    #[must_use]
    pub fn effective_font_size(&self) -> f32 {
        if self.font_size.is_finite() && self.font_size > 0.0 {
            self.font_size
        } else {
            Self::default().font_size
        }
    }
}
