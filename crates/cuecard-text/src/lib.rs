#![forbid(unsafe_code)]

//! Cue text handling: parsing, the timeline index, and projections.
//!
//! This crate turns annotated presenter notes into an immutable
//! [`CueDocument`] and maps playback time onto it:
//! - [`parse`] - annotated text to segments, never fails
//! - [`CueDocument`] - segments, timeline index, pacing spans
//! - [`LayoutMap`] - per-word vertical offsets for auto-scroll
//! - projection functions ([`current_word_index`], [`highlight_progress`],
//!   [`scroll_target`], ...) - pure, framework-free
//!
//! # Example
//! ```
//! use cuecard_core::{PacingConfig, PlaybackState};
//! use cuecard_text::{current_word_index, highlight_progress, parse, word_alphas};
//!
//! let pacing = PacingConfig::new(120);
//! let doc = parse("Hello world\n\n[time 00:10]\nSecond line here", &pacing);
//!
//! assert_eq!(current_word_index(&doc, 5.0, &pacing), 1);
//!
//! // Before playback every word sits at the floor alpha.
//! let idle = highlight_progress(&doc, &PlaybackState::default(), &pacing);
//! assert!(word_alphas(&doc, idle).iter().all(|a| (*a - 0.3).abs() < 1e-9));
//! ```

pub mod document;
pub mod layout;
mod parser;
pub mod projection;
pub mod segment;

pub use document::{CueDocument, parse};
pub use layout::LayoutMap;
pub use projection::{
    TokenKind, TokenView, current_word_index, highlight_progress, pacing_position,
    project_tokens, scroll_speed, scroll_target, word_alpha, word_alphas,
};
pub use segment::{PacingSpan, Segment, TimelineEntry, TimingSummary};
