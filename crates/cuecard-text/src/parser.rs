#![forbid(unsafe_code)]

//! Cue parser: annotated text to segments.
//!
//! # Grammar
//!
//! ```text
//! time-tag = "[time" WS+ ( minutes ":" seconds2 | seconds ) WS* "]"
//! note-tag = "[note" WS+ body "]"        ; body: no "]", not blank
//! ```
//!
//! Tags may appear on a line of their own or inline between words. Anything
//! that does not match the grammar (an unterminated note, `[time bad]`, a
//! seconds field of 60 or more) stays in the text as ordinary words.
//!
//! # Invariants
//!
//! 1. Parsing never fails.
//! 2. Time markers are non-decreasing in document order; an earlier target is
//!    raised to the previous marker's value.
//! 3. Concatenating the `Word` segments reproduces the whitespace-delimited words
//!    of the source with tags removed.

use crate::segment::Segment;

const NOTE_OPEN: &str = "[note";
const TIME_OPEN: &str = "[time";

/// A recognized tag and the number of bytes it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Tag<'a> {
    Note(&'a str),
    Time(u32),
}

/// Split normalized text into segments.
pub(crate) fn parse_segments(raw: &str) -> Vec<Segment> {
    let normalized = normalize_newlines(raw);
    let mut out = Vec::new();
    let mut last_target: Option<u32> = None;
    let mut line_in_paragraph = false;
    let mut pending_paragraph = false;

    for line in normalized.split('\n') {
        if line.trim().is_empty() {
            if !out.is_empty() {
                pending_paragraph = true;
            }
            line_in_paragraph = false;
            continue;
        }

        if pending_paragraph {
            out.push(Segment::ParagraphBreak);
            pending_paragraph = false;
        } else if line_in_paragraph {
            out.push(Segment::LineBreak);
        }
        line_in_paragraph = true;

        parse_line(line, &mut last_target, &mut out);
    }

    out
}

fn normalize_newlines(raw: &str) -> std::borrow::Cow<'_, str> {
    if raw.contains('\r') {
        std::borrow::Cow::Owned(raw.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        std::borrow::Cow::Borrowed(raw)
    }
}

fn parse_line(line: &str, last_target: &mut Option<u32>, out: &mut Vec<Segment>) {
    let mut literal_start = 0;
    let mut search_from = 0;

    while let Some(offset) = line[search_from..].find('[') {
        let pos = search_from + offset;
        match parse_tag(&line[pos..]) {
            Some((tag, len)) => {
                push_words(&line[literal_start..pos], out);
                match tag {
                    Tag::Note(body) => out.push(Segment::note(body)),
                    Tag::Time(requested) => {
                        let target = match *last_target {
                            Some(prev) if requested < prev => {
                                tracing::trace!(requested, clamped_to = prev, "time marker clamped");
                                prev
                            }
                            _ => requested,
                        };
                        *last_target = Some(target);
                        out.push(Segment::TimeMarker(target));
                    }
                }
                literal_start = pos + len;
                search_from = literal_start;
            }
            None => {
                // '[' is one byte, so pos + 1 is a char boundary.
                search_from = pos + 1;
            }
        }
    }

    push_words(&line[literal_start..], out);
}

fn push_words(text: &str, out: &mut Vec<Segment>) {
    out.extend(text.split_whitespace().map(|w| Segment::Word(w.to_owned())));
}

/// Try to read a tag at the start of `s` (which begins with `[`).
fn parse_tag(s: &str) -> Option<(Tag<'_>, usize)> {
    if let Some(rest) = s.strip_prefix(NOTE_OPEN) {
        return parse_note(rest).map(|(body, len)| (Tag::Note(body), NOTE_OPEN.len() + len));
    }
    if let Some(rest) = s.strip_prefix(TIME_OPEN) {
        return parse_time(rest).map(|(secs, len)| (Tag::Time(secs), TIME_OPEN.len() + len));
    }
    None
}

/// `WS+ body "]"`; returns the trimmed body and bytes consumed.
fn parse_note(rest: &str) -> Option<(&str, usize)> {
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let close = rest.find(']')?;
    let body = rest[..close].trim();
    if body.is_empty() {
        return None;
    }
    Some((body, close + 1))
}

/// `WS+ (mm:ss | ss) WS* "]"`; returns seconds and bytes consumed.
fn parse_time(rest: &str) -> Option<(u32, usize)> {
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let close = rest.find(']')?;
    let value = rest[..close].trim();
    let seconds = parse_time_value(value)?;
    Some((seconds, close + 1))
}

fn parse_time_value(value: &str) -> Option<u32> {
    match value.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes = parse_digits(minutes)?;
            if seconds.len() != 2 {
                return None;
            }
            let seconds = parse_digits(seconds)?;
            if seconds >= 60 {
                return None;
            }
            minutes.checked_mul(60)?.checked_add(seconds)
        }
        None => parse_digits(value),
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(segments: &[Segment]) -> Vec<&str> {
        segments.iter().filter_map(Segment::as_word).collect()
    }

    #[test]
    fn plain_words_and_breaks() {
        let segs = parse_segments("Hello world\nnext line\n\nnew para");
        assert_eq!(
            segs,
            vec![
                Segment::Word("Hello".into()),
                Segment::Word("world".into()),
                Segment::LineBreak,
                Segment::Word("next".into()),
                Segment::Word("line".into()),
                Segment::ParagraphBreak,
                Segment::Word("new".into()),
                Segment::Word("para".into()),
            ]
        );
    }

    #[test]
    fn multiple_blank_lines_make_one_paragraph_break() {
        let segs = parse_segments("a\n\n \n\t\nb");
        assert_eq!(
            segs,
            vec![
                Segment::Word("a".into()),
                Segment::ParagraphBreak,
                Segment::Word("b".into()),
            ]
        );
    }

    #[test]
    fn leading_and_trailing_blank_lines_are_dropped() {
        let segs = parse_segments("\n\n  one  \n\n");
        assert_eq!(segs, vec![Segment::Word("one".into())]);
    }

    #[test]
    fn crlf_is_normalized() {
        let segs = parse_segments("a\r\nb\rc");
        assert_eq!(
            segs,
            vec![
                Segment::Word("a".into()),
                Segment::LineBreak,
                Segment::Word("b".into()),
                Segment::LineBreak,
                Segment::Word("c".into()),
            ]
        );
    }

    #[test]
    fn time_tag_forms() {
        assert_eq!(parse_segments("[time 01:30]"), vec![Segment::TimeMarker(90)]);
        assert_eq!(parse_segments("[time 45]"), vec![Segment::TimeMarker(45)]);
        assert_eq!(parse_segments("[time 120]"), vec![Segment::TimeMarker(120)]);
        assert_eq!(parse_segments("[time  2:05 ]"), vec![Segment::TimeMarker(125)]);
    }

    #[test]
    fn malformed_time_tags_are_literal() {
        for src in [
            "[time bad]",
            "[time 1:5]",
            "[time 1:75]",
            "[time]",
            "[time 00:10",
            "[timer 10]",
            "[time10]",
            "[time -5]",
            "[time 99999999999]",
        ] {
            let segs = parse_segments(src);
            assert!(
                segs.iter().all(|s| matches!(s, Segment::Word(_))),
                "{src:?} should be literal, got {segs:?}"
            );
            assert_eq!(words(&segs).join(" "), src.split_whitespace().collect::<Vec<_>>().join(" "));
        }
    }

    #[test]
    fn note_tag_keeps_body_verbatim() {
        let segs = parse_segments("[note   remember to  smile ]");
        assert_eq!(
            segs,
            vec![Segment::NoteMarker {
                text: "remember to  smile".into(),
                word_count: 3,
            }]
        );
    }

    #[test]
    fn unterminated_note_is_literal() {
        let segs = parse_segments("[note forgot to close");
        assert_eq!(words(&segs), vec!["[note", "forgot", "to", "close"]);
    }

    #[test]
    fn empty_note_is_literal() {
        let segs = parse_segments("[note ]");
        assert_eq!(words(&segs), vec!["[note", "]"]);
    }

    #[test]
    fn inline_tags_split_surrounding_words() {
        let segs = parse_segments("Hello [note smile] world[time 00:05]again");
        assert_eq!(
            segs,
            vec![
                Segment::Word("Hello".into()),
                Segment::note("smile"),
                Segment::Word("world".into()),
                Segment::TimeMarker(5),
                Segment::Word("again".into()),
            ]
        );
    }

    #[test]
    fn bracket_text_survives_next_to_tags() {
        let segs = parse_segments("[see fig 2] [note ok] [x");
        assert_eq!(words(&segs), vec!["[see", "fig", "2]", "[x"]);
        assert!(segs.contains(&Segment::note("ok")));
    }

    #[test]
    fn time_markers_are_clamped_monotonic() {
        let segs = parse_segments("[time 00:30]\na\n[time 00:10]\nb\n[time 00:40]");
        let targets: Vec<u32> = segs
            .iter()
            .filter_map(|s| match s {
                Segment::TimeMarker(t) => Some(*t),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![30, 30, 40]);
    }

    #[test]
    fn tags_are_case_sensitive() {
        let segs = parse_segments("[TIME 00:10] [Note hi]");
        assert_eq!(words(&segs), vec!["[TIME", "00:10]", "[Note", "hi]"]);
    }

    #[test]
    fn multibyte_text_around_brackets() {
        let segs = parse_segments("héllo [wörld] [note ünïcode] 終わり");
        assert_eq!(words(&segs), vec!["héllo", "[wörld]", "終わり"]);
        assert!(segs.contains(&Segment::note("ünïcode")));
    }

    #[test]
    fn empty_input() {
        assert!(parse_segments("").is_empty());
        assert!(parse_segments("   \n\n ").is_empty());
    }
}
