//! Recursive separator-based segmentation.
//!
//! Splits text into contiguous, non-overlapping byte ranges of at most
//! `budget` characters. Coarse separators are tried first; only pieces that
//! still exceed the budget fall through to finer ones, down to single
//! characters. Separators stay attached to the end of the piece before them.

use std::ops::Range;

/// Separator levels, coarsest first.
const LEVELS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "? ", "! "], &[" "]];

/// Partition `text` into ranges that cover it exactly, each at most `budget` chars.
pub(crate) fn segment(text: &str, budget: usize) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    if !text.is_empty() {
        segment_into(text, 0, budget.max(1), 0, &mut out);
    }
    out
}

fn segment_into(text: &str, offset: usize, budget: usize, level: usize, out: &mut Vec<Range<usize>>) {
    if text.chars().count() <= budget {
        out.push(offset..offset + text.len());
        return;
    }

    let found = (level..LEVELS.len()).find_map(|lvl| {
        let pieces = split_keeping(text, LEVELS[lvl]);
        (pieces.len() > 1).then_some((lvl, pieces))
    });

    let Some((lvl, pieces)) = found else {
        split_chars(text, offset, budget, out);
        return;
    };

    // Greedily merge adjacent pieces up to the budget
    let mut start = 0;
    let mut end = 0;
    let mut current = 0;

    for piece in pieces {
        let len = text[piece.clone()].chars().count();

        if len > budget {
            if end > start {
                out.push(offset + start..offset + end);
            }
            segment_into(&text[piece.clone()], offset + piece.start, budget, lvl + 1, out);
            start = piece.end;
            end = piece.end;
            current = 0;
            continue;
        }

        if current + len > budget && end > start {
            out.push(offset + start..offset + end);
            start = piece.start;
            current = 0;
        }

        end = piece.end;
        current += len;
    }

    if end > start {
        out.push(offset + start..offset + end);
    }
}

/// Split after every occurrence of any separator; the pieces cover `text`.
fn split_keeping(text: &str, separators: &[&str]) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let next = separators
            .iter()
            .filter_map(|sep| text[start..].find(sep).map(|i| start + i + sep.len()))
            .min();

        match next {
            Some(end) => {
                pieces.push(start..end);
                start = end;
            }
            None => break,
        }
    }

    if start < text.len() {
        pieces.push(start..text.len());
    }
    pieces
}

fn split_chars(text: &str, offset: usize, budget: usize, out: &mut Vec<Range<usize>>) {
    let mut start = 0;
    let mut count = 0;

    for (i, _) in text.char_indices() {
        if count == budget {
            out.push(offset + start..offset + i);
            start = i;
            count = 0;
        }
        count += 1;
    }

    out.push(offset + start..offset + text.len());
}
