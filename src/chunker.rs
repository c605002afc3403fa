//! Size-bounded content splitter.
//!
//! Second splitting pass: cuts each fragment's text into overlapping
//! windows of at most `chunk_size` characters. The splitter is recursive —
//! it prefers paragraph boundaries, then line breaks, then spaces, and
//! only cuts raw characters when a piece still will not fit. Consecutive
//! windows from the same fragment share up to `chunk_overlap` characters.
//!
//! Every chunk inherits its fragment's hierarchy unchanged, and no chunk
//! crosses a fragment boundary: a fragment may yield zero, one, or many
//! chunks, but never a chunk mixing two fragments' content.

use std::collections::VecDeque;

use crate::models::{Chunk, Fragment};

/// Separators tried in order, coarsest first. The empty string means
/// character-level cuts, the fallback of last resort.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Split every fragment into chunks. Ordinals number the chunks across the
/// whole corpus, in order.
pub fn split_fragments(
    fragments: &[Fragment],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for fragment in fragments {
        for piece in split_text(&fragment.text, chunk_size, chunk_overlap) {
            let ordinal = chunks.len();
            chunks.push(Chunk::new(
                &fragment.source,
                ordinal,
                piece,
                fragment.hierarchy.clone(),
            ));
        }
    }
    chunks
}

/// Split raw text into size-bounded pieces. Sizes are measured in
/// characters, not bytes, so multibyte text never splits mid-codepoint.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    split_recursive(text, &SEPARATORS, chunk_size, chunk_overlap)
        .into_iter()
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn split_recursive(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    // Pick the coarsest separator that actually occurs; "" always matches.
    let mut separator = *separators.last().unwrap_or(&"");
    let mut finer: &[&str] = &[];
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            separator = sep;
            finer = &separators[i + 1..];
            break;
        }
    }

    let mut chunks = Vec::new();
    let mut fitting: Vec<String> = Vec::new();

    for piece in split_on(text, separator) {
        if char_len(&piece) < chunk_size {
            fitting.push(piece);
        } else {
            // Flush what fits so far, then re-split the oversized piece
            // with the finer separators.
            if !fitting.is_empty() {
                chunks.extend(merge_pieces(&fitting, separator, chunk_size, chunk_overlap));
                fitting.clear();
            }
            if finer.is_empty() {
                // A single unsplittable unit; emitted oversized.
                chunks.push(piece);
            } else {
                chunks.extend(split_recursive(&piece, finer, chunk_size, chunk_overlap));
            }
        }
    }

    if !fitting.is_empty() {
        chunks.extend(merge_pieces(&fitting, separator, chunk_size, chunk_overlap));
    }

    chunks
}

fn split_on(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Greedily pack pieces into windows of at most `chunk_size` characters,
/// re-joined with the separator they were split on. When a window fills,
/// a trailing run of pieces totalling at most `chunk_overlap` characters
/// is retained as the seed of the next window, so adjacent windows share
/// that run byte for byte.
fn merge_pieces(
    pieces: &[String],
    separator: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut merged = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        let joined = if window.is_empty() { 0 } else { sep_len };

        if total + len + joined > chunk_size && !window.is_empty() {
            merged.push(join(&window, separator));

            // Shrink until the carried run fits under the overlap budget
            // and leaves room for the incoming piece.
            while total > chunk_overlap
                || (total + len + if window.is_empty() { 0 } else { sep_len } > chunk_size
                    && total > 0)
            {
                let front = window.pop_front().expect("window is non-empty");
                total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
            }
        }

        if !window.is_empty() {
            total += sep_len;
        }
        total += len;
        window.push_back(piece);
    }

    if !window.is_empty() {
        merged.push(join(&window, separator));
    }

    merged
}

fn join(pieces: &VecDeque<&str>, separator: &str) -> String {
    pieces
        .iter()
        .copied()
        .collect::<Vec<_>>()
        .join(separator)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
