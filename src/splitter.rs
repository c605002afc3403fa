//! Heading-driven structural splitter.
//!
//! First of two splitting passes: walks a document line by line and cuts it
//! at markdown heading boundaries, so every emitted fragment carries the
//! chapter/section/subsection/subsubsection labels in force where its text
//! appeared. The second pass ([`crate::chunker`]) enforces size bounds.
//!
//! The scan keeps one held heading per level. A heading at level L flushes
//! the text accumulated since the previous heading as a fragment tagged
//! with the *previous* hierarchy state, then records the new heading and
//! clears every deeper level. Text before the first heading becomes a
//! fragment with an empty hierarchy. There are no error conditions:
//! malformed heading syntax is plain text, and heading-like lines inside
//! fenced code blocks are plain text too.

use crate::models::{Document, Fragment, HeadingLevel, Hierarchy};

/// Split one document into fragments along `#`..`####` headings.
pub fn split_headings(doc: &Document) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut state = Hierarchy::default();
    let mut buf = String::new();
    let mut in_fence = false;

    for line in doc.body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            buf.push_str(line);
            buf.push('\n');
            continue;
        }

        match parse_heading(line).filter(|_| !in_fence) {
            Some((level, heading)) => {
                flush(&mut fragments, &mut buf, &state, &doc.id);
                state.enter(level, heading);
            }
            None => {
                buf.push_str(line);
                buf.push('\n');
            }
        }
    }

    flush(&mut fragments, &mut buf, &state, &doc.id);
    fragments
}

fn flush(fragments: &mut Vec<Fragment>, buf: &mut String, state: &Hierarchy, source: &str) {
    let text = buf.trim();
    if !text.is_empty() {
        fragments.push(Fragment {
            text: text.to_string(),
            source: source.to_string(),
            hierarchy: state.clone(),
        });
    }
    buf.clear();
}

/// Parse `# Heading` syntax: one to four `#` followed by whitespace.
/// Five or more hashes, or a missing space, is not a recognized heading.
fn parse_heading(line: &str) -> Option<(HeadingLevel, &str)> {
    let s = line.trim();
    let hashes = s.bytes().take_while(|&b| b == b'#').count();
    let level = match hashes {
        1 => HeadingLevel::Chapter,
        2 => HeadingLevel::Section,
        3 => HeadingLevel::Subsection,
        4 => HeadingLevel::Subsubsection,
        _ => return None,
    };
    let rest = &s[hashes..];
    if rest.is_empty() {
        return Some((level, ""));
    }
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    Some((level, rest.trim()))
}
