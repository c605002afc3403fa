//! Core data models used throughout the pipeline.
//!
//! These types represent the documents, fragments, chunks, and answers that
//! flow through the splitting, indexing, and retrieval stages.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A raw document loaded from the corpus.
#[derive(Debug, Clone)]
pub struct Document {
    /// Corpus-relative path; attached to every fragment and chunk as the
    /// source identifier so later stages never re-resolve provenance.
    pub id: String,
    pub body: String,
}

/// Heading depths recognized by the structural splitter, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    Chapter,
    Section,
    Subsection,
    Subsubsection,
}

/// Structural labels inherited from the headings above a piece of text.
///
/// Levels are ranked chapter > section > subsection > subsubsection.
/// Entering a heading at one level clears every deeper level, so a fragment
/// under a `###` heading carries chapter, section, and subsection labels
/// but no subsubsection unless a `####` heading follows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsubsection: Option<String>,
}

impl Hierarchy {
    /// Record a heading at `level`, invalidating everything deeper.
    pub fn enter(&mut self, level: HeadingLevel, text: &str) {
        let text = Some(text.to_string());
        match level {
            HeadingLevel::Chapter => {
                self.chapter = text;
                self.section = None;
                self.subsection = None;
                self.subsubsection = None;
            }
            HeadingLevel::Section => {
                self.section = text;
                self.subsection = None;
                self.subsubsection = None;
            }
            HeadingLevel::Subsection => {
                self.subsection = text;
                self.subsubsection = None;
            }
            HeadingLevel::Subsubsection => {
                self.subsubsection = text;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chapter.is_none()
            && self.section.is_none()
            && self.subsection.is_none()
            && self.subsubsection.is_none()
    }

    /// The labels present, outermost first.
    pub fn path(&self) -> Vec<&str> {
        [
            self.chapter.as_deref(),
            self.section.as_deref(),
            self.subsection.as_deref(),
            self.subsubsection.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// A run of text between two structural headings, before size-based
/// splitting. Concatenating a document's fragment texts in order
/// reconstructs the body, modulo the consumed heading lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub source: String,
    pub hierarchy: Hierarchy,
}

/// The unit of indexing and retrieval: a size-bounded window of fragment
/// text carrying the fragment's hierarchy unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic content id: SHA-256 over source, ordinal, and text.
    /// Rebuilding the same corpus with the same configuration reproduces
    /// the same ids, which keeps the persisted index artifact stable.
    pub id: String,
    pub source: String,
    /// Position in the global chunk sequence; the retrieval tie-breaker.
    pub ordinal: usize,
    pub text: String,
    pub hierarchy: Hierarchy,
}

impl Chunk {
    pub fn new(source: &str, ordinal: usize, text: String, hierarchy: Hierarchy) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(ordinal.to_le_bytes());
        hasher.update(text.as_bytes());
        let id = format!("{:x}", hasher.finalize());

        Self {
            id,
            source: source.to_string(),
            ordinal,
            text,
            hierarchy,
        }
    }
}

/// A scored chunk produced by the hybrid retriever. Ephemeral; the ordering
/// of a result sequence defines relevance rank.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub score: f64,
}

/// Provenance of a retrieved chunk: source file plus hierarchy path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub source: String,
    pub hierarchy: Hierarchy,
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        for label in self.hierarchy.path() {
            write!(f, " \u{276f} {}", label)?;
        }
        Ok(())
    }
}

/// Final response for one question.
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_enter_clears_deeper_levels() {
        let mut h = Hierarchy::default();
        h.enter(HeadingLevel::Chapter, "A");
        h.enter(HeadingLevel::Section, "B");
        h.enter(HeadingLevel::Subsection, "C");
        h.enter(HeadingLevel::Subsubsection, "D");
        assert_eq!(h.path(), vec!["A", "B", "C", "D"]);

        h.enter(HeadingLevel::Section, "B2");
        assert_eq!(h.chapter.as_deref(), Some("A"));
        assert_eq!(h.section.as_deref(), Some("B2"));
        assert_eq!(h.subsection, None);
        assert_eq!(h.subsubsection, None);
    }

    #[test]
    fn test_hierarchy_path_skips_absent_levels() {
        let mut h = Hierarchy::default();
        h.enter(HeadingLevel::Section, "Only Section");
        assert_eq!(h.path(), vec!["Only Section"]);
        assert!(!h.is_empty());
    }

    #[test]
    fn test_chunk_id_deterministic() {
        let a = Chunk::new("doc.md", 0, "text".to_string(), Hierarchy::default());
        let b = Chunk::new("doc.md", 0, "text".to_string(), Hierarchy::default());
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_chunk_id_distinguishes_sources() {
        let a = Chunk::new("a.md", 0, "same text".to_string(), Hierarchy::default());
        let b = Chunk::new("b.md", 0, "same text".to_string(), Hierarchy::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_citation_display() {
        let mut h = Hierarchy::default();
        h.enter(HeadingLevel::Chapter, "Kernel");
        h.enter(HeadingLevel::Section, "Scheduling");
        let c = Citation {
            source: "docs/kernel.md".to_string(),
            hierarchy: h,
        };
        assert_eq!(
            c.to_string(),
            "docs/kernel.md \u{276f} Kernel \u{276f} Scheduling"
        );
    }
}
