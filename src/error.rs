//! Error taxonomy for the retrieval pipeline.
//!
//! Startup failures (corpus loading, index building or loading) are fatal
//! and abort. Per-query failures (retrieval, generation) are reported to
//! the caller and leave the serving loop alive; a generation failure still
//! carries the citations, since retrieval succeeded independently.

use thiserror::Error;

use crate::models::Citation;

#[derive(Debug, Error)]
pub enum Error {
    /// A raw document or the corpus directory could not be read.
    #[error("failed to load corpus: {0}")]
    Load(#[source] anyhow::Error),

    /// The embedding backend failed while building the vector index.
    #[error("failed to build vector index: {0}")]
    IndexBuild(#[source] anyhow::Error),

    /// A persisted vector index exists but could not be restored.
    #[error("failed to load persisted vector index: {0}")]
    IndexLoad(#[source] anyhow::Error),

    /// The embedding backend failed while serving a query.
    #[error("retrieval failed: {0}")]
    Retrieval(#[source] anyhow::Error),

    /// The text generator failed after retrieval succeeded.
    #[error("generation failed: {source}")]
    Generation {
        #[source]
        source: anyhow::Error,
        /// Provenance of the chunks that were retrieved for the question.
        citations: Vec<Citation>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
