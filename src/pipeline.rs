//! Pipeline orchestration: startup indexing and the per-query entry points.
//!
//! Startup is a one-shot batch: load the corpus, split it structurally,
//! split it by size, then build or restore the vector index and rebuild
//! the keyword index. Both indices are immutable afterwards, so queries
//! borrow them read-only and are safe to serve concurrently.
//!
//! The load-or-build decision for the vector index is purely
//! presence-of-artifact. A persisted artifact that no longer matches the
//! corpus is not detected beyond a chunk-count comparison against the
//! freshly built keyword index, which is logged as a staleness warning.

use anyhow::anyhow;
use tracing::{info, warn};

use crate::chunker;
use crate::config::Config;
use crate::embedding::{self, create_provider};
use crate::error::{Error, Result};
use crate::generate::{self, INSUFFICIENT_CONTEXT};
use crate::keyword_index::KeywordIndex;
use crate::loader;
use crate::models::{Answer, Chunk, Citation, Fragment, RetrievalResult};
use crate::retriever::{self, RetrievalParams};
use crate::splitter;
use crate::vector_index::VectorIndex;

/// A fully constructed retrieval pipeline: the immutable chunk set plus
/// both indices, ready to serve queries.
pub struct Pipeline {
    config: Config,
    document_count: usize,
    fragment_count: usize,
    chunks: Vec<Chunk>,
    vector_index: VectorIndex,
    keyword_index: KeywordIndex,
}

impl Pipeline {
    /// Load the corpus, chunk it, and build or restore both indices.
    pub async fn build(config: Config) -> Result<Self> {
        let documents = loader::load_documents(&config.corpus).map_err(Error::Load)?;

        let fragments: Vec<Fragment> = documents
            .iter()
            .flat_map(splitter::split_headings)
            .collect();
        let chunks = chunker::split_fragments(
            &fragments,
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        );
        info!(
            documents = documents.len(),
            fragments = fragments.len(),
            chunks = chunks.len(),
            "corpus split"
        );

        let index_dir = &config.index.dir;
        let vector_index = if VectorIndex::artifact_exists(index_dir) {
            let index = VectorIndex::load(index_dir).map_err(Error::IndexLoad)?;
            info!(
                chunks = index.len(),
                model = %index.meta().model,
                "loaded persisted vector index"
            );

            if config.embedding.is_enabled() && index.meta().model != config.embedding.model {
                return Err(Error::IndexLoad(anyhow!(
                    "persisted index was built with embedding model '{}' but '{}' is configured; \
                     delete {} and re-run `docqa index`",
                    index.meta().model,
                    config.embedding.model,
                    index_dir.display()
                )));
            }
            if index.meta().chunk_size != config.chunking.chunk_size
                || index.meta().chunk_overlap != config.chunking.chunk_overlap
            {
                warn!(
                    persisted_size = index.meta().chunk_size,
                    persisted_overlap = index.meta().chunk_overlap,
                    configured_size = config.chunking.chunk_size,
                    configured_overlap = config.chunking.chunk_overlap,
                    "persisted vector index was built with different chunking parameters"
                );
            }
            index
        } else {
            let index = embed_corpus(&config, chunks.clone()).await?;
            index.save(index_dir).map_err(Error::IndexBuild)?;
            info!(
                chunks = index.len(),
                dir = %index_dir.display(),
                "built and persisted vector index"
            );
            index
        };

        let keyword_index = KeywordIndex::build(chunks.iter().map(|c| c.text.as_str()));

        if vector_index.len() != keyword_index.len() {
            warn!(
                persisted = vector_index.len(),
                current = keyword_index.len(),
                "persisted vector index chunk count differs from the current corpus; \
                 the artifact is likely stale — re-run `docqa index --rebuild`"
            );
        }

        Ok(Self {
            config,
            document_count: documents.len(),
            fragment_count: fragments.len(),
            chunks,
            vector_index,
            keyword_index,
        })
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn vector_count(&self) -> usize {
        self.vector_index.len()
    }

    /// Retrieval-only path: embed the question and fuse both legs.
    ///
    /// An empty chunk set returns an empty sequence without touching the
    /// embedding backend; an embedding failure is a per-query error, not
    /// a crash. Callers may retry, or degrade to the keyword index alone
    /// via [`KeywordIndex::search`].
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievalResult>> {
        if self.chunks.is_empty() && self.vector_index.is_empty() {
            return Ok(Vec::new());
        }

        let provider = create_provider(&self.config.embedding).map_err(Error::Retrieval)?;
        let query_vec =
            embedding::embed_query(provider.as_ref(), &self.config.embedding, question)
                .await
                .map_err(Error::Retrieval)?;

        let params = RetrievalParams {
            k: self.config.retrieval.k,
            fetch_k: self.config.retrieval.fetch_k,
            vector_weight: self.config.retrieval.vector_weight,
            keyword_weight: self.config.retrieval.keyword_weight,
        };

        Ok(retriever::retrieve(
            &self.vector_index,
            &self.keyword_index,
            &self.chunks,
            question,
            &query_vec,
            &params,
        ))
    }

    /// Answer one question: retrieve, assemble context, generate.
    ///
    /// With no retrieved context the generator is skipped and the answer
    /// is exactly the insufficient-context sentinel. A generation failure
    /// carries the citations, since retrieval already succeeded.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let results = self.retrieve(question).await?;

        if results.is_empty() {
            return Ok(Answer {
                answer: INSUFFICIENT_CONTEXT.to_string(),
                citations: Vec::new(),
            });
        }

        let max_chunks = self.config.retrieval.context_chunks;
        let citations: Vec<Citation> = results
            .iter()
            .take(max_chunks)
            .map(|r| Citation {
                source: r.chunk.source.clone(),
                hierarchy: r.chunk.hierarchy.clone(),
            })
            .collect();

        let context = generate::assemble_context(&results, max_chunks);
        let answer = generate::generate(&self.config.generation, &context, question)
            .await
            .map_err(|e| Error::Generation {
                source: e,
                citations: citations.clone(),
            })?;

        Ok(Answer { answer, citations })
    }
}

async fn embed_corpus(config: &Config, chunks: Vec<Chunk>) -> Result<VectorIndex> {
    let provider = create_provider(&config.embedding).map_err(Error::IndexBuild)?;
    if !config.embedding.is_enabled() && !chunks.is_empty() {
        return Err(Error::IndexBuild(anyhow!(
            "embedding provider is disabled; set [embedding] provider in config"
        )));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(config.embedding.batch_size.max(1)) {
        let embedded = embedding::embed_texts(provider.as_ref(), &config.embedding, batch)
            .await
            .map_err(Error::IndexBuild)?;
        vectors.extend(embedded);
    }

    VectorIndex::build(
        chunks,
        vectors,
        provider.model_name(),
        config.embedding.dims,
        &config.chunking,
    )
    .map_err(Error::IndexBuild)
}
