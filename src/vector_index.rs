//! Persistent brute-force vector index.
//!
//! Owns the chunk payload and one fixed-length embedding vector per chunk.
//! Similarity search is exact cosine over all vectors. The on-disk
//! artifact is a directory:
//!
//! | File | Contents |
//! |------|----------|
//! | `meta.json` | format version, embedding model, dims, chunk count, chunking params |
//! | `chunks.json` | the chunk payload, in order |
//! | `vectors.bin` | raw little-endian f32 vectors, `chunk_count × dims` |
//!
//! `save` then `load` restores an index that yields identical retrieval
//! results for every query. Loading validates the artifact against its own
//! metadata and fails loudly on any mismatch — a corrupt index must never
//! silently degrade to empty results.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::ChunkingConfig;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::Chunk;

const META_FILE: &str = "meta.json";
const CHUNKS_FILE: &str = "chunks.json";
const VECTORS_FILE: &str = "vectors.bin";
const FORMAT_VERSION: u32 = 1;

/// Artifact header: everything needed to validate the binary vector file
/// and to detect configuration drift on reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub model: String,
    pub dims: usize,
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub created_at: String,
}

#[derive(Debug)]
pub struct VectorIndex {
    meta: IndexMeta,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Build an index from parallel chunk/vector sequences.
    ///
    /// # Errors
    ///
    /// Fails when the sequences differ in length or any vector does not
    /// match `dims` — the embedding contract requires consistent
    /// dimensionality across one index's lifetime.
    pub fn build(
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        model: &str,
        dims: usize,
        chunking: &ChunkingConfig,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }
        for (i, vector) in vectors.iter().enumerate() {
            if vector.len() != dims {
                bail!(
                    "vector {} has {} dims, expected {}",
                    i,
                    vector.len(),
                    dims
                );
            }
        }

        let meta = IndexMeta {
            version: FORMAT_VERSION,
            model: model.to_string(),
            dims,
            chunk_count: chunks.len(),
            chunk_size: chunking.chunk_size,
            chunk_overlap: chunking.chunk_overlap,
            created_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        };

        Ok(Self {
            meta,
            chunks,
            vectors,
        })
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Whether a persisted artifact is present at `dir`.
    ///
    /// This is the whole load-or-build decision: presence of the artifact,
    /// no staleness check (the pipeline logs a chunk-count warning instead).
    pub fn artifact_exists(dir: &Path) -> bool {
        dir.join(META_FILE).is_file()
    }

    /// Persist the index as a directory artifact.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index directory: {}", dir.display()))?;

        let meta_json = serde_json::to_string_pretty(&self.meta)?;
        fs::write(dir.join(META_FILE), meta_json)?;

        let chunks_json = serde_json::to_string(&self.chunks)?;
        fs::write(dir.join(CHUNKS_FILE), chunks_json)?;

        let mut blob = Vec::with_capacity(self.vectors.len() * self.meta.dims * 4);
        for vector in &self.vectors {
            blob.extend_from_slice(&vec_to_blob(vector));
        }
        fs::write(dir.join(VECTORS_FILE), blob)?;

        Ok(())
    }

    /// Restore a previously persisted index.
    ///
    /// # Errors
    ///
    /// Fails on an unknown format version, unreadable or unparseable
    /// files, or any disagreement between `meta.json` and the actual
    /// payload sizes.
    pub fn load(dir: &Path) -> Result<Self> {
        let meta_path = dir.join(META_FILE);
        let meta_json = fs::read_to_string(&meta_path)
            .with_context(|| format!("Failed to read {}", meta_path.display()))?;
        let meta: IndexMeta =
            serde_json::from_str(&meta_json).with_context(|| "Failed to parse index metadata")?;

        if meta.version != FORMAT_VERSION {
            bail!(
                "unsupported index format version {} (expected {})",
                meta.version,
                FORMAT_VERSION
            );
        }
        if meta.dims == 0 {
            bail!("index metadata declares zero dims");
        }

        let chunks_path = dir.join(CHUNKS_FILE);
        let chunks_json = fs::read_to_string(&chunks_path)
            .with_context(|| format!("Failed to read {}", chunks_path.display()))?;
        let chunks: Vec<Chunk> =
            serde_json::from_str(&chunks_json).with_context(|| "Failed to parse chunk payload")?;

        if chunks.len() != meta.chunk_count {
            bail!(
                "chunk payload holds {} chunks but metadata declares {}",
                chunks.len(),
                meta.chunk_count
            );
        }

        let vectors_path = dir.join(VECTORS_FILE);
        let blob = fs::read(&vectors_path)
            .with_context(|| format!("Failed to read {}", vectors_path.display()))?;

        let expected = meta.chunk_count * meta.dims * 4;
        if blob.len() != expected {
            bail!(
                "vector file is {} bytes but metadata implies {}",
                blob.len(),
                expected
            );
        }

        let vectors: Vec<Vec<f32>> = blob
            .chunks_exact(meta.dims * 4)
            .map(blob_to_vec)
            .collect();

        Ok(Self {
            meta,
            chunks,
            vectors,
        })
    }

    /// Nearest chunks by cosine similarity.
    ///
    /// Widens to `fetch_k` candidates first, then keeps the closest `k` —
    /// a no-op for exact search, but part of the retrieval contract so an
    /// approximate backend can be swapped in without changing callers.
    /// Returns `(position, similarity)` pairs, best first; ties keep
    /// corpus order.
    pub fn search(&self, query_vec: &[f32], fetch_k: usize, k: usize) -> Vec<(usize, f64)> {
        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, f64::from(cosine_similarity(query_vec, v))))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(fetch_k);
        scored.truncate(k.min(fetch_k));
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Hierarchy;

    fn chunk(source: &str, ordinal: usize, text: &str) -> Chunk {
        Chunk::new(source, ordinal, text.to_string(), Hierarchy::default())
    }

    fn chunking() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 800,
            chunk_overlap: 300,
        }
    }

    fn sample_index() -> VectorIndex {
        let chunks = vec![
            chunk("a.md", 0, "first chunk"),
            chunk("a.md", 1, "second chunk"),
            chunk("b.md", 2, "third chunk"),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        VectorIndex::build(chunks, vectors, "test-model", 3, &chunking()).unwrap()
    }

    #[test]
    fn test_build_rejects_mismatched_lengths() {
        let chunks = vec![chunk("a.md", 0, "only one")];
        let err = VectorIndex::build(chunks, vec![], "m", 3, &chunking());
        assert!(err.is_err());
    }

    #[test]
    fn test_build_rejects_inconsistent_dims() {
        let chunks = vec![chunk("a.md", 0, "one"), chunk("a.md", 1, "two")];
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]];
        let err = VectorIndex::build(chunks, vectors, "m", 2, &chunking());
        assert!(err.is_err());
    }

    #[test]
    fn test_search_returns_nearest_first() {
        let index = sample_index();
        let results = index.search(&[0.0, 1.0, 0.0], 10, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 1);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fetch_k_bounds_the_pool() {
        let index = sample_index();
        let results = index.search(&[1.0, 1.0, 1.0], 1, 3);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_empty_index_search() {
        let index =
            VectorIndex::build(vec![], vec![], "m", 3, &chunking()).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0, 0.0], 10, 3).is_empty());
    }

    #[test]
    fn test_save_load_roundtrip_identical_results() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("vectors_store");

        let index = sample_index();
        index.save(&dir).unwrap();
        assert!(VectorIndex::artifact_exists(&dir));

        let restored = VectorIndex::load(&dir).unwrap();
        assert_eq!(restored.len(), index.len());
        assert_eq!(restored.meta().model, "test-model");
        assert_eq!(restored.chunks(), index.chunks());

        for query in [
            vec![1.0, 0.0, 0.0],
            vec![0.3, 0.3, 0.9],
            vec![-1.0, 0.5, 0.0],
        ] {
            assert_eq!(
                index.search(&query, 10, 3),
                restored.search(&query, 10, 3)
            );
        }
    }

    #[test]
    fn test_load_rejects_truncated_vector_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("vectors_store");

        sample_index().save(&dir).unwrap();
        let vectors_path = dir.join("vectors.bin");
        let blob = std::fs::read(&vectors_path).unwrap();
        std::fs::write(&vectors_path, &blob[..blob.len() - 4]).unwrap();

        let err = VectorIndex::load(&dir).unwrap_err();
        assert!(err.to_string().contains("vector file"));
    }

    #[test]
    fn test_load_rejects_corrupt_metadata() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("vectors_store");

        sample_index().save(&dir).unwrap();
        std::fs::write(dir.join("meta.json"), "{ not json").unwrap();

        assert!(VectorIndex::load(&dir).is_err());
    }

    #[test]
    fn test_missing_artifact_is_detected() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(!VectorIndex::artifact_exists(&tmp.path().join("absent")));
    }
}
