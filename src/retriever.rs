//! Hybrid retrieval: weighted fusion of the vector and keyword legs.
//!
//! Both indices are owned elsewhere and passed in by reference; the fusion
//! itself is stateless. The legs' raw scores live on different scales
//! (cosine similarity vs BM25), so each leg is min-max normalized onto
//! `[0, 1]` before the weighted combination:
//!
//! ```text
//! fused = vector_weight × norm(vector) + keyword_weight × norm(keyword)
//! ```
//!
//! A chunk appearing in only one leg keeps that leg's normalized score and
//! takes zero from the absent leg — it is never excluded. Output is sorted
//! by fused score descending, ties broken by corpus ordinal (stable).

use std::collections::HashMap;

use crate::keyword_index::KeywordIndex;
use crate::models::{Chunk, RetrievalResult};
use crate::vector_index::VectorIndex;

/// Fusion tuning, fixed at configuration time.
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    /// Results kept per leg.
    pub k: usize,
    /// Nearest-neighbor candidate pool before trimming to `k`.
    pub fetch_k: usize,
    pub vector_weight: f64,
    pub keyword_weight: f64,
}

/// Run one query against both indices and fuse the legs.
///
/// `chunks` is the fresh chunk sequence the keyword index was built over;
/// the vector index carries its own (possibly persisted) payload. The two
/// are matched up by chunk id, so a stale artifact degrades to partially
/// overlapping candidates rather than mismatched text.
pub fn retrieve(
    vector: &VectorIndex,
    keyword: &KeywordIndex,
    chunks: &[Chunk],
    query: &str,
    query_vec: &[f32],
    params: &RetrievalParams,
) -> Vec<RetrievalResult> {
    let vector_leg = vector.search(query_vec, params.fetch_k, params.k);
    let keyword_leg = keyword.search(query, params.k);

    let norm_vector = normalize_scores(&vector_leg);
    let norm_keyword = normalize_scores(&keyword_leg);

    struct LegScores<'a> {
        chunk: &'a Chunk,
        vector: f64,
        keyword: f64,
    }

    let mut merged: HashMap<&str, LegScores> = HashMap::new();

    for (position, score) in norm_vector {
        let chunk = &vector.chunks()[position];
        merged
            .entry(chunk.id.as_str())
            .or_insert(LegScores {
                chunk,
                vector: 0.0,
                keyword: 0.0,
            })
            .vector = score;
    }
    for (position, score) in norm_keyword {
        let chunk = &chunks[position];
        merged
            .entry(chunk.id.as_str())
            .or_insert(LegScores {
                chunk,
                vector: 0.0,
                keyword: 0.0,
            })
            .keyword = score;
    }

    let mut results: Vec<RetrievalResult> = merged
        .into_values()
        .map(|leg| RetrievalResult {
            chunk: leg.chunk.clone(),
            score: params.vector_weight * leg.vector + params.keyword_weight * leg.keyword,
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk.ordinal.cmp(&b.chunk.ordinal))
    });

    results
}

/// Min-max normalize `(position, raw_score)` candidates to `[0.0, 1.0]`.
///
/// If all scores are equal, they are normalized to `1.0`.
pub fn normalize_scores(candidates: &[(usize, f64)]) -> Vec<(usize, f64)> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let s_min = candidates
        .iter()
        .map(|(_, s)| *s)
        .fold(f64::INFINITY, f64::min);
    let s_max = candidates
        .iter()
        .map(|(_, s)| *s)
        .fold(f64::NEG_INFINITY, f64::max);

    candidates
        .iter()
        .map(|(position, score)| {
            let norm = if (s_max - s_min).abs() < f64::EPSILON {
                1.0
            } else {
                (score - s_min) / (s_max - s_min)
            };
            (*position, norm)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::models::{Chunk, Hierarchy};

    fn chunk(source: &str, ordinal: usize, text: &str) -> Chunk {
        Chunk::new(source, ordinal, text.to_string(), Hierarchy::default())
    }

    fn chunking() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 800,
            chunk_overlap: 300,
        }
    }

    fn params() -> RetrievalParams {
        RetrievalParams {
            k: 3,
            fetch_k: 20,
            vector_weight: 0.5,
            keyword_weight: 0.5,
        }
    }

    /// Three chunks with basis vectors so every cosine score is exact.
    fn fixture() -> (VectorIndex, KeywordIndex, Vec<Chunk>) {
        let chunks = vec![
            chunk("a.md", 0, "scheduler threads cores"),
            chunk("a.md", 1, "memory slab allocator"),
            chunk("b.md", 2, "network driver queue"),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let vector =
            VectorIndex::build(chunks.clone(), vectors, "test-model", 3, &chunking()).unwrap();
        let keyword = KeywordIndex::build(chunks.iter().map(|c| c.text.as_str()));
        (vector, keyword, chunks)
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize_scores(&[]).is_empty());
    }

    #[test]
    fn test_normalize_single() {
        let result = normalize_scores(&[(0, 5.0)]);
        assert_eq!(result.len(), 1);
        assert!((result[0].1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_range() {
        let result = normalize_scores(&[(0, 10.0), (1, 5.0), (2, 0.0)]);
        assert!((result[0].1 - 1.0).abs() < 1e-9);
        assert!((result[1].1 - 0.5).abs() < 1e-9);
        assert!((result[2].1 - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_all_equal() {
        let result = normalize_scores(&[(0, 3.0), (1, 3.0)]);
        for (_, score) in &result {
            assert!((*score - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_both_legs_agree_on_best_chunk() {
        let (vector, keyword, chunks) = fixture();
        let results = retrieve(
            &vector,
            &keyword,
            &chunks,
            "slab allocator",
            &[0.0, 1.0, 0.0],
            &params(),
        );
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk.ordinal, 1);
    }

    #[test]
    fn test_keyword_only_chunk_is_kept() {
        let (vector, keyword, chunks) = fixture();
        // The query vector points at chunk 0; "driver" only matches chunk 2.
        let results = retrieve(
            &vector,
            &keyword,
            &chunks,
            "driver",
            &[1.0, 0.0, 0.0],
            &params(),
        );
        assert!(results.iter().any(|r| r.chunk.ordinal == 2));
    }

    #[test]
    fn test_vector_weight_one_matches_vector_ordering() {
        let (vector, keyword, chunks) = fixture();
        let p = RetrievalParams {
            vector_weight: 1.0,
            keyword_weight: 0.0,
            ..params()
        };
        let results = retrieve(
            &vector,
            &keyword,
            &chunks,
            "driver queue",
            &[0.9, 0.1, 0.0],
            &p,
        );
        // Keyword hits contribute nothing; ranking follows cosine.
        assert_eq!(results[0].chunk.ordinal, 0);
    }

    #[test]
    fn test_fusion_monotonic_in_vector_leg() {
        let (_, keyword, chunks) = fixture();
        let p = params();

        let rank_of = |vectors: Vec<Vec<f32>>| -> usize {
            let vector =
                VectorIndex::build(chunks.clone(), vectors, "test-model", 3, &chunking())
                    .unwrap();
            let results = retrieve(
                &vector,
                &keyword,
                &chunks,
                "scheduler",
                &[1.0, 0.0, 0.0],
                &p,
            );
            results
                .iter()
                .position(|r| r.chunk.ordinal == 2)
                .expect("chunk 2 present")
        };

        // Raising chunk 2's vector similarity (all else fixed) must not
        // worsen its fused rank.
        let weak = rank_of(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.5, 0.5, 0.0],
            vec![0.1, 0.0, 1.0],
        ]);
        let strong = rank_of(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.5, 0.5, 0.0],
            vec![0.9, 0.0, 0.4],
        ]);
        assert!(strong <= weak);
    }

    #[test]
    fn test_identical_text_different_sources_not_merged() {
        let chunks = vec![
            chunk("one.md", 0, "identical content"),
            chunk("two.md", 1, "identical content"),
        ];
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        let vector =
            VectorIndex::build(chunks.clone(), vectors, "test-model", 2, &chunking()).unwrap();
        let keyword = KeywordIndex::build(chunks.iter().map(|c| c.text.as_str()));

        let results = retrieve(
            &vector,
            &keyword,
            &chunks,
            "identical",
            &[1.0, 0.0],
            &params(),
        );
        assert_eq!(results.len(), 2);
        let sources: Vec<&str> = results.iter().map(|r| r.chunk.source.as_str()).collect();
        assert!(sources.contains(&"one.md"));
        assert!(sources.contains(&"two.md"));
        // Equal fused scores: corpus order breaks the tie.
        assert_eq!(results[0].chunk.ordinal, 0);
    }

    #[test]
    fn test_empty_indices_yield_empty_results() {
        let vector = VectorIndex::build(vec![], vec![], "test-model", 2, &chunking()).unwrap();
        let keyword = KeywordIndex::build([]);
        let results = retrieve(&vector, &keyword, &[], "anything", &[1.0, 0.0], &params());
        assert!(results.is_empty());
    }
}
