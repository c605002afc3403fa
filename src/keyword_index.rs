//! In-memory inverted index with BM25 ranking.
//!
//! Rebuilt from the chunk set on every process start — construction is a
//! single cheap pass and never persisted, so its term statistics always
//! describe the current corpus. The pipeline compares its chunk count
//! against the persisted vector index as a staleness signal.
//!
//! Identical chunk set + identical tokenizer ⇒ identical term statistics.

use std::collections::HashMap;

/// Okapi BM25 parameters, standard values.
const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

/// Lowercase a text and split it into alphanumeric terms.
///
/// The same tokenizer is applied to indexed chunks and to queries.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// One entry in a term's posting list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Ordinal of the chunk in the indexed sequence.
    pub chunk: usize,
    pub term_freq: u32,
}

/// Term-frequency inverted index over a chunk sequence.
///
/// Positions in the input sequence become posting ids; callers map them
/// back to chunk payloads.
#[derive(Debug, Default)]
pub struct KeywordIndex {
    postings: HashMap<String, Vec<Posting>>,
    chunk_lens: Vec<u32>,
    avg_chunk_len: f64,
}

impl KeywordIndex {
    /// Index the given texts in order.
    pub fn build<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut chunk_lens = Vec::new();

        for (ordinal, text) in texts.into_iter().enumerate() {
            let terms = tokenize(text);
            chunk_lens.push(terms.len() as u32);

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *freqs.entry(term).or_insert(0) += 1;
            }
            for (term, term_freq) in freqs {
                postings.entry(term).or_default().push(Posting {
                    chunk: ordinal,
                    term_freq,
                });
            }
        }

        let total_len: u64 = chunk_lens.iter().map(|&l| u64::from(l)).sum();
        let avg_chunk_len = if chunk_lens.is_empty() {
            0.0
        } else {
            total_len as f64 / chunk_lens.len() as f64
        };

        Self {
            postings,
            chunk_lens,
            avg_chunk_len,
        }
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunk_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_lens.is_empty()
    }

    /// Score every chunk whose postings intersect the query terms and
    /// return the top `k` as `(chunk ordinal, BM25 score)`, best first.
    /// Ties keep corpus order.
    pub fn search(&self, query: &str, k: usize) -> Vec<(usize, f64)> {
        if self.is_empty() || self.avg_chunk_len == 0.0 {
            return Vec::new();
        }

        let n = self.len() as f64;
        let mut scores: HashMap<usize, f64> = HashMap::new();

        for term in tokenize(query) {
            let Some(list) = self.postings.get(&term) else {
                continue;
            };
            let df = list.len() as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for posting in list {
                let tf = f64::from(posting.term_freq);
                let len_norm = f64::from(self.chunk_lens[posting.chunk]) / self.avg_chunk_len;
                let term_score = idf * (tf * (BM25_K1 + 1.0))
                    / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * len_norm));
                *scores.entry(posting.chunk).or_insert(0.0) += term_score;
            }
        }

        let mut ranked: Vec<(usize, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(k);
        ranked
    }
}
