//! Corpus-local TF-IDF vectors and the pairwise cosine similarity matrix.
//!
//! The vocabulary is fitted on the documents being compared, never on an
//! external corpus. Weighting follows the common smoothed scheme:
//!
//! ```text
//! tf(t, d)  = raw count of t in d
//! idf(t)    = ln((1 + n) / (1 + df(t))) + 1
//! w(t, d)   = tf(t, d) * idf(t), then each row is L2-normalized
//! ```
//!
//! Tokens are lowercased maximal runs of word characters (alphanumeric or
//! `_`) at least two characters long.

use std::collections::{BTreeMap, HashMap};

/// Minimum token length in characters.
const MIN_TOKEN_CHARS: usize = 2;

/// Split text into lowercase word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(|t| t.to_string())
        .collect()
}

/// A fitted TF-IDF model: vocabulary, IDF weights, and one sparse
/// L2-normalized vector per input document.
#[derive(Debug, Clone)]
pub struct TfidfModel {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<Vec<(usize, f64)>>,
}

impl TfidfModel {
    /// Fit on `documents` and transform them in one pass.
    ///
    /// Returns `None` when no document contains a single token.
    pub fn fit_transform<S: AsRef<str>>(documents: &[S]) -> Option<Self> {
        let counts: Vec<HashMap<String, usize>> = documents
            .iter()
            .map(|doc| {
                let mut tf = HashMap::new();
                for token in tokenize(doc.as_ref()) {
                    *tf.entry(token).or_insert(0) += 1;
                }
                tf
            })
            .collect();

        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        for tf in &counts {
            for term in tf.keys() {
                *df.entry(term.clone()).or_insert(0) += 1;
            }
        }
        if df.is_empty() {
            return None;
        }

        let n = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(df.len());
        for (index, (term, doc_freq)) in df.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + doc_freq as f64)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        let vectors = counts
            .into_iter()
            .map(|tf| {
                let mut row: Vec<(usize, f64)> = tf
                    .into_iter()
                    .map(|(term, count)| {
                        let col = vocabulary[&term];
                        (col, count as f64 * idf[col])
                    })
                    .collect();
                row.sort_by_key(|(col, _)| *col);
                l2_normalize(&mut row);
                row
            })
            .collect();

        Some(Self {
            vocabulary,
            idf,
            vectors,
        })
    }

    /// Number of distinct terms in the fitted vocabulary.
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// IDF weight of `term`, if it occurs in the corpus.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&col| self.idf[col])
    }

    /// Number of document vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Full pairwise cosine similarity matrix over the fitted documents.
    pub fn similarity_matrix(&self) -> SimilarityMatrix {
        SimilarityMatrix::from_vectors(&self.vectors)
    }
}

fn l2_normalize(row: &mut [(usize, f64)]) {
    let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for (_, w) in row.iter_mut() {
            *w /= norm;
        }
    }
}

/// Cosine similarity between two sparse vectors sorted by column.
///
/// Returns `0.0` when either vector has zero length.
pub fn cosine_similarity(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let mut dot = 0.0f64;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }

    let norm_a = a.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    let denom = norm_a * norm_b;
    if denom < f64::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Square, symmetric similarity matrix with a unit diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    fn from_vectors(vectors: &[Vec<(usize, f64)>]) -> Self {
        let size = vectors.len();
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            values[i * size + i] = 1.0;
            for j in (i + 1)..size {
                let sim = cosine_similarity(&vectors[i], &vectors[j]);
                values[i * size + j] = sim;
                values[j * size + i] = sim;
            }
        }
        Self { size, values }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Similarity between documents `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    /// Row `i`, including the diagonal entry.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.size..(i + 1) * self.size]
    }

    /// Maximum value of row `i`, diagonal included.
    pub fn row_max(&self, i: usize) -> f64 {
        self.row(i).iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}
