//! Deterministic lexical vectorizer: character n-gram TF-IDF.
//!
//! Works for scripts without word boundaries (Japanese, Chinese) because it
//! never tokenizes on whitespace. Used when no embedding provider is
//! available or the provider fails.

use std::collections::BTreeMap;

use crate::error::EmbeddingError;

/// Character n-gram TF-IDF vectorizer.
///
/// Text is lowercased and whitespace runs are collapsed to one space. Terms
/// are weighted by raw count times smoothed idf `ln((1 + n) / (1 + df)) + 1`
/// and each row is L2-normalized. Columns follow the sorted vocabulary, so the
/// output is identical for identical input.
#[derive(Debug, Clone, Copy)]
pub struct LexicalVectorizer {
    ngram_min: usize,
    ngram_max: usize,
}

impl Default for LexicalVectorizer {
    fn default() -> Self {
        Self::new(1, 3)
    }
}

impl LexicalVectorizer {
    #[must_use]
    pub fn new(ngram_min: usize, ngram_max: usize) -> Self {
        let ngram_min = ngram_min.max(1);
        Self {
            ngram_min,
            ngram_max: ngram_max.max(ngram_min),
        }
    }

    /// Fit the vocabulary on `texts` and return one row per text.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::EmptyVocabulary`] when no text yields a single
    /// n-gram (including an empty input list).
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn fit_transform(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let counts: Vec<BTreeMap<String, usize>> =
            texts.iter().map(|t| self.term_counts(t)).collect();

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &counts {
            for term in doc.keys() {
                *document_frequency.entry(term.as_str()).or_default() += 1;
            }
        }
        if document_frequency.is_empty() {
            return Err(EmbeddingError::EmptyVocabulary);
        }

        let n = texts.len() as f64;
        let columns: BTreeMap<&str, (usize, f64)> = document_frequency
            .iter()
            .enumerate()
            .map(|(col, (term, df))| {
                let idf = ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0;
                (*term, (col, idf))
            })
            .collect();

        let dim = columns.len();
        let rows = counts
            .iter()
            .map(|doc| {
                let mut row = vec![0.0_f64; dim];
                for (term, count) in doc {
                    if let Some(&(col, idf)) = columns.get(term.as_str()) {
                        row[col] = *count as f64 * idf;
                    }
                }
                let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for v in &mut row {
                        *v /= norm;
                    }
                }
                row.into_iter().map(|v| v as f32).collect()
            })
            .collect();

        Ok(rows)
    }

    fn term_counts(&self, text: &str) -> BTreeMap<String, usize> {
        let normalized = normalize(text);
        let chars: Vec<char> = normalized.chars().collect();
        let mut counts = BTreeMap::new();
        for size in self.ngram_min..=self.ngram_max {
            if size > chars.len() {
                break;
            }
            for window in chars.windows(size) {
                *counts.entry(window.iter().collect::<String>()).or_default() += 1;
            }
        }
        counts
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
