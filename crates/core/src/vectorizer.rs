//! TF-IDF model and dense term matrix over the chunk store.
//!
//! Weights use raw term counts scaled by a smoothed inverse document frequency
//! `ln((1 + n) / (1 + df)) + 1`, and each row is L2-normalized. Every build
//! refits from scratch; nothing carries over from a previous vocabulary.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{Chunk, KeywordWeight};
use crate::stop_words::is_stop_word;
use crate::traits::Vectorizer;

#[derive(Debug, Clone)]
pub struct TfidfModel {
    terms: Vec<String>,
    columns: HashMap<String, usize>,
    idf: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TermMatrix {
    rows: Vec<Vec<f64>>,
    columns: usize,
}

/// A fitted model and the matrix it produced, replaced together on every build.
#[derive(Debug, Clone)]
pub struct TfidfIndex {
    pub model: TfidfModel,
    pub matrix: TermMatrix,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexStats {
    pub rows: usize,
    pub vocabulary_size: usize,
    pub built_at: DateTime<Utc>,
}

/// Lowercased runs of two or more word characters, minus stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|token| !is_stop_word(token))
        .collect()
}

fn term_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

pub fn l2_norm(vector: &[f64]) -> f64 {
    vector.iter().map(|value| value * value).sum::<f64>().sqrt()
}

fn normalize_in_place(vector: &mut [f64]) {
    let norm = l2_norm(vector);
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

impl TfidfModel {
    fn fit(documents: &[HashMap<String, usize>]) -> Self {
        let mut document_frequency = BTreeMap::<&str, usize>::new();
        for counts in documents {
            for term in counts.keys() {
                *document_frequency.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let mut terms = Vec::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (term, df) in document_frequency {
            terms.push(term.to_string());
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }

        let columns = terms
            .iter()
            .enumerate()
            .map(|(column, term)| (term.clone(), column))
            .collect();

        Self {
            terms,
            columns,
            idf,
        }
    }

    fn weigh(&self, counts: &HashMap<String, usize>) -> Vec<f64> {
        let mut vector = vec![0.0; self.terms.len()];
        for (term, count) in counts {
            if let Some(&column) = self.columns.get(term) {
                vector[column] = *count as f64 * self.idf[column];
            }
        }
        normalize_in_place(&mut vector);
        vector
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.terms
    }

    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.columns.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.column_of(term).map(|column| self.idf[column])
    }
}

impl Vectorizer for TfidfModel {
    fn dimensions(&self) -> usize {
        self.terms.len()
    }

    fn vectorize(&self, text: &str) -> Vec<f64> {
        self.weigh(&term_counts(text))
    }
}

impl TermMatrix {
    pub fn new(rows: Vec<Vec<f64>>, columns: usize) -> Self {
        Self { rows, columns }
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }
}

impl TfidfIndex {
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            rows: self.matrix.row_count(),
            vocabulary_size: self.model.dimensions(),
            built_at: self.built_at,
        }
    }
}

/// Fits a fresh model over `chunks` in store order. Returns `None` for an empty
/// store or when no chunk contributes a single vocabulary term.
pub fn build_index(chunks: &[Chunk]) -> Option<TfidfIndex> {
    if chunks.is_empty() {
        debug!("skipping index build for empty document store");
        return None;
    }

    let documents: Vec<_> = chunks.iter().map(|chunk| term_counts(&chunk.text)).collect();
    let model = TfidfModel::fit(&documents);

    if model.dimensions() == 0 {
        warn!(
            chunks = chunks.len(),
            "no vocabulary terms left after stop-word removal"
        );
        return None;
    }

    let rows = documents.iter().map(|counts| model.weigh(counts)).collect();
    let matrix = TermMatrix::new(rows, model.dimensions());

    debug!(
        rows = matrix.row_count(),
        vocabulary = matrix.column_count(),
        "fitted tf-idf index"
    );

    Some(TfidfIndex {
        model,
        matrix,
        built_at: Utc::now(),
    })
}

/// Mean weight of every vocabulary term across all rows, highest first.
/// Equal means keep vocabulary (alphabetical) order.
pub fn top_keywords(model: &TfidfModel, matrix: &TermMatrix, n: usize) -> Vec<KeywordWeight> {
    let row_count = matrix.row_count();
    if row_count == 0 {
        return Vec::new();
    }

    let mut sums = vec![0.0; matrix.column_count()];
    for row in matrix.rows() {
        for (sum, weight) in sums.iter_mut().zip(row) {
            *sum += weight;
        }
    }

    let mut keywords: Vec<(usize, f64)> = sums
        .into_iter()
        .map(|sum| sum / row_count as f64)
        .enumerate()
        .collect();

    keywords.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));

    keywords
        .into_iter()
        .take(n)
        .map(|(column, mean_weight)| KeywordWeight {
            term: model.terms[column].clone(),
            mean_weight,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            chunk_id: format!("id-{text}"),
            text: text.to_string(),
            source_file: "notes.txt".to_string(),
            page: None,
            sequence_index: 0,
        }
    }

    #[test]
    fn tokenizer_drops_stop_words_and_single_characters() {
        assert_eq!(tokenize("The cat, a dog & I ran."), vec!["cat", "dog", "ran"]);
    }

    #[test]
    fn empty_store_builds_nothing() {
        assert!(build_index(&[]).is_none());
    }

    #[test]
    fn stop_word_only_store_builds_nothing() {
        assert!(build_index(&[chunk("the and of"), chunk("a an")]).is_none());
    }

    #[test]
    fn matrix_has_one_row_per_chunk_and_sorted_vocabulary() {
        let index = build_index(&[chunk("the cat sat"), chunk("the dog ran")]).unwrap();

        assert_eq!(index.matrix.row_count(), 2);
        assert_eq!(index.model.vocabulary(), ["cat", "dog", "ran", "sat"]);
        assert_eq!(index.matrix.column_count(), 4);
    }

    #[test]
    fn absent_terms_weigh_zero_and_weights_are_non_negative() {
        let index = build_index(&[chunk("the cat sat"), chunk("the dog ran")]).unwrap();
        let dog = index.model.column_of("dog").unwrap();

        assert_eq!(index.matrix.rows()[0][dog], 0.0);
        assert!(index.matrix.rows()[1][dog] > 0.0);
        assert!(index
            .matrix
            .rows()
            .iter()
            .flatten()
            .all(|weight| *weight >= 0.0));
    }

    #[test]
    fn rarer_terms_get_higher_idf() {
        let index = build_index(&[
            chunk("pump valve"),
            chunk("pump seal"),
            chunk("pump gasket"),
        ])
        .unwrap();

        assert!(index.model.idf("valve").unwrap() > index.model.idf("pump").unwrap());
    }

    #[test]
    fn rows_are_unit_length() {
        let index = build_index(&[chunk("pump pump valve"), chunk("seal")]).unwrap();
        for row in index.matrix.rows() {
            assert!((l2_norm(row) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn rebuild_discards_previous_vocabulary() {
        let first = build_index(&[chunk("zebra stripes"), chunk("lion mane")]).unwrap();
        assert!(first.model.column_of("zebra").is_some());

        let second = build_index(&[chunk("lion mane")]).unwrap();
        assert!(second.model.column_of("zebra").is_none());
        assert!(l2_norm(&second.model.vectorize("zebra")) == 0.0);
    }

    #[test]
    fn unseen_query_terms_do_not_grow_the_vocabulary() {
        let index = build_index(&[chunk("cat sat")]).unwrap();
        let vector = index.model.vectorize("cat unicorn");
        assert_eq!(vector.len(), index.model.dimensions());
    }

    #[test]
    fn top_keywords_are_sorted_descending() {
        let index = build_index(&[
            chunk("pump pump pump valve"),
            chunk("pump seal"),
            chunk("gasket"),
        ])
        .unwrap();

        let keywords = top_keywords(&index.model, &index.matrix, 3);
        assert_eq!(keywords.len(), 3);
        assert!(keywords
            .windows(2)
            .all(|pair| pair[0].mean_weight >= pair[1].mean_weight));
        assert_eq!(keywords[0].term, "pump");
    }

    #[test]
    fn top_keywords_caps_at_vocabulary_size() {
        let index = build_index(&[chunk("the cat sat"), chunk("the dog ran")]).unwrap();
        let keywords = top_keywords(&index.model, &index.matrix, 50);
        assert_eq!(keywords.len(), 4);
    }
}
