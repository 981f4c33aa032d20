use tracing::{debug, warn};

use crate::models::{Chunk, SearchOptions, SearchResult, MAX_SCORE_DECIMALS};
use crate::normalize::TextNormalizer;
use crate::traits::Vectorizer;
use crate::vectorizer::{l2_norm, TermMatrix, TfidfIndex};

#[derive(Debug, Clone, Copy)]
struct ScoredRow {
    position: usize,
    score: f64,
}

/// Ranks `chunks` against `query`. No index, an empty store, or a query that
/// shares no vocabulary with the corpus all give an empty result.
pub fn search(
    query: &str,
    normalizer: &TextNormalizer,
    index: Option<&TfidfIndex>,
    chunks: &[Chunk],
    options: &SearchOptions,
) -> Vec<SearchResult> {
    let Some(index) = index else {
        debug!("search requested before the index was built");
        return Vec::new();
    };

    search_with(query, normalizer, &index.model, &index.matrix, chunks, options)
}

pub fn search_with<V: Vectorizer>(
    query: &str,
    normalizer: &TextNormalizer,
    vectorizer: &V,
    matrix: &TermMatrix,
    chunks: &[Chunk],
    options: &SearchOptions,
) -> Vec<SearchResult> {
    if let Err(error) = options.validate() {
        warn!(%error, "rejecting search with invalid options");
        return Vec::new();
    }

    if chunks.is_empty() || matrix.row_count() == 0 {
        return Vec::new();
    }

    if matrix.row_count() != chunks.len() {
        warn!(
            rows = matrix.row_count(),
            chunks = chunks.len(),
            "matrix does not match the document store; rebuild required"
        );
        return Vec::new();
    }

    let query_vector = vectorizer.vectorize(&normalizer.normalize(query));
    let query_norm = l2_norm(&query_vector);
    if query_norm == 0.0 {
        debug!("query shares no terms with the vocabulary");
        return Vec::new();
    }

    let mut scored: Vec<ScoredRow> = matrix
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(position, row)| {
            cosine_similarity(&query_vector, query_norm, row)
                .map(|score| ScoredRow { position, score })
        })
        .filter(|row| options.min_score.map_or(true, |floor| row.score > floor))
        .collect();

    let candidates = scored.len();
    scored.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then(left.position.cmp(&right.position))
    });
    scored.truncate(options.top_n);

    debug!(candidates, returned = scored.len(), "ranked chunks");

    scored
        .into_iter()
        .map(|row| {
            let chunk = &chunks[row.position];
            SearchResult {
                text: chunk.text.clone(),
                source_file: chunk.source_file.clone(),
                page: chunk.display_page(),
                sequence_index: chunk.sequence_index,
                score: round_score(row.score, options.score_decimals),
            }
        })
        .collect()
}

/// `None` for a zero-norm row, which can never be similar to anything.
fn cosine_similarity(query: &[f64], query_norm: f64, row: &[f64]) -> Option<f64> {
    let row_norm = l2_norm(row);
    if row_norm == 0.0 {
        return None;
    }

    let dot: f64 = query.iter().zip(row).map(|(left, right)| left * right).sum();
    Some(dot / (query_norm * row_norm))
}

/// Precision is capped at `MAX_SCORE_DECIMALS`.
pub fn round_score(score: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_SCORE_DECIMALS) as i32);
    (score * factor).round() / factor
}
