use serde::{Deserialize, Serialize};

use crate::normalize::NormalizationMode;

/// Page reported for sources that have no page concept.
pub const DEFAULT_PAGE: u32 = 1;

/// Finest score precision; beyond this the rounding factor loses meaning.
pub const MAX_SCORE_DECIMALS: u32 = 12;

/// One unit of raw input handed over by the file-reading layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceText {
    pub file_name: String,
    pub raw_text: String,
    pub page: Option<u32>,
}

impl SourceText {
    pub fn new(file_name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            raw_text: raw_text.into(),
            page: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub source_file: String,
    pub page: Option<u32>,
    /// Running count of chunks already emitted for `source_file`.
    pub sequence_index: u64,
}

impl Chunk {
    pub fn display_page(&self) -> u32 {
        self.page.unwrap_or(DEFAULT_PAGE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub text: String,
    pub source_file: String,
    pub page: u32,
    pub sequence_index: u64,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordWeight {
    pub term: String,
    pub mean_weight: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    #[default]
    SlidingWindow,
    Sentence,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestionOptions {
    pub normalization: NormalizationMode,
    pub chunking: ChunkingStrategy,
    pub chunk_size: usize,
    /// Only consulted by the sliding window.
    pub chunk_overlap: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            normalization: NormalizationMode::Full,
            chunking: ChunkingStrategy::SlidingWindow,
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchOptions {
    pub top_n: usize,
    /// Results scoring at or below the floor are dropped. `None` keeps everything.
    pub min_score: Option<f64>,
    pub score_decimals: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_n: 3,
            min_score: None,
            score_decimals: 4,
        }
    }
}

impl SearchOptions {
    pub fn validate(&self) -> Result<(), crate::ConfigError> {
        if self.top_n == 0 {
            return Err(crate::ConfigError::InvalidArgument(
                "top_n must be at least 1".to_string(),
            ));
        }

        if let Some(floor) = self.min_score {
            if !floor.is_finite() || floor < 0.0 {
                return Err(crate::ConfigError::InvalidArgument(format!(
                    "min_score must be a finite non-negative number, got {floor}"
                )));
            }
        }

        if self.score_decimals > MAX_SCORE_DECIMALS {
            return Err(crate::ConfigError::InvalidArgument(format!(
                "score_decimals must be at most {MAX_SCORE_DECIMALS}, got {}",
                self.score_decimals
            )));
        }

        Ok(())
    }
}
