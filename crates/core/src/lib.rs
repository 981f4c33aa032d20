pub mod chunking;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod search;
pub mod stop_words;
pub mod traits;
pub mod vectorizer;

pub use chunking::{
    build_chunks, chunk_by_sentence, chunk_sliding_window, split_sentences, ChunkingConfig,
};
pub use error::ConfigError;
pub use ingest::{IngestionLog, IngestionReportEntry};
pub use models::{
    Chunk, ChunkingStrategy, IngestionOptions, KeywordWeight, SearchOptions, SearchResult,
    SourceText, DEFAULT_PAGE,
};
pub use normalize::{NormalizationMode, TextNormalizer};
pub use orchestrator::KnowledgeBase;
pub use search::{search, search_with};
pub use traits::Vectorizer;
pub use vectorizer::{build_index, top_keywords, IndexStats, TermMatrix, TfidfIndex, TfidfModel};
