//! Owned session state: the chunk store, the current index generation and
//! the ingestion report. `new`, `ingest`, `reset` and `build_index` are the
//! only operations that change it.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::chunking::{build_chunks, ChunkingConfig};
use crate::error::ConfigError;
use crate::ingest::IngestionLog;
use crate::models::{Chunk, IngestionOptions, KeywordWeight, SearchOptions, SearchResult, SourceText};
use crate::normalize::TextNormalizer;
use crate::search::search;
use crate::vectorizer::{build_index, top_keywords, IndexStats, TfidfIndex};

#[derive(Debug)]
pub struct KnowledgeBase {
    options: IngestionOptions,
    search_options: SearchOptions,
    chunking: ChunkingConfig,
    normalizer: TextNormalizer,
    chunks: Vec<Chunk>,
    index: Option<TfidfIndex>,
    log: IngestionLog,
    cursors: HashMap<String, u64>,
}

impl KnowledgeBase {
    pub fn new(options: IngestionOptions, search_options: SearchOptions) -> Result<Self, ConfigError> {
        let chunking = ChunkingConfig::try_from(&options)?;
        search_options.validate()?;
        let normalizer = TextNormalizer::new(options.normalization)?;

        Ok(Self {
            options,
            search_options,
            chunking,
            normalizer,
            chunks: Vec::new(),
            index: None,
            log: IngestionLog::new(),
            cursors: HashMap::new(),
        })
    }

    /// Cleans and chunks one source, appending to the store. Any previously
    /// built index is dropped since it no longer covers every chunk.
    pub fn ingest(&mut self, source: &SourceText) -> usize {
        let cleaned = self.normalizer.normalize(&source.raw_text);
        let cursor = self.cursors.get(&source.file_name).copied().unwrap_or(0);

        let (chunks, next_cursor) =
            build_chunks(&source.file_name, source.page, &cleaned, &self.chunking, cursor);
        let added = chunks.len();

        self.cursors.insert(source.file_name.clone(), next_cursor);
        self.log.record(&source.file_name, &source.raw_text, &cleaned, added);
        self.chunks.extend(chunks);

        if self.index.take().is_some() {
            debug!(file = %source.file_name, "index invalidated by new ingestion");
        }

        debug!(
            file = %source.file_name,
            page = ?source.page,
            chunks = added,
            "ingested source text"
        );
        added
    }

    pub fn ingest_all<'a>(&mut self, sources: impl IntoIterator<Item = &'a SourceText>) -> usize {
        sources.into_iter().map(|source| self.ingest(source)).sum()
    }

    /// Clears the store, index, report and per-file counters.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.index = None;
        self.log.clear();
        self.cursors.clear();
        info!("knowledge base reset");
    }

    /// Refits the model and matrix over the whole store. Returns the number of
    /// indexed rows, zero when nothing could be indexed.
    pub fn build_index(&mut self) -> usize {
        self.index = build_index(&self.chunks);
        let rows = self.index.as_ref().map_or(0, |index| index.matrix.row_count());
        info!(
            rows,
            vocabulary = self.index.as_ref().map_or(0, |index| index.matrix.column_count()),
            "index built"
        );
        rows
    }

    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        self.search_with(query, &self.search_options)
    }

    pub fn search_with(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        search(query, &self.normalizer, self.index.as_ref(), &self.chunks, options)
    }

    pub fn top_keywords(&self, n: usize) -> Vec<KeywordWeight> {
        self.index
            .as_ref()
            .map(|index| top_keywords(&index.model, &index.matrix, n))
            .unwrap_or_default()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn report(&self) -> &IngestionLog {
        &self.log
    }

    pub fn index_stats(&self) -> Option<IndexStats> {
        self.index.as_ref().map(TfidfIndex::stats)
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    pub fn options(&self) -> &IngestionOptions {
        &self.options
    }

    pub fn search_options(&self) -> &SearchOptions {
        &self.search_options
    }
}
