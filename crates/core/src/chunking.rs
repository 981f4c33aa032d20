use crate::error::ConfigError;
use crate::models::{Chunk, ChunkingStrategy, IngestionOptions};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub strategy: ChunkingStrategy,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn sliding_window(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        Self::validated(ChunkingStrategy::SlidingWindow, chunk_size, chunk_overlap)
    }

    pub fn sentence(chunk_size: usize) -> Result<Self, ConfigError> {
        Self::validated(ChunkingStrategy::Sentence, chunk_size, 0)
    }

    fn validated(
        strategy: ChunkingStrategy,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        if strategy == ChunkingStrategy::SlidingWindow && chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidChunkConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }

        Ok(Self {
            strategy,
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn split(&self, normalized: &str) -> Vec<String> {
        match self.strategy {
            ChunkingStrategy::SlidingWindow => {
                chunk_sliding_window(normalized, self.chunk_size, self.chunk_overlap)
            }
            ChunkingStrategy::Sentence => chunk_by_sentence(normalized, self.chunk_size),
        }
    }
}

impl TryFrom<&IngestionOptions> for ChunkingConfig {
    type Error = ConfigError;

    fn try_from(value: &IngestionOptions) -> Result<Self, Self::Error> {
        Self::validated(value.chunking, value.chunk_size, value.chunk_overlap)
    }
}

/// Fixed windows of `chunk_size` characters whose starts advance by
/// `chunk_size - chunk_overlap`. The last window may be short.
pub fn chunk_sliding_window(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        start += step;
    }

    windows
}

/// Splits after `.`, `!` or `?` when followed by whitespace. Punctuation stays
/// with the sentence it ends.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }

        let Some(&(boundary, next)) = chars.peek() else {
            break;
        };
        if !next.is_whitespace() {
            continue;
        }

        sentences.push(&text[start..boundary]);
        while chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            chars.next();
        }
        start = chars.peek().map_or(text.len(), |&(index, _)| index);
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

/// Accumulates whole sentences until the next one would push the buffer past
/// `chunk_size`. A single sentence longer than `chunk_size` becomes its own chunk.
pub fn chunk_by_sentence(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();

        if !buffer.is_empty() && buffer_len + sentence_len > chunk_size {
            chunks.push(buffer.trim().to_string());
            buffer.clear();
            buffer_len = 0;
        }

        if !buffer.is_empty() {
            buffer.push(' ');
            buffer_len += 1;
        }
        buffer.push_str(sentence);
        buffer_len += sentence_len;
    }

    if !buffer.trim().is_empty() {
        chunks.push(buffer.trim().to_string());
    }

    chunks
}

/// Splits already-normalized text and attaches provenance. `cursor` is the
/// number of chunks already emitted for `source_file`; the advanced cursor is
/// returned alongside the chunks.
pub fn build_chunks(
    source_file: &str,
    page: Option<u32>,
    normalized: &str,
    config: &ChunkingConfig,
    cursor: u64,
) -> (Vec<Chunk>, u64) {
    let mut chunks = Vec::new();
    let mut cursor = cursor;

    for text in config.split(normalized) {
        chunks.push(Chunk {
            chunk_id: make_chunk_id(source_file, page, cursor, &text),
            text,
            source_file: source_file.to_string(),
            page,
            sequence_index: cursor,
        });
        cursor = cursor.saturating_add(1);
    }

    (chunks, cursor)
}

fn make_chunk_id(source_file: &str, page: Option<u32>, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_file.as_bytes());
    hasher.update(page.unwrap_or(0).to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_advances_by_size_minus_overlap() {
        let text = "abcdefghijklmnopqrstuvwxy";
        assert_eq!(text.len(), 25);

        let chunks = chunk_sliding_window(text, 10, 3);
        assert_eq!(chunks, vec!["abcdefghij", "hijklmnopq", "opqrstuvwx", "vwxy"]);
        assert!(chunks[3].len() < 10);
    }

    #[test]
    fn sliding_window_on_empty_text_emits_nothing() {
        assert!(chunk_sliding_window("", 10, 3).is_empty());
    }

    #[test]
    fn sliding_window_counts_characters_not_bytes() {
        let chunks = chunk_sliding_window("ééééé", 2, 0);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        assert!(ChunkingConfig::sliding_window(10, 10).is_err());
        assert!(ChunkingConfig::sliding_window(10, 12).is_err());
        assert!(ChunkingConfig::sliding_window(0, 0).is_err());
        assert!(ChunkingConfig::sliding_window(10, 9).is_ok());
    }

    #[test]
    fn sentence_mode_ignores_overlap() {
        let options = IngestionOptions {
            chunking: ChunkingStrategy::Sentence,
            chunk_size: 40,
            chunk_overlap: 400,
            ..IngestionOptions::default()
        };
        let config = ChunkingConfig::try_from(&options).unwrap();
        assert_eq!(config.strategy, ChunkingStrategy::Sentence);
    }

    #[test]
    fn sentences_keep_their_terminal_punctuation() {
        let sentences = split_sentences("first one. second! third? tail without stop");
        assert_eq!(
            sentences,
            vec!["first one.", "second!", "third?", "tail without stop"]
        );
    }

    #[test]
    fn punctuation_without_following_space_does_not_split() {
        assert_eq!(split_sentences("version 1.2 is out."), vec!["version 1.2 is out."]);
    }

    #[test]
    fn sentence_chunks_never_split_a_sentence() {
        let normalized = format!("a. b. {}", "word ".repeat(200).trim_end());
        let chunks = chunk_by_sentence(&normalized, 50);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a. b.");
        assert_eq!(chunks.join(" "), normalized);
        for chunk in &chunks {
            for sentence in split_sentences(chunk) {
                assert!(normalized.contains(sentence));
            }
        }
    }

    #[test]
    fn sentence_chunks_respect_size_when_sentences_fit() {
        let text = "one two. three four. five six. seven eight.";
        let chunks = chunk_by_sentence(text, 22);
        assert_eq!(chunks, vec!["one two. three four.", "five six. seven eight."]);
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn build_chunks_numbers_sequence_from_cursor() {
        let config = ChunkingConfig::sliding_window(4, 0).unwrap();
        let (chunks, next) = build_chunks("manual.pdf", Some(2), "abcdefgh", &config, 5);

        assert_eq!(next, 7);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].sequence_index, 5);
        assert_eq!(chunks[1].sequence_index, 6);
        assert!(chunks.iter().all(|chunk| chunk.source_file == "manual.pdf"));
        assert!(chunks.iter().all(|chunk| chunk.page == Some(2)));
        assert_ne!(chunks[0].chunk_id, chunks[1].chunk_id);
    }

    #[test]
    fn chunk_ids_are_reproducible() {
        let config = ChunkingConfig::sentence(100).unwrap();
        let (first, _) = build_chunks("a.txt", None, "same text.", &config, 0);
        let (second, _) = build_chunks("a.txt", None, "same text.", &config, 0);
        assert_eq!(first[0].chunk_id, second[0].chunk_id);
        assert_eq!(first[0].chunk_id.len(), 64);
    }
}
