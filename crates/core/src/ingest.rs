use serde::{Deserialize, Serialize};

/// Per-file cleaning statistics for one ingestion cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestionReportEntry {
    pub file: String,
    pub raw_char_count: usize,
    pub cleaned_char_count: usize,
    pub noise_reduction_percent: f64,
    pub chunk_count: usize,
    pub pages: usize,
}

impl IngestionReportEntry {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            raw_char_count: 0,
            cleaned_char_count: 0,
            noise_reduction_percent: 0.0,
            chunk_count: 0,
            pages: 0,
        }
    }
}

pub fn noise_reduction_percent(raw_len: usize, cleaned_len: usize) -> f64 {
    if raw_len == 0 {
        return 0.0;
    }
    (raw_len as f64 - cleaned_len as f64) / raw_len as f64 * 100.0
}

/// One row per distinct file, in first-seen order. Repeated calls for the same
/// file accumulate into its existing row.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionLog {
    entries: Vec<IngestionReportEntry>,
}

impl IngestionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, file: &str, raw: &str, cleaned: &str, chunk_count: usize) {
        let position = match self.entries.iter().position(|entry| entry.file == file) {
            Some(position) => position,
            None => {
                self.entries.push(IngestionReportEntry::new(file));
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[position];
        entry.raw_char_count += raw.chars().count();
        entry.cleaned_char_count += cleaned.chars().count();
        entry.noise_reduction_percent =
            noise_reduction_percent(entry.raw_char_count, entry.cleaned_char_count);
        entry.chunk_count += chunk_count;
        entry.pages += 1;
    }

    pub fn entries(&self) -> &[IngestionReportEntry] {
        &self.entries
    }

    pub fn entry(&self, file: &str) -> Option<&IngestionReportEntry> {
        self.entries.iter().find(|entry| entry.file == file)
    }

    pub fn total_chunks(&self) -> usize {
        self.entries.iter().map(|entry| entry.chunk_count).sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_of_one_file_share_a_row() {
        let mut log = IngestionLog::new();
        log.record("manual.pdf", "Page One!!", "page one!", 1);
        log.record("manual.pdf", "Page  Two", "page two", 2);

        assert_eq!(log.entries().len(), 1);
        let entry = &log.entries()[0];
        assert_eq!(entry.raw_char_count, 10 + 9);
        assert_eq!(entry.cleaned_char_count, 9 + 8);
        assert_eq!(entry.chunk_count, 3);
        assert_eq!(entry.pages, 2);
    }

    #[test]
    fn distinct_files_keep_first_seen_order() {
        let mut log = IngestionLog::new();
        log.record("b.txt", "b", "b", 1);
        log.record("a.txt", "a", "a", 1);
        log.record("b.txt", "b", "b", 1);

        let files: Vec<_> = log.entries().iter().map(|entry| entry.file.as_str()).collect();
        assert_eq!(files, vec!["b.txt", "a.txt"]);
        assert_eq!(log.total_chunks(), 3);
    }

    #[test]
    fn empty_raw_text_reports_zero_reduction() {
        assert_eq!(noise_reduction_percent(0, 0), 0.0);

        let mut log = IngestionLog::new();
        log.record("empty.txt", "", "", 0);
        assert_eq!(log.entry("empty.txt").map(|e| e.noise_reduction_percent), Some(0.0));
    }

    #[test]
    fn reduction_is_a_percentage_of_raw_length() {
        assert_eq!(noise_reduction_percent(200, 150), 25.0);
    }

    #[test]
    fn clear_empties_the_report() {
        let mut log = IngestionLog::new();
        log.record("a.txt", "abc", "abc", 1);
        log.clear();
        assert!(log.is_empty());
    }
}
