//! Text cleaning applied identically to ingested passages and to queries.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const URL_PATTERN: &str = r"(?:^|\s)(?:https?://|www\.)\S*";
const DISALLOWED_PATTERN: &str = r"[^a-z0-9\s.!?]";
const WHITESPACE_PATTERN: &str = r"\s+";
const HEADING_PATTERN: &str = r"#+\s?";
const NEWLINE_PATTERN: &str = r"\n+";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Lowercase, drop URLs, keep only `[a-z0-9 .!?]`, collapse whitespace.
    #[default]
    Full,
    /// Strip markdown heading markers and fold newlines; case and punctuation are kept.
    Light,
}

#[derive(Debug, Clone)]
pub struct TextNormalizer {
    mode: NormalizationMode,
    url_re: Regex,
    disallowed_re: Regex,
    whitespace_re: Regex,
    heading_re: Regex,
    newline_re: Regex,
}

impl TextNormalizer {
    pub fn new(mode: NormalizationMode) -> Result<Self, ConfigError> {
        Ok(Self {
            mode,
            url_re: Regex::new(URL_PATTERN)?,
            disallowed_re: Regex::new(DISALLOWED_PATTERN)?,
            whitespace_re: Regex::new(WHITESPACE_PATTERN)?,
            heading_re: Regex::new(HEADING_PATTERN)?,
            newline_re: Regex::new(NEWLINE_PATTERN)?,
        })
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    pub fn normalize(&self, raw: &str) -> String {
        match self.mode {
            NormalizationMode::Full => self.normalize_full(raw),
            NormalizationMode::Light => self.normalize_light(raw),
        }
    }

    fn normalize_full(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        let without_urls = self.url_re.replace_all(&lowered, " ");
        let restricted = self.disallowed_re.replace_all(&without_urls, " ");
        self.whitespace_re
            .replace_all(&restricted, " ")
            .trim()
            .to_string()
    }

    fn normalize_light(&self, raw: &str) -> String {
        let without_headings = self.heading_re.replace_all(raw, "");
        self.newline_re
            .replace_all(&without_headings, " ")
            .trim()
            .to_string()
    }
}
