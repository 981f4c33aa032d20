//! Reads uploaded files into `SourceText` values: one per PDF page, one per
//! text or markdown file. The core never touches the filesystem itself.

use anyhow::{bail, Context, Result};
use lopdf::Document;
use notes_search_core::SourceText;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TEXT_EXTENSIONS: [&str; 4] = ["txt", "md", "markdown", "text"];

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>> {
        let document = Document::load(path)
            .with_context(|| format!("pdf parse error: {}", path.display()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .with_context(|| format!("failed to extract page {page_no} of {}", path.display()))?;

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        if pages.is_empty() {
            bail!("pdf had no readable page text: {}", path.display());
        }

        Ok(pages)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Pdf,
    Text,
}

fn source_kind(path: &Path) -> Option<SourceKind> {
    let extension = path.extension().and_then(|ext| ext.to_str())?;
    if extension.eq_ignore_ascii_case("pdf") {
        Some(SourceKind::Pdf)
    } else if TEXT_EXTENSIONS
        .iter()
        .any(|known| extension.eq_ignore_ascii_case(known))
    {
        Some(SourceKind::Text)
    } else {
        None
    }
}

/// Expands folders recursively. Explicit file arguments are kept as given so
/// unsupported ones surface as skipped files instead of vanishing.
pub fn discover_source_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .into_iter()
            .filter_map(|item| item.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| source_kind(entry.path()).is_some())
            .map(|entry| entry.path().to_path_buf())
            .collect();
        found.sort_unstable();
        files.extend(found);
    }

    files
}

fn display_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("path has no file name: {}", path.display()))
}

pub fn read_sources(path: &Path, extractor: &impl PdfExtractor) -> Result<Vec<SourceText>> {
    let name = display_name(path)?;

    match source_kind(path) {
        Some(SourceKind::Pdf) => Ok(extractor
            .extract_pages(path)?
            .into_iter()
            .map(|page| SourceText::new(name.clone(), page.text).with_page(page.number))
            .collect()),
        Some(SourceKind::Text) => {
            let bytes = fs::read(path).with_context(|| format!("io error: {}", path.display()))?;
            let text = String::from_utf8(bytes)
                .with_context(|| format!("file is not valid utf-8: {}", path.display()))?;
            Ok(vec![SourceText::new(name, text)])
        }
        None => bail!("unsupported file type: {}", path.display()),
    }
}

pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct ExtractionReport {
    pub sources: Vec<SourceText>,
    pub skipped_files: Vec<SkippedFile>,
}

pub fn extract_best_effort(inputs: &[PathBuf], extractor: &impl PdfExtractor) -> ExtractionReport {
    let mut sources = Vec::new();
    let mut skipped_files = Vec::new();

    for path in discover_source_files(inputs) {
        match read_sources(&path, extractor) {
            Ok(file_sources) => sources.extend(file_sources),
            Err(error) => skipped_files.push(SkippedFile {
                path,
                reason: format!("{error:#}"),
            }),
        }
    }

    ExtractionReport {
        sources,
        skipped_files,
    }
}
