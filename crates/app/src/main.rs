mod extract;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use extract::{extract_best_effort, LopdfExtractor};
use notes_search_core::{
    ChunkingStrategy, IngestionOptions, KnowledgeBase, NormalizationMode, SearchOptions,
    SearchResult,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SNIPPET_CHARS: usize = 50;

#[derive(Parser)]
#[command(name = "notes-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Text cleaning policy applied to documents and queries.
    #[arg(long, value_enum, default_value = "full", env = "NOTES_SEARCH_NORMALIZATION", global = true)]
    normalization: NormalizationArg,

    /// How normalized text is split into chunks.
    #[arg(long, value_enum, default_value = "sliding-window", env = "NOTES_SEARCH_CHUNKING", global = true)]
    chunking: ChunkingArg,

    /// Maximum characters per chunk.
    #[arg(long, default_value = "500", env = "NOTES_SEARCH_CHUNK_SIZE", global = true)]
    chunk_size: usize,

    /// Characters shared by consecutive sliding windows.
    #[arg(long, default_value = "50", env = "NOTES_SEARCH_CHUNK_OVERLAP", global = true)]
    chunk_overlap: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum NormalizationArg {
    Full,
    Light,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChunkingArg {
    SlidingWindow,
    Sentence,
}

#[derive(Args)]
struct RankingArgs {
    /// Number of results to return.
    #[arg(long, default_value = "3", env = "NOTES_SEARCH_TOP_N")]
    top_n: usize,

    /// Drop results scoring at or below this value. Bare flag means 0.05.
    #[arg(long, num_args = 0..=1, default_missing_value = "0.05", env = "NOTES_SEARCH_MIN_SCORE")]
    min_score: Option<f64>,

    /// Best-match score a result must exceed to be presented as an answer.
    #[arg(long, default_value = "0.05", env = "NOTES_SEARCH_ANSWER_THRESHOLD")]
    answer_threshold: f64,

    /// Decimal places kept in reported scores.
    #[arg(long, default_value = "4")]
    score_decimals: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Index the given files and folders, then answer a single query.
    Search {
        /// Files or folders (pdf, txt, md).
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Search query.
        #[arg(long)]
        query: String,
        #[command(flatten)]
        ranking: RankingArgs,
        /// Print results as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show the terms with the highest mean weight across the corpus.
    Keywords {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Number of keywords to show.
        #[arg(long, default_value = "10")]
        top: usize,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show per-file cleaning and chunk counts.
    Report {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Index once, then answer queries read from stdin until EOF or `exit`.
    Chat {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        ranking: RankingArgs,
    },
}

impl From<NormalizationArg> for NormalizationMode {
    fn from(value: NormalizationArg) -> Self {
        match value {
            NormalizationArg::Full => NormalizationMode::Full,
            NormalizationArg::Light => NormalizationMode::Light,
        }
    }
}

impl From<ChunkingArg> for ChunkingStrategy {
    fn from(value: ChunkingArg) -> Self {
        match value {
            ChunkingArg::SlidingWindow => ChunkingStrategy::SlidingWindow,
            ChunkingArg::Sentence => ChunkingStrategy::Sentence,
        }
    }
}

impl Cli {
    fn ingestion_options(&self) -> IngestionOptions {
        IngestionOptions {
            normalization: self.normalization.into(),
            chunking: self.chunking.into(),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}

impl RankingArgs {
    fn search_options(&self) -> SearchOptions {
        SearchOptions {
            top_n: self.top_n,
            min_score: self.min_score,
            score_decimals: self.score_decimals,
        }
    }
}

fn load_knowledge_base(
    paths: &[PathBuf],
    options: IngestionOptions,
    search_options: SearchOptions,
) -> anyhow::Result<KnowledgeBase> {
    let mut kb = KnowledgeBase::new(options, search_options).context("invalid configuration")?;
    let report = extract_best_effort(paths, &LopdfExtractor);

    for skipped in &report.skipped_files {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
    }

    let chunk_count = kb.ingest_all(&report.sources);
    let rows = kb.build_index();
    info!(
        sources = report.sources.len(),
        skipped = report.skipped_files.len(),
        chunk_count,
        rows,
        "knowledge base ready"
    );

    if rows == 0 {
        eprintln!("0 chunks indexed (no readable text found)");
    }

    Ok(kb)
}

fn snippet(text: &str) -> String {
    let head: String = text.chars().take(SNIPPET_CHARS).collect();
    if text.chars().count() > SNIPPET_CHARS {
        format!("{head}...")
    } else {
        head
    }
}

fn render_answer(results: &[SearchResult], answer_threshold: f64) -> String {
    let Some(best) = results.first() else {
        return "I couldn't find any relevant information. Have you indexed any readable files?"
            .to_string();
    };

    if best.score <= answer_threshold {
        return "I couldn't find a strong match for that query in your documents.".to_string();
    }

    let mut answer = format!(
        "Best match (score {:.2}) from {} page {}:\n> {}\n",
        best.score, best.source_file, best.page, best.text
    );
    for (rank, result) in results.iter().enumerate() {
        answer.push_str(&format!(
            "  rank {} | score {} | {} p{} | {}\n",
            rank + 1,
            result.score,
            result.source_file,
            result.page,
            snippet(&result.text)
        ));
    }
    answer
}

fn run_chat(kb: &KnowledgeBase, answer_threshold: f64) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        let results = kb.search(query);
        writeln!(stdout, "{}", render_answer(&results, answer_threshold))?;
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "notes-search boot"
    );

    let options = cli.ingestion_options();

    match &cli.command {
        Command::Search {
            paths,
            query,
            ranking,
            json,
        } => {
            let kb = load_knowledge_base(paths, options, ranking.search_options())?;
            let results = kb.search(query);

            if *json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("query: {query}");
                print!("{}", render_answer(&results, ranking.answer_threshold));
            }
        }
        Command::Keywords { paths, top, json } => {
            let kb = load_knowledge_base(paths, options, SearchOptions::default())?;
            let keywords = kb.top_keywords(*top);

            if *json {
                println!("{}", serde_json::to_string_pretty(&keywords)?);
            } else {
                for keyword in keywords {
                    println!("{:<24} {:.4}", keyword.term, keyword.mean_weight);
                }
            }
        }
        Command::Report { paths, json } => {
            let kb = load_knowledge_base(paths, options, SearchOptions::default())?;
            let report = kb.report();

            if *json {
                println!("{}", serde_json::to_string_pretty(report.entries())?);
            } else {
                println!(
                    "{:<32} {:>10} {:>10} {:>8} {:>7} {:>6}",
                    "file", "raw", "cleaned", "noise%", "chunks", "pages"
                );
                for entry in report.entries() {
                    println!(
                        "{:<32} {:>10} {:>10} {:>7.1}% {:>7} {:>6}",
                        entry.file,
                        entry.raw_char_count,
                        entry.cleaned_char_count,
                        entry.noise_reduction_percent,
                        entry.chunk_count,
                        entry.pages
                    );
                }
                println!("total chunks: {}", report.total_chunks());
                if let Some(stats) = kb.index_stats() {
                    println!(
                        "index: rows={} vocabulary={} built_at={}",
                        stats.rows,
                        stats.vocabulary_size,
                        stats.built_at.to_rfc3339()
                    );
                }
            }
        }
        Command::Chat { paths, ranking } => {
            let kb = load_knowledge_base(paths, options, ranking.search_options())?;
            println!("{} chunks indexed. Type a question, or `exit` to quit.", kb.chunks().len());
            run_chat(&kb, ranking.answer_threshold)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: f64) -> SearchResult {
        SearchResult {
            text: "hydraulic pump maintenance schedule and pressure limits for the main line"
                .to_string(),
            source_file: "manual.pdf".to_string(),
            page: 3,
            sequence_index: 0,
            score,
        }
    }

    #[test]
    fn empty_results_explain_missing_index() {
        assert!(render_answer(&[], 0.05).contains("couldn't find any relevant"));
    }

    #[test]
    fn weak_best_match_is_not_presented() {
        assert!(render_answer(&[result(0.05)], 0.05).contains("strong match"));
    }

    #[test]
    fn strong_match_lists_every_rank() {
        let answer = render_answer(&[result(0.8), result(0.4)], 0.05);
        assert!(answer.contains("manual.pdf page 3"));
        assert!(answer.contains("rank 2"));
    }

    #[test]
    fn snippets_are_truncated_on_characters() {
        let text = "é".repeat(60);
        assert_eq!(snippet(&text).chars().count(), SNIPPET_CHARS + 3);
        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn cli_parses_global_and_ranking_flags() {
        let cli = Cli::try_parse_from([
            "notes-search",
            "search",
            "notes/",
            "--query",
            "pump",
            "--chunking",
            "sentence",
            "--min-score",
        ])
        .unwrap();

        assert_eq!(cli.ingestion_options().chunking, ChunkingStrategy::Sentence);
        match cli.command {
            Command::Search { ranking, .. } => assert_eq!(ranking.min_score, Some(0.05)),
            _ => panic!("expected search command"),
        }
    }
}
