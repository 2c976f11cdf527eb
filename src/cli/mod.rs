//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod helpers;
mod highlight;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::highlight::CrossPagePolicy;
use crate::phrases::SentenceRank;

#[derive(Parser)]
#[command(name = "readease")]
#[command(about = "Highlight key phrases and keywords on scanned document pages")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// OCR pages, match phrases and write highlighted page images
    Highlight {
        /// A PDF or one or more page images, in page order
        #[arg(required = true)]
        input: Vec<PathBuf>,
        /// Phrase file (JSON, TOML or YAML) with `keywords` and `sentences`
        #[arg(short, long)]
        phrases: PathBuf,
        /// Output directory (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Number of page workers (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Drop ranked sentences below this rank (low, average, high or a number)
        #[arg(long, value_parser = SentenceRank::from_str)]
        min_rank: Option<SentenceRank>,
        /// Phrases crossing a page break: split or ignore (overrides config)
        #[arg(long, value_parser = CrossPagePolicy::from_str)]
        policy: Option<CrossPagePolicy>,
        /// Also write words.json with every recognized token
        #[arg(long)]
        words: bool,
    },

    /// Print the recognized, normalized words of each page
    Words {
        /// A PDF or one or more page images, in page order
        #[arg(required = true)]
        input: Vec<PathBuf>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check if required OCR tools are installed
    Check,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(&path).await?,
        None => Config::load().await,
    };

    match cli.command {
        Commands::Highlight {
            input,
            phrases,
            out,
            workers,
            min_rank,
            policy,
            words,
        } => {
            let args = highlight::HighlightArgs {
                input,
                phrases,
                out,
                workers,
                min_rank,
                policy,
                words,
            };
            highlight::cmd_highlight(&config, args).await
        }
        Commands::Words { input, json } => highlight::cmd_words(&config, &input, json).await,
        Commands::Check => check::cmd_check().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrases::RankLabel;

    #[test]
    fn parses_highlight_command() {
        let cli = Cli::try_parse_from([
            "readease",
            "highlight",
            "doc.pdf",
            "--phrases",
            "phrases.json",
            "--policy",
            "ignore",
            "-w",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Highlight {
                input,
                policy,
                workers,
                ..
            } => {
                assert_eq!(input, vec![PathBuf::from("doc.pdf")]);
                assert_eq!(policy, Some(CrossPagePolicy::Ignore));
                assert_eq!(workers, Some(2));
            }
            _ => panic!("expected highlight"),
        }
    }

    #[test]
    fn min_rank_accepts_labels_and_numbers() {
        let parse = |rank: &str| {
            let cli = Cli::try_parse_from([
                "readease", "highlight", "a.png", "--phrases", "p.json", "--min-rank", rank,
            ])
            .unwrap();
            match cli.command {
                Commands::Highlight { min_rank, .. } => min_rank,
                _ => panic!("expected highlight"),
            }
        };
        assert_eq!(parse("average"), Some(SentenceRank::Label(RankLabel::Average)));
        assert_eq!(parse("4"), Some(SentenceRank::Score(4.0)));
    }

    #[test]
    fn rejects_unknown_policy() {
        let result = Cli::try_parse_from([
            "readease",
            "highlight",
            "a.png",
            "--phrases",
            "p.json",
            "--policy",
            "merge",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["readease", "check", "-v", "-c", "readease.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("readease.toml")));
    }
}
