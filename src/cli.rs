// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// The old method names are still accepted:
//   --method requests  ==  --mode sequential
//   --method asyncio   ==  --mode concurrent
// =============================================================================

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use sqli_crawler::config::{DEFAULT_CONCURRENCY, DEFAULT_MAX_DEPTH, DEFAULT_TIMEOUT_SECS};
use sqli_crawler::{CrawlConfig, FetchMode};

#[derive(Parser, Debug)]
#[command(
    name = "sqli-crawler",
    version,
    about = "Crawl a site and its subdomains, flagging pages with SQL-injection-looking output",
    long_about = "sqli-crawler walks a website and its subdomains breadth-first up to a fixed depth. \
                  Every page whose text or element attributes contain quotes, semicolons or SQL \
                  comment markers is reported. This is a crude lexical hint, not a vulnerability test."
)]
pub struct Cli {
    /// Seed URL to start crawling from (e.g., https://example.com)
    #[arg(value_name = "URL")]
    pub url: String,

    /// Maximum crawl depth; the seed is depth 0
    #[arg(long, visible_alias = "max-depth", default_value_t = DEFAULT_MAX_DEPTH)]
    pub depth: usize,

    /// How pages are fetched
    #[arg(long, alias = "method", value_enum, default_value_t = Mode::Sequential)]
    pub mode: Mode,

    /// Maximum simultaneous requests in concurrent mode
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Stop the whole crawl after this many seconds
    #[arg(long, value_name = "SECS")]
    pub run_timeout: Option<u64>,

    /// Append findings and errors to this file as JSON lines
    #[arg(long, value_name = "PATH")]
    pub logfile: Option<PathBuf>,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,

    /// User-Agent header sent with every request
    #[arg(long, default_value = concat!("sqli-crawler/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// One request at a time
    #[value(alias = "requests")]
    Sequential,
    /// Several requests at a time (see --concurrency)
    #[value(alias = "asyncio")]
    Concurrent,
}

impl From<Mode> for FetchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Sequential => FetchMode::Sequential,
            Mode::Concurrent => FetchMode::Concurrent,
        }
    }
}

impl Cli {
    pub fn to_config(&self) -> CrawlConfig {
        CrawlConfig {
            seed: self.url.clone(),
            max_depth: self.depth,
            mode: self.mode.into(),
            concurrency: self.concurrency,
            request_timeout: Duration::from_secs(self.timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["sqli-crawler", "http://example.com"]).unwrap();
        let config = cli.to_config();
        assert_eq!(config.seed, "http://example.com");
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.mode, FetchMode::Sequential);
        assert_eq!(config.concurrency, 8);
        assert!(!cli.json);
    }

    #[test]
    fn test_legacy_method_names() {
        let cli = Cli::try_parse_from([
            "sqli-crawler",
            "http://example.com",
            "--method",
            "asyncio",
            "--max-depth",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.mode, Mode::Concurrent);
        assert_eq!(cli.depth, 3);
    }

    #[test]
    fn test_seed_is_required() {
        assert!(Cli::try_parse_from(["sqli-crawler"]).is_err());
    }
}
