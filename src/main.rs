// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and the sinks findings/errors are delivered to
// 3. Run the crawl with the chosen fetch mode
// 4. Print the findings and exit with the proper code:
//    0 = crawl completed (with or without findings)
//    1 = the seed URL is invalid or could not be fetched
//    2 = any other error (bad options, unwritable log file, ...)
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cli::Cli;
use sqli_crawler::telemetry::init_telemetry;
use sqli_crawler::{
    CollectingSink, CrawlReport, Crawler, Finding, HttpTransport, JsonLinesSink, LogSink, RunError,
};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // If an unexpected error occurred, print it and exit with code 2
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_telemetry(cli.verbose);

    let config = cli.to_config();
    info!(
        "Scanning {} and its subdomains to depth {} ({} mode)",
        config.seed, config.max_depth, config.mode
    );

    let transport = HttpTransport::new(&cli.user_agent).context("failed to build HTTP client")?;

    // The collecting sink feeds the final summary; the log sink reports
    // findings as they happen
    let collected = Arc::new(CollectingSink::new());
    let mut crawler = Crawler::from_config(&config, Arc::new(transport))?
        .with_finding_sink(Arc::new(LogSink))
        .with_error_sink(Arc::new(LogSink))
        .with_finding_sink(collected.clone())
        .with_error_sink(collected.clone());

    let mut log_writer = None;
    if let Some(path) = &cli.logfile {
        let (file_sink, writer) = JsonLinesSink::append_to(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        let file_sink = Arc::new(file_sink);
        crawler = crawler
            .with_finding_sink(file_sink.clone())
            .with_error_sink(file_sink);
        log_writer = Some(writer);
    }

    spawn_cancel_triggers(crawler.cancellation_token(), cli.run_timeout);

    // run() consumes the crawler, so the file sink is closed once it returns
    let outcome = crawler.run(&config.seed).await;
    if let Some(writer) = log_writer {
        writer.await.context("event log writer failed")?;
    }

    match outcome {
        Ok(report) => {
            print_results(&report, &collected.findings(), cli.json)?;
            Ok(0)
        }
        Err(e @ (RunError::InvalidSeed { .. } | RunError::SeedUnreachable { .. })) => {
            error!("{}", e);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

// Cancels the crawl on Ctrl-C, and after --run-timeout if one was given
fn spawn_cancel_triggers(token: CancellationToken, run_timeout: Option<u64>) {
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping crawl");
            on_interrupt.cancel();
        }
    });

    if let Some(secs) = run_timeout {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!("run timeout of {}s reached, stopping crawl", secs);
            token.cancel();
        });
    }
}

// Prints the results either as a table or JSON
fn print_results(report: &CrawlReport, findings: &[Finding], json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({
            "report": report,
            "findings": findings,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_table(report, findings);
    }
    Ok(())
}

// Prints findings as a human-readable table in the terminal
fn print_table(report: &CrawlReport, findings: &[Finding]) {
    if !findings.is_empty() {
        println!("{:<60} {:<6} {:<40}", "URL", "TOKEN", "EVIDENCE");
        println!("{}", "=".repeat(106));

        for finding in findings {
            println!(
                "{:<60} {:<6} {:<40}",
                truncate(&finding.url, 57),
                finding.token,
                truncate(&one_line(&finding.evidence), 40)
            );
        }
        println!();
    }

    println!("📊 Summary:");
    println!("   🌐 Scope: {}", report.scope);
    println!("   🔗 URLs discovered: {}", report.visited_count);
    println!("   📄 Pages fetched: {}", report.fetched.len());
    println!("   ⚠️  Findings: {}", report.findings);
    println!("   ❌ Errors: {}", report.errors);
    if report.cancelled {
        println!("   ⏹️  Crawl was cancelled before completion");
    }
}

// Shortens a string for display, on char boundaries
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
