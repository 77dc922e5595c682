mod args;
mod progress;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use toon_engine::{HarvestError, SeriesDownloader, SeriesReport};
use toon_logging::{toon_error, toon_info, toon_warn};

use args::Args;
use progress::LogProgress;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    toon_logging::initialize(args.verbose, args.log_destination());

    match run(args).await {
        Ok(report) => exit_code(report.as_ref()),
        Err(err) if is_interrupt(&err) => {
            eprintln!("Interrupted");
            ExitCode::from(INTERRUPTED)
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Conventional status for a process ended by SIGINT.
const INTERRUPTED: u8 = 130;

fn is_interrupt(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<HarvestError>(),
        Some(HarvestError::Interrupted)
    )
}

/// The first Ctrl-C stops new chapters from starting, the second ends the
/// process without waiting.
fn watch_interrupts(cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut received = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            received += 1;
            if received == 1 {
                toon_warn!("Interrupted, finishing chapters already in progress");
                cancel.cancel();
            } else {
                toon_error!("Interrupted again, exiting");
                std::process::exit(INTERRUPTED.into());
            }
        }
    });
}

async fn run(args: Args) -> Result<Option<SeriesReport>> {
    // Fails on a bad range before anything touches the network.
    let request = args.request()?;
    let downloader = SeriesDownloader::new(args.engine_config())
        .context("failed to set up the HTTP client")?
        .with_sink(Arc::new(LogProgress::new()));

    if args.list {
        let listing = downloader.list(&request).await?;
        for chapter in &listing.selected {
            let line = json!({
                "series": listing.series.title(),
                "episode": chapter.episode_number,
                "title": chapter.title,
                "released": chapter.release_date.to_string(),
                "url": chapter.viewer_url,
            });
            println!("{line}");
        }
        return Ok(None);
    }

    let cancel = CancellationToken::new();
    watch_interrupts(cancel.clone());

    let report = downloader
        .run(&request, cancel)
        .await
        .with_context(|| format!("failed to download {}", request.url))?;
    print_summary(&report);
    Ok(Some(report))
}

fn print_summary(report: &SeriesReport) {
    let summary = &report.summary;
    println!(
        "{}: {} of {} chapters downloaded to {}",
        report.series.title(),
        summary.succeeded,
        summary.selected,
        report.series_dir.display()
    );
    if summary.failed > 0 {
        println!("{} chapters failed, see the log for details", summary.failed);
    }
    let partial = report
        .chapters
        .iter()
        .filter(|chapter| !chapter.failed_pages.is_empty())
        .count();
    if partial > 0 {
        println!("{partial} chapters are missing pages");
    }
    if summary.cancelled {
        println!(
            "Interrupted: {} chapters were not started",
            summary.not_submitted
        );
    }
    toon_info!("{:?}", summary);
}

fn exit_code(report: Option<&SeriesReport>) -> ExitCode {
    match report {
        Some(report) if report.summary.failed > 0 || report.summary.cancelled => {
            ExitCode::FAILURE
        }
        _ => ExitCode::SUCCESS,
    }
}
