//! rsvp-roll - attendance reports for a recurring Meetup session.
//!
//! Fetches every occurrence of the configured event series, collects the
//! "yes" RSVPs of each, and prints capacity, links, per-person session
//! counts and an attendance table for pasting into a spreadsheet. Pass
//! the previous table back in to update it instead of starting over.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rsvp_roll_core::report;
use rsvp_roll_core::{
    collect_attendance, reconcile, Config, Delimiter, MeetupClient, PriorSheet, RefreshFilter,
};

#[derive(Parser, Debug)]
#[command(name = "rsvp-roll")]
#[command(about = "Report Meetup RSVPs for a recurring event and update an attendance sheet")]
struct Cli {
    /// Previously exported sheet (tab-separated rows); omit on the first run
    prior_sheet: Option<String>,

    /// Comma-separated date keys to refresh even if the event is past
    refresh_dates: Option<String>,

    /// Read the previous sheet from a file instead of an argument
    #[arg(long, conflicts_with = "prior_sheet")]
    sheet_file: Option<PathBuf>,

    /// Same as REFRESH_DATES, usable together with --sheet-file
    #[arg(long, conflicts_with = "refresh_dates")]
    refresh: Option<String>,

    /// Config file (defaults to ~/.config/rsvp-roll/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Meetup group URL name
    #[arg(long)]
    group: Option<String>,

    /// Exact name of the recurring event
    #[arg(long)]
    event_name: Option<String>,

    /// Maximum RSVP fetches in flight (default: all at once)
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Table delimiter: tab or comma
    #[arg(long)]
    delimiter: Option<Delimiter>,

    /// Only print one attendance line per event
    #[arg(long)]
    summary_only: bool,

    /// Write the default config file and exit
    #[arg(long)]
    init_config: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref group) = self.group {
            config.group = group.clone();
        }
        if let Some(ref name) = self.event_name {
            config.event_name = name.clone();
        }
        if let Some(max) = self.max_concurrent {
            config.max_concurrent_fetches = Some(max);
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
    }

    fn prior_sheet_text(&self) -> Result<Option<String>> {
        match (&self.prior_sheet, &self.sheet_file) {
            (Some(text), _) => Ok(Some(text.clone())),
            (None, Some(path)) => std::fs::read_to_string(path)
                .map(Some)
                .with_context(|| format!("Failed to read sheet file: {}", path.display())),
            (None, None) => Ok(None),
        }
    }

    fn refresh_filter(&self) -> Option<RefreshFilter> {
        self.refresh_dates
            .as_deref()
            .or(self.refresh.as_deref())
            .and_then(RefreshFilter::parse)
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
    // Logs go to stderr; stdout carries only the report.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(ref path) => path.clone(),
        None => Config::config_path()?,
    };

    if cli.init_config {
        Config::default().save_to(&config_path)?;
        println!("Wrote default config to {}", config_path.display());
        return Ok(());
    }

    let mut config = Config::load_from(&config_path)?;
    cli.apply_overrides(&mut config);

    // Read the previous sheet before touching the network
    let prior = match cli.prior_sheet_text()? {
        Some(text) => PriorSheet::parse(&text).context("Failed to read previous sheet")?,
        None => None,
    };
    let filter = cli.refresh_filter();

    info!(
        group = %config.group,
        event = %config.event_name,
        prior_rows = ?prior.as_ref().map(|s| s.rows.len()),
        "Starting"
    );

    let client = MeetupClient::new(config.group.clone())?;
    let events = match client.fetch_events(&config.event_name, config.events_window).await {
        Ok(events) => events,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Events fetch failed");
            Vec::new()
        }
    };
    info!(count = events.len(), "Events fetched");

    let attendance = collect_attendance(&client, events, config.max_concurrent_fetches).await;

    if cli.summary_only {
        for event in &attendance.events {
            println!("{}", report::summary_line(event));
        }
        return Ok(());
    }

    let result = reconcile(&attendance, prior.as_ref(), filter.as_ref(), &config.sheet_layout());
    if !result.unplaced_dates.is_empty() {
        warn!(
            dates = %result.unplaced_dates.join(", "),
            "Events missing from the sheet's date row get no column; add the dates to track them"
        );
    }
    info!(refreshed = ?result.refreshed, new_people = result.new_people, "Sheet updated");

    println!("{}", report::render(&attendance, &result.matrix, &config.report_options()));
    Ok(())
}
