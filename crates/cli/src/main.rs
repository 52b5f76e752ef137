//! dirtrack CLI - directory change tracking
//!
//! This binary provides the command-line interface for the dirtrack tracker.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dirtrack_core::Config;
use dirtrack_watcher::{
    track_directory, CloseReason, Delta, DirectoryTracker, SessionState, TrackOptions,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dirtrack")]
#[command(about = "Track changes to a directory's entries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print changes to a directory until interrupted
    Watch {
        /// Directory to watch
        dir: PathBuf,

        /// Print each delta as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Print the tracked entries of a directory once
    List {
        /// Directory to list
        dir: PathBuf,

        /// Print the entries as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let options = load_options(cli.config.as_deref())?;

    match cli.command {
        Commands::Watch { dir, json } => watch(&dir, options, json).await,
        Commands::List { dir, json } => list(&dir, options, json).await,
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dirtrack={level},dirtrack_core={level},dirtrack_watcher={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn load_options(config_path: Option<&Path>) -> Result<TrackOptions> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    debug!("Tracker configuration: {:?}", config.tracker);
    TrackOptions::from_config(&config.tracker).context("Invalid tracker configuration")
}

/// Watch a directory and print every delta
async fn watch(dir: &Path, options: TrackOptions, json: bool) -> Result<()> {
    let tracker = track_directory(dir, options);
    let mut subscription = tracker
        .subscribe()
        .await
        .with_context(|| format!("Failed to watch {}", dir.display()))?;

    info!("Watching {} (Ctrl-C to stop)", dir.display());
    let mut stdout = std::io::stdout().lock();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                subscription.cancel();
                break;
            }
            delta = subscription.recv() => match delta {
                Some(delta) => write_delta(&mut stdout, &delta, json)?,
                None => break,
            }
        }
    }

    drop(subscription);
    finish(&tracker, dir).await
}

/// Close the tracker, turning a failed session into an error
async fn finish(tracker: &DirectoryTracker, dir: &Path) -> Result<()> {
    tracker.close().await;

    if let Some(SessionState::Closed(CloseReason::Failed(message))) = tracker.state().await {
        bail!("Tracking {} failed: {}", dir.display(), message);
    }
    Ok(())
}

/// Print the entries the initial scan finds
async fn list(dir: &Path, options: TrackOptions, json: bool) -> Result<()> {
    let tracker = track_directory(dir, options);
    let mut subscription = tracker
        .subscribe()
        .await
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    let Some(initial) = subscription.recv().await else {
        bail!("Tracking {} ended before the initial scan", dir.display());
    };

    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, initial.added())?;
        writeln!(stdout)?;
    } else {
        for entry in initial.added() {
            writeln!(stdout, "{}", entry.name())?;
        }
    }

    drop(subscription);
    finish(&tracker, dir).await
}

fn write_delta(out: &mut impl Write, delta: &Delta, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer(&mut *out, delta)?;
        writeln!(out)?;
    } else {
        for line in format_delta(delta) {
            writeln!(out, "{line}")?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Removals first, matching the order deltas are applied in
fn format_delta(delta: &Delta) -> Vec<String> {
    delta
        .removed_names()
        .map(|name| format!("- {name}"))
        .chain(delta.added_names().map(|name| format!("+ {name}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirtrack_watcher::{Entry, EntryKind, EntryMetadata};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn entry(name: &str, secs: u64) -> Entry {
        Entry::new(
            name,
            EntryMetadata::new(
                SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
                0,
                EntryKind::File,
            ),
        )
    }

    #[test]
    fn test_format_delta() {
        let delta = Delta::new(
            vec![entry("b", 2), entry("a", 2)],
            vec![entry("a", 1)],
        );
        assert_eq!(format_delta(&delta), vec!["- a", "+ a", "+ b"]);
    }

    #[test]
    fn test_write_delta_json() {
        let delta = Delta::new(vec![entry("new.txt", 1)], Vec::new());
        let mut out = Vec::new();
        write_delta(&mut out, &delta, true).expect("write failed");

        let line = String::from_utf8(out).expect("not utf-8");
        let value: serde_json::Value = serde_json::from_str(line.trim()).expect("invalid json");
        assert_eq!(value["added"][0]["name"], "new.txt");
        assert_eq!(value["removed"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_finish_reports_failed_session() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let watched = temp_dir.path().join("watched");
        std::fs::create_dir(&watched).expect("test setup failed");

        let tracker = track_directory(&watched, TrackOptions::default());
        let mut subscription = tracker.subscribe().await.expect("subscribe failed");
        subscription.recv().await.expect("no initial delta");

        std::fs::remove_dir(&watched).expect("test setup failed");
        tokio::time::timeout(Duration::from_secs(5), async {
            while subscription.recv().await.is_some() {}
        })
        .await
        .expect("session did not close");
        drop(subscription);

        let err = finish(&tracker, &watched)
            .await
            .expect_err("failed session must be an error");
        assert!(err.to_string().contains("failed"));
    }

    #[tokio::test]
    async fn test_finish_after_clean_close() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let tracker = track_directory(temp_dir.path(), TrackOptions::default());
        let subscription = tracker.subscribe().await.expect("subscribe failed");
        drop(subscription);

        finish(&tracker, temp_dir.path())
            .await
            .expect("clean shutdown is not an error");
    }

    #[test]
    fn test_cli_parses_watch() {
        let cli = Cli::try_parse_from(["dirtrack", "-v", "watch", "/tmp", "--json"])
            .expect("parse failed");
        assert!(cli.verbose);
        match cli.command {
            Commands::Watch { dir, json } => {
                assert_eq!(dir, PathBuf::from("/tmp"));
                assert!(json);
            }
            Commands::List { .. } => panic!("expected watch"),
        }
    }
}
