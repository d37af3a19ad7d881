//! # recap
//!
//! Command-line host for the Recap pipeline. Stands in for the page the
//! pipeline is normally embedded in: URLs arrive as arguments or on stdin,
//! page content comes from an optional HTML snapshot.

#![deny(unsafe_code)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recap_client::HttpTranscriptService;
use recap_core::logging::{LogFormat, init_logging};
use recap_core::text::format_time;
use recap_core::{Artifact, SummarySection};
use recap_runtime::{
    BadgeTracker, ExtractionCoordinator, NavigationSignal, NavigationWatcher, ReadPathReconciler,
    ReadState, SnapshotPage, WatcherConfig,
};
use recap_settings::RecapSettings;
use recap_store::{ArtifactRepository, BroadcastNotifier, JsonFileStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Transcript extraction and cache sync for video pages.
#[derive(Parser, Debug)]
#[command(name = "recap", about = "Transcript extraction and cache sync for video pages")]
struct Cli {
    /// Settings file (defaults to `~/.recap/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Artifact store file (overrides settings).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the transcript for a page, fetching it if it is not cached.
    Read {
        /// Page URL.
        url: String,
        /// HTML snapshot of the page, used for title lookup.
        #[arg(long)]
        html: Option<PathBuf>,
        /// Playback offset; the line spoken at this point is marked.
        #[arg(long, value_name = "SECONDS")]
        at: Option<f64>,
    },
    /// Watch URLs read from stdin (one per line) and prime the store.
    Watch {
        /// Label stamped on announcements from this context.
        #[arg(long, default_value = "cli")]
        context: String,
        /// HTML snapshot rendered for every URL.
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Probe the transcript service.
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let format = if settings.logging.json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_logging(&settings.logging.level, format);

    match cli.command {
        Command::Read { url, html, at } => read(&settings, &url, html.as_deref(), at).await,
        Command::Watch { context, html } => watch(&settings, &context, html.as_deref()).await,
        Command::Health => health(&settings).await,
    }
}

fn load_settings(cli: &Cli) -> Result<Arc<RecapSettings>> {
    let mut settings = match &cli.settings {
        Some(path) => recap_settings::load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => recap_settings::load_settings().context("failed to load settings")?,
    };
    if let Some(store) = &cli.store {
        settings.store.path.clone_from(store);
    }
    recap_settings::init_settings(settings);
    Ok(recap_settings::get_settings())
}

fn read_html(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read HTML snapshot: {}", path.display())),
        None => Ok(String::new()),
    }
}

fn repository(settings: &RecapSettings) -> ArtifactRepository {
    ArtifactRepository::new(Arc::new(JsonFileStore::new(settings.store.path.clone())))
}

async fn read(settings: &RecapSettings, url: &str, html: Option<&Path>, at: Option<f64>) -> Result<()> {
    let page = Arc::new(SnapshotPage::with_html(url, read_html(html)?));
    let service = Arc::new(HttpTranscriptService::new(settings.api.clone()));
    let reconciler = ReadPathReconciler::new(service, page, repository(settings))
        .with_language(settings.language.clone());

    let state = reconciler.activate().await;
    print!("{}", render_state(&state, at));
    if let ReadState::Failed { message, .. } = state {
        anyhow::bail!("transcript fetch failed: {message}");
    }
    Ok(())
}

async fn watch(settings: &RecapSettings, context: &str, html: Option<&Path>) -> Result<()> {
    let page = Arc::new(SnapshotPage::with_html("about:blank", read_html(html)?));
    let service = Arc::new(HttpTranscriptService::new(settings.api.clone()));
    let hub = BroadcastNotifier::new();
    let badges = Arc::new(BadgeTracker::new());

    let mut events = hub.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(envelope) = events.recv().await {
            match serde_json::to_string(&envelope.event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to encode event"),
            }
        }
    });
    let badge_task = {
        let badges = Arc::clone(&badges);
        let rx = hub.subscribe();
        tokio::spawn(async move { badges.run(rx).await })
    };

    let coordinator = Arc::new(
        ExtractionCoordinator::new(
            service,
            page.clone(),
            repository(settings),
            Arc::new(hub.context(context)),
        )
        .with_language(settings.language.clone()),
    );
    let watcher = Arc::new(NavigationWatcher::new(
        page.clone(),
        coordinator,
        WatcherConfig::from(&settings.watcher),
    ));
    let (tx, rx) = mpsc::channel(64);
    let handle = Arc::clone(&watcher).start(rx);
    info!(context, "watching stdin for navigations");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let url = line.trim();
                if url.is_empty() {
                    continue;
                }
                page.navigate(url);
                badges.on_navigation(context, url);
                if tx.send(NavigationSignal::PushState).await.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                handle.stop().await;
                return Ok(());
            }
        }
    }

    drop(tx);
    handle.join().await;
    info!(
        dispatched = watcher.dispatch_count(),
        badge = badges.badge(context).text(),
        "watcher finished"
    );
    // Printer and badge tasks end once every sender is gone
    drop(watcher);
    drop(hub);
    let _ = printer.await;
    let _ = badge_task.await;
    Ok(())
}

async fn health(settings: &RecapSettings) -> Result<()> {
    let service = HttpTranscriptService::new(settings.api.clone());
    let url = settings.api.health_url();
    if service.health().await.with_context(|| format!("health probe failed: {url}"))? {
        println!("healthy ({url})");
        Ok(())
    } else {
        anyhow::bail!("service at {url} is not healthy")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

fn render_state(state: &ReadState, at: Option<f64>) -> String {
    match state {
        ReadState::Ready(artifact) => render_artifact(artifact, at),
        ReadState::Unavailable { subject_id, title } => {
            format!("{title} ({subject_id})\nNo transcript available for this video.\n")
        }
        ReadState::Failed { subject_id, message } => {
            format!("Failed to load transcript for {subject_id}: {message}\n")
        }
        ReadState::NoSubject => "No video on this page.\n".to_string(),
        ReadState::Loading => "Loading...\n".to_string(),
    }
}

fn render_artifact(artifact: &Artifact, at: Option<f64>) -> String {
    let mut out = format!(
        "{} ({})\nDuration {}\n\n",
        artifact.title,
        artifact.subject_id,
        format_time(artifact.duration())
    );
    let playing = at.and_then(|offset| artifact.segment_at(offset));
    for (index, segment) in artifact.segments.iter().enumerate() {
        let marker = if playing == Some(index) { "> " } else { "" };
        let _ = writeln!(out, "{marker}[{}] {}", format_time(segment.start), segment.text);
    }

    out.push_str("\nSummary\n");
    match &artifact.summary {
        None => out.push_str("Summary not available.\n"),
        Some(summary) if summary.blocks().is_empty() => {
            let _ = writeln!(out, "{}", summary.formatted_text);
        }
        Some(summary) => {
            for block in summary.blocks() {
                match block {
                    SummarySection::Header { content, level } => {
                        let hashes = "#".repeat(usize::from((*level).clamp(1, 6)));
                        let _ = writeln!(out, "{hashes} {content}");
                    }
                    SummarySection::Paragraph { content } => {
                        let _ = writeln!(out, "{content}");
                    }
                    SummarySection::List { items } => {
                        for item in items {
                            let _ = writeln!(out, "- {item}");
                        }
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use recap_core::{Segment, SubjectId, Summary};

    fn artifact() -> Artifact {
        Artifact::new(
            SubjectId::parse("abc12345678").unwrap(),
            "Talk",
            vec![Segment::new("hello", 0.0, 2.0), Segment::new("later", 75.4, 3.0)],
        )
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["recap", "read", "https://youtu.be/abc12345678", "--store", "/tmp/s.json"]);
        assert_eq!(cli.store.as_deref(), Some(Path::new("/tmp/s.json")));
        assert!(matches!(
            cli.command,
            Command::Read { ref url, html: None, at: None } if url.contains("youtu.be")
        ));
    }

    #[test]
    fn read_accepts_playback_offset() {
        let cli = Cli::parse_from(["recap", "read", "https://youtu.be/abc12345678", "--at", "76.5"]);
        assert!(matches!(cli.command, Command::Read { at: Some(at), .. } if (at - 76.5).abs() < f64::EPSILON));
    }

    #[test]
    fn renders_transcript_lines_with_timestamps() {
        let out = render_artifact(&artifact(), None);
        assert!(out.starts_with("Talk (abc12345678)\nDuration 1:18\n"));
        assert!(out.contains("[0:00] hello"));
        assert!(out.contains("[1:15] later"));
        assert!(out.contains("Summary not available."));
        assert!(!out.contains("> "));
    }

    #[test]
    fn marks_line_playing_at_offset() {
        let out = render_artifact(&artifact(), Some(76.0));
        assert!(out.contains("\n[0:00] hello\n"));
        assert!(out.contains("\n> [1:15] later\n"));

        // Between lines nothing is marked
        let gap = render_artifact(&artifact(), Some(30.0));
        assert!(!gap.contains("> "));
    }

    #[test]
    fn renders_structured_summary() {
        let summary = Summary {
            formatted_text: "ignored".into(),
            has_formatting: true,
            sections: Some(vec![
                SummarySection::Header {
                    content: "Key points".into(),
                    level: 2,
                },
                SummarySection::List {
                    items: vec!["one".into(), "two".into()],
                },
            ]),
        };
        let out = render_artifact(&artifact().with_summary(Some(summary)), None);
        assert!(out.contains("## Key points\n- one\n- two\n"));
        assert!(!out.contains("ignored"));
    }

    #[test]
    fn renders_terminal_states() {
        let id = SubjectId::parse("abc12345678").unwrap();
        let unavailable = ReadState::Unavailable {
            subject_id: id.clone(),
            title: "T".into(),
        };
        assert!(render_state(&unavailable, None).contains("No transcript available"));
        let failed = ReadState::Failed {
            subject_id: id,
            message: "timed out".into(),
        };
        assert!(render_state(&failed, None).contains("timed out"));
        assert_eq!(render_state(&ReadState::NoSubject, None), "No video on this page.\n");
    }
}
