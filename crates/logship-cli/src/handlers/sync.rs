use anyhow::Result;
use logship_client::{CursorStore, HttpEndpoint, SyncConfig, SyncProgress, SyncService};
use logship_types::truncate;
use owo_colors::OwoColorize;
use std::path::Path;

/// Stall reasons can embed whole server error chains; keep one line.
const REASON_MAX_LEN: usize = 120;

pub fn handle(data_dir: &Path, verbose: bool) -> Result<()> {
    let config = SyncConfig::load_from(&data_dir.join("config.toml"))?;
    let cursors = CursorStore::load(&data_dir.join("cursors.toml"))?;

    let endpoint = HttpEndpoint::new(&config.endpoint, config.api_token.clone())?;
    let mut service = SyncService::new(&endpoint, config.transmit_options(), cursors);

    let summary = service.sync_all(&config.log_root, &mut |event| {
        render_progress(&event, verbose)
    })?;

    println!();
    println!(
        "{} {} message(s) across {} batch(es), {} source(s) scanned",
        "Synced".green(),
        summary.messages_sent,
        summary.batches_delivered,
        summary.sources_scanned
    );
    if summary.messages_duplicate > 0 {
        println!("  {} duplicate(s) absorbed by the server", summary.messages_duplicate);
    }
    if summary.lines_skipped > 0 {
        println!("  {} unparseable line(s) skipped", summary.lines_skipped);
    }
    if summary.sources_stalled > 0 {
        println!(
            "  {} {} source(s) stalled; re-run to retry",
            "Warning:".yellow(),
            summary.sources_stalled
        );
    }
    Ok(())
}

fn render_progress(event: &SyncProgress, verbose: bool) {
    match event {
        SyncProgress::ScanStarted { sources } => {
            println!("Scanning {} source(s)...", sources);
        }
        SyncProgress::SourceStarted {
            source_id,
            pending_lines,
        } if verbose => {
            println!("  {} {} ({} new line(s))", "->".dimmed(), source_id, pending_lines);
        }
        SyncProgress::BatchDelivered {
            source_id,
            processed,
            skipped,
        } if verbose => {
            println!(
                "     {} batch: {} processed, {} skipped",
                source_id.dimmed(),
                processed,
                skipped
            );
        }
        SyncProgress::SourceStalled { source_id, reason } => {
            println!(
                "  {} {}: {}",
                "stalled".yellow(),
                source_id,
                truncate(reason, REASON_MAX_LEN)
            );
        }
        SyncProgress::SourceCompleted {
            source_id,
            messages_sent,
            ..
        } if verbose => {
            println!("  {} {} ({} sent)", "ok".green(), source_id, messages_sent);
        }
        _ => {}
    }
}
