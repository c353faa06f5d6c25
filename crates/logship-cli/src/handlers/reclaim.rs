use anyhow::Result;
use logship_server::{Database, RateLimiter, Reclaimer};
use owo_colors::OwoColorize;

/// Usage records older than this no longer affect any quota window, and
/// batch tokens this old can no longer be replayed by a live retry loop.
const USAGE_RETENTION_HOURS: i64 = 48;

pub fn handle(db: &Database) -> Result<()> {
    let reclaimer = Reclaimer::new(db);

    let resumed = reclaimer.resume_pending()?;
    if resumed > 0 {
        println!("Resumed {} interrupted deletion(s)", resumed);
    }

    let report = reclaimer.sweep_orphans()?;
    println!(
        "{} {} orphan session(s), {} orphan message(s)",
        "Removed".green(),
        report.orphan_sessions_removed,
        report.orphan_messages_removed
    );
    if report.failures > 0 {
        println!(
            "  {} {} record(s) could not be removed; re-run to retry",
            "Warning:".yellow(),
            report.failures
        );
    }

    let pruned = RateLimiter::new(db).prune(USAGE_RETENTION_HOURS)?;
    if pruned > 0 {
        println!("Pruned {} aged usage record(s)", pruned);
    }

    let tokens = reclaimer.prune_batch_ledger(USAGE_RETENTION_HOURS)?;
    if tokens > 0 {
        println!("Pruned {} aged batch token(s)", tokens);
    }

    db.vacuum()?;
    Ok(())
}
