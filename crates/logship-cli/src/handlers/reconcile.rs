use anyhow::Result;
use logship_server::{Database, reconcile};
use owo_colors::OwoColorize;

pub fn handle(db: &Database, repair: bool) -> Result<()> {
    let drifts = reconcile(db, repair)?;

    if drifts.is_empty() {
        println!("{} all counters agree with recomputation", "OK".green());
        return Ok(());
    }

    for drift in &drifts {
        println!(
            "{} {} {}: count {} -> {}, cost {:.6} -> {:.6}",
            "drift".yellow(),
            drift.entity,
            drift.id,
            drift.stored_count,
            drift.actual_count,
            drift.stored_cost,
            drift.actual_cost
        );
    }
    if repair {
        println!("{} {} counter(s) repaired", "Fixed".green(), drifts.len());
    } else {
        println!("{} drifted counter(s); run with --repair to fix", drifts.len());
    }
    Ok(())
}
