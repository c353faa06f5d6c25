use anyhow::Result;
use logship_client::{CursorStore, SyncConfig};
use logship_parser::discover_sources;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn handle(data_dir: &Path) -> Result<()> {
    let config_path = data_dir.join("config.toml");
    if !config_path.exists() {
        println!("No config found at {}", config_path.display());
        println!("Run `logship init` to get started.");
        return Ok(());
    }

    let config = SyncConfig::load_from(&config_path)?;
    let cursors = CursorStore::load(&data_dir.join("cursors.toml"))?;

    println!("{}", "Workspace".bold());
    println!("  config:   {}", config_path.display());
    println!("  log root: {}", config.log_root.display());
    println!("  endpoint: {}", config.endpoint);
    println!();

    let sources = if config.log_root.exists() {
        discover_sources(&config.log_root)?
    } else {
        Vec::new()
    };
    println!(
        "{} source(s) discovered, {} with sync state",
        sources.len(),
        cursors.len()
    );

    if !cursors.is_empty() {
        println!();
        println!("{}", "Cursors".bold());
        for (source_id, cursor) in cursors.iter() {
            let synced_at = cursor.last_synced_at.as_deref().unwrap_or("never");
            println!(
                "  {}  line {}  last synced {}",
                source_id, cursor.last_line, synced_at
            );
        }
    }
    Ok(())
}
