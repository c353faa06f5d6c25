use anyhow::Result;
use logship_client::SyncConfig;
use logship_client::config::default_log_root;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn handle(data_dir: &Path, force: bool) -> Result<()> {
    let config_path = data_dir.join("config.toml");

    if config_path.exists() && !force {
        println!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
        return Ok(());
    }

    let mut config = SyncConfig::default();
    if let Some(log_root) = default_log_root() {
        if log_root.exists() {
            println!("{} log root: {}", "Detected".green(), log_root.display());
        } else {
            println!(
                "{} default log root {} does not exist yet; edit the config if your logs live elsewhere",
                "Note:".yellow(),
                log_root.display()
            );
        }
        config.log_root = log_root;
    }

    config.save_to(&config_path)?;
    println!("{} {}", "Wrote".green(), config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set `endpoint` (and `api_token`) in the config");
    println!("  2. Run `logship sync`");
    Ok(())
}
