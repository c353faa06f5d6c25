use anyhow::Result;
use logship_server::{Database, Reclaimer};
use logship_types::OwnerId;
use owo_colors::OwoColorize;

pub fn handle(db: &Database, owner: &str, project_id: &str) -> Result<()> {
    let owner = OwnerId::new(owner);

    if db.get_project(project_id)?.is_none() {
        println!("No project with id {}", project_id);
        return Ok(());
    }

    let reclaimer = Reclaimer::new(db);
    let report = reclaimer.delete_project(&owner, project_id)?;

    println!(
        "{} project {}: {} session(s), {} message(s)",
        "Deleted".green(),
        project_id,
        report.sessions_deleted,
        report.messages_deleted
    );
    Ok(())
}
