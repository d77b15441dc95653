//! Status command handler

use anyhow::Result;

use shelfwise_core::config::Config;
use shelfwise_core::session::Session;
use shelfwise_core::sync::SyncStatus;

use crate::output::Output;

/// Show session status: user, counts, sync state, storage paths
pub fn show(session: &Session, config: &Config, output: &Output) -> Result<()> {
    let sync = match session.status() {
        SyncStatus::Synced => "synced",
        SyncStatus::Syncing => "syncing",
        SyncStatus::Error => "error",
    };

    if output.is_json() {
        println!(
            "{}",
            serde_json::json!({
                "user": session.user(),
                "books": session.books().len(),
                "collections": session.collections().len(),
                "sync": sync,
                "data_dir": config.data_dir,
            })
        );
        return Ok(());
    }
    if output.is_quiet() {
        println!("{}", sync);
        return Ok(());
    }

    println!("User:        {}", session.user().unwrap_or("-"));
    println!("Books:       {}", session.books().len());
    println!("Collections: {}", session.collections().len());
    println!("Sync:        {}", sync);
    println!("Data dir:    {}", config.data_dir.display());
    Ok(())
}
