//! Import, export, and bulk-clear command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use shelfwise_core::export::{backup_to_json, export_backup, export_csv, parse_backup};
use shelfwise_core::import::import_goodreads_csv;
use shelfwise_core::session::Session;

use crate::output::Output;

/// Import a Goodreads CSV export
pub async fn import_goodreads(
    session: &mut Session,
    file: PathBuf,
    output: &Output,
) -> Result<()> {
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {:?}", file))?;
    let report = import_goodreads_csv(&text, session.books())
        .context("Failed to parse Goodreads CSV")?;

    if report.books.is_empty() {
        bail!(
            "No importable books found ({} duplicates, {} invalid rows)",
            report.skipped_duplicates,
            report.skipped_invalid
        );
    }

    let count = report.books.len();
    output.message(&format!("Importing {} books...", count));
    for book in report.books {
        session.save_book(book).await?;
    }
    session.flush().await;

    output.success(&format!(
        "Imported {} books from Goodreads ({} duplicates skipped)",
        count, report.skipped_duplicates
    ));
    Ok(())
}

/// Restore a native JSON backup
pub async fn import_backup(session: &mut Session, file: PathBuf, output: &Output) -> Result<()> {
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {:?}", file))?;
    let backup = parse_backup(&text).context("Not a valid Shelfwise backup file")?;

    output.message(&format!("Importing {} books...", backup.books.len()));
    for book in backup.books {
        // Ids are kept when present so re-importing a backup is idempotent
        session.save_book(book).await?;
    }
    for collection in backup.collections {
        session.save_collection(collection).await?;
    }
    if let Some(settings) = backup.settings {
        let mut merged = session.settings().clone();
        merged.merge_json(&serde_json::to_value(&settings)?);
        session.update_settings(merged)?;
    }
    session.flush().await;

    output.success("Library restored from backup");
    Ok(())
}

/// Export the library as a native JSON backup
pub fn export_json(session: &Session, path: Option<PathBuf>, output: &Output) -> Result<()> {
    let backup = export_backup(session.books(), session.collections(), session.settings());
    let json = backup_to_json(&backup);

    match path {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
            output.success(&format!("Library exported to {:?}", path));
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Export the library as flattened CSV
pub fn export_as_csv(session: &Session, path: Option<PathBuf>, output: &Output) -> Result<()> {
    let csv = export_csv(session.books());

    match path {
        Some(path) => {
            std::fs::write(&path, csv).with_context(|| format!("Failed to write {:?}", path))?;
            output.success(&format!("Library exported to {:?}", path));
        }
        None => print!("{}", csv),
    }
    Ok(())
}

/// Delete every book and collection and reset the settings
///
/// The theme survives the reset, matching the destructive-clear flow's
/// "keep my appearance" behavior.
pub async fn clear_all(session: &mut Session, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        use std::io::{self, Write};
        println!("This permanently deletes ALL books, collections, and settings.");
        print!("Type DELETE to confirm: ");
        io::stdout().flush()?;
        let mut confirmation = String::new();
        io::stdin().read_line(&mut confirmation)?;
        if confirmation.trim() != "DELETE" {
            bail!("Aborted");
        }
    }

    let book_ids: Vec<String> = session.books().iter().map(|b| b.id.clone()).collect();
    let collection_ids: Vec<String> = session.collections().iter().map(|c| c.id.clone()).collect();

    output.message("Clearing all data...");
    for id in book_ids {
        session.delete_book(&id).await?;
    }
    for id in collection_ids {
        session.delete_collection(&id).await?;
    }

    let mut settings = shelfwise_core::models::Settings::default();
    settings.theme = session.settings().theme;
    session.update_settings(settings)?;
    session.flush().await;

    output.success("All data cleared");
    Ok(())
}
