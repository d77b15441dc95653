//! Collection command handlers

use anyhow::{bail, Result};

use shelfwise_core::models::Collection;
use shelfwise_core::session::Session;

use crate::output::Output;

/// Create a new collection
pub async fn create(
    session: &mut Session,
    name: String,
    emoji: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut collection = Collection::new(name.trim());
    if let Some(emoji) = emoji {
        collection = collection.with_emoji(emoji);
    }
    let id = collection.id.clone();
    let name = collection.name.clone();

    session.save_collection(collection).await?;
    session.flush().await;

    if output.is_quiet() {
        println!("{}", id);
    } else {
        output.success(&format!("Collection \"{}\" created", name));
    }
    Ok(())
}

/// List collections with their book counts
pub fn list(session: &Session, output: &Output) -> Result<()> {
    let collections = session.collections();
    let counts: Vec<usize> = collections
        .iter()
        .map(|collection| {
            session
                .books()
                .iter()
                .filter(|b| b.collections.contains(&collection.id))
                .count()
        })
        .collect();
    output.print_collections(collections, &counts);
    Ok(())
}

/// Delete a collection
///
/// Books referencing it keep the dangling id; renderers filter it out.
pub async fn delete(session: &mut Session, id: String, output: &Output) -> Result<()> {
    let collection = resolve(session, &id)?;
    let name = collection.name.clone();
    let collection_id = collection.id.clone();

    session.delete_collection(&collection_id).await?;
    session.flush().await;
    output.success(&format!("Collection \"{}\" deleted", name));
    Ok(())
}

/// Resolve a collection by exact id, id prefix, or name
fn resolve<'a>(session: &'a Session, id: &str) -> Result<&'a Collection> {
    let collections = session.collections();
    if let Some(collection) = collections.iter().find(|c| c.id == id) {
        return Ok(collection);
    }
    let matches: Vec<&Collection> = collections
        .iter()
        .filter(|c| c.id.starts_with(id) || c.name.eq_ignore_ascii_case(id))
        .collect();
    match matches.len() {
        1 => Ok(matches[0]),
        0 => bail!("No collection matching '{}'", id),
        n => bail!("'{}' is ambiguous ({} matches)", id, n),
    }
}
