//! User settings command handlers
//!
//! Settings writes hit the local cache synchronously; the remote write is
//! debounced inside the session, so these handlers flush before returning.

use anyhow::Result;

use shelfwise_core::models::Theme;
use shelfwise_core::session::Session;

use crate::output::Output;

/// Set the annual reading goal
pub async fn set_goal(session: &mut Session, goal: u32, output: &Output) -> Result<()> {
    session.set_goal(goal)?;
    let year = session.settings().goal_year;
    session.flush().await;
    output.success(&format!("Goal set: {} books in {}", goal, year));
    Ok(())
}

/// Set the color theme
pub async fn set_theme(session: &mut Session, theme: Theme, output: &Output) -> Result<()> {
    session.set_theme(theme)?;
    session.flush().await;
    output.success(&format!("Theme set to {}", theme));
    Ok(())
}

/// Set the display name
pub async fn set_display_name(session: &mut Session, name: String, output: &Output) -> Result<()> {
    let name = name.trim().to_string();
    if name.is_empty() {
        anyhow::bail!("Display name must not be empty");
    }
    session.set_display_name(name.clone())?;
    session.flush().await;
    output.success(&format!("Display name updated to \"{}\"", name));
    Ok(())
}
