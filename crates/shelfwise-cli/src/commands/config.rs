//! Config command handlers

use anyhow::{bail, Result};

use shelfwise_core::config::Config;

use crate::output::Output;

/// Show the current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load()?;

    if output.is_json() {
        println!(
            "{}",
            serde_json::json!({
                "config_file": Config::config_file_path(),
                "data_dir": config.data_dir,
                "user": config.user,
            })
        );
        return Ok(());
    }

    println!("Config file: {}", Config::config_file_path().display());
    println!("data_dir:    {}", config.data_dir.display());
    println!("user:        {}", config.user);
    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load()?;

    match key.as_str() {
        "data_dir" => config.data_dir = value.clone().into(),
        "user" => {
            if value.trim().is_empty() {
                bail!("user must not be empty");
            }
            config.user = value.clone();
        }
        other => bail!("Unknown config key '{}'. Valid keys: data_dir, user", other),
    }

    config.save()?;
    output.success(&format!("{} = {}", key, value));
    Ok(())
}
