//! `logbard profile` — show what Logbard knows about a player.

use crate::commands::build_engine;
use logbard_config::AppConfig;

pub async fn run(entity: String) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let engine = build_engine(config).await?;

    match engine.profiles.context_for(&entity).await? {
        Some(context) => {
            println!("{}", serde_json::to_string_pretty(&context)?);
        }
        None => {
            println!("No profile for '{entity}' yet.");
        }
    }

    Ok(())
}
