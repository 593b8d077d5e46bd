//! `logbard init` — write a default config file.

use logbard_config::AppConfig;

pub async fn run() -> anyhow::Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    tokio::fs::create_dir_all(&config_dir).await?;
    tokio::fs::write(&config_path, AppConfig::default_toml()).await?;

    println!("Wrote default config to {}", config_path.display());
    println!("Edit it to point at your Ollama endpoint and database path.");
    Ok(())
}
