use crate::config::Config;
use crate::error::BotError;
use std::path::Path;
use tokio::fs;
use tracing::info;

pub async fn ensure_directories(cfg: &Config) -> Result<(), BotError> {
    let dir = Path::new(&cfg.history_dir);
    if !dir.exists() {
        fs::create_dir_all(dir).await?;
        info!("Created directory: {}", dir.display());
    }
    Ok(())
}

pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
