use ai_shorts_bot::config::Config;
use ai_shorts_bot::{init, pipeline};
use anyhow::Result;
use tracing::{error, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config.json").await?;
    init::ensure_directories(&cfg).await?;

    if !init::check_ffmpeg().await {
        warn!("FFmpeg not found in PATH. Please install FFmpeg.");
    }

    match pipeline::run_pipeline(&cfg).await {
        Ok(_) => Ok(()),
        Err(err) => {
            error!("Pipeline failed: {}", err);
            std::process::exit(1);
        }
    }
}
