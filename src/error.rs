use thiserror::Error;

/// Stage-level failures. Every variant is fatal to the current run; the
/// binary logs it and exits non-zero.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Script generation failed: {0}")]
    Generation(String),

    #[error("Script format invalid: {0}")]
    Format(String),

    #[error("Asset generation failed: {0}")]
    Asset(String),

    #[error("Video encode failed: {0}")]
    Encode(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Topic store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
