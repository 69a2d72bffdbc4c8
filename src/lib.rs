pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod init;
pub mod pipeline;
pub mod platform;
pub mod script;
pub mod topics;
pub mod video;

pub use error::BotError;
