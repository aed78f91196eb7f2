use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("media root '{}' is missing or inaccessible", .0.display())]
    SourceUnavailable(PathBuf),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}
