use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaywatchError>;

#[derive(Error, Debug)]
pub enum PaywatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}
