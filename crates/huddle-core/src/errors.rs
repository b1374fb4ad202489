use thiserror::Error;

#[derive(Debug, Error)]
pub enum HuddleError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("settings i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
