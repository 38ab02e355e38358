use formseal_session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("Invalid hash size {0}: must be a positive even number of characters")]
    InvalidHashSize(usize),

    #[error("Random source failure: {0}")]
    RandomSource(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed request parameters: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, CsrfError>;
