use aws_sdk_dynamodb::error::DisplayErrorContext;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeeError {
    #[error("datastore error: {0}")]
    Datastore(String),

    #[error("push service error: {0}")]
    Push(String),

    #[error("auth provider error: {0}")]
    Auth(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

impl FeeError {
    pub fn datastore<E: std::error::Error>(err: E) -> Self {
        FeeError::Datastore(DisplayErrorContext(err).to_string())
    }

    pub fn push<E: std::error::Error>(err: E) -> Self {
        FeeError::Push(DisplayErrorContext(err).to_string())
    }

    pub fn auth<E: std::error::Error>(err: E) -> Self {
        FeeError::Auth(DisplayErrorContext(err).to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeeError>;
