use thiserror::Error;

#[derive(Debug, Error)]
pub enum PalisadeError {
    #[error("scoring error: {0}")]
    Scoring(String),

    #[error("rate limit error: {0}")]
    RateLimit(String),

    #[error("reputation error: {0}")]
    Reputation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("gate error: {0}")]
    Gate(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PalisadeResult<T> = Result<T, PalisadeError>;
