use thiserror::Error;

pub type CohortResult<T> = Result<T, CohortError>;

#[derive(Error, Debug)]
pub enum CohortError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{builder} condition requires {requires}")]
    MissingContent {
        builder: &'static str,
        requires: &'static str,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for CohortError {
    fn from(err: config::ConfigError) -> Self {
        CohortError::Config(err.to_string())
    }
}
