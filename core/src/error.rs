use thiserror::Error;

#[derive(Error, Debug)]
pub enum TowerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Fixture error: {message}")]
    Fixture { message: String },

    #[error("{parameter} = {value} is outside {min}..={max}")]
    ParameterOutOfRange {
        parameter: &'static str,
        value:     f64,
        min:       f64,
        max:       f64,
    },

    #[error("Unknown lifecycle stage '{name}'")]
    UnknownStage { name: String },

    #[error("Rule set '{id}' not found")]
    UnknownRuleSet { id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TowerResult<T> = Result<T, TowerError>;
