use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data for {context}: need {required} bars, have {available}")]
    InsufficientData {
        context: String,
        required: usize,
        available: usize,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    pub fn insufficient(context: impl Into<String>, required: usize, available: usize) -> Self {
        AnalysisError::InsufficientData {
            context: context.into(),
            required,
            available,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
