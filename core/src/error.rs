use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuantError {
    #[error("Invalid value '{value}' for {field}")]
    InvalidInput { field: &'static str, value: String },

    #[error("Invalid {variable} distribution: min={min}, mode={mode}, max={max}")]
    InvalidDistributionParameters {
        variable: &'static str,
        min: f64,
        mode: f64,
        max: f64,
    },

    #[error("Iteration count {requested} outside [{min}, {max}]")]
    InvalidIterationCount { requested: i64, min: u32, max: u32 },

    #[error("{axis} {value} is off the risk matrix (expected 1..=5)")]
    InvalidGridPosition { axis: &'static str, value: i64 },

    #[error("Threshold scheme '{name}' not configured")]
    UnknownScheme { name: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Simulation cancelled after {completed} iterations")]
    Cancelled { completed: u32 },

    #[error("Simulation worker terminated abnormally")]
    WorkerFailed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type QuantResult<T> = Result<T, QuantError>;
