use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid coordinate '{field}': {value}")]
    InvalidCoordinate { field: &'static str, value: String },
}
