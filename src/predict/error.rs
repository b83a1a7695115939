use thiserror::Error;

#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("invalid elements for satellite {catalog_id}: {message}")]
    InvalidElements { catalog_id: u32, message: String },
    #[error("propagation error: {0}")]
    Propagation(String),
    #[error("time out of range for element set: {0}")]
    Time(String),
}
