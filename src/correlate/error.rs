use chrono::{DateTime, Utc};
use thiserror::Error;

use super::PipelineState;
use crate::elements::ElementError;
use crate::predict::PropagationError;

#[derive(Debug, Error)]
pub enum CorrelationError {
    #[error(transparent)]
    Elements(#[from] ElementError),
    #[error(transparent)]
    Propagation(#[from] PropagationError),
    #[error("unknown satellite: {name}")]
    UnknownSatellite { name: String },
    #[error("detections out of order for {satellite}: {current} precedes {previous}")]
    OrderingViolation {
        satellite: String,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
    #[error("row {row}: {message}")]
    Input { row: usize, message: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pipeline cannot run from state {0}")]
    InvalidState(PipelineState),
}
