use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElementError {
    #[error("element file read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid element set at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("no element sets loaded for satellite {0}")]
    UnknownSatellite(u32),
}
