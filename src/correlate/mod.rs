mod bearing;
mod error;
mod matcher;
mod pipeline;
mod types;

pub use error::CorrelationError;
pub use pipeline::{CorrelationPipeline, PipelineSettings, PipelineState};
pub use types::{
    Correlation, EnrichedDetection, HotspotDetection, NearestPass, OnUnknownSatellite, RunSummary,
    SatelliteCatalog, SoftWarning,
};
