mod detections;
mod output;

pub use detections::DetectionReader;
pub use output::{EnrichedWriter, OutputFormat};
