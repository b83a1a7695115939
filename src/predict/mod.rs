mod error;
mod geometry;
mod ground_point;
mod pass_finder;
mod propagator;
mod types;

pub use error::PropagationError;
pub use ground_point::GroundPoint;
pub use pass_finder::{predict_passes, PassCriteria};
pub use propagator::{Propagator, Sgp4Propagator};
pub use types::{CandidatePass, LookAngles, SubSatellitePoint};
