use chrono::{DateTime, Duration, Utc};

use crate::elements::OrbitalElementSet;
use crate::predict::{PropagationError, Propagator, SubSatellitePoint};

/// Fixes are taken this many seconds either side of culmination.
pub const BEARING_HALF_SPAN_SECONDS: i64 = 30;

/// Direction of travel of the ground track at `culmination`, degrees in [0, 360).
pub fn ground_track_bearing<P: Propagator + ?Sized>(
    propagator: &mut P,
    elements: &OrbitalElementSet,
    culmination: DateTime<Utc>,
) -> Result<f64, PropagationError> {
    let half_span = Duration::seconds(BEARING_HALF_SPAN_SECONDS);
    let before = propagator.sub_satellite_point(elements, culmination - half_span)?;
    let after = propagator.sub_satellite_point(elements, culmination + half_span)?;
    Ok(initial_bearing(&before, &after))
}

/// Great-circle initial bearing from `from` to `to`, degrees in [0, 360).
///
/// Identical points give 0. Antipodal points have no unique great circle;
/// the result is finite but arbitrary.
pub fn initial_bearing(from: &SubSatellitePoint, to: &SubSatellitePoint) -> f64 {
    let lat1 = from.latitude_deg.to_radians();
    let lat2 = to.latitude_deg.to_radians();
    let dlon = (to.longitude_deg - from.longitude_deg).to_radians();

    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let bearing = x.atan2(y).to_degrees().rem_euclid(360.0);
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}
