use chrono::{DateTime, Duration, Utc};

use crate::elements::OrbitalElementSet;
use crate::predict::{CandidatePass, GroundPoint, PropagationError, Propagator};

const COARSE_STEP_SECONDS: i64 = 60; // 1 minute for initial scan
const FINE_STEP_SECONDS: f64 = 1.0; // 1 second for refinement
const INV_GOLDEN_RATIO: f64 = 0.618_033_988_749_894_9;

/// Elevation thresholds applied while predicting passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassCriteria {
    /// Horizon used when searching for rise and set.
    pub horizon_deg: f64,
    /// A culmination must be strictly above this to become a candidate.
    pub min_elevation_deg: f64,
}

/// Candidate passes over `ground` between `window_start` and `window_start + window`,
/// in ascending time order.
pub fn predict_passes<P: Propagator + ?Sized>(
    propagator: &mut P,
    elements: &OrbitalElementSet,
    ground: &GroundPoint,
    window_start: DateTime<Utc>,
    window: Duration,
    criteria: PassCriteria,
) -> Result<Vec<CandidatePass>, PropagationError> {
    let window_end = window_start + window;
    let times = propagator.culminations(
        elements,
        ground,
        window_start,
        window_end,
        criteria.horizon_deg,
    )?;

    let mut passes = Vec::with_capacity(times.len());
    for time in times {
        let look = propagator.look_angles(elements, ground, time)?;
        if look.elevation_deg > criteria.min_elevation_deg {
            passes.push(CandidatePass {
                time,
                azimuth_deg: look.azimuth_deg,
                elevation_deg: look.elevation_deg,
            });
        }
    }

    passes.sort_by_key(|p| p.time);
    Ok(passes)
}

/// Find all culminations of the elevation curve between `start` and `end`.
///
/// Only passes whose rise and set both fall inside the window are reported.
pub fn find_culminations<F, E>(
    mut elevation: F,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    horizon_deg: f64,
) -> Result<Vec<DateTime<Utc>>, E>
where
    F: FnMut(DateTime<Utc>) -> Result<f64, E>,
{
    let coarse_step = Duration::seconds(COARSE_STEP_SECONDS);
    let mut culminations = Vec::new();
    let mut cursor = start;
    let mut prev_visible: Option<bool> = None;
    let mut peak: Option<(DateTime<Utc>, f64)> = None;

    while cursor <= end {
        let el = elevation(cursor)?;
        let visible = el >= horizon_deg;

        match (prev_visible, visible) {
            // AOS
            (Some(false), true) => peak = Some((cursor, el)),
            (Some(true), true) => {
                if let Some((_, best)) = peak {
                    if el > best {
                        peak = Some((cursor, el));
                    }
                }
            }
            // LOS
            (Some(true), false) => {
                if let Some((best_time, _)) = peak.take() {
                    let low = (best_time - coarse_step).max(start);
                    let high = (best_time + coarse_step).min(end);
                    culminations.push(refine_culmination(&mut elevation, low, high)?);
                }
            }
            _ => {}
        }

        prev_visible = Some(visible);
        cursor += coarse_step;
    }

    Ok(culminations)
}

/// Golden-section search for the elevation maximum inside `[low, high]`.
fn refine_culmination<F, E>(
    elevation: &mut F,
    low: DateTime<Utc>,
    high: DateTime<Utc>,
) -> Result<DateTime<Utc>, E>
where
    F: FnMut(DateTime<Utc>) -> Result<f64, E>,
{
    let at = |seconds: f64| low + Duration::milliseconds((seconds * 1000.0).round() as i64);

    let mut a = 0.0;
    let mut b = (high - low).num_milliseconds() as f64 / 1000.0;
    let mut c = b - INV_GOLDEN_RATIO * (b - a);
    let mut d = a + INV_GOLDEN_RATIO * (b - a);
    let mut fc = elevation(at(c))?;
    let mut fd = elevation(at(d))?;

    while b - a > FINE_STEP_SECONDS {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_GOLDEN_RATIO * (b - a);
            fc = elevation(at(c))?;
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_GOLDEN_RATIO * (b - a);
            fd = elevation(at(d))?;
        }
    }

    Ok(at((a + b) / 2.0))
}
