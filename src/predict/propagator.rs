use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use crate::elements::OrbitalElementSet;
use crate::predict::geometry::{ecef_to_geodetic, look_angles, teme_to_ecef_position};
use crate::predict::pass_finder::find_culminations;
use crate::predict::{GroundPoint, LookAngles, PropagationError, SubSatellitePoint};

/// Orbit-mechanics capability used by pass prediction and bearing.
///
/// Implementations may keep per-satellite state between calls; `invalidate`
/// drops whatever is held for a satellite.
pub trait Propagator {
    fn sub_satellite_point(
        &mut self,
        elements: &OrbitalElementSet,
        at: DateTime<Utc>,
    ) -> Result<SubSatellitePoint, PropagationError>;

    /// Culmination times of every pass over `ground` between `start` and `end`.
    fn culminations(
        &mut self,
        elements: &OrbitalElementSet,
        ground: &GroundPoint,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        horizon_deg: f64,
    ) -> Result<Vec<DateTime<Utc>>, PropagationError>;

    fn look_angles(
        &mut self,
        elements: &OrbitalElementSet,
        ground: &GroundPoint,
        at: DateTime<Utc>,
    ) -> Result<LookAngles, PropagationError>;

    fn invalidate(&mut self, _catalog_id: u32) {}
}

struct CachedOrbit {
    set: OrbitalElementSet,
    elements: Elements,
    constants: Constants,
}

impl CachedOrbit {
    fn build(set: &OrbitalElementSet) -> Result<Self, PropagationError> {
        let invalid = |message: String| PropagationError::InvalidElements {
            catalog_id: set.catalog_id,
            message,
        };
        let elements = Elements::from_tle(None, set.line1.as_bytes(), set.line2.as_bytes())
            .map_err(|e| invalid(e.to_string()))?;
        let constants = Constants::from_elements(&elements).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            set: set.clone(),
            elements,
            constants,
        })
    }

    fn matches(&self, set: &OrbitalElementSet) -> bool {
        self.set.same_elements(set)
    }

    fn position_ecef_km(&self, at: DateTime<Utc>) -> Result<[f64; 3], PropagationError> {
        let naive = at.naive_utc();
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&naive)
            .map_err(|e| PropagationError::Time(e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| PropagationError::Propagation(e.to_string()))?;

        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&naive));
        Ok(teme_to_ecef_position(prediction.position, sidereal))
    }

    fn look_angles(
        &self,
        ground: &GroundPoint,
        at: DateTime<Utc>,
    ) -> Result<LookAngles, PropagationError> {
        Ok(look_angles(self.position_ecef_km(at)?, ground))
    }
}

/// SGP4 propagation with the parsed orbit cached per satellite.
#[derive(Default)]
pub struct Sgp4Propagator {
    cache: HashMap<u32, CachedOrbit>,
    builds: usize,
}

impl Sgp4Propagator {
    pub fn new() -> Self {
        Self::default()
    }

    fn orbit(&mut self, set: &OrbitalElementSet) -> Result<&CachedOrbit, PropagationError> {
        let stale = self
            .cache
            .get(&set.catalog_id)
            .map_or(true, |cached| !cached.matches(set));
        if stale {
            self.builds += 1;
            log::debug!(
                "satellite {}: initialising SGP4 for epoch {} ({} orbits built)",
                set.catalog_id,
                set.epoch,
                self.builds
            );
            self.cache.insert(set.catalog_id, CachedOrbit::build(set)?);
        }
        self.cache
            .get(&set.catalog_id)
            .ok_or_else(|| PropagationError::Propagation("orbit cache miss".into()))
    }
}

impl Propagator for Sgp4Propagator {
    fn sub_satellite_point(
        &mut self,
        elements: &OrbitalElementSet,
        at: DateTime<Utc>,
    ) -> Result<SubSatellitePoint, PropagationError> {
        let orbit = self.orbit(elements)?;
        Ok(ecef_to_geodetic(orbit.position_ecef_km(at)?))
    }

    fn culminations(
        &mut self,
        elements: &OrbitalElementSet,
        ground: &GroundPoint,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        horizon_deg: f64,
    ) -> Result<Vec<DateTime<Utc>>, PropagationError> {
        let orbit = self.orbit(elements)?;
        find_culminations(
            |t| orbit.look_angles(ground, t).map(|l| l.elevation_deg),
            start,
            end,
            horizon_deg,
        )
    }

    fn look_angles(
        &mut self,
        elements: &OrbitalElementSet,
        ground: &GroundPoint,
        at: DateTime<Utc>,
    ) -> Result<LookAngles, PropagationError> {
        self.orbit(elements)?.look_angles(ground, at)
    }

    fn invalidate(&mut self, catalog_id: u32) {
        self.cache.remove(&catalog_id);
    }
}
