use chrono::{DateTime, Utc};

/// A culmination over a ground point with the look angles at that instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePass {
    pub time: DateTime<Utc>,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

/// Observer-relative direction to the satellite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

/// Ground location directly beneath the satellite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubSatellitePoint {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub altitude_km: f64,
}
