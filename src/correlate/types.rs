use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::predict::CandidatePass;

/// One hotspot row. `passthrough` holds every input column, unchanged and in order.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotDetection {
    pub satellite: String,
    pub longitude: f64,
    pub latitude: f64,
    pub acquired_at: DateTime<Utc>,
    pub passthrough: Vec<String>,
}

/// The matched pass with the ground-track bearing at culmination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPass {
    pub time: DateTime<Utc>,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub bearing_deg: f64,
    /// Pass time minus detection time.
    pub offset_seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedDetection {
    pub detection: HotspotDetection,
    pub pass: Option<NearestPass>,
    pub previous: Option<CandidatePass>,
    pub next: Option<CandidatePass>,
}

/// Conditions worth reporting that do not stop the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoftWarning {
    NoCandidatePasses,
    LargeOffset { offset_seconds: f64 },
}

impl fmt::Display for SoftWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftWarning::NoCandidatePasses => write!(f, "no candidate passes"),
            SoftWarning::LargeOffset { offset_seconds } => {
                write!(f, "offset exceeds threshold: {:.1}s", offset_seconds)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub record: EnrichedDetection,
    pub warnings: Vec<SoftWarning>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnUnknownSatellite {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub processed: usize,
    pub emitted: usize,
    pub skipped: usize,
    pub no_candidate_warnings: usize,
    pub large_offset_warnings: usize,
    pub min_elevation_deg: Option<f64>,
}

/// Satellite names as they appear in detections, mapped to catalog ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SatelliteCatalog {
    names: BTreeMap<String, u32>,
}

impl SatelliteCatalog {
    pub fn new(names: BTreeMap<String, u32>) -> Self {
        Self { names }
    }

    /// Look up a name; a bare catalog number resolves to itself.
    pub fn resolve(&self, name: &str) -> Option<u32> {
        let name = name.trim();
        self.names.get(name).copied().or_else(|| name.parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.names.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, u32)> for SatelliteCatalog {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
