use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::error::ElementError;
use super::types::{OrbitalElementSet, SatelliteElementTimeline};

const EPOCH_FIELD_END: usize = 32;

/// All element sets of a run, keyed by catalog id.
#[derive(Debug, Default)]
pub struct ElementStore {
    timelines: BTreeMap<u32, SatelliteElementTimeline>,
}

impl ElementStore {
    pub fn load(path: &Path) -> Result<Self, ElementError> {
        let content = fs::read_to_string(path)?;
        let store = Self::parse(&content)?;
        log::info!(
            "Loaded {} element sets for {} satellites from {}",
            store.set_count(),
            store.timelines.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parse consecutive non-empty line pairs.
    pub fn parse(content: &str) -> Result<Self, ElementError> {
        let mut timelines: BTreeMap<u32, SatelliteElementTimeline> = BTreeMap::new();
        let mut pending: Option<(usize, &str)> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            let number = idx + 1;
            match pending.take() {
                None => pending = Some((number, line)),
                Some((first_number, line1)) => {
                    let set = parse_pair(first_number, line1, line)?;
                    let id = set.catalog_id;
                    timelines
                        .entry(id)
                        .or_insert_with(|| SatelliteElementTimeline::new(id))
                        .sets
                        .push(set);
                }
            }
        }

        if let Some((line, _)) = pending {
            return Err(ElementError::Parse {
                line,
                message: "file ends in the middle of an element set".into(),
            });
        }

        // Stable sort keeps file order for equal epochs.
        for timeline in timelines.values_mut() {
            timeline.sets.sort_by_key(|s| s.epoch);
        }

        Ok(Self { timelines })
    }

    #[cfg(test)]
    pub fn timeline(&self, catalog_id: u32) -> Option<&SatelliteElementTimeline> {
        self.timelines.get(&catalog_id)
    }

    pub fn timelines(&self) -> impl Iterator<Item = &SatelliteElementTimeline> {
        self.timelines.values()
    }

    pub fn contains(&self, catalog_id: u32) -> bool {
        self.timelines
            .get(&catalog_id)
            .is_some_and(|t| !t.sets.is_empty())
    }

    pub fn set_count(&self) -> usize {
        self.timelines.values().map(|t| t.len()).sum()
    }

    /// Select the element set for a satellite at `query`, advancing that
    /// satellite's cursor.
    pub fn select(
        &mut self,
        catalog_id: u32,
        query: DateTime<Utc>,
        margin: Duration,
    ) -> Result<(usize, &OrbitalElementSet), ElementError> {
        self.timelines
            .get_mut(&catalog_id)
            .and_then(|t| t.select(query, margin))
            .ok_or(ElementError::UnknownSatellite(catalog_id))
    }
}

fn parse_pair(number: usize, line1: &str, line2: &str) -> Result<OrbitalElementSet, ElementError> {
    let err = |line: usize, message: &str| ElementError::Parse {
        line,
        message: message.to_string(),
    };

    if !line1.starts_with('1') {
        return Err(err(number, "expected line 1 of an element set"));
    }
    if !line2.starts_with('2') {
        return Err(err(number + 1, "expected line 2 of an element set"));
    }

    let Some(catalog_id) = parse_catalog_id(line1) else {
        return Err(err(number, "invalid catalog number"));
    };
    match parse_catalog_id(line2) {
        Some(id) if id == catalog_id => {}
        Some(id) => {
            let message = format!("catalog number {id} does not match line 1 ({catalog_id})");
            return Err(err(number + 1, &message));
        }
        None => return Err(err(number + 1, "invalid catalog number")),
    }

    let year2d: i32 = field(line1, 18, 20)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| err(number, "invalid epoch year"))?;
    let day: f64 = field(line1, 20, EPOCH_FIELD_END)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| err(number, "invalid epoch day"))?;
    let Some(epoch) = parse_epoch(year2d, day) else {
        return Err(err(number, "epoch out of range"));
    };

    Ok(OrbitalElementSet {
        catalog_id,
        epoch,
        line1: line1.to_string(),
        line2: line2.to_string(),
    })
}

/// Convert the two-digit year and fractional day-of-year of an element set.
///
/// Years 0..=56 are 2000-2056, 57..=99 are 1957-1999. Day 1.0 is January 1st, 00:00 UTC.
pub fn parse_epoch(year2d: i32, day: f64) -> Option<DateTime<Utc>> {
    if !(0..=99).contains(&year2d) || !(1.0..367.0).contains(&day) {
        return None;
    }
    let year = if year2d <= 56 { 2000 + year2d } else { 1900 + year2d };
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?
        .and_hms_opt(0, 0, 0)?
        .and_utc();
    let micros = ((day - 1.0) * 86_400_000_000.0).round() as i64;
    Some(start + Duration::microseconds(micros))
}

fn parse_catalog_id(line: &str) -> Option<u32> {
    field(line, 2, 7)?.parse().ok()
}

fn field(line: &str, start: usize, end: usize) -> Option<&str> {
    line.get(start..end)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
