use chrono::{DateTime, Utc};

/// One two-line element set as read from the element file.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalElementSet {
    pub catalog_id: u32,
    pub epoch: DateTime<Utc>,
    pub line1: String,
    pub line2: String,
}

impl OrbitalElementSet {
    /// True when both sets carry the same orbital data.
    pub fn same_elements(&self, other: &OrbitalElementSet) -> bool {
        self.line1 == other.line1 && self.line2 == other.line2
    }
}

/// Element sets of a single satellite in epoch order, with the selection cursor.
///
/// The cursor only ever moves forward during a run.
#[derive(Debug, Clone)]
pub struct SatelliteElementTimeline {
    pub(super) catalog_id: u32,
    pub(super) sets: Vec<OrbitalElementSet>,
    pub(super) cursor: usize,
}

impl SatelliteElementTimeline {
    pub fn new(catalog_id: u32) -> Self {
        Self {
            catalog_id,
            sets: Vec::new(),
            cursor: 0,
        }
    }

    pub fn catalog_id(&self) -> u32 {
        self.catalog_id
    }

    #[cfg(test)]
    pub fn sets(&self) -> &[OrbitalElementSet] {
        &self.sets
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn first_epoch(&self) -> Option<DateTime<Utc>> {
        self.sets.first().map(|s| s.epoch)
    }

    pub fn last_epoch(&self) -> Option<DateTime<Utc>> {
        self.sets.last().map(|s| s.epoch)
    }
}
