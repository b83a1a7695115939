use chrono::{DateTime, Duration, Utc};

use super::types::{OrbitalElementSet, SatelliteElementTimeline};

/// Move `cursor` forward while the following element set's epoch is at or
/// before `query - margin`. Never returns an index below `cursor`.
pub fn advance_cursor(
    sets: &[OrbitalElementSet],
    cursor: usize,
    query: DateTime<Utc>,
    margin: Duration,
) -> usize {
    let limit = query - margin;
    let mut idx = cursor;
    while idx + 1 < sets.len() && sets[idx + 1].epoch <= limit {
        idx += 1;
    }
    idx
}

impl SatelliteElementTimeline {
    /// Select the element set for `query`, advancing the cursor as needed.
    ///
    /// Returns the cursor index together with the set so callers can tell
    /// when the selection changed. Returns `None` only for an empty timeline.
    pub fn select(
        &mut self,
        query: DateTime<Utc>,
        margin: Duration,
    ) -> Option<(usize, &OrbitalElementSet)> {
        if self.sets.is_empty() {
            return None;
        }
        let next = advance_cursor(&self.sets, self.cursor, query, margin);
        debug_assert!(next >= self.cursor);
        if next != self.cursor {
            log::debug!(
                "satellite {}: element cursor {} -> {} (epoch {})",
                self.catalog_id,
                self.cursor,
                next,
                self.sets[next].epoch
            );
        }
        self.cursor = next;
        Some((next, &self.sets[next]))
    }
}
