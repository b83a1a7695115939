use chrono::{DateTime, Duration, Utc};

use crate::predict::CandidatePass;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestCandidate {
    pub index: usize,
    pub pass: CandidatePass,
    /// Pass time minus detection time.
    pub offset: Duration,
}

impl NearestCandidate {
    pub fn offset_seconds(&self) -> f64 {
        self.offset.num_milliseconds() as f64 / 1000.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassMatch {
    pub nearest: Option<NearestCandidate>,
    pub previous: Option<CandidatePass>,
    pub next: Option<CandidatePass>,
}

/// Pick the candidate closest in time to `detection_time` together with its
/// neighbours in `candidates`, which must be in ascending time order.
///
/// Equal absolute offsets resolve to the earlier candidate.
pub fn match_passes(detection_time: DateTime<Utc>, candidates: &[CandidatePass]) -> PassMatch {
    let mut best: Option<(usize, Duration)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let offset = candidate.time - detection_time;
        match best {
            Some((_, least)) if offset.abs() >= least.abs() => {}
            _ => best = Some((idx, offset)),
        }
    }

    let Some((index, offset)) = best else {
        return PassMatch::default();
    };

    PassMatch {
        nearest: Some(NearestCandidate {
            index,
            pass: candidates[index],
            offset,
        }),
        previous: index.checked_sub(1).map(|i| candidates[i]),
        next: candidates.get(index + 1).copied(),
    }
}
