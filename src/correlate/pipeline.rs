use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use super::bearing::ground_track_bearing;
use super::matcher::match_passes;
use super::{
    Correlation, CorrelationError, EnrichedDetection, HotspotDetection, NearestPass,
    OnUnknownSatellite, RunSummary, SatelliteCatalog, SoftWarning,
};
use crate::elements::ElementStore;
use crate::predict::{predict_passes, GroundPoint, PassCriteria, Propagator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum PipelineState {
    Idle,
    Streaming,
    Draining,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// An element set stays selected until its successor is this old.
    pub element_margin: Duration,
    /// Passes are predicted from `t - half_width` to `t + half_width`.
    pub window_half_width: Duration,
    pub criteria: PassCriteria,
    pub offset_warning: Duration,
    pub ground_altitude_m: f64,
    pub on_unknown_satellite: OnUnknownSatellite,
    pub limit: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            element_margin: Duration::hours(12),
            window_half_width: Duration::hours(24),
            criteria: PassCriteria {
                horizon_deg: 0.0,
                min_elevation_deg: 20.0,
            },
            offset_warning: Duration::seconds(600),
            ground_altitude_m: 0.0,
            on_unknown_satellite: OnUnknownSatellite::Abort,
            limit: None,
        }
    }
}

struct SatelliteProgress {
    last_seen: DateTime<Utc>,
    element_index: usize,
}

/// Correlates a stream of detections with the passes that observed them.
///
/// Detections of one satellite must arrive in non-decreasing time order;
/// different satellites may interleave. A detection older than the previous
/// one of the same satellite aborts the run.
pub struct CorrelationPipeline<P: Propagator> {
    store: ElementStore,
    catalog: SatelliteCatalog,
    propagator: P,
    settings: PipelineSettings,
    state: PipelineState,
    progress: HashMap<u32, SatelliteProgress>,
    skipped_satellites: HashSet<String>,
    summary: RunSummary,
}

impl<P: Propagator> CorrelationPipeline<P> {
    pub fn new(
        store: ElementStore,
        catalog: SatelliteCatalog,
        propagator: P,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            propagator,
            settings,
            state: PipelineState::Idle,
            progress: HashMap::new(),
            skipped_satellites: HashSet::new(),
            summary: RunSummary::default(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[cfg(test)]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    #[cfg(test)]
    pub fn propagator(&self) -> &P {
        &self.propagator
    }

    /// Drive the whole stream, handing every correlation to `emit`.
    ///
    /// Stops early once `limit` detections have been processed. Any error
    /// from the input, the pipeline or `emit` ends the run.
    pub fn run<I, F>(&mut self, detections: I, mut emit: F) -> Result<RunSummary, CorrelationError>
    where
        I: IntoIterator<Item = Result<HotspotDetection, CorrelationError>>,
        F: FnMut(Correlation) -> Result<(), CorrelationError>,
    {
        if self.state != PipelineState::Idle {
            return Err(CorrelationError::InvalidState(self.state));
        }
        self.state = PipelineState::Streaming;

        let result = self.stream(detections, &mut emit);
        self.state = PipelineState::Draining;
        if result.is_ok() {
            self.log_summary();
        }
        self.state = PipelineState::Done;

        result.map(|_| self.summary.clone())
    }

    fn stream<I, F>(&mut self, detections: I, emit: &mut F) -> Result<(), CorrelationError>
    where
        I: IntoIterator<Item = Result<HotspotDetection, CorrelationError>>,
        F: FnMut(Correlation) -> Result<(), CorrelationError>,
    {
        let mut detections = detections.into_iter();
        loop {
            if let Some(limit) = self.settings.limit {
                if self.summary.processed >= limit {
                    log::info!("Row limit of {} reached", limit);
                    return Ok(());
                }
            }
            let Some(detection) = detections.next() else {
                return Ok(());
            };
            if let Some(correlation) = self.process(detection?)? {
                let d = &correlation.record.detection;
                for warning in &correlation.warnings {
                    log::warn!(
                        "{} at {} ({}, {}): {}",
                        d.satellite,
                        d.acquired_at,
                        d.longitude,
                        d.latitude,
                        warning
                    );
                }
                emit(correlation)?;
                self.summary.emitted += 1;
            }
        }
    }

    /// Correlate a single detection. Returns `None` when the detection's
    /// satellite is being skipped.
    pub fn process(
        &mut self,
        detection: HotspotDetection,
    ) -> Result<Option<Correlation>, CorrelationError> {
        self.summary.processed += 1;

        let Some(catalog_id) = self.resolve(&detection.satellite)? else {
            self.summary.skipped += 1;
            return Ok(None);
        };

        let when = detection.acquired_at;
        if let Some(progress) = self.progress.get(&catalog_id) {
            if when < progress.last_seen {
                return Err(CorrelationError::OrderingViolation {
                    satellite: detection.satellite.clone(),
                    previous: progress.last_seen,
                    current: when,
                });
            }
        }

        let (element_index, elements) = self
            .store
            .select(catalog_id, when, self.settings.element_margin)?;

        let switched = self
            .progress
            .get(&catalog_id)
            .is_some_and(|p| p.element_index != element_index);
        if switched {
            log::debug!(
                "{}: switching to element set with epoch {}",
                detection.satellite,
                elements.epoch
            );
            self.propagator.invalidate(catalog_id);
        }
        self.progress.insert(
            catalog_id,
            SatelliteProgress {
                last_seen: when,
                element_index,
            },
        );

        let ground = GroundPoint::new(
            detection.longitude,
            detection.latitude,
            self.settings.ground_altitude_m,
        );
        let half_width = self.settings.window_half_width;
        let candidates = predict_passes(
            &mut self.propagator,
            elements,
            &ground,
            when - half_width,
            half_width * 2,
            self.settings.criteria,
        )?;

        let matched = match_passes(when, &candidates);
        let mut warnings = Vec::new();

        let pass = match matched.nearest {
            None => {
                self.summary.no_candidate_warnings += 1;
                warnings.push(SoftWarning::NoCandidatePasses);
                None
            }
            Some(nearest) => {
                let offset_seconds = nearest.offset_seconds();
                if nearest.offset.abs() > self.settings.offset_warning {
                    self.summary.large_offset_warnings += 1;
                    warnings.push(SoftWarning::LargeOffset { offset_seconds });
                }

                let bearing_deg =
                    ground_track_bearing(&mut self.propagator, elements, nearest.pass.time)?;

                let elevation = nearest.pass.elevation_deg;
                let lowest = self.summary.min_elevation_deg.unwrap_or(elevation);
                self.summary.min_elevation_deg = Some(lowest.min(elevation));

                Some(NearestPass {
                    time: nearest.pass.time,
                    azimuth_deg: nearest.pass.azimuth_deg,
                    elevation_deg: elevation,
                    bearing_deg,
                    offset_seconds,
                })
            }
        };

        Ok(Some(Correlation {
            record: EnrichedDetection {
                detection,
                pass,
                previous: matched.previous,
                next: matched.next,
            },
            warnings,
        }))
    }

    /// Catalog id for a detection's satellite, or `None` if it is skipped.
    fn resolve(&mut self, satellite: &str) -> Result<Option<u32>, CorrelationError> {
        let known = self
            .catalog
            .resolve(satellite)
            .filter(|id| self.store.contains(*id));
        match (known, self.settings.on_unknown_satellite) {
            (Some(id), _) => Ok(Some(id)),
            (None, OnUnknownSatellite::Abort) => Err(CorrelationError::UnknownSatellite {
                name: satellite.to_string(),
            }),
            (None, OnUnknownSatellite::Skip) => {
                if self.skipped_satellites.insert(satellite.to_string()) {
                    log::warn!("Skipping detections of unknown satellite {}", satellite);
                }
                Ok(None)
            }
        }
    }

    fn log_summary(&self) {
        let s = &self.summary;
        log::info!(
            "{} detections: {} emitted, {} skipped, {} without passes, {} with large offsets",
            s.processed,
            s.emitted,
            s.skipped,
            s.no_candidate_warnings,
            s.large_offset_warnings
        );
        if let Some(min) = s.min_elevation_deg {
            log::info!("Minimum elevation observed: {:.2}deg", min);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::OrbitalElementSet;
    use crate::predict::{LookAngles, PropagationError, SubSatellitePoint};
    use chrono::TimeZone;

    /// Fixed passes, a northbound ground track, and a record of what was asked.
    #[derive(Default)]
    struct Fixture {
        passes: Vec<(DateTime<Utc>, f64, f64)>,
        epochs_used: Vec<DateTime<Utc>>,
        invalidated: Vec<u32>,
    }

    impl Propagator for Fixture {
        fn sub_satellite_point(
            &mut self,
            _elements: &OrbitalElementSet,
            at: DateTime<Utc>,
        ) -> Result<SubSatellitePoint, PropagationError> {
            let origin = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
            let seconds = (at - origin).num_seconds();
            Ok(SubSatellitePoint {
                longitude_deg: 116.0,
                latitude_deg: -80.0 + 1e-4 * seconds as f64,
                altitude_km: 705.0,
            })
        }

        fn culminations(
            &mut self,
            elements: &OrbitalElementSet,
            _ground: &GroundPoint,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            _horizon_deg: f64,
        ) -> Result<Vec<DateTime<Utc>>, PropagationError> {
            self.epochs_used.push(elements.epoch);
            Ok(self
                .passes
                .iter()
                .map(|p| p.0)
                .filter(|t| *t >= start && *t <= end)
                .collect())
        }

        fn look_angles(
            &mut self,
            _elements: &OrbitalElementSet,
            _ground: &GroundPoint,
            at: DateTime<Utc>,
        ) -> Result<LookAngles, PropagationError> {
            self.passes
                .iter()
                .find(|p| p.0 == at)
                .map(|p| LookAngles {
                    azimuth_deg: p.1,
                    elevation_deg: p.2,
                })
                .ok_or_else(|| PropagationError::Propagation("no fixture".into()))
        }

        fn invalidate(&mut self, catalog_id: u32) {
            self.invalidated.push(catalog_id);
        }
    }

    const LINE1_TAIL: &str = ".00000000  .00000054  00000-0  22077-4 0  9991";
    const LINE2_TAIL: &str = "98.2058  75.5306 0001165  96.1380 263.9955 14.57112134 69350";

    fn at(day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, day, hour, min, sec).unwrap()
    }

    fn element_lines(catalog_id: u32, day_of_year: u32) -> String {
        let line1 = format!("1 {catalog_id:05}U 99068A   20{day_of_year:03}{LINE1_TAIL}");
        let line2 = format!("2 {catalog_id:05}  {LINE2_TAIL}");
        format!("{line1}\n{line2}\n")
    }

    fn store(sets: &[(u32, u32)]) -> ElementStore {
        let content: String = sets
            .iter()
            .map(|(id, day)| element_lines(*id, *day))
            .collect();
        ElementStore::parse(&content).unwrap()
    }

    fn catalog() -> SatelliteCatalog {
        [("Terra".to_string(), 25994), ("Aqua".to_string(), 27424)]
            .into_iter()
            .collect()
    }

    fn detection(satellite: &str, when: DateTime<Utc>) -> HotspotDetection {
        HotspotDetection {
            satellite: satellite.to_string(),
            longitude: 116.0,
            latitude: -31.0,
            acquired_at: when,
            passthrough: vec![satellite.to_string(), when.to_rfc3339()],
        }
    }

    fn pipeline(fixture: Fixture, settings: PipelineSettings) -> CorrelationPipeline<Fixture> {
        CorrelationPipeline::new(
            store(&[(25994, 1), (25994, 2), (27424, 1)]),
            catalog(),
            fixture,
            settings,
        )
    }

    fn run_all(
        pipeline: &mut CorrelationPipeline<Fixture>,
        detections: Vec<HotspotDetection>,
    ) -> Result<(Vec<Correlation>, RunSummary), CorrelationError> {
        let mut out = Vec::new();
        let summary = pipeline.run(detections.into_iter().map(Ok), |c| {
            out.push(c);
            Ok(())
        })?;
        Ok((out, summary))
    }

    #[test]
    fn selects_element_set_preceding_query_by_margin() {
        let mut p = pipeline(Fixture::default(), PipelineSettings::default());
        p.process(detection("Terra", at(1, 18, 0, 0))).unwrap();
        assert_eq!(p.propagator().epochs_used, vec![at(1, 0, 0, 0)]);

        p.process(detection("Terra", at(2, 12, 0, 0))).unwrap();
        assert_eq!(p.propagator().epochs_used[1], at(2, 0, 0, 0));
        assert_eq!(p.propagator().invalidated, vec![25994]);
    }

    #[test]
    fn nearest_pass_with_neighbours_and_no_warning() {
        let detected = at(1, 12, 0, 0);
        let fixture = Fixture {
            passes: vec![
                (detected - Duration::hours(12), 100.0, 30.0),
                (detected + Duration::seconds(3), 200.0, 45.0),
                (detected + Duration::hours(12), 300.0, 25.0),
            ],
            ..Fixture::default()
        };
        let mut p = pipeline(fixture, PipelineSettings::default());
        let c = p.process(detection("Terra", detected)).unwrap().unwrap();

        assert!(c.warnings.is_empty());
        let pass = c.record.pass.unwrap();
        assert_eq!(pass.time, detected + Duration::seconds(3));
        assert_eq!(pass.azimuth_deg, 200.0);
        assert_eq!(pass.elevation_deg, 45.0);
        assert_eq!(pass.offset_seconds, 3.0);
        assert!(pass.bearing_deg.abs() < 1e-6);
        assert_eq!(c.record.previous.unwrap().azimuth_deg, 100.0);
        assert_eq!(c.record.next.unwrap().elevation_deg, 25.0);
    }

    #[test]
    fn no_qualifying_pass_emits_empty_fields_and_one_warning() {
        let detected = at(1, 12, 0, 0);
        let fixture = Fixture {
            passes: vec![(detected + Duration::seconds(40), 10.0, 12.0)],
            ..Fixture::default()
        };
        let mut p = pipeline(fixture, PipelineSettings::default());
        let detections = vec![detection("Terra", detected)];
        let (out, summary) = run_all(&mut p, detections).unwrap();

        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_eq!(c.warnings, vec![SoftWarning::NoCandidatePasses]);
        assert!(c.record.pass.is_none());
        assert!(c.record.previous.is_none());
        assert!(c.record.next.is_none());
        assert_eq!(summary.no_candidate_warnings, 1);
        assert_eq!(summary.large_offset_warnings, 0);
        assert_eq!(summary.min_elevation_deg, None);
    }

    #[test]
    fn large_offset_is_a_soft_warning() {
        let detected = at(1, 12, 0, 0);
        let fixture = Fixture {
            passes: vec![(detected - Duration::seconds(601), 10.0, 50.0)],
            ..Fixture::default()
        };
        let mut p = pipeline(fixture, PipelineSettings::default());
        let c = p.process(detection("Terra", detected)).unwrap().unwrap();
        let expected = SoftWarning::LargeOffset {
            offset_seconds: -601.0,
        };
        assert_eq!(c.warnings, vec![expected]);
        assert!(c.record.pass.is_some());
    }

    #[test]
    fn out_of_order_detection_aborts_the_run() {
        let mut p = pipeline(Fixture::default(), PipelineSettings::default());
        let result = run_all(
            &mut p,
            vec![
                detection("Terra", at(1, 12, 0, 0)),
                detection("Aqua", at(1, 6, 0, 0)),
                detection("Terra", at(1, 11, 59, 59)),
            ],
        );
        assert!(matches!(
            result,
            Err(CorrelationError::OrderingViolation { ref satellite, .. }) if satellite == "Terra"
        ));
        assert_eq!(p.state(), PipelineState::Done);
        assert_eq!(p.summary().emitted, 2);
    }

    #[test]
    fn equal_timestamps_are_in_order() {
        let mut p = pipeline(Fixture::default(), PipelineSettings::default());
        let (out, _) = run_all(
            &mut p,
            vec![
                detection("Terra", at(1, 12, 0, 0)),
                detection("Terra", at(1, 12, 0, 0)),
            ],
        )
        .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn unknown_satellite_aborts_by_default() {
        let mut p = pipeline(Fixture::default(), PipelineSettings::default());
        let result = run_all(&mut p, vec![detection("N", at(1, 12, 0, 0))]);
        assert!(matches!(
            result,
            Err(CorrelationError::UnknownSatellite { ref name }) if name == "N"
        ));
    }

    #[test]
    fn unknown_satellite_can_be_skipped() {
        let settings = PipelineSettings {
            on_unknown_satellite: OnUnknownSatellite::Skip,
            ..PipelineSettings::default()
        };
        let mut p = pipeline(Fixture::default(), settings);
        let (out, summary) = run_all(
            &mut p,
            vec![
                detection("N", at(1, 12, 0, 0)),
                detection("Terra", at(1, 12, 0, 0)),
                detection("N", at(1, 13, 0, 0)),
            ],
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].record.detection.satellite, "Terra");
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.processed, 3);
    }

    #[test]
    fn limit_stops_the_stream_early() {
        let settings = PipelineSettings {
            limit: Some(2),
            ..PipelineSettings::default()
        };
        let mut p = pipeline(Fixture::default(), settings);
        let mut pulled = 0;
        let detections = (0..5).map(|h| {
            pulled += 1;
            Ok(detection("Terra", at(1, h, 0, 0)))
        });
        let summary = p.run(detections, |_| Ok(())).unwrap();
        assert_eq!(summary.emitted, 2);
        assert_eq!(pulled, 2);
        assert_eq!(p.state(), PipelineState::Done);
    }

    #[test]
    fn pipeline_runs_only_once() {
        let mut p = pipeline(Fixture::default(), PipelineSettings::default());
        run_all(&mut p, Vec::new()).unwrap();
        assert!(matches!(
            run_all(&mut p, Vec::new()),
            Err(CorrelationError::InvalidState(PipelineState::Done))
        ));
    }

    #[test]
    fn rerunning_yields_identical_output() {
        let fixture = || Fixture {
            passes: vec![
                (at(1, 3, 0, 0), 80.0, 35.0),
                (at(1, 14, 0, 0), 260.0, 70.0),
                (at(2, 2, 0, 0), 90.0, 22.0),
            ],
            ..Fixture::default()
        };
        let detections = || {
            vec![
                detection("Terra", at(1, 3, 1, 0)),
                detection("Aqua", at(1, 5, 0, 0)),
                detection("Terra", at(1, 13, 58, 0)),
            ]
        };
        let mut once = pipeline(fixture(), PipelineSettings::default());
        let mut again = pipeline(fixture(), PipelineSettings::default());
        let first = run_all(&mut once, detections()).unwrap();
        let second = run_all(&mut again, detections()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.1.min_elevation_deg, Some(35.0));
    }
}
