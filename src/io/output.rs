use std::io::Write;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde_json::{Map, Value};

use crate::correlate::{CorrelationError, EnrichedDetection};
use crate::predict::CandidatePass;

/// Columns appended to every input row, in output order.
pub const PASS_COLUMNS: [&str; 11] = [
    "pass_azimuth",
    "pass_elevation",
    "pass_bearing",
    "pass_datetime",
    "prev_azimuth",
    "prev_elevation",
    "prev_datetime",
    "next_azimuth",
    "next_elevation",
    "next_datetime",
    "pass_offset",
];

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

/// A single flattened pass field.
#[derive(Debug, Clone, PartialEq)]
enum Field {
    Angle(f64),
    Time(DateTime<Utc>),
    Seconds(f64),
}

impl Field {
    fn to_text(&self) -> String {
        match self {
            Field::Angle(v) => format!("{:.5}", v),
            Field::Time(t) => t.format(DATETIME_FORMAT).to_string(),
            Field::Seconds(v) => format!("{:.3}", v),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Field::Angle(v) | Field::Seconds(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Field::Time(t) => Value::String(t.format(DATETIME_FORMAT).to_string()),
        }
    }
}

/// Pass fields in `PASS_COLUMNS` order; absent values stay `None`.
fn pass_fields(record: &EnrichedDetection) -> [Option<Field>; 11] {
    let pass = record.pass.as_ref();
    let neighbour = |p: Option<&CandidatePass>| {
        (
            p.map(|p| Field::Angle(p.azimuth_deg)),
            p.map(|p| Field::Angle(p.elevation_deg)),
            p.map(|p| Field::Time(p.time)),
        )
    };
    let (prev_az, prev_el, prev_time) = neighbour(record.previous.as_ref());
    let (next_az, next_el, next_time) = neighbour(record.next.as_ref());

    [
        pass.map(|p| Field::Angle(p.azimuth_deg)),
        pass.map(|p| Field::Angle(p.elevation_deg)),
        pass.map(|p| Field::Angle(p.bearing_deg)),
        pass.map(|p| Field::Time(p.time)),
        prev_az,
        prev_el,
        prev_time,
        next_az,
        next_el,
        next_time,
        pass.map(|p| Field::Seconds(p.offset_seconds)),
    ]
}

/// Serialises enriched detections after the input columns.
pub enum EnrichedWriter<W: Write> {
    Csv(csv::Writer<W>),
    Jsonl { out: W, headers: Vec<String> },
}

impl<W: Write> EnrichedWriter<W> {
    pub fn new(
        out: W,
        format: OutputFormat,
        headers: Vec<String>,
    ) -> Result<Self, CorrelationError> {
        match format {
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(out);
                writer.write_record(headers.iter().map(String::as_str).chain(PASS_COLUMNS))?;
                Ok(EnrichedWriter::Csv(writer))
            }
            OutputFormat::Jsonl => Ok(EnrichedWriter::Jsonl { out, headers }),
        }
    }

    pub fn write(&mut self, record: &EnrichedDetection) -> Result<(), CorrelationError> {
        let fields = pass_fields(record);
        match self {
            EnrichedWriter::Csv(writer) => {
                let extra = fields
                    .iter()
                    .map(|f| f.as_ref().map(Field::to_text).unwrap_or_default());
                let row: Vec<String> = record
                    .detection
                    .passthrough
                    .iter()
                    .cloned()
                    .chain(extra)
                    .collect();
                writer.write_record(&row)?;
            }
            EnrichedWriter::Jsonl { out, headers } => {
                let mut object = Map::new();
                for (name, value) in headers.iter().zip(&record.detection.passthrough) {
                    object.insert(name.clone(), Value::String(value.clone()));
                }
                for (name, field) in PASS_COLUMNS.iter().zip(&fields) {
                    let value = field.as_ref().map(Field::to_json).unwrap_or(Value::Null);
                    object.insert(name.to_string(), value);
                }
                serde_json::to_writer(&mut *out, &Value::Object(object))?;
                out.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<W, CorrelationError> {
        match self {
            EnrichedWriter::Csv(writer) => writer
                .into_inner()
                .map_err(|e| CorrelationError::Io(e.into_error())),
            EnrichedWriter::Jsonl { mut out, .. } => {
                out.flush()?;
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::{HotspotDetection, NearestPass};
    use chrono::{Duration, TimeZone};

    fn record(with_pass: bool) -> EnrichedDetection {
        let t = Utc.with_ymd_and_hms(2020, 1, 4, 1, 30, 0).unwrap();
        let pass = CandidatePass {
            time: t - Duration::hours(12),
            azimuth_deg: 12.5,
            elevation_deg: 33.25,
        };
        EnrichedDetection {
            detection: HotspotDetection {
                satellite: "Terra".into(),
                longitude: 115.86,
                latitude: -31.95,
                acquired_at: t,
                passthrough: vec!["Terra".into(), "115.86".into(), "-31.95".into()],
            },
            pass: with_pass.then(|| NearestPass {
                time: t + Duration::seconds(3),
                azimuth_deg: 270.123456,
                elevation_deg: 45.0,
                bearing_deg: 192.5,
                offset_seconds: 3.0,
            }),
            previous: with_pass.then_some(pass),
            next: None,
        }
    }

    fn headers() -> Vec<String> {
        vec!["satellite".into(), "longitude".into(), "latitude".into()]
    }

    fn to_string(format: OutputFormat, records: &[EnrichedDetection]) -> String {
        let mut writer = EnrichedWriter::new(Vec::new(), format, headers()).unwrap();
        for r in records {
            writer.write(r).unwrap();
        }
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn csv_appends_pass_columns_and_leaves_absent_values_empty() {
        let text = to_string(OutputFormat::Csv, &[record(true), record(false)]);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "satellite,longitude,latitude,\
             pass_azimuth,pass_elevation,pass_bearing,pass_datetime,\
             prev_azimuth,prev_elevation,prev_datetime,\
             next_azimuth,next_elevation,next_datetime,pass_offset"
        );
        assert_eq!(
            lines[1],
            "Terra,115.86,-31.95,270.12346,45.00000,192.50000,2020-01-04 01:30:03.000,\
             12.50000,33.25000,2020-01-03 13:30:00.000,,,,3.000"
        );
        assert_eq!(lines[2], "Terra,115.86,-31.95,,,,,,,,,,,");
    }

    #[test]
    fn jsonl_uses_nulls_for_absent_values() {
        let text = to_string(OutputFormat::Jsonl, &[record(true)]);
        let value: Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["satellite"], "Terra");
        assert_eq!(value["pass_elevation"], 45.0);
        assert_eq!(value["prev_datetime"], "2020-01-03 13:30:00.000");
        assert!(value["next_azimuth"].is_null());
    }

    #[test]
    fn output_is_byte_identical_across_runs() {
        let records = [record(true), record(false), record(true)];
        assert_eq!(
            to_string(OutputFormat::Csv, &records),
            to_string(OutputFormat::Csv, &records)
        );
    }
}
