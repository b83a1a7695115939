use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::correlate::{CorrelationError, HotspotDetection};

const SATELLITE: &str = "satellite";
const LONGITUDE: &str = "longitude";
const LATITUDE: &str = "latitude";
const ACQ_DATE: &str = "acq_date";
const ACQ_TIME: &str = "acq_time";

struct Columns {
    satellite: usize,
    longitude: usize,
    latitude: usize,
    acq_date: usize,
    acq_time: usize,
}

/// Reads hotspot rows (FIRMS column names) from CSV.
pub struct DetectionReader<R: Read> {
    reader: csv::Reader<R>,
    headers: csv::StringRecord,
    columns: Columns,
}

impl<R: Read> DetectionReader<R> {
    pub fn new(input: R) -> Result<Self, CorrelationError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(input);
        let headers = reader.headers()?.clone();

        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| CorrelationError::Input {
                    row: 0,
                    message: format!("missing column '{}'", name),
                })
        };
        let columns = Columns {
            satellite: find(SATELLITE)?,
            longitude: find(LONGITUDE)?,
            latitude: find(LATITUDE)?,
            acq_date: find(ACQ_DATE)?,
            acq_time: find(ACQ_TIME)?,
        };

        Ok(Self {
            reader,
            headers,
            columns,
        })
    }

    pub fn headers(&self) -> Vec<String> {
        self.headers.iter().map(String::from).collect()
    }

    /// Rows in file order. Row numbers in errors count the header as row 1.
    pub fn detections(self) -> impl Iterator<Item = Result<HotspotDetection, CorrelationError>> {
        let columns = self.columns;
        self.reader
            .into_records()
            .enumerate()
            .map(move |(idx, record)| parse_record(idx + 2, &record?, &columns))
    }
}

fn parse_record(
    row: usize,
    record: &csv::StringRecord,
    columns: &Columns,
) -> Result<HotspotDetection, CorrelationError> {
    let err = |message: String| CorrelationError::Input { row, message };
    let get = |idx: usize, name: &str| {
        record
            .get(idx)
            .map(str::trim)
            .ok_or_else(|| err(format!("missing value for '{}'", name)))
    };
    let coordinate = |idx: usize, name: &str, limit: f64| -> Result<f64, CorrelationError> {
        parse_coordinate(get(idx, name)?, name, limit).map_err(&err)
    };

    let date = get(columns.acq_date, ACQ_DATE)?;
    let time = get(columns.acq_time, ACQ_TIME)?;
    let acquired_at = parse_acquisition(date, time)
        .ok_or_else(|| err(format!("invalid acquisition time '{} {}'", date, time)))?;

    Ok(HotspotDetection {
        satellite: get(columns.satellite, SATELLITE)?.to_string(),
        longitude: coordinate(columns.longitude, LONGITUDE, 180.0)?,
        latitude: coordinate(columns.latitude, LATITUDE, 90.0)?,
        acquired_at,
        passthrough: record.iter().map(String::from).collect(),
    })
}

/// Degrees within `[-limit, limit]`; NaN and infinities are rejected.
fn parse_coordinate(raw: &str, name: &str, limit: f64) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{name} '{raw}': {e}"))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(format!("{name} '{raw}' outside [-{limit}, {limit}]"));
    }
    Ok(value)
}

/// Combine `acq_date` (`YYYY-MM-DD`) and `acq_time` (`HHMM`, `HH:MM` or `HH:MM:SS`) as UTC.
pub fn parse_acquisition(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = time.trim();
    let time = if time.contains(':') {
        NaiveTime::parse_from_str(time, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
            .ok()?
    } else {
        // FIRMS drops leading zeros, e.g. "130" for 01:30.
        let digits: u32 = time.parse().ok()?;
        NaiveTime::from_hms_opt(digits / 100, digits % 100, 0)?
    };
    Some(date.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn acquisition_time_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 4, 1, 30, 0).unwrap();
        assert_eq!(parse_acquisition("2020-01-04", "0130"), Some(expected));
        assert_eq!(parse_acquisition("2020-01-04", "130"), Some(expected));
        assert_eq!(parse_acquisition("2020-01-04", "01:30"), Some(expected));
        assert_eq!(parse_acquisition("2020-01-04", "01:30:00"), Some(expected));
        assert_eq!(parse_acquisition("2020-01-04", "2460"), None);
        assert_eq!(parse_acquisition("04/01/2020", "0130"), None);
    }

    #[test]
    fn reads_rows_and_keeps_every_column() {
        let input = "latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite\n\
                     -31.95,115.86,330.1,1.2,1.1,2020-01-04,0130,Terra\n\
                     -32.00,116.00,310.4,1.0,1.0,2020-01-04,0215,Aqua\n";
        let reader = DetectionReader::new(input.as_bytes()).unwrap();
        assert_eq!(reader.headers()[2], "brightness");

        let rows: Vec<_> = reader.detections().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].satellite, "Terra");
        assert_eq!(rows[0].longitude, 115.86);
        assert_eq!(rows[0].latitude, -31.95);
        assert_eq!(
            rows[1].acquired_at,
            Utc.with_ymd_and_hms(2020, 1, 4, 2, 15, 0).unwrap()
        );
        assert_eq!(rows[1].passthrough[2], "310.4");
        assert_eq!(rows[1].passthrough.len(), 8);
    }

    #[test]
    fn missing_column_is_rejected() {
        let input = "latitude,longitude,acq_date,acq_time\n-31,115,2020-01-04,0130\n";
        assert!(matches!(
            DetectionReader::new(input.as_bytes()),
            Err(CorrelationError::Input { row: 0, .. })
        ));
    }

    #[test]
    fn bad_value_reports_its_row() {
        let input = "satellite,longitude,latitude,acq_date,acq_time\n\
                     Terra,115.0,-31.0,2020-01-04,0130\n\
                     Terra,east,-31.0,2020-01-04,0131\n";
        let reader = DetectionReader::new(input.as_bytes()).unwrap();
        let rows: Vec<_> = reader.detections().collect();
        assert!(rows[0].is_ok());
        assert!(matches!(
            rows[1],
            Err(CorrelationError::Input { row: 3, .. })
        ));
    }

    #[test]
    fn coordinates_must_be_finite_and_on_the_globe() {
        let input = "satellite,longitude,latitude,acq_date,acq_time\n\
                     Terra,180.0,-90.0,2020-01-04,0130\n\
                     Terra,115.0,NaN,2020-01-04,0131\n\
                     Terra,115.0,200.0,2020-01-04,0132\n\
                     Terra,-180.5,-31.0,2020-01-04,0133\n\
                     Aqua,inf,-31.0,2020-01-04,0134\n";
        let reader = DetectionReader::new(input.as_bytes()).unwrap();
        let rows: Vec<_> = reader.detections().collect();
        assert_eq!(rows.len(), 5);

        let edge = rows[0].as_ref().unwrap();
        assert_eq!((edge.longitude, edge.latitude), (180.0, -90.0));
        for (idx, result) in rows.iter().enumerate().skip(1) {
            let Err(CorrelationError::Input { row, .. }) = result else {
                panic!("row {} was accepted", idx + 2);
            };
            assert_eq!(*row, idx + 2);
        }
    }
}
