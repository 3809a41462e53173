//! Sensor hub payload types and parsers.
//!
//! The hub answers `/latest/{device}` with either a reading object
//! (`{"temperature", "moisture", "CO2", "TVOC", ...}`) or a no-data body
//! (`{"error": "..."}`). History comes in two shapes: one object per
//! sample, or a CSV-style table of a header row followed by string rows.
//! Everything here normalizes into [`SensorReading`].

use chrono::{DateTime, NaiveDateTime, Utc};
use compost_core::reading::SensorReading;
use compost_core::types::{DeviceId, Timestamp};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use validator::Validate;

use crate::source::{FetchError, LatestReading};

/// Timestamp layout the hub writes into its CSV store.
pub const HUB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column order of the hub's CSV store, used when a table arrives without
/// its header row.
const TABLE_COLUMNS: [&str; 5] = ["timestamp", "temperature", "moisture", "CO2", "TVOC"];

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// A single reading as the hub serializes it.
///
/// Measurements may arrive as JSON numbers or as numeric strings (the hub's
/// CSV store keeps everything as text).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReadingPayload {
    #[serde(deserialize_with = "measurement")]
    pub temperature: f64,
    #[serde(deserialize_with = "measurement")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub moisture: f64,
    #[serde(rename = "CO2", alias = "co2", deserialize_with = "measurement")]
    pub co2: f64,
    #[serde(rename = "TVOC", alias = "tvoc", deserialize_with = "measurement")]
    pub tvoc: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub chi: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub aeration: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Body of `GET /latest/{device}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LatestPayload {
    NoData { error: String },
    Reading(ReadingPayload),
}

/// Body of `GET /data` / `GET /history`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HistoryPayload {
    NoData { error: String },
    /// One JSON object per sample.
    Rows(Vec<Map<String, Value>>),
    /// Header row (optional) followed by positional rows.
    Table(Vec<Vec<Value>>),
}

impl ReadingPayload {
    /// Validate and convert into a reading for `device_id`.
    ///
    /// `now` stamps payloads that carry no timestamp of their own.
    pub fn into_reading(self, device_id: &str, now: Timestamp) -> Result<SensorReading, FetchError> {
        self.validate()
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        if ![self.temperature, self.moisture, self.co2, self.tvoc]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(FetchError::Malformed(
                "measurements must be finite numbers".to_string(),
            ));
        }

        if let Some(tagged) = self.device_id.as_deref() {
            if tagged != device_id {
                return Err(FetchError::Malformed(format!(
                    "payload tagged for device {tagged}, expected {device_id}"
                )));
            }
        }

        let timestamp = match self.timestamp.as_deref() {
            Some(raw) => parse_timestamp(raw).ok_or_else(|| {
                FetchError::Malformed(format!("unrecognised timestamp {raw:?}"))
            })?,
            None => now,
        };

        Ok(SensorReading {
            device_id: device_id.to_string(),
            temperature: self.temperature,
            moisture: self.moisture,
            co2: self.co2,
            tvoc: self.tvoc,
            chi: self.chi,
            aeration: self.aeration,
            timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// Parse a `/latest/{device}` body.
pub fn parse_latest(text: &str, device_id: &str, now: Timestamp) -> Result<LatestReading, FetchError> {
    let payload: LatestPayload =
        serde_json::from_str(text).map_err(|e| FetchError::Malformed(e.to_string()))?;

    match payload {
        LatestPayload::NoData { error } => Ok(LatestReading::NoData(error)),
        LatestPayload::Reading(reading) => {
            Ok(LatestReading::Reading(reading.into_reading(device_id, now)?))
        }
    }
}

/// Parse a `/devices` body.
pub fn parse_devices(text: &str) -> Result<Vec<DeviceId>, FetchError> {
    serde_json::from_str(text).map_err(|e| FetchError::Malformed(e.to_string()))
}

/// Parse a history body in either wire shape.
///
/// A no-data body yields an empty history. Individual rows that fail to
/// parse are logged and skipped; a table header missing a required column
/// fails the whole payload.
pub fn parse_history(
    text: &str,
    device_id: &str,
    now: Timestamp,
) -> Result<Vec<SensorReading>, FetchError> {
    let payload: HistoryPayload =
        serde_json::from_str(text).map_err(|e| FetchError::Malformed(e.to_string()))?;

    match payload {
        HistoryPayload::NoData { error } => {
            tracing::debug!(device_id, reason = %error, "No history for device");
            Ok(Vec::new())
        }
        HistoryPayload::Rows(rows) => Ok(rows
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let parsed = serde_json::from_value::<ReadingPayload>(Value::Object(row))
                    .map_err(|e| FetchError::Malformed(e.to_string()))
                    .and_then(|payload| payload.into_reading(device_id, now));
                skip_bad_row(device_id, index, parsed)
            })
            .collect()),
        HistoryPayload::Table(rows) => table_readings(rows, device_id),
    }
}

/// Parse a hub timestamp: RFC 3339, or the CSV store's naive layout
/// (interpreted as UTC).
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, HUB_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

// ---- private helpers ----

fn table_readings(rows: Vec<Vec<Value>>, device_id: &str) -> Result<Vec<SensorReading>, FetchError> {
    let mut rows = rows.into_iter().peekable();

    // The hub trims the table to its last rows, which drops the header
    // once the store grows past that window.
    let columns = match rows.peek() {
        None => return Ok(Vec::new()),
        Some(first) if is_header(first) => {
            let header = rows.next().unwrap_or_default();
            column_indices(&header)?
        }
        Some(_) => [0, 1, 2, 3, 4],
    };

    Ok(rows
        .enumerate()
        .filter_map(|(index, row)| {
            skip_bad_row(device_id, index, table_row(&row, &columns, device_id))
        })
        .collect())
}

fn is_header(row: &[Value]) -> bool {
    row.iter()
        .filter_map(Value::as_str)
        .any(|cell| cell.eq_ignore_ascii_case("temperature"))
}

fn column_indices(header: &[Value]) -> Result<[usize; 5], FetchError> {
    let mut indices = [0; 5];
    for (slot, name) in indices.iter_mut().zip(TABLE_COLUMNS) {
        *slot = header
            .iter()
            .position(|cell| cell.as_str().is_some_and(|c| c.trim().eq_ignore_ascii_case(name)))
            .ok_or_else(|| {
                FetchError::Malformed(format!("history header is missing column {name}"))
            })?;
    }
    Ok(indices)
}

fn table_row(row: &[Value], columns: &[usize; 5], device_id: &str) -> Result<SensorReading, FetchError> {
    let cell = |i: usize| {
        row.get(columns[i]).ok_or_else(|| {
            FetchError::Malformed(format!("row is missing column {}", TABLE_COLUMNS[i]))
        })
    };
    let number = |i: usize| -> Result<f64, FetchError> {
        let value = cell(i)?;
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| {
                FetchError::Malformed(format!("{} is not a number: {value}", TABLE_COLUMNS[i]))
            })
    };

    let raw_timestamp = cell(0)?;
    let timestamp = raw_timestamp
        .as_str()
        .and_then(parse_timestamp)
        .ok_or_else(|| FetchError::Malformed(format!("unrecognised timestamp {raw_timestamp}")))?;

    Ok(SensorReading::new(
        device_id,
        number(1)?,
        number(2)?,
        number(3)?,
        number(4)?,
        timestamp,
    ))
}

fn skip_bad_row(
    device_id: &str,
    index: usize,
    parsed: Result<SensorReading, FetchError>,
) -> Option<SensorReading> {
    match parsed {
        Ok(reading) => Some(reading),
        Err(e) => {
            tracing::warn!(device_id, row = index, error = %e, "Skipping malformed history row");
            None
        }
    }
}

/// Accept a measurement as a JSON number or a numeric string.
fn measurement<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("not a number: {s:?}"))),
    }
}
