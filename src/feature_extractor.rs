//! Feature extraction for demand model inference.
//!
//! Turns raw ride requests into the categorical feature space the model was
//! trained on: exact-coordinate location lookup, community area, half-hour
//! time bin and day of week. The batch is validated as a whole; a single
//! request outside the known locations fails the entire call.

use crate::error::{PredictError, Result};
use crate::lookups::{floor_to_bin, Lookups};
use crate::types::{FeatureRow, RideRequest, FEATURE_NAMES};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// Parse an ISO-8601 timestamp as wall-clock time.
///
/// A UTC designator or offset (`+02:00` or `+0200`) is accepted but not
/// applied: `14:37+02:00` yields 14:37. A bare date means midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Some(dt) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt);
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.naive_local());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Feature extractor that transforms ride requests into model input rows.
pub struct FeatureExtractor<'a> {
    lookups: &'a Lookups,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(lookups: &'a Lookups) -> Self {
        Self { lookups }
    }

    /// Extract one feature row per request, in input order.
    ///
    /// Every request is checked for the required fields before any timestamp
    /// is parsed, and every timestamp is parsed before any location is
    /// resolved, so the reported error is the earliest failing phase.
    pub fn extract(&self, requests: &[RideRequest]) -> Result<Vec<FeatureRow>> {
        let mut raw = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            raw.push((request.coordinates(index)?, request.timestamp(index)?));
        }

        let mut parsed = Vec::with_capacity(raw.len());
        for (index, (coords, timestamp)) in raw.into_iter().enumerate() {
            let when = parse_timestamp(timestamp).ok_or_else(|| PredictError::TimestampParse {
                index,
                value: timestamp.to_string(),
            })?;
            parsed.push((coords, when));
        }

        let mut resolved = Vec::with_capacity(parsed.len());
        let mut unknown: Vec<(usize, f64, f64)> = Vec::new();
        for (index, ((lat, lng), when)) in parsed.into_iter().enumerate() {
            match self.lookups.locations.get(lat, lng) {
                Some(location) => resolved.push((location, when)),
                None => unknown.push((index, lat, lng)),
            }
        }
        if let Some(&(first_index, lat, lng)) = unknown.first() {
            debug!(count = unknown.len(), first_index, "Requests outside the location vocabulary");
            return Err(PredictError::UnknownLocation {
                count: unknown.len(),
                first_index,
                lat,
                lng,
            });
        }

        let mut rows = Vec::with_capacity(resolved.len());
        for (location, when) in resolved {
            let area = self.lookups.areas.get(location).ok_or_else(|| {
                PredictError::InconsistentLookup {
                    table: "area",
                    key: location.to_string(),
                }
            })?;

            let bin_key = floor_to_bin(when.time());
            let time_bin = self.lookups.time_bins.get(bin_key).ok_or_else(|| {
                PredictError::InconsistentLookup {
                    table: "time",
                    key: bin_key.format("%H:%M:%S").to_string(),
                }
            })?;

            rows.push(FeatureRow {
                location_id: location.clone(),
                area_id: area.clone(),
                time_bin_id: time_bin.clone(),
                day_of_week: when.weekday().num_days_from_monday() as u8,
            });
        }

        debug!(rows = rows.len(), "Feature extraction complete");
        Ok(rows)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Get feature names (matching training column order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}
