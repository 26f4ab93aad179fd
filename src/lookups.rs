//! Lookup tables exported by training: coordinates -> location, location -> area,
//! half-hour boundary -> time bin.
//!
//! Each table has an explicit on-disk schema and is validated when it is
//! loaded, so a malformed export surfaces as an artifact error instead of a
//! confusing failure halfway through a batch.

use crate::error::{PredictError, Result};
use crate::types::Category;
use chrono::{NaiveTime, Timelike};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Width of a time bin in minutes.
pub const BIN_MINUTES: u32 = 30;

/// Exact-match key for a coordinate pair. `-0.0` and `0.0` are the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CoordKey(u64, u64);

impl CoordKey {
    fn new(lat: f64, lng: f64) -> Self {
        // adding 0.0 turns -0.0 into 0.0
        Self((lat + 0.0).to_bits(), (lng + 0.0).to_bits())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocationEntry {
    lat: f64,
    lng: f64,
    location: Category,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AreaEntry {
    location: Category,
    area: Category,
}

/// Coordinates -> location id.
#[derive(Debug, Clone, Default)]
pub struct LocationLookup {
    map: HashMap<CoordKey, Category>,
}

impl LocationLookup {
    /// Build from `(lat, lng, location)` triples. The same pair mapped to two
    /// different locations is rejected.
    pub fn from_entries<I>(entries: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = (f64, f64, Category)>,
    {
        let mut map = HashMap::new();
        for (lat, lng, location) in entries {
            if !lat.is_finite() || !lng.is_finite() {
                return Err(format!("non-finite coordinates ({lat}, {lng})"));
            }
            if let Some(previous) = map.insert(CoordKey::new(lat, lng), location.clone()) {
                if previous != location {
                    return Err(format!(
                        "coordinates ({lat}, {lng}) map to both {previous} and {location}"
                    ));
                }
            }
        }
        Ok(Self { map })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let entries: Vec<LocationEntry> = read_json(path)?;
        if entries.is_empty() {
            return Err(PredictError::artifact(path, "location lookup is empty"));
        }
        Self::from_entries(entries.into_iter().map(|e| (e.lat, e.lng, e.location)))
            .map_err(|reason| PredictError::artifact(path, reason))
    }

    pub fn get(&self, lat: f64, lng: f64) -> Option<&Category> {
        self.map.get(&CoordKey::new(lat, lng))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Every location id this table can produce.
    pub fn location_ids(&self) -> impl Iterator<Item = &Category> {
        self.map.values()
    }
}

/// Location id -> community area id.
#[derive(Debug, Clone, Default)]
pub struct AreaLookup {
    map: HashMap<Category, Category>,
}

impl AreaLookup {
    pub fn from_entries<I>(entries: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = (Category, Category)>,
    {
        let mut map = HashMap::new();
        for (location, area) in entries {
            if let Some(previous) = map.insert(location.clone(), area.clone()) {
                if previous != area {
                    return Err(format!("location {location} maps to both {previous} and {area}"));
                }
            }
        }
        Ok(Self { map })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let entries: Vec<AreaEntry> = read_json(path)?;
        Self::from_entries(entries.into_iter().map(|e| (e.location, e.area)))
            .map_err(|reason| PredictError::artifact(path, reason))
    }

    pub fn get(&self, location: &Category) -> Option<&Category> {
        self.map.get(location)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Half-hour boundary -> time bin id.
#[derive(Debug, Clone, Default)]
pub struct TimeBinLookup {
    map: BTreeMap<NaiveTime, Category>,
}

impl TimeBinLookup {
    /// Build from boundaries; every key must sit exactly on a half hour.
    pub fn from_entries<I>(entries: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = (NaiveTime, Category)>,
    {
        let mut map = BTreeMap::new();
        for (time, bin) in entries {
            if floor_to_bin(time) != time {
                return Err(format!("{time} is not on a {BIN_MINUTES}-minute boundary"));
            }
            if let Some(previous) = map.insert(time, bin.clone()) {
                if previous != bin {
                    return Err(format!("{time} maps to both {previous} and {bin}"));
                }
            }
        }
        Ok(Self { map })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw: BTreeMap<String, Category> = read_json(path)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (key, bin) in raw {
            let time = parse_time_key(&key).ok_or_else(|| {
                PredictError::artifact(path, format!("time key {key:?} is not HH:MM[:SS]"))
            })?;
            entries.push((time, bin));
        }
        Self::from_entries(entries).map_err(|reason| PredictError::artifact(path, reason))
    }

    /// Bin for the boundary at or before `time`.
    pub fn get(&self, time: NaiveTime) -> Option<&Category> {
        self.map.get(&floor_to_bin(time))
    }

    /// Half-hour boundaries of the day that have no bin.
    pub fn missing_boundaries(&self) -> Vec<NaiveTime> {
        (0..24 * 60 / BIN_MINUTES)
            .filter_map(|i| NaiveTime::from_hms_opt(i * BIN_MINUTES / 60, i * BIN_MINUTES % 60, 0))
            .filter(|t| !self.map.contains_key(t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Floor a time of day to the nearest lower half-hour boundary.
///
/// 14:37 -> 14:30, 14:00 -> 14:00, 14:44:59.9 -> 14:30.
pub fn floor_to_bin(time: NaiveTime) -> NaiveTime {
    let minute = time.minute() - time.minute() % BIN_MINUTES;
    time.with_minute(minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

fn parse_time_key(key: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(key, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(key, "%H:%M"))
        .ok()
}

/// The three lookup tables of one run.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    pub locations: LocationLookup,
    pub areas: AreaLookup,
    pub time_bins: TimeBinLookup,
}

impl Lookups {
    pub fn new(locations: LocationLookup, areas: AreaLookup, time_bins: TimeBinLookup) -> Self {
        Self {
            locations,
            areas,
            time_bins,
        }
    }

    /// Log coverage gaps between the tables.
    ///
    /// Gaps are not load errors: they only fail a run when a record actually
    /// lands on them.
    pub fn report_coverage(&self) {
        let mut unmapped: Vec<&Category> = self
            .locations
            .location_ids()
            .filter(|id| self.areas.get(id).is_none())
            .collect();
        unmapped.sort();
        unmapped.dedup();
        if !unmapped.is_empty() {
            warn!(
                count = unmapped.len(),
                first = %unmapped[0],
                "Location ids without a community area"
            );
        }

        let missing = self.time_bins.missing_boundaries();
        if !missing.is_empty() {
            warn!(
                count = missing.len(),
                first = %missing[0],
                "Half-hour boundaries without a time bin"
            );
        }

        info!(
            locations = self.locations.len(),
            areas = self.areas.len(),
            time_bins = self.time_bins.len(),
            "Lookup tables ready"
        );
    }
}

/// Deserialize a JSON artifact, mapping every failure to an artifact error.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| PredictError::artifact(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| PredictError::artifact(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_floor_to_bin() {
        assert_eq!(floor_to_bin(hms(14, 37, 0)), hms(14, 30, 0));
        assert_eq!(floor_to_bin(hms(14, 0, 0)), hms(14, 0, 0));
        assert_eq!(floor_to_bin(hms(14, 44, 59)), hms(14, 30, 0));
        assert_eq!(floor_to_bin(hms(23, 59, 59)), hms(23, 30, 0));
        let late = NaiveTime::from_hms_milli_opt(14, 29, 59, 999).unwrap();
        assert_eq!(floor_to_bin(late), hms(14, 0, 0));
    }

    #[test]
    fn test_time_bin_lookup() {
        let bins = TimeBinLookup::from_entries([
            (hms(14, 30, 0), Category::from("tb29")),
            (hms(15, 0, 0), Category::from("tb30")),
        ])
        .unwrap();
        assert_eq!(bins.get(hms(14, 44, 59)), Some(&Category::from("tb29")));
        assert_eq!(bins.get(hms(14, 30, 0)), bins.get(hms(14, 44, 59)));
        assert_ne!(bins.get(hms(15, 0, 0)), bins.get(hms(14, 30, 0)));
        assert_eq!(bins.get(hms(13, 59, 0)), None);
        assert_eq!(bins.missing_boundaries().len(), 46);
    }

    #[test]
    fn test_time_bin_rejects_unaligned_keys() {
        let err = TimeBinLookup::from_entries([(hms(14, 15, 0), Category::Int(1))]).unwrap_err();
        assert!(err.contains("boundary"));
    }

    #[test]
    fn test_location_lookup_exact_match() {
        let locations =
            LocationLookup::from_entries([(41.88, -87.63, Category::from("loc7"))]).unwrap();
        assert_eq!(locations.get(41.88, -87.63), Some(&Category::from("loc7")));
        assert_eq!(locations.get(41.880001, -87.63), None);
        assert_eq!(locations.get(-87.63, 41.88), None);
    }

    #[test]
    fn test_negative_zero_matches_zero() {
        let locations = LocationLookup::from_entries([(0.0, -0.0, Category::Int(1))]).unwrap();
        assert_eq!(locations.get(-0.0, 0.0), Some(&Category::Int(1)));
    }

    #[test]
    fn test_conflicting_entries_are_rejected() {
        let err = LocationLookup::from_entries([
            (1.0, 2.0, Category::Int(1)),
            (1.0, 2.0, Category::Int(2)),
        ])
        .unwrap_err();
        assert!(err.contains("both"));

        // repeating an identical entry is harmless
        assert!(AreaLookup::from_entries([
            (Category::Int(1), Category::Int(5)),
            (Category::Int(1), Category::Int(5)),
        ])
        .is_ok());
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let locations = dir.path().join("locations.json");
        let area = dir.path().join("area.json");
        let time = dir.path().join("time.json");
        fs::write(&locations, r#"[{"lat": 41.88, "lng": -87.63, "location": "loc7"}]"#).unwrap();
        fs::write(&area, r#"[{"location": "loc7", "area": 12.0}]"#).unwrap();
        fs::write(&time, r#"{"14:30:00": "tb29", "15:00": "tb30"}"#).unwrap();

        let locations = LocationLookup::load(&locations).unwrap();
        let areas = AreaLookup::load(&area).unwrap();
        let bins = TimeBinLookup::load(&time).unwrap();
        assert_eq!(areas.get(&Category::from("loc7")), Some(&Category::Int(12)));
        assert_eq!(bins.get(hms(15, 10, 0)), Some(&Category::from("tb30")));
        assert_eq!(locations.len(), 1);
    }

    #[test]
    fn test_malformed_files_are_artifact_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.json");

        fs::write(&path, r#"{"41.88,-87.63": "loc7"}"#).unwrap();
        assert!(matches!(
            LocationLookup::load(&path),
            Err(PredictError::ArtifactLoad { .. })
        ));

        fs::write(&path, "[]").unwrap();
        assert!(LocationLookup::load(&path).unwrap_err().to_string().contains("empty"));

        fs::write(&path, r#"[{"lat": 1.0, "lng": 2.0, "location": 1, "extra": 0}]"#).unwrap();
        assert!(LocationLookup::load(&path).is_err());

        let time = dir.path().join("time.json");
        fs::write(&time, r#"{"noon": 1}"#).unwrap();
        assert!(TimeBinLookup::load(&time).unwrap_err().to_string().contains("noon"));

        assert!(matches!(
            AreaLookup::load(&dir.path().join("missing.json")),
            Err(PredictError::ArtifactLoad { .. })
        ));
    }
}
