//! Ride request records as read from the input batch

use crate::error::{PredictError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One input record.
///
/// Only `lat`, `lng` and `timestamp` are interpreted. Every other key is kept
/// verbatim and in its original position so the record can be written back
/// unchanged apart from the added `demand`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RideRequest {
    fields: Map<String, Value>,
}

impl RideRequest {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Pickup coordinates; `index` is the record's position in the batch, for diagnostics.
    pub fn coordinates(&self, index: usize) -> Result<(f64, f64)> {
        Ok((self.number(index, "lat")?, self.number(index, "lng")?))
    }

    /// Raw timestamp string.
    pub fn timestamp(&self, index: usize) -> Result<&str> {
        match self.fields.get("timestamp") {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(PredictError::schema(
                index,
                format!("field `timestamp` must be a string, got {}", kind(other)),
            )),
            None => Err(PredictError::schema(index, "missing field `timestamp`")),
        }
    }

    /// Set `demand`, overwriting an existing value in place.
    pub fn set_demand(&mut self, demand: i64) {
        self.fields.insert("demand".to_string(), Value::from(demand));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn number(&self, index: usize, key: &str) -> Result<f64> {
        match self.fields.get(key) {
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
                PredictError::schema(index, format!("field `{key}` is not representable as f64"))
            }),
            Some(other) => Err(PredictError::schema(
                index,
                format!("field `{key}` must be a number, got {}", kind(other)),
            )),
            None => Err(PredictError::schema(index, format!("missing field `{key}`"))),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> RideRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_fields_are_read() {
        let req = request(json!({"lat": 41.88, "lng": -87.63, "timestamp": "2024-03-04T14:37:00"}));
        assert_eq!(req.coordinates(0).unwrap(), (41.88, -87.63));
        assert_eq!(req.timestamp(0).unwrap(), "2024-03-04T14:37:00");
    }

    #[test]
    fn test_integer_coordinates_are_accepted() {
        let req = request(json!({"lat": 41, "lng": -87, "timestamp": "2024-03-04"}));
        assert_eq!(req.coordinates(0).unwrap(), (41.0, -87.0));
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        let req = request(json!({"lng": -87.63, "timestamp": "2024-03-04"}));
        let err = req.coordinates(5).unwrap_err();
        assert!(matches!(err, PredictError::Schema { index: 5, .. }));
        assert!(err.to_string().contains("`lat`"));

        let req = request(json!({"lat": "41.88", "lng": -87.63, "timestamp": 3}));
        assert!(req.coordinates(0).unwrap_err().to_string().contains("a string"));
        assert!(req.timestamp(0).unwrap_err().to_string().contains("a number"));
    }

    #[test]
    fn test_demand_keeps_key_order() {
        let mut req = request(json!({
            "id": "a",
            "demand": 9,
            "lat": 1.0,
            "lng": 2.0,
            "timestamp": "t"
        }));
        req.set_demand(4);
        let keys: Vec<&String> = req.fields().keys().collect();
        assert_eq!(keys, ["id", "demand", "lat", "lng", "timestamp"]);
        assert_eq!(req.get("demand"), Some(&json!(4)));

        let mut req = request(json!({"lat": 1.0, "lng": 2.0, "timestamp": "t"}));
        req.set_demand(-1);
        assert_eq!(req.fields().keys().last().map(String::as_str), Some("demand"));
    }
}
