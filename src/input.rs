//! Reader for the input request batch

use crate::error::{PredictError, Result};
use crate::types::RideRequest;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Read a JSON array of request objects.
///
/// Syntax and I/O problems are read errors; a well-formed document with the
/// wrong shape is a schema error.
pub fn read_requests(path: &Path) -> Result<Vec<RideRequest>> {
    let file = File::open(path).map_err(|e| PredictError::InputRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let document: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| PredictError::InputRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let requests = parse_requests(document)?;
    info!(path = %path.display(), count = requests.len(), "Input records loaded");
    Ok(requests)
}

/// Split an already parsed document into requests.
pub fn parse_requests(document: Value) -> Result<Vec<RideRequest>> {
    let items = match document {
        Value::Array(items) => items,
        _ => {
            return Err(PredictError::Schema {
                index: 0,
                message: "input must be a JSON array of objects".to_string(),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(RideRequest::new(fields)),
            _ => Err(PredictError::schema(index, "record is not a JSON object")),
        })
        .collect()
}
