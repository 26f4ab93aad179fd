//! Merging predictions back into the requests and writing the result

use crate::error::{PredictError, Result};
use crate::types::RideRequest;
use std::fs::{self, Permissions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Attach `demand` to every request, matched by position.
pub fn merge(mut requests: Vec<RideRequest>, demand: &[i64]) -> Result<Vec<RideRequest>> {
    if requests.len() != demand.len() {
        return Err(PredictError::RecordCountMismatch {
            records: requests.len(),
            predictions: demand.len(),
        });
    }
    for (request, &value) in requests.iter_mut().zip(demand) {
        request.set_demand(value);
    }
    Ok(requests)
}

/// Serialize records as compact JSON.
///
/// The data goes to a temporary file next to `path` that is renamed over
/// `path` only once fully written, so a failure leaves any previous output
/// untouched. A replaced file keeps its mode; a new one gets `0o644`.
pub fn write_output(path: &Path, records: &[RideRequest]) -> Result<()> {
    let fail = |reason: String| PredictError::OutputWrite {
        path: path.to_path_buf(),
        reason,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| fail(e.to_string()))?;
    if let Some(permissions) = output_permissions(path) {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| fail(e.to_string()))?;
    }
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, records).map_err(|e| fail(e.to_string()))?;
        writer.flush().map_err(|e| fail(e.to_string()))?;
    }
    tmp.persist(path).map_err(|e| fail(e.error.to_string()))?;

    info!(path = %path.display(), count = records.len(), "Output written");
    Ok(())
}

fn output_permissions(path: &Path) -> Option<Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}
