//! Tabular export of a persisted progress file
//!
//! Pure read-transform-write: loads the JSON progress file and writes its
//! record sequence as CSV, one row per commit, headers taken from the
//! record's serialized field names.

use std::path::Path;
use tracing::info;

use crate::error::HarvestError;
use crate::progress::read_progress_file;

/// Convert the progress file at `progress_path` into a CSV at `out_path`
pub fn export_csv(progress_path: &Path, out_path: &Path) -> Result<(), HarvestError> {
    if !progress_path.exists() {
        return Err(HarvestError::Persistence(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("progress file {} does not exist", progress_path.display()),
        )));
    }

    let state = read_progress_file(progress_path)?;

    let mut writer = csv::Writer::from_path(out_path).map_err(into_persistence)?;
    for record in &state.commits_info {
        writer.serialize(record).map_err(into_persistence)?;
    }
    writer.flush()?;

    info!(
        records = state.commits_info.len(),
        path = %out_path.display(),
        "exported progress to CSV"
    );
    Ok(())
}

fn into_persistence(e: csv::Error) -> HarvestError {
    HarvestError::Persistence(std::io::Error::new(
        std::io::ErrorKind::Other,
        e.to_string(),
    ))
}
