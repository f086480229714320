use crate::utils::error::{Result, ShippingError};
use std::fs;
use std::path::Path;

/// Creates `dir` and any missing parents. Succeeds when the directory is
/// already there, whether fully or partly created before.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(dir).map_err(|e| ShippingError::LogIoFailure {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;
    tracing::debug!("Created directory {}", dir.display());
    Ok(())
}
