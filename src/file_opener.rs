//! Hands files to the platform's default application

use crate::error::{LotusError, Result};
use log::debug;
use std::path::Path;

/// Opens `path` with the application registered for its type.
///
/// Fails with `NotFound` if the path does not exist.
pub fn open_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(LotusError::NotFound(path.to_path_buf()));
    }

    debug!("opening {} with the default application", path.display());
    open::that(path).map_err(|e| LotusError::from_io(path, e))
}
