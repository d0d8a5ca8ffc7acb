//! Runtime configuration for a browsing session
//!
//! Nothing here is persisted; a configuration lives as long as the process.

use crate::domain::navigation::NavigationController;
use crate::domain::transfer::{DeleteMode, SharedClipboard, TransferEngine};
use crate::domain::ListingOptions;
use crate::error::{LotusError, Result};
use crate::locations::Location;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Directory to start in; the home directory when unset
    pub start_dir: Option<PathBuf>,
    pub listing: ListingOptions,
    pub delete_mode: DeleteMode,
}

impl BrowserConfig {
    /// Resolve the directory a session starts in
    pub fn start_directory(&self) -> Result<PathBuf> {
        match &self.start_dir {
            Some(dir) => Ok(dir.clone()),
            None => Location::Home.path().ok_or_else(|| {
                LotusError::ConfigError("Could not determine home directory".to_string())
            }),
        }
    }

    pub fn navigation(&self) -> Result<NavigationController> {
        NavigationController::new(&self.start_directory()?)
    }

    pub fn transfer_engine(&self, clipboard: SharedClipboard) -> TransferEngine {
        TransferEngine::new(clipboard).with_delete_mode(self.delete_mode)
    }
}
