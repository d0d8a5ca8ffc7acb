//! Lotus - navigation and file transfer engine for a file browser
//!
//! This crate provides directory listing, back/forward navigation history,
//! and clipboard-driven copy, move, delete and rename operations that report
//! a per-item outcome. Long-running transfers run on a [`TransferWorker`] and
//! can be cancelled cooperatively.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod file_opener;
pub mod locations;
pub mod worker;

// Re-export primary types for convenience
pub use config::BrowserConfig;
pub use domain::navigation::{Activation, NavigationController};
pub use domain::transfer::{
    CancelToken, ClipboardState, DeleteMode, ItemOutcome, SharedClipboard, TransferEngine,
    TransferItem, TransferMode, TransferResult,
};
pub use domain::{DirectoryListing, FileSystemEntry, ListingOptions, SortBy};
pub use error::{ErrorKind, FailureReason, LotusError, Result};
pub use file_opener::open_file;
pub use locations::Location;
pub use worker::{TransferHandle, TransferWorker};
