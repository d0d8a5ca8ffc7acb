use super::transfer::{CancelToken, ItemOutcome, TransferItem, TransferResult};
use crate::error::{LotusError, Result};
use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Depth-first, pre-order copy of a file or directory subtree.
///
/// Every directory creation and every file copy yields its own item in the
/// returned [`TransferResult`]. A failing child never stops its siblings.
/// Symbolic links are followed; trees that link back into themselves are not
/// supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveCopier;

impl RecursiveCopier {
    pub fn new() -> Self {
        Self
    }

    /// Copies `source` to `destination`.
    ///
    /// For a directory source, `destination` is created; an existing empty
    /// directory is filled in place without a creation item. Files are never
    /// overwritten. `cancel` is checked before each child; children not yet
    /// visited are reported as cancelled.
    pub fn copy(&self, source: &Path, destination: &Path, cancel: &CancelToken) -> TransferResult {
        let mut result = TransferResult::new();
        if cancel.is_cancelled() {
            result.push(TransferItem::new(
                source,
                Some(destination),
                ItemOutcome::Cancelled,
            ));
            return result;
        }

        self.copy_into(source, destination, true, cancel, &mut result);
        result
    }

    fn copy_into(
        &self,
        source: &Path,
        destination: &Path,
        is_root: bool,
        cancel: &CancelToken,
        result: &mut TransferResult,
    ) {
        let metadata = match fs::metadata(source) {
            Ok(m) => m,
            Err(e) => {
                let err = LotusError::from_io(source, e);
                record(result, source, destination, Err(err));
                return;
            }
        };

        if !metadata.is_dir() {
            let outcome = copy_file(source, destination).map(|bytes| {
                debug!(
                    "copied {} -> {} ({} bytes)",
                    source.display(),
                    destination.display(),
                    bytes
                );
            });
            record(result, source, destination, outcome);
            return;
        }

        let created = if is_root && is_empty_dir(destination) {
            false
        } else if let Err(e) = fs::create_dir(destination) {
            // Nothing can be copied below a directory we could not create
            record(result, source, destination, Err(LotusError::from_io(destination, e)));
            return;
        } else {
            true
        };

        let (children, unreadable) = match sorted_children(source) {
            Ok(listing) => {
                if created {
                    record(result, source, destination, Ok(()));
                }
                listing
            }
            Err(err) => {
                record(result, source, destination, Err(err));
                return;
            }
        };
        for err in unreadable {
            record(result, source, destination, Err(err));
        }

        for (index, child) in children.iter().enumerate() {
            if cancel.is_cancelled() {
                for skipped in &children[index..] {
                    let target = destination.join(file_name_of(skipped));
                    result.push(TransferItem::new(
                        skipped,
                        Some(target.as_path()),
                        ItemOutcome::Cancelled,
                    ));
                }
                debug!("copy of {} cancelled", source.display());
                return;
            }

            let target = destination.join(file_name_of(child));
            self.copy_into(child, &target, false, cancel, result);
        }
    }
}

fn record(result: &mut TransferResult, source: &Path, destination: &Path, outcome: Result<()>) {
    let outcome = match outcome {
        Ok(()) => ItemOutcome::Succeeded,
        Err(err) => {
            warn!("copy of {} failed: {}", source.display(), err);
            ItemOutcome::Failed(err.into())
        }
    };
    result.push(TransferItem::new(source, Some(destination), outcome));
}

fn is_empty_dir(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}

fn file_name_of(path: &Path) -> &std::ffi::OsStr {
    path.file_name().unwrap_or(path.as_os_str())
}

/// Immediate children of `dir`, sorted by name for a deterministic traversal,
/// plus one error per entry that could not be read
fn sorted_children(dir: &Path) -> Result<(Vec<PathBuf>, Vec<LotusError>)> {
    let entries = fs::read_dir(dir).map_err(|e| LotusError::from_io(dir, e))?;
    Ok(split_entries(dir, entries.map(|entry| entry.map(|e| e.path()))))
}

fn split_entries<I>(dir: &Path, entries: I) -> (Vec<PathBuf>, Vec<LotusError>)
where
    I: Iterator<Item = io::Result<PathBuf>>,
{
    let mut children = Vec::new();
    let mut unreadable = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => children.push(path),
            Err(e) => unreadable.push(LotusError::from_io(dir, e)),
        }
    }
    children.sort();
    (children, unreadable)
}

/// Copies a single file's bytes and permissions, refusing to overwrite
pub(crate) fn copy_file(source: &Path, destination: &Path) -> Result<u64> {
    let mut reader = File::open(source).map_err(|e| LotusError::from_io(source, e))?;
    let permissions = reader
        .metadata()
        .map_err(|e| LotusError::from_io(source, e))?
        .permissions();

    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .map_err(|e| LotusError::from_io(destination, e))?;

    let copied = match io::copy(&mut reader, &mut writer) {
        Ok(n) => n,
        Err(e) => {
            drop(writer);
            fs::remove_file(destination).ok();
            return Err(LotusError::from_io(source, e));
        }
    };

    writer
        .set_permissions(permissions)
        .map_err(|e| LotusError::from_io(destination, e))?;
    Ok(copied)
}
