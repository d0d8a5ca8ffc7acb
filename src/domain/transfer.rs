use super::copier::RecursiveCopier;
use crate::error::{ErrorKind, FailureReason, LotusError, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Whether a paste duplicates or relocates the clipboard entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    #[default]
    Copy,
    Cut,
}

/// How [`TransferEngine::delete_entries`] disposes of entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// Move to the desktop trash
    #[default]
    Trash,
    /// Remove from disk
    Permanent,
}

/// Paths staged for the next paste. `mode` is meaningless while `entries` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardState {
    entries: Vec<PathBuf>,
    mode: TransferMode,
}

impl ClipboardState {
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Clipboard shared by every engine built from the same handle.
///
/// There is no process-wide clipboard: callers create one and inject it.
#[derive(Debug, Clone, Default)]
pub struct SharedClipboard {
    state: Arc<Mutex<ClipboardState>>,
}

impl SharedClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ClipboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ClipboardState {
        self.lock().clone()
    }

    fn replace(&self, state: ClipboardState) {
        *self.lock() = state;
    }

    pub fn clear(&self) {
        *self.lock() = ClipboardState::default();
    }

    /// Clears the clipboard unless it was replaced since `expected` was taken
    fn clear_if_unchanged(&self, expected: &ClipboardState) -> bool {
        let mut guard = self.lock();
        if *guard == *expected {
            *guard = ClipboardState::default();
            true
        } else {
            false
        }
    }
}

/// Cooperative cancellation flag checked between items
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    #[cfg(test)]
    checks_left: Option<Arc<AtomicUsize>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        #[cfg(test)]
        if let Some(left) = &self.checks_left {
            if left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
            {
                self.cancel();
            }
        }
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Token that trips itself on the check after the first `checks` ones
    #[cfg(test)]
    pub(crate) fn cancel_after(checks: usize) -> Self {
        Self {
            checks_left: Some(Arc::new(AtomicUsize::new(checks))),
            ..Self::default()
        }
    }
}

/// Outcome of a single item in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded,
    Failed(FailureReason),
    Cancelled,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded)
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            ItemOutcome::Failed(reason) => Some(reason.kind),
            _ => None,
        }
    }

    fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => ItemOutcome::Succeeded,
            Err(err) => ItemOutcome::Failed(err.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferItem {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl TransferItem {
    pub fn new(source: &Path, destination: Option<&Path>, outcome: ItemOutcome) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.map(Path::to_path_buf),
            outcome,
        }
    }
}

/// One outcome per requested item, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    pub items: Vec<TransferItem>,
}

impl TransferResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: TransferItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(|i| i.outcome.is_success())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &TransferItem> {
        self.items.iter().filter(|i| i.outcome.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TransferItem> {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Failed(_)))
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &TransferItem> {
        self.items
            .iter()
            .filter(|i| i.outcome == ItemOutcome::Cancelled)
    }

    /// Folds every item into one outcome: the first failure wins, then
    /// cancellation, otherwise success
    pub fn aggregate(&self) -> ItemOutcome {
        if let Some(item) = self.failed().next() {
            return item.outcome.clone();
        }
        if self.cancelled().next().is_some() {
            return ItemOutcome::Cancelled;
        }
        ItemOutcome::Succeeded
    }

    fn cancel_remaining(&mut self, remaining: &[PathBuf]) {
        for path in remaining {
            self.push(TransferItem::new(path, None, ItemOutcome::Cancelled));
        }
    }
}

/// Clipboard-driven copy/cut/paste plus delete and rename.
///
/// Cloning an engine shares its clipboard.
#[derive(Debug, Clone, Default)]
pub struct TransferEngine {
    clipboard: SharedClipboard,
    copier: RecursiveCopier,
    delete_mode: DeleteMode,
}

impl TransferEngine {
    pub fn new(clipboard: SharedClipboard) -> Self {
        Self {
            clipboard,
            copier: RecursiveCopier::new(),
            delete_mode: DeleteMode::default(),
        }
    }

    pub fn with_delete_mode(mut self, delete_mode: DeleteMode) -> Self {
        self.delete_mode = delete_mode;
        self
    }

    pub fn delete_mode(&self) -> DeleteMode {
        self.delete_mode
    }

    /// Current clipboard contents, `None` when nothing is staged
    pub fn clipboard(&self) -> Option<ClipboardState> {
        let snapshot = self.clipboard.snapshot();
        (!snapshot.is_empty()).then_some(snapshot)
    }

    pub fn clear_clipboard(&self) {
        self.clipboard.clear();
    }

    /// Stages `paths` for the next paste, replacing any previous clipboard.
    ///
    /// Every path must be absolute and exist, otherwise fails with `NotFound`
    /// and the clipboard keeps its previous contents. Duplicates are collapsed.
    pub fn set_clipboard<I, P>(&self, paths: I, mode: TransferMode) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for path in paths {
            let path = path.as_ref();
            if !path.is_absolute() || fs::symlink_metadata(path).is_err() {
                return Err(LotusError::NotFound(path.to_path_buf()));
            }
            if seen.insert(path.to_path_buf()) {
                entries.push(path.to_path_buf());
            }
        }

        if entries.is_empty() {
            return Err(LotusError::EmptyClipboard);
        }

        debug!("clipboard set to {} item(s) ({:?})", entries.len(), mode);
        self.clipboard.replace(ClipboardState { entries, mode });
        Ok(())
    }

    /// Pastes the clipboard into `destination_dir`.
    ///
    /// Each entry lands at `destination_dir/<name>`. An existing entry there is
    /// never overwritten: that item fails with `AlreadyExists`. A cut paste
    /// clears the clipboard afterwards whatever the item outcomes, unless it
    /// was replaced meanwhile; a copy paste keeps it for repeated pastes.
    pub fn paste(&self, destination_dir: &Path, cancel: &CancelToken) -> Result<TransferResult> {
        if !destination_dir.is_dir() {
            return Err(LotusError::NotADirectory(destination_dir.to_path_buf()));
        }

        let snapshot = self.clipboard.snapshot();
        if snapshot.is_empty() {
            return Err(LotusError::EmptyClipboard);
        }

        let mut result = TransferResult::new();
        for (index, source) in snapshot.entries().iter().enumerate() {
            if cancel.is_cancelled() {
                result.cancel_remaining(&snapshot.entries()[index..]);
                break;
            }

            let item = match source.file_name() {
                Some(name) => {
                    let destination = destination_dir.join(name);
                    let outcome = self.paste_one(source, &destination, snapshot.mode(), cancel);
                    TransferItem::new(source, Some(destination.as_path()), outcome)
                }
                None => TransferItem::new(
                    source,
                    None,
                    ItemOutcome::Failed(
                        LotusError::InvalidName(source.display().to_string()).into(),
                    ),
                ),
            };
            if let ItemOutcome::Failed(reason) = &item.outcome {
                warn!("paste of {} failed: {}", source.display(), reason);
            }
            result.push(item);
        }

        if snapshot.mode() == TransferMode::Cut && !self.clipboard.clear_if_unchanged(&snapshot) {
            debug!("clipboard replaced during paste; keeping the newer contents");
        }

        info!(
            "pasted into {}: {} succeeded, {} failed, {} cancelled",
            destination_dir.display(),
            result.succeeded().count(),
            result.failed().count(),
            result.cancelled().count()
        );
        Ok(result)
    }

    fn paste_one(
        &self,
        source: &Path,
        destination: &Path,
        mode: TransferMode,
        cancel: &CancelToken,
    ) -> ItemOutcome {
        let metadata = match fs::symlink_metadata(source) {
            Ok(m) => m,
            Err(e) => return ItemOutcome::Failed(LotusError::from_io(source, e).into()),
        };

        if fs::symlink_metadata(destination).is_ok() {
            return ItemOutcome::Failed(LotusError::AlreadyExists(destination.to_path_buf()).into());
        }

        // A copy follows a link to a directory; a move relocates the link itself
        let is_dir = match mode {
            TransferMode::Copy => fs::metadata(source).map(|m| m.is_dir()).unwrap_or(false),
            TransferMode::Cut => metadata.is_dir(),
        };
        if is_dir && is_nested(source, destination) {
            return ItemOutcome::Failed(LotusError::NestedDestination(source.to_path_buf()).into());
        }

        match mode {
            TransferMode::Copy => self.copier.copy(source, destination, cancel).aggregate(),
            TransferMode::Cut => self.move_entry(source, destination, cancel),
        }
    }

    fn move_entry(&self, source: &Path, destination: &Path, cancel: &CancelToken) -> ItemOutcome {
        match fs::rename(source, destination) {
            Ok(()) => {
                debug!("moved {} -> {}", source.display(), destination.display());
                ItemOutcome::Succeeded
            }
            Err(e) if is_cross_device(&e) => {
                self.move_across_devices(source, destination, cancel)
            }
            Err(e) => ItemOutcome::Failed(LotusError::from_io(source, e).into()),
        }
    }

    /// Copy-then-delete fallback for moves between volumes
    pub(crate) fn move_across_devices(
        &self,
        source: &Path,
        destination: &Path,
        cancel: &CancelToken,
    ) -> ItemOutcome {
        if fs::symlink_metadata(source).is_ok_and(|m| m.file_type().is_symlink()) {
            return relink(source, destination);
        }

        debug!(
            "moving {} -> {} by copy and delete",
            source.display(),
            destination.display()
        );
        let copied = self.copier.copy(source, destination, cancel);
        let created_destination = copied
            .items
            .first()
            .is_some_and(|item| item.outcome.is_success());

        match copied.aggregate() {
            ItemOutcome::Succeeded => match remove_path(source) {
                Ok(()) => ItemOutcome::Succeeded,
                Err(err) => ItemOutcome::Failed(
                    LotusError::CrossDeviceMove {
                        path: source.to_path_buf(),
                        reason: format!("copied, but the source could not be removed: {}", err),
                    }
                    .into(),
                ),
            },
            outcome => {
                // Roll back the partial copy; the source stays where it was
                if created_destination {
                    remove_path(destination).ok();
                }
                match outcome {
                    ItemOutcome::Failed(reason) => ItemOutcome::Failed(
                        LotusError::CrossDeviceMove {
                            path: source.to_path_buf(),
                            reason: reason.message,
                        }
                        .into(),
                    ),
                    other => other,
                }
            }
        }
    }

    /// Deletes each path independently; a failing item never stops the batch
    pub fn delete_entries(&self, paths: &[PathBuf], cancel: &CancelToken) -> TransferResult {
        let mut result = TransferResult::new();

        for (index, path) in paths.iter().enumerate() {
            if cancel.is_cancelled() {
                result.cancel_remaining(&paths[index..]);
                break;
            }

            let outcome = match fs::symlink_metadata(path) {
                Err(e) => Err(LotusError::from_io(path, e)),
                Ok(_) => match self.delete_mode {
                    DeleteMode::Trash => trash::delete(path).map_err(|e| LotusError::Trash {
                        path: path.clone(),
                        message: e.to_string(),
                    }),
                    DeleteMode::Permanent => remove_path(path),
                },
            };

            match &outcome {
                Ok(()) => debug!("deleted {} ({:?})", path.display(), self.delete_mode),
                Err(err) => warn!("delete of {} failed: {}", path.display(), err),
            }
            result.push(TransferItem::new(path, None, ItemOutcome::from_result(outcome)));
        }

        info!(
            "deleted {} of {} item(s)",
            result.succeeded().count(),
            paths.len()
        );
        result
    }

    /// Renames `path` within its parent directory.
    ///
    /// Fails with `InvalidName` when `new_name` is empty, equals the current
    /// name, or is not a single path component, and with `AlreadyExists` when a
    /// sibling already uses the name.
    pub fn rename_entry(&self, path: &Path, new_name: &str) -> Result<TransferResult> {
        validate_name(new_name)?;

        fs::symlink_metadata(path).map_err(|e| LotusError::from_io(path, e))?;

        let current_name = path
            .file_name()
            .ok_or_else(|| LotusError::InvalidName(path.display().to_string()))?;
        if current_name == new_name {
            return Err(LotusError::InvalidName(new_name.to_string()));
        }

        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        let target = parent.join(new_name);
        if fs::symlink_metadata(&target).is_ok() && !is_case_only_rename(path, &target) {
            return Err(LotusError::AlreadyExists(target));
        }

        let outcome = fs::rename(path, &target).map_err(|e| LotusError::from_io(path, e));
        match &outcome {
            Ok(()) => info!("renamed {} -> {}", path.display(), target.display()),
            Err(err) => warn!("rename of {} failed: {}", path.display(), err),
        }

        let mut result = TransferResult::new();
        result.push(TransferItem::new(
            path,
            Some(target.as_path()),
            ItemOutcome::from_result(outcome),
        ));
        Ok(result)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let has_separator = name.chars().any(std::path::is_separator);
    if name.is_empty() || name == "." || name == ".." || has_separator {
        return Err(LotusError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// `to` differs from `from` only by letter case and names the very same entry,
/// as on a case-insensitive volume. Links are not followed.
fn is_case_only_rename(from: &Path, to: &Path) -> bool {
    let (Some(a), Some(b)) = (
        from.file_name().and_then(|n| n.to_str()),
        to.file_name().and_then(|n| n.to_str()),
    ) else {
        return false;
    };
    a.to_lowercase() == b.to_lowercase() && same_entry(from, to)
}

#[cfg(unix)]
fn same_entry(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::symlink_metadata(a), fs::symlink_metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_entry(a: &Path, b: &Path) -> bool {
    let parent = |p: &Path| p.parent().and_then(|d| fs::canonicalize(d).ok());
    fs::symlink_metadata(a).is_ok() && parent(a).is_some() && parent(a) == parent(b)
}

/// Re-creates the link `source` at `destination`, then removes `source`.
/// Relative link targets are kept verbatim.
fn relink(source: &Path, destination: &Path) -> ItemOutcome {
    let created = fs::read_link(source)
        .map_err(|e| LotusError::from_io(source, e))
        .and_then(|target| {
            create_symlink(&target, source, destination)
                .map_err(|e| LotusError::from_io(destination, e))
        });
    let outcome = created.and_then(|()| {
        remove_link(source).map_err(|e| {
            remove_link(destination).ok();
            LotusError::from_io(source, e)
        })
    });

    match outcome {
        Ok(()) => {
            debug!("relinked {} -> {}", source.display(), destination.display());
            ItemOutcome::Succeeded
        }
        Err(err) => ItemOutcome::Failed(
            LotusError::CrossDeviceMove {
                path: source.to_path_buf(),
                reason: err.to_string(),
            }
            .into(),
        ),
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, _source: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, source: &Path, link: &Path) -> io::Result<()> {
    if fs::metadata(source).is_ok_and(|m| m.is_dir()) {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _source: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}

fn remove_link(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if cfg!(windows) => fs::remove_dir(path).map_err(|_| e),
        other => other,
    }
}

/// `destination` lies inside the directory `source`
fn is_nested(source: &Path, destination: &Path) -> bool {
    let Some(parent) = destination.parent() else {
        return false;
    };
    match (fs::canonicalize(source), fs::canonicalize(parent)) {
        (Ok(source), Ok(parent)) => parent.starts_with(source),
        _ => destination.starts_with(source),
    }
}

fn remove_path(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| LotusError::from_io(path, e))?;
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| LotusError::from_io(path, e))
}

fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}
