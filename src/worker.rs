//! Background execution of transfer operations with cancellable handles

use crate::domain::transfer::{CancelToken, TransferEngine, TransferResult};
use crate::error::{LotusError, Result};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Mutex};

type DestinationLocks = Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>;

/// Pending result of an operation submitted to a [`TransferWorker`]
#[derive(Debug)]
pub struct TransferHandle {
    cancel: CancelToken,
    receiver: Option<oneshot::Receiver<Result<TransferResult>>>,
}

impl TransferHandle {
    /// Asks the operation to stop before its next item
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Non-blocking poll. Returns the result once, when the operation finishes.
    pub fn try_result(&mut self) -> Option<Result<TransferResult>> {
        let receiver = self.receiver.as_mut()?;
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(worker_gone()),
        };
        self.receiver = None;
        Some(result)
    }

    /// Waits for the operation to finish
    pub async fn wait(mut self) -> Result<TransferResult> {
        match self.receiver.take() {
            Some(receiver) => receiver.await.unwrap_or_else(|_| Err(worker_gone())),
            None => Err(worker_gone()),
        }
    }
}

fn worker_gone() -> LotusError {
    LotusError::Io {
        path: PathBuf::new(),
        source: io::Error::other("Transfer worker shut down"),
    }
}

/// Runs filesystem-touching operations on the blocking pool so the caller
/// never waits on I/O.
///
/// Pastes into the same destination directory run one after another; pastes
/// into different directories run concurrently.
#[derive(Clone)]
pub struct TransferWorker {
    engine: TransferEngine,
    runtime: Handle,
    destination_locks: DestinationLocks,
}

impl TransferWorker {
    /// Creates a worker on the current tokio runtime.
    ///
    /// Panics when called outside a runtime, like `tokio::spawn`.
    pub fn new(engine: TransferEngine) -> Self {
        Self::with_handle(engine, Handle::current())
    }

    pub fn with_handle(engine: TransferEngine, runtime: Handle) -> Self {
        Self {
            engine,
            runtime,
            destination_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    pub fn paste(&self, destination_dir: &Path) -> TransferHandle {
        let (tx, handle) = Self::channel();
        let cancel = handle.cancel_token();
        let engine = self.engine.clone();
        let locks = Arc::clone(&self.destination_locks);
        let destination = destination_dir.to_path_buf();

        self.runtime.spawn(async move {
            let key = fs::canonicalize(&destination).unwrap_or_else(|_| destination.clone());
            let lock = {
                let mut locks = locks.lock().await;
                Arc::clone(locks.entry(key).or_default())
            };

            let result = {
                let _guard = lock.lock().await;
                debug!("paste into {} started", destination.display());
                let dest = destination.clone();
                run_blocking(move || engine.paste(&dest, &cancel), &destination).await
            };

            drop(lock);
            locks
                .lock()
                .await
                .retain(|_, lock| Arc::strong_count(lock) > 1);

            let _ = tx.send(result);
        });

        handle
    }

    pub fn delete_entries(&self, paths: Vec<PathBuf>) -> TransferHandle {
        let (tx, handle) = Self::channel();
        let cancel = handle.cancel_token();
        let engine = self.engine.clone();

        self.runtime.spawn(async move {
            let label = paths.first().cloned().unwrap_or_default();
            let result =
                run_blocking(move || Ok(engine.delete_entries(&paths, &cancel)), &label).await;
            let _ = tx.send(result);
        });

        handle
    }

    pub fn rename_entry(&self, path: &Path, new_name: &str) -> TransferHandle {
        let (tx, handle) = Self::channel();
        let engine = self.engine.clone();
        let path = path.to_path_buf();
        let new_name = new_name.to_string();

        self.runtime.spawn(async move {
            let target = path.clone();
            let result = run_blocking(move || engine.rename_entry(&target, &new_name), &path).await;
            let _ = tx.send(result);
        });

        handle
    }

    fn channel() -> (oneshot::Sender<Result<TransferResult>>, TransferHandle) {
        let (tx, rx) = oneshot::channel();
        let handle = TransferHandle {
            cancel: CancelToken::new(),
            receiver: Some(rx),
        };
        (tx, handle)
    }
}

async fn run_blocking<F>(operation: F, path: &Path) -> Result<TransferResult>
where
    F: FnOnce() -> Result<TransferResult> + Send + 'static,
{
    match tokio::task::spawn_blocking(operation).await {
        Ok(result) => result,
        Err(e) => Err(LotusError::Io {
            path: path.to_path_buf(),
            source: io::Error::other(format!("Task panicked: {}", e)),
        }),
    }
}
