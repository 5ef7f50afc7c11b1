//! Deferred dataset results: a handle per dataset that blocks only on
//! first access, plus batch-level cancellation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::error::Error;
use crate::types::DatasetData;

pub(crate) struct HandleState {
    slot: Mutex<Option<Result<DatasetData, Error>>>,
    ready: Condvar,
}

impl HandleState {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        })
    }

    /// Deliver the result and wake any waiter.
    pub(crate) fn complete(&self, result: Result<DatasetData, Error>) {
        let mut slot = self.slot.lock().expect("promise mutex poisoned");
        *slot = Some(result);
        self.ready.notify_all();
    }
}

/// A deferred dataset result.
///
/// The worker fills the handle in the background; `join` blocks until the
/// payload is available and yields it.
pub struct DatasetHandle {
    path: String,
    state: Arc<HandleState>,
}

impl DatasetHandle {
    pub(crate) fn new(path: String) -> (Self, Arc<HandleState>) {
        let state = HandleState::new();
        (
            Self {
                path,
                state: Arc::clone(&state),
            },
            state,
        )
    }

    /// The dataset path this handle resolves.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the result has been delivered.
    pub fn is_ready(&self) -> bool {
        self.state
            .slot
            .lock()
            .expect("promise mutex poisoned")
            .is_some()
    }

    /// Block until the dataset is available and take the result.
    pub fn join(self) -> Result<DatasetData, Error> {
        let mut slot = self.state.slot.lock().expect("promise mutex poisoned");
        while slot.is_none() {
            slot = self
                .state
                .ready
                .wait(slot)
                .expect("promise condvar poisoned");
        }
        slot.take().expect("checked above")
    }
}

/// A batch of deferred dataset reads.
///
/// Cancellation applies to the batch as a unit: in-flight chunk reads
/// complete and are discarded, and unfinished handles resolve to
/// [`Error::Cancelled`].
pub struct Batch {
    handles: BTreeMap<String, DatasetHandle>,
    cancel: Arc<AtomicBool>,
}

impl Batch {
    pub(crate) fn new(handles: BTreeMap<String, DatasetHandle>, cancel: Arc<AtomicBool>) -> Self {
        Self { handles, cancel }
    }

    /// Request cancellation of all unfinished datasets in the batch.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Paths in this batch.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(|s| s.as_str())
    }

    /// Remove a single handle for individual joining.
    pub fn take(&mut self, path: &str) -> Option<DatasetHandle> {
        self.handles.remove(path)
    }

    /// Block until every dataset completes and collect the results.
    pub fn join(self) -> BTreeMap<String, Result<DatasetData, Error>> {
        self.handles
            .into_iter()
            .map(|(path, handle)| (path, handle.join()))
            .collect()
    }
}
