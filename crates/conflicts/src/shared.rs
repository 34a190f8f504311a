//! Coarse-lock handle for sharing the manager across threads.

use crate::{AddError, Conflicts};
use graupel_types::{TransitionId, Tx, TxId};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// A cloneable handle that serializes every operation on a [`Conflicts`]
/// manager behind a single lock.
///
/// The manager itself is a synchronous state machine; this wrapper is for
/// deployments where the voting loop and the decision drain live on
/// different threads. No lock is held across calls, so emissions observed
/// through one handle are immediately visible through all clones.
#[derive(Clone, Default)]
pub struct SharedConflicts {
    inner: Arc<Mutex<Conflicts>>,
}

impl SharedConflicts {
    /// Create a handle around an empty manager.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Conflicts::new())),
        }
    }

    /// See [`Conflicts::add`].
    pub fn add(&self, tx: Arc<dyn Tx>) -> Result<(), AddError> {
        self.inner.lock().add(tx)
    }

    /// See [`Conflicts::processing`].
    pub fn processing(&self, transition_id: TransitionId) -> bool {
        self.inner.lock().processing(transition_id)
    }

    /// See [`Conflicts::is_virtuous`].
    pub fn is_virtuous(&self, tx: &dyn Tx) -> bool {
        self.inner.lock().is_virtuous(tx)
    }

    /// See [`Conflicts::conflicts`].
    pub fn conflicts(&self, tx: &dyn Tx) -> HashSet<TxId> {
        self.inner.lock().conflicts(tx)
    }

    /// See [`Conflicts::accept`].
    pub fn accept(&self, tx_id: TxId) {
        self.inner.lock().accept(tx_id)
    }

    /// See [`Conflicts::reject`].
    pub fn reject(&self, tx_id: TxId) {
        self.inner.lock().reject(tx_id)
    }

    /// See [`Conflicts::updateable`].
    pub fn updateable(&self) -> (Vec<Arc<dyn Tx>>, Vec<Arc<dyn Tx>>) {
        self.inner.lock().updateable()
    }

    /// See [`Conflicts::is_quiescent`].
    pub fn is_quiescent(&self) -> bool {
        self.inner.lock().is_quiescent()
    }
}
