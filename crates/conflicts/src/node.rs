//! Per-transition bookkeeping.

use graupel_types::{Epoch, Transition, TransitionId, TxId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Bookkeeping for one tracked transition.
///
/// A node exists while at least one processing tx proposes the transition,
/// some tracked tx restricts it, or some tracked transition depends on it.
/// A node created for a dependency or restriction target before any tx
/// proposes it is a *shell*: it carries no descriptor and no txs, and is
/// neither accepted nor rejected.
#[derive(Debug, Default)]
pub(crate) struct TransitionNode {
    /// Descriptor, filled in when the first proposing tx is admitted.
    pub(crate) transition: Option<Arc<Transition>>,

    /// Processing txs proposing this transition, grouped by epoch.
    txs_by_epoch: BTreeMap<Epoch, BTreeSet<TxId>>,

    /// Transitions whose dependency lists name this one.
    pub(crate) dependents: BTreeSet<TransitionId>,

    /// Every tx of this transition, present or future, is doomed.
    pub(crate) rejected: bool,

    /// Epoch the transition committed in, once one of its txs was accepted.
    pub(crate) accepted_epoch: Option<Epoch>,

    /// Lowest epoch at which this transition may still commit. Raised by
    /// accepted restrictions; admissions below it are rejected outright.
    pub(crate) min_epoch: Option<Epoch>,
}

impl TransitionNode {
    /// Track a tx proposing this transition at the given epoch.
    pub(crate) fn insert_tx(&mut self, epoch: Epoch, tx_id: TxId) {
        self.txs_by_epoch.entry(epoch).or_default().insert(tx_id);
    }

    /// Stop tracking a tx. Empty epoch groups are dropped.
    pub(crate) fn remove_tx(&mut self, epoch: Epoch, tx_id: TxId) {
        if let Some(ids) = self.txs_by_epoch.get_mut(&epoch) {
            ids.remove(&tx_id);
            if ids.is_empty() {
                self.txs_by_epoch.remove(&epoch);
            }
        }
    }

    /// Whether any tx currently proposes this transition.
    pub(crate) fn has_txs(&self) -> bool {
        !self.txs_by_epoch.is_empty()
    }

    /// Whether the tx is tracked under the given epoch.
    pub(crate) fn contains_tx(&self, epoch: Epoch, tx_id: TxId) -> bool {
        self.txs_by_epoch
            .get(&epoch)
            .is_some_and(|ids| ids.contains(&tx_id))
    }

    /// All tracked txs, ordered by epoch then id.
    pub(crate) fn tx_ids(&self) -> impl Iterator<Item = TxId> + '_ {
        self.txs_by_epoch.values().flatten().copied()
    }

    /// Tracked txs at epochs strictly below the given epoch.
    pub(crate) fn tx_ids_below(&self, epoch: Epoch) -> impl Iterator<Item = TxId> + '_ {
        self.txs_by_epoch
            .range(..epoch)
            .flat_map(|(_, ids)| ids)
            .copied()
    }

    /// Epoch groups of tracked txs.
    pub(crate) fn epochs(&self) -> impl Iterator<Item = (Epoch, &BTreeSet<TxId>)> + '_ {
        self.txs_by_epoch.iter().map(|(epoch, ids)| (*epoch, ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graupel_types::Id;

    #[test]
    fn test_epoch_grouping() {
        let mut node = TransitionNode::default();
        let tx0 = Id::from_bytes(b"tx0");
        let tx1 = Id::from_bytes(b"tx1");
        let tx2 = Id::from_bytes(b"tx2");

        node.insert_tx(0, tx0);
        node.insert_tx(0, tx1);
        node.insert_tx(2, tx2);

        assert!(node.has_txs());
        assert!(node.contains_tx(0, tx0));
        assert!(!node.contains_tx(1, tx0));
        assert_eq!(node.tx_ids().count(), 3);

        let below: Vec<TxId> = node.tx_ids_below(2).collect();
        assert_eq!(below.len(), 2);
        assert!(below.contains(&tx0) && below.contains(&tx1));
    }

    #[test]
    fn test_remove_drops_empty_groups() {
        let mut node = TransitionNode::default();
        let tx0 = Id::from_bytes(b"tx0");

        node.insert_tx(3, tx0);
        node.remove_tx(3, tx0);

        assert!(!node.has_txs());
        assert_eq!(node.epochs().count(), 0);
    }
}
