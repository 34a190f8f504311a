//! The conflict set manager.
//!
//! Tracks every processing transaction together with the transition it
//! proposes, the inputs that transition consumes, the transitions it depends
//! on, and the epoch restrictions declared against it. The outer protocol
//! feeds selections in through [`Conflicts::accept`] and pulls final
//! accept/reject emissions back out of [`Conflicts::updateable`] until the
//! engine is quiescent.
//!
//! Decision flow per `updateable` call:
//!
//! 1. The oldest conditionally accepted tx whose dependencies have all
//!    committed at satisfying epochs is finalized. At most one tx is
//!    accepted per call; finalizing it queues every rival for rejection.
//! 2. If none is ready, conditionally accepted txs whose dependencies are
//!    permanently broken are moved to the rejection queue.
//! 3. The rejection queue entries present at that point are drained.
//!    Rejections can cascade (a dying transition dooms its dependents);
//!    cascade discoveries are queued for the next call.

use crate::error::AddError;
use crate::node::TransitionNode;
use crate::ordered_set::OrderedSet;
use graupel_types::{Epoch, InputId, Status, Transition, TransitionId, Tx, TxId};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

/// Conflict set manager for a transaction consensus engine.
///
/// All operations take `&self`/`&mut self` and complete in time bounded by
/// the sizes of the touched adjacency sets; callers that share the manager
/// across threads wrap it in [`crate::SharedConflicts`].
pub struct Conflicts {
    /// Processing txs by id.
    pub(crate) txs: HashMap<TxId, Arc<dyn Tx>>,

    /// Per-transition bookkeeping.
    pub(crate) transition_nodes: HashMap<TransitionId, TransitionNode>,

    /// Input id -> transitions with a processing tx consuming that input.
    pub(crate) utxos: HashMap<InputId, BTreeSet<TransitionId>>,

    /// Transition id -> txs restricting it to their epoch or above.
    pub(crate) restrictors: HashMap<TransitionId, BTreeSet<TxId>>,

    /// Txs the outer protocol selected, in selection order, that are still
    /// waiting for their dependencies to resolve.
    pub(crate) conditionally_accepted: OrderedSet<TxId>,

    /// Epochs at which transitions committed. Consulted by the dependency
    /// readiness check after the corresponding nodes are reclaimed.
    pub(crate) accepted_epochs: HashMap<TransitionId, Epoch>,

    /// Transitions whose rejection is final. Outlives node pruning the same
    /// way `accepted_epochs` does on the accept side, so late txs proposing
    /// or depending on a dead transition still resolve.
    pub(crate) rejected_transitions: HashSet<TransitionId>,

    /// Tx ids that have been emitted accepted or rejected. Re-admission of
    /// a decided id is a no-op.
    pub(crate) decided_txs: HashSet<TxId>,

    /// Txs queued for rejection, in discovery order.
    pub(crate) rejectable: VecDeque<TxId>,

    /// Membership guard: a tx is queued for rejection at most once.
    pub(crate) rejectable_ids: HashSet<TxId>,
}

impl Conflicts {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            txs: HashMap::new(),
            transition_nodes: HashMap::new(),
            utxos: HashMap::new(),
            restrictors: HashMap::new(),
            conditionally_accepted: OrderedSet::new(),
            accepted_epochs: HashMap::new(),
            rejected_transitions: HashSet::new(),
            decided_txs: HashSet::new(),
            rejectable: VecDeque::new(),
            rejectable_ids: HashSet::new(),
        }
    }

    /// Number of txs still processing.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// Whether no tx is currently processing.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Whether [`Conflicts::updateable`] has nothing to emit and will have
    /// nothing until further `add`/`accept`/`reject` calls.
    pub fn is_quiescent(&self) -> bool {
        self.conditionally_accepted.is_empty() && self.rejectable.is_empty()
    }

    /// Admit a processing tx.
    ///
    /// Fails only on malformed input: a transition depending on itself, or a
    /// dependency chain through known transitions that loops back. Re-adding
    /// a known tx id — still processing or already decided — is a no-op
    /// success. A tx admitted below a transition's epoch floor, for a
    /// transition that is already rejected or committed, or depending on a
    /// rejected transition is tracked but queued for rejection immediately;
    /// `accept` of such a tx is a silent no-op.
    pub fn add(&mut self, tx: Arc<dyn Tx>) -> Result<(), AddError> {
        let tx_id = tx.id();
        if self.txs.contains_key(&tx_id) || self.decided_txs.contains(&tx_id) {
            return Ok(());
        }

        let transition = tx.transition();
        let transition_id = transition.id();
        let epoch = tx.epoch();

        if transition.depends_on(transition_id) {
            return Err(AddError::SelfReferentialDependency(transition_id));
        }
        self.check_acyclic(&transition)?;

        trace!(tx = %tx_id, transition = %transition_id, epoch, "admitting tx");

        // Materialize the node: a shell left behind by a dependency or
        // restriction reference gains its descriptor here. A recreated node
        // for a durably rejected transition carries the flag again.
        let rejected = self.rejected_transitions.contains(&transition_id);
        let below_floor = {
            let node = self.transition_nodes.entry(transition_id).or_default();
            if node.transition.is_none() {
                node.transition = Some(transition.clone());
            }
            if rejected {
                node.rejected = true;
            }
            let below_floor = node.min_epoch.is_some_and(|floor| epoch < floor);
            node.insert_tx(epoch, tx_id);
            below_floor
        };

        for input in transition.inputs() {
            self.utxos.entry(*input).or_default().insert(transition_id);
        }

        self.txs.insert(tx_id, tx.clone());

        let already_committed = self.accepted_epochs.contains_key(&transition_id);
        let dependency_dead = transition
            .dependencies()
            .iter()
            .any(|dependency| self.rejected_transitions.contains(dependency));
        if rejected || below_floor || already_committed || dependency_dead {
            // Tracked so a later accept() resolves to a no-op, but doomed:
            // it drains out of the next updateable().
            self.enqueue_rejection(tx_id);
            return Ok(());
        }

        for dependency in transition.dependencies() {
            if self.accepted_epochs.contains_key(dependency) {
                continue;
            }
            self.transition_nodes
                .entry(*dependency)
                .or_default()
                .dependents
                .insert(transition_id);
        }

        for restricted in tx.restrictions() {
            self.restrictors.entry(*restricted).or_default().insert(tx_id);
            self.transition_nodes.entry(*restricted).or_default();
        }

        Ok(())
    }

    /// Whether the transition has at least one processing tx and has not
    /// been rejected.
    pub fn processing(&self, transition_id: TransitionId) -> bool {
        self.transition_nodes
            .get(&transition_id)
            .is_some_and(|node| node.has_txs() && !node.rejected)
    }

    /// Whether the tx conflicts with nothing currently tracked.
    pub fn is_virtuous(&self, tx: &dyn Tx) -> bool {
        self.conflicts(tx).is_empty()
    }

    /// The set of tracked txs in conflict with the given tx.
    ///
    /// A pure read; the queried tx does not need to be tracked and is never
    /// part of its own conflict set.
    pub fn conflicts(&self, tx: &dyn Tx) -> HashSet<TxId> {
        let transition = tx.transition();
        let transition_id = transition.id();
        let epoch = tx.epoch();
        let mut found = HashSet::new();

        // Input conflicts: txs of other transitions contending on an input.
        for input in transition.inputs() {
            let Some(spenders) = self.utxos.get(input) else {
                continue;
            };
            for spender in spenders {
                if *spender == transition_id {
                    continue;
                }
                if let Some(node) = self.transition_nodes.get(spender) {
                    found.extend(node.tx_ids());
                }
            }
        }

        // Epoch rivals: txs proposing the same transition in another epoch.
        if let Some(node) = self.transition_nodes.get(&transition_id) {
            for (other_epoch, ids) in node.epochs() {
                if other_epoch != epoch {
                    found.extend(ids.iter().copied());
                }
            }
        }

        // Outer restrictions: this tx demands the restricted transitions
        // commit at `epoch` or above, so their lower-epoch txs conflict.
        for restricted in tx.restrictions() {
            if let Some(node) = self.transition_nodes.get(restricted) {
                found.extend(node.tx_ids_below(epoch));
            }
        }

        // Inner restrictions: a tracked tx restricts this transition from a
        // higher epoch.
        if let Some(restrictor_ids) = self.restrictors.get(&transition_id) {
            for restrictor_id in restrictor_ids {
                let Some(restrictor) = self.txs.get(restrictor_id) else {
                    debug_assert!(false, "restrictor index points at an untracked tx");
                    continue;
                };
                if epoch < restrictor.epoch() {
                    found.insert(*restrictor_id);
                }
            }
        }

        found.remove(&tx.id());
        found
    }

    /// Record that the outer protocol selected this tx for acceptance.
    ///
    /// The tx joins the conditionally accepted queue and is finalized by a
    /// later [`Conflicts::updateable`] call once its dependencies commit.
    /// Unknown ids and txs already queued for rejection are ignored: the tx
    /// may have been rejected on admission, and the caller guarantees it
    /// never selects two conflicting txs.
    pub fn accept(&mut self, tx_id: TxId) {
        if !self.txs.contains_key(&tx_id) || self.rejectable_ids.contains(&tx_id) {
            return;
        }
        trace!(tx = %tx_id, "conditionally accepted");
        self.conditionally_accepted.insert(tx_id);
    }

    /// Record that the outer protocol decided against this tx.
    ///
    /// Only the named tx is queued; its transition may still commit through
    /// another tx. Unknown ids are ignored.
    pub fn reject(&mut self, tx_id: TxId) {
        if !self.txs.contains_key(&tx_id) {
            return;
        }
        self.enqueue_rejection(tx_id);
    }

    /// Drain currently decidable txs: `(accepted, rejected)`.
    ///
    /// At most one tx is accepted per call; rejections fan out. Emissions
    /// are monotone (a decided tx never reappears) and their union over all
    /// calls partitions the admitted txs once the engine is quiescent.
    /// Decided txs have their status stamped before they are returned.
    pub fn updateable(&mut self) -> (Vec<Arc<dyn Tx>>, Vec<Arc<dyn Tx>>) {
        let mut accepted = Vec::new();

        if let Some(tx_id) = self.next_acceptable() {
            if let Some(tx) = self.finalize_accept(tx_id) {
                accepted.push(tx);
            }
        } else {
            self.sweep_broken_dependencies();
        }

        // Drain what is queued now; cascades discovered while draining wait
        // for the next call.
        let batch: Vec<TxId> = self.rejectable.drain(..).collect();
        let mut rejected = Vec::with_capacity(batch.len());
        for tx_id in batch {
            self.rejectable_ids.remove(&tx_id);
            if let Some(tx) = self.finalize_reject(tx_id) {
                rejected.push(tx);
            }
        }

        (accepted, rejected)
    }

    /// Oldest conditionally accepted tx whose dependencies have all
    /// committed at epochs at or below its own.
    fn next_acceptable(&self) -> Option<TxId> {
        self.conditionally_accepted.iter().find(|tx_id| {
            self.txs
                .get(tx_id)
                .is_some_and(|tx| self.dependencies_ready(tx.as_ref()))
        })
    }

    fn dependencies_ready(&self, tx: &dyn Tx) -> bool {
        tx.transition().dependencies().iter().all(|dependency| {
            self.accepted_epochs
                .get(dependency)
                .is_some_and(|committed_at| *committed_at <= tx.epoch())
        })
    }

    fn dependencies_broken(&self, tx: &dyn Tx) -> bool {
        tx.transition().dependencies().iter().any(|dependency| {
            if let Some(committed_at) = self.accepted_epochs.get(dependency) {
                return *committed_at > tx.epoch();
            }
            self.rejected_transitions.contains(dependency)
        })
    }

    /// Move conditionally accepted txs whose dependencies can no longer be
    /// met to the rejection queue.
    fn sweep_broken_dependencies(&mut self) {
        let doomed: Vec<TxId> = self
            .conditionally_accepted
            .iter()
            .filter(|tx_id| {
                self.txs
                    .get(tx_id)
                    .is_some_and(|tx| self.dependencies_broken(tx.as_ref()))
            })
            .collect();
        for tx_id in doomed {
            self.enqueue_rejection(tx_id);
        }
    }

    /// Queue a tx for rejection. Queued txs leave the conditionally
    /// accepted set and can no longer be selected.
    fn enqueue_rejection(&mut self, tx_id: TxId) {
        if self.rejectable_ids.insert(tx_id) {
            self.conditionally_accepted.remove(&tx_id);
            self.rejectable.push_back(tx_id);
        }
    }

    /// Commit a tx: its transition is now accepted at the tx's epoch, and
    /// everything that loses to it is queued for rejection.
    fn finalize_accept(&mut self, tx_id: TxId) -> Option<Arc<dyn Tx>> {
        let Some(tx) = self.txs.remove(&tx_id) else {
            debug_assert!(false, "accepting an untracked tx");
            return None;
        };
        self.decided_txs.insert(tx_id);
        self.conditionally_accepted.remove(&tx_id);

        let transition = tx.transition();
        let transition_id = transition.id();
        let epoch = tx.epoch();
        debug!(tx = %tx_id, transition = %transition_id, epoch, "finalizing acceptance");

        self.accepted_epochs.insert(transition_id, epoch);

        // The winner leaves the multiset; every rival tx left under this
        // transition loses.
        let (rivals, dependents, now_empty) = {
            let node = self.transition_nodes.entry(transition_id).or_default();
            node.accepted_epoch = Some(epoch);
            node.remove_tx(epoch, tx_id);
            let rivals: Vec<TxId> = node.tx_ids().collect();
            let dependents: Vec<TransitionId> = node.dependents.iter().copied().collect();
            (rivals, dependents, !node.has_txs())
        };
        for rival in rivals {
            self.enqueue_rejection(rival);
        }

        // Input rivals: any other transition contending on one of our
        // inputs can never commit.
        for input in transition.inputs() {
            let losers: Vec<TransitionId> = self
                .utxos
                .get(input)
                .map(|spenders| {
                    spenders
                        .iter()
                        .copied()
                        .filter(|spender| *spender != transition_id)
                        .collect()
                })
                .unwrap_or_default();
            for loser in losers {
                self.condemn(loser);
            }
        }

        // Restrictions this tx declared: raise each target's epoch floor and
        // doom its txs below the floor.
        for restricted in tx.restrictions() {
            self.raise_floor(*restricted, epoch);
            self.remove_restrictor(*restricted, tx_id);
        }

        // A dependent must commit at or above the epoch its dependency
        // committed in.
        for dependent in dependents {
            let doomed: Vec<TxId> = self
                .transition_nodes
                .get(&dependent)
                .map(|node| node.tx_ids_below(epoch).collect())
                .unwrap_or_default();
            for low_tx in doomed {
                self.enqueue_rejection(low_tx);
            }
        }

        if now_empty {
            self.release_inputs(transition_id, &transition);
        }
        self.try_prune(transition_id);

        tx.set_status(Status::Accepted);
        Some(tx)
    }

    /// Finalize a queued rejection and propagate its consequences.
    fn finalize_reject(&mut self, tx_id: TxId) -> Option<Arc<dyn Tx>> {
        let Some(tx) = self.txs.remove(&tx_id) else {
            debug_assert!(false, "rejecting an untracked tx");
            return None;
        };
        self.decided_txs.insert(tx_id);
        self.conditionally_accepted.remove(&tx_id);

        let transition = tx.transition();
        let transition_id = transition.id();
        let epoch = tx.epoch();
        debug!(tx = %tx_id, transition = %transition_id, epoch, "finalizing rejection");

        for restricted in tx.restrictions() {
            self.remove_restrictor(*restricted, tx_id);
        }

        let mut now_empty = false;
        let mut was_accepted = false;
        let mut was_rejected = false;
        let mut floor = None;
        let mut dependents: Vec<TransitionId> = Vec::new();
        if let Some(node) = self.transition_nodes.get_mut(&transition_id) {
            node.remove_tx(epoch, tx_id);
            now_empty = !node.has_txs();
            was_accepted = node.accepted_epoch.is_some();
            was_rejected = node.rejected;
            floor = node.min_epoch;
            dependents = node.dependents.iter().copied().collect();
        } else {
            debug_assert!(false, "tracked tx without a transition node");
        }

        if !was_accepted {
            if now_empty && was_rejected {
                // The transition is gone for good: everything built on it
                // dies with it.
                for dependent in &dependents {
                    self.condemn(*dependent);
                }
            } else if let Some(floor) = floor {
                // Epochs below the floor can never commit, so dependents
                // stuck below it can never see their dependency commit.
                for dependent in &dependents {
                    let doomed: Vec<TxId> = self
                        .transition_nodes
                        .get(dependent)
                        .map(|node| node.tx_ids_below(floor).collect())
                        .unwrap_or_default();
                    for low_tx in doomed {
                        self.enqueue_rejection(low_tx);
                    }
                }
            }
        }

        if now_empty {
            self.release_inputs(transition_id, &transition);
        }
        self.try_prune(transition_id);

        tx.set_status(Status::Rejected);
        Some(tx)
    }

    /// Mark a transition as rejected and queue all of its txs. If it has no
    /// txs left to drain, the rejection propagates to its dependents now.
    fn condemn(&mut self, transition_id: TransitionId) {
        let (doomed, dependents) = match self.transition_nodes.get_mut(&transition_id) {
            Some(node) if !node.rejected && node.accepted_epoch.is_none() => {
                node.rejected = true;
                self.rejected_transitions.insert(transition_id);
                let doomed: Vec<TxId> = node.tx_ids().collect();
                let dependents: Vec<TransitionId> = if doomed.is_empty() {
                    node.dependents.iter().copied().collect()
                } else {
                    Vec::new()
                };
                (doomed, dependents)
            }
            _ => return,
        };

        if !doomed.is_empty() {
            debug!(transition = %transition_id, txs = doomed.len(), "transition rejected");
            for tx_id in doomed {
                self.enqueue_rejection(tx_id);
            }
            return;
        }
        for dependent in dependents {
            self.condemn(dependent);
        }
    }

    /// Raise a transition's epoch floor and doom its txs below it.
    fn raise_floor(&mut self, transition_id: TransitionId, epoch: Epoch) {
        let doomed: Vec<TxId> = {
            let node = self.transition_nodes.entry(transition_id).or_default();
            let floor = node.min_epoch.map_or(epoch, |current| current.max(epoch));
            node.min_epoch = Some(floor);
            node.tx_ids_below(floor).collect()
        };
        for tx_id in doomed {
            self.enqueue_rejection(tx_id);
        }
    }

    /// Drop a resolved restrictor edge, reclaiming the target node if the
    /// edge was the last reference to it.
    fn remove_restrictor(&mut self, restricted: TransitionId, tx_id: TxId) {
        if let Some(ids) = self.restrictors.get_mut(&restricted) {
            ids.remove(&tx_id);
            if ids.is_empty() {
                self.restrictors.remove(&restricted);
                self.try_prune(restricted);
            }
        }
    }

    /// Unregister a transition from the inputs it consumes.
    fn release_inputs(&mut self, transition_id: TransitionId, transition: &Transition) {
        for input in transition.inputs() {
            if let Some(spenders) = self.utxos.get_mut(input) {
                spenders.remove(&transition_id);
                if spenders.is_empty() {
                    self.utxos.remove(input);
                }
            }
        }
    }

    /// Drop a node nothing references: no processing txs, no dependents, no
    /// restrictors. Releasing its dependency edges can make its own
    /// dependencies reclaimable in turn. Pruning loses no decision state:
    /// committed and rejected transitions stay recorded in
    /// `accepted_epochs` and `rejected_transitions`.
    fn try_prune(&mut self, transition_id: TransitionId) {
        let removable = self.transition_nodes.get(&transition_id).is_some_and(|node| {
            !node.has_txs()
                && node.dependents.is_empty()
                && !self.restrictors.contains_key(&transition_id)
        });
        if !removable {
            return;
        }
        let Some(node) = self.transition_nodes.remove(&transition_id) else {
            return;
        };
        trace!(transition = %transition_id, "pruning transition node");

        if let Some(descriptor) = node.transition {
            self.release_inputs(transition_id, &descriptor);
            for dependency in descriptor.dependencies() {
                if let Some(parent) = self.transition_nodes.get_mut(dependency) {
                    parent.dependents.remove(&transition_id);
                }
                self.try_prune(*dependency);
            }
        }
    }

    /// Reject admission of transitions whose dependency chain, through
    /// currently known descriptors, loops back to themselves.
    fn check_acyclic(&self, transition: &Transition) -> Result<(), AddError> {
        let target = transition.id();
        let mut stack: Vec<TransitionId> = transition.dependencies().to_vec();
        let mut visited: HashSet<TransitionId> = HashSet::new();

        while let Some(current) = stack.pop() {
            if current == target {
                return Err(AddError::DependencyCycle(target));
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(descriptor) = self
                .transition_nodes
                .get(&current)
                .and_then(|node| node.transition.as_deref())
            {
                stack.extend_from_slice(descriptor.dependencies());
            }
        }
        Ok(())
    }
}

impl Default for Conflicts {
    fn default() -> Self {
        Self::new()
    }
}
