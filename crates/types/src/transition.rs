//! Immutable state-change descriptor.

use crate::{InputId, TransitionId};
use serde::{Deserialize, Serialize};

/// An atomic state change proposed by one or more transactions.
///
/// A transition consumes a set of inputs and may depend on other
/// transitions; it can only commit after all of its dependencies have
/// committed. Two transitions with overlapping inputs contend: at most one
/// of them may ever commit. Epochs are not part of the transition — they
/// belong to the transactions wrapping it, so the same transition can be
/// proposed in several epochs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    id: TransitionId,
    inputs: Vec<InputId>,
    dependencies: Vec<TransitionId>,
}

impl Transition {
    /// Create a new transition descriptor.
    pub fn new(id: TransitionId, inputs: Vec<InputId>, dependencies: Vec<TransitionId>) -> Self {
        Self {
            id,
            inputs,
            dependencies,
        }
    }

    /// Unique identifier of this state change.
    pub fn id(&self) -> TransitionId {
        self.id
    }

    /// Inputs this transition consumes.
    pub fn inputs(&self) -> &[InputId] {
        &self.inputs
    }

    /// Transitions that must commit before this one may.
    pub fn dependencies(&self) -> &[TransitionId] {
        &self.dependencies
    }

    /// Whether this transition consumes the given input.
    pub fn consumes(&self, input: InputId) -> bool {
        self.inputs.contains(&input)
    }

    /// Whether this transition depends on the given transition.
    pub fn depends_on(&self, transition_id: TransitionId) -> bool {
        self.dependencies.contains(&transition_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Id;

    #[test]
    fn test_accessors() {
        let input = Id::from_bytes(b"utxo-0");
        let dependency = Id::from_bytes(b"parent");
        let transition = Transition::new(Id::from_bytes(b"self"), vec![input], vec![dependency]);

        assert!(transition.consumes(input));
        assert!(!transition.consumes(Id::from_bytes(b"utxo-1")));
        assert!(transition.depends_on(dependency));
        assert!(!transition.depends_on(transition.id()));
    }
}
