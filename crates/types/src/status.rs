//! Decision status of a transaction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The decision state of a transaction.
///
/// Every transaction starts [`Status::Processing`] and is moved to exactly
/// one of [`Status::Accepted`] or [`Status::Rejected`] by the conflict
/// engine. The move is final.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Not yet decided.
    #[default]
    Processing,

    /// Finally accepted; the proposed transition committed.
    Accepted,

    /// Finally rejected; the transaction will never commit.
    Rejected,
}

impl Status {
    /// Whether a final decision has been made.
    pub fn is_decided(self) -> bool {
        !matches!(self, Status::Processing)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Processing => write!(f, "Processing"),
            Status::Accepted => write!(f, "Accepted"),
            Status::Rejected => write!(f, "Rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_processing() {
        assert_eq!(Status::default(), Status::Processing);
        assert!(!Status::default().is_decided());
    }

    #[test]
    fn test_decided() {
        assert!(Status::Accepted.is_decided());
        assert!(Status::Rejected.is_decided());
    }
}
