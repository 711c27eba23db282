use serde::{Deserialize, Serialize};

/// Where a transaction is in its lifecycle.
///
/// `Unknown → Processing → {Accepted, Rejected}`; the last two are final.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Unknown,
    Processing,
    Rejected,
    Accepted,
}

impl Status {
    /// Whether the transaction has been seen and stored.
    pub fn fetched(self) -> bool {
        self != Status::Unknown
    }

    /// Whether consensus has ruled on it.
    pub fn decided(self) -> bool {
        matches!(self, Status::Accepted | Status::Rejected)
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Status::Unknown => 0,
            Status::Processing => 1,
            Status::Rejected => 2,
            Status::Accepted => 3,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Status::Unknown),
            1 => Some(Status::Processing),
            2 => Some(Status::Rejected),
            3 => Some(Status::Accepted),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_predicates() {
        assert!(!Status::Unknown.fetched());
        assert!(Status::Processing.fetched() && !Status::Processing.decided());
        assert!(Status::Accepted.decided() && Status::Rejected.decided());
        assert_eq!(Status::from_byte(Status::Rejected.to_byte()), Some(Status::Rejected));
        assert_eq!(Status::from_byte(9), None);
    }
}
