//! Canonical proposal lifecycle states and the on-chain code mapping.
//!
//! The contract stores the lifecycle state as a small integer; this
//! module is the single place where that code is interpreted. The
//! transition graph is monotonic and acyclic:
//!
//! ```text
//! active ──> scheduled ──> executed
//!    │            │   └──> completed
//!    │            └──> canceled
//!    └──> canceled
//! ```
//!
//! `executed`, `completed`, and `canceled` are terminal.

use serde::{Deserialize, Serialize};

/// Label returned for status codes outside the known mapping.
pub const INEXISTENT_STATUS: &str = "inexistent status";

/// Lifecycle state of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Active,
    Scheduled,
    Executed,
    Completed,
    Canceled,
}

impl ProposalStatus {
    /// Interpret an on-chain status code. Codes outside 0..=4 are unknown.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ProposalStatus::Active),
            1 => Some(ProposalStatus::Scheduled),
            2 => Some(ProposalStatus::Executed),
            3 => Some(ProposalStatus::Completed),
            4 => Some(ProposalStatus::Canceled),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ProposalStatus::Active => 0,
            ProposalStatus::Scheduled => 1,
            ProposalStatus::Executed => 2,
            ProposalStatus::Completed => 3,
            ProposalStatus::Canceled => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProposalStatus::Active => "active",
            ProposalStatus::Scheduled => "scheduled",
            ProposalStatus::Executed => "executed",
            ProposalStatus::Completed => "completed",
            ProposalStatus::Canceled => "canceled",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProposalStatus::Executed | ProposalStatus::Completed | ProposalStatus::Canceled
        )
    }
}

/// Total mapping from status code to display label.
/// Never fails; unknown codes map to [`INEXISTENT_STATUS`].
pub fn status_label(code: u8) -> &'static str {
    match ProposalStatus::from_code(code) {
        Some(status) => status.label(),
        None => INEXISTENT_STATUS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mapping_is_canonical() {
        assert_eq!(status_label(0), "active");
        assert_eq!(status_label(1), "scheduled");
        assert_eq!(status_label(2), "executed");
        assert_eq!(status_label(3), "completed");
        assert_eq!(status_label(4), "canceled");
    }

    #[test]
    fn unknown_codes_are_total() {
        assert_eq!(status_label(5), INEXISTENT_STATUS);
        assert_eq!(status_label(200), INEXISTENT_STATUS);
        assert_eq!(status_label(u8::MAX), INEXISTENT_STATUS);
    }

    #[test]
    fn from_code_roundtrips() {
        for code in 0..=4u8 {
            let status = ProposalStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert!(ProposalStatus::from_code(5).is_none());
    }

    #[test]
    fn terminal_classification() {
        assert!(!ProposalStatus::Active.is_terminal());
        assert!(!ProposalStatus::Scheduled.is_terminal());
        assert!(ProposalStatus::Executed.is_terminal());
        assert!(ProposalStatus::Completed.is_terminal());
        assert!(ProposalStatus::Canceled.is_terminal());
    }

    #[test]
    fn serde_uses_lowercase_labels() {
        let json = serde_json::to_string(&ProposalStatus::Scheduled).unwrap();
        assert_eq!(json, "\"scheduled\"");
        let back: ProposalStatus = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(back, ProposalStatus::Canceled);
    }
}
