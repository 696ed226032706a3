//! Eligibility evaluation for closed-vote proposals.
//!
//! Pure, deterministic, side-effect-free: the detail page re-runs this
//! on every render and must get identical output for identical input.
//!
//! ## Invariants
//!
//! 1. At most one of `schedulable` / `cancelable` is true
//! 2. `proposal_invalid` and `proposal_rejected` are mutually exclusive
//! 3. `proposal_invalid || proposal_rejected` implies `cancelable`
//! 4. Quorum check is not-less-than: `votes_total == quorum` counts as reached
//! 5. Approval is strict: a for/against tie is a rejection, not an approval

use crate::status::ProposalStatus;
use serde::{Deserialize, Serialize};

/// Derived eligibility flags of a proposal. All default to false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub schedulable: bool,
    pub cancelable: bool,
    pub proposal_invalid: bool,
    pub proposal_rejected: bool,
}

impl Eligibility {
    fn schedulable() -> Self {
        Eligibility {
            schedulable: true,
            ..Default::default()
        }
    }

    fn invalid() -> Self {
        Eligibility {
            cancelable: true,
            proposal_invalid: true,
            ..Default::default()
        }
    }

    fn rejected() -> Self {
        Eligibility {
            cancelable: true,
            proposal_rejected: true,
            ..Default::default()
        }
    }
}

/// Evaluate eligibility at ledger time `now`.
///
/// Ordered rules; the first match wins:
/// 1. Scheduled/executed/completed proposals are past this decision
///    point and are never re-evaluated: all false.
/// 2. While voting is open (`now < end_time`) nothing is derivable yet,
///    regardless of the tallies: all false.
/// 3. Voting closed below quorum: the proposal is invalid and can only
///    be canceled, whichever way the votes leaned.
/// 4. Quorum reached and strictly more for than against: schedulable.
/// 5. Otherwise (including an exact tie): rejected, cancelable.
pub fn evaluate(
    now: u64,
    end_time: u64,
    status: ProposalStatus,
    votes_total: u64,
    votes_for: u64,
    quorum: u64,
) -> Eligibility {
    if !matches!(status, ProposalStatus::Active | ProposalStatus::Canceled) {
        return Eligibility::default();
    }

    if now < end_time {
        return Eligibility::default();
    }

    if votes_total < quorum {
        return Eligibility::invalid();
    }

    let votes_against = votes_total.saturating_sub(votes_for);
    if votes_for > votes_against {
        Eligibility::schedulable()
    } else {
        Eligibility::rejected()
    }
}
