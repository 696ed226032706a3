//! Typed proposal records.
//!
//! Contract-returned tuples are decoded into `ProposalStruct` at the
//! ledger boundary; nothing loosely typed travels past it. The fully
//! assembled `ProposalRecord` is an immutable snapshot: once built it
//! is only ever serialized, cached, and displayed.

use crate::eligibility::Eligibility;
use crate::status::ProposalStatus;
use serde::{Deserialize, Serialize};

/// Sentinel `event_date` when no matching status-change log exists.
pub const EVENT_NOT_FOUND: &str = "Event not found";

/// Sentinel `event_date` when resolving the event date failed.
pub const EVENT_DATE_ERROR: &str = "Error fetching date";

/// Raw proposal struct as stored by the governance contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalStruct {
    /// Content-addressed pointer to the off-chain proposal document.
    pub content_pointer: String,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
    pub status_code: u8,
    pub votes_for: u64,
    pub votes_total: u64,
    /// Quorum threshold fixed when voting closed; never recomputed.
    pub quorum_snapshot: u64,
    pub executable: bool,
    pub quadratic_voting: bool,
}

/// Protocol-wide governance parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    pub quorum: u64,
    pub voting_period_secs: u64,
}

/// Fully assembled, immutable proposal snapshot.
///
/// `index` is the stable identity assigned by the ledger at creation,
/// unique and monotonically increasing. `execution_tx_hash` is only
/// populated for executed proposals; `event_date` may carry the
/// [`EVENT_NOT_FOUND`] / [`EVENT_DATE_ERROR`] sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub index: u64,
    pub proposer: String,
    pub content_pointer: String,
    pub title: String,
    pub body: String,
    pub summary: String,
    pub execution_option: String,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
    pub status: ProposalStatus,
    pub votes_for: u64,
    pub votes_against: u64,
    pub votes_total: u64,
    pub quorum_snapshot: u64,
    pub executable: bool,
    pub quadratic_voting: bool,
    pub execution_tx_hash: String,
    pub event_date: String,
    #[serde(flatten)]
    pub eligibility: Eligibility,
}
