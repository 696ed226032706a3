//! Proposal assembly.
//!
//! Composes the ledger reader, content resolver, status mapper, and
//! eligibility evaluator into one immutable `ProposalRecord`.
//! Independent reads are issued concurrently; the only sequencing is
//! forced by true data dependencies:
//!
//! ```text
//! ┌ proposal_count ┐
//! ├ latest block ts ┼──> proposal_struct ──┬ content resolve
//! └ proposer scan  ┘                       ├ execution tx hash
//!                                          └ event date
//! ```
//!
//! Eligibility is evaluated against the ledger's latest block
//! timestamp, not wall-clock time, so the flags stay consistent with
//! the state the ledger itself reported.

use crate::eligibility::evaluate;
use crate::ledger::{LedgerError, LedgerReader};
use crate::status::ProposalStatus;
use crate::types::ProposalRecord;
use govsync_common::ContentSource;
use tracing::debug;

/// Fetch and assemble one proposal.
///
/// Fails with [`LedgerError::DoesNotExist`] for out-of-range indices
/// and with the underlying error when the struct read fails; log-scan
/// and content degradation never fail the assembly.
pub async fn get_proposal<L, C>(
    ledger: &L,
    content: &C,
    index: u64,
) -> Result<ProposalRecord, LedgerError>
where
    L: LedgerReader,
    C: ContentSource,
{
    let (count, now, proposer) = tokio::join!(
        ledger.proposal_count(),
        ledger.latest_block_timestamp(),
        ledger.find_proposer(index),
    );
    let count = count?;
    if index >= count {
        return Err(LedgerError::DoesNotExist { index });
    }
    let now = now?;

    let raw = ledger.proposal_struct(index).await?;
    let status = ProposalStatus::from_code(raw.status_code).ok_or_else(|| {
        LedgerError::Decode(format!(
            "proposal {} has unknown status code {}",
            index, raw.status_code
        ))
    })?;

    let (doc, execution_tx_hash, event_date) = tokio::join!(
        content.resolve(&raw.content_pointer),
        async {
            if status == ProposalStatus::Executed {
                ledger.execution_tx_hash(index).await
            } else {
                String::new()
            }
        },
        ledger.status_change_date(index, raw.status_code),
    );

    let eligibility = evaluate(
        now,
        raw.end_timestamp,
        status,
        raw.votes_total,
        raw.votes_for,
        raw.quorum_snapshot,
    );

    debug!(index, status = status.label(), "proposal assembled");
    Ok(ProposalRecord {
        index,
        proposer,
        content_pointer: raw.content_pointer,
        title: doc.title,
        body: doc.body,
        summary: doc.summary,
        execution_option: doc.execution_option,
        start_timestamp: raw.start_timestamp,
        end_timestamp: raw.end_timestamp,
        status,
        votes_for: raw.votes_for,
        votes_against: raw.votes_total.saturating_sub(raw.votes_for),
        votes_total: raw.votes_total,
        quorum_snapshot: raw.quorum_snapshot,
        executable: raw.executable,
        quadratic_voting: raw.quadratic_voting,
        execution_tx_hash,
        event_date,
        eligibility,
    })
}
