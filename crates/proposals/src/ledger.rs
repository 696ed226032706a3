//! Ledger Reader
//!
//! The governance contract and its event logs are the authoritative
//! source of proposal state. This module defines the `LedgerReader`
//! trait plus two backends:
//!
//! | Type | Role |
//! |------|------|
//! | `LedgerReader` | Abstract read-only contract/log access |
//! | `RpcLedger` | JSON-RPC backend (`eth_call`, `eth_getLogs`) |
//! | `MockLedger` | In-memory backend for tests |
//!
//! ## Failure semantics
//!
//! Struct reads are fatal for the requested index. Log scans are not:
//! a failed or undecodable scan degrades a single field (proposer,
//! execution tx hash, event date) to its safe default instead of
//! aborting assembly.

use crate::abi;
use crate::types::{GovernanceParams, ProposalStruct, EVENT_DATE_ERROR, EVENT_NOT_FOUND};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

// ════════════════════════════════════════════════════════════════════════════
// CONTRACT SURFACE
// ════════════════════════════════════════════════════════════════════════════

const GET_PROPOSAL: &str = "getProposal(uint256)";
const GET_PROPOSAL_INDEX: &str = "getProposalIndex()";
const GET_GOVERNANCE_PARAMETERS: &str = "getGovernanceParameters()";

/// Emitted once when a proposal is created; carries the proposer.
const PROPOSED_EVENT: &str = "ResearchProposed(uint256,address)";
/// Emitted on every lifecycle transition; carries the new status code.
const STATUS_CHANGED_EVENT: &str = "StatusChanged(uint256,uint8)";

/// Display timezone for event dates (UTC-3).
const EVENT_DATE_UTC_OFFSET_SECS: i32 = -3 * 3600;

// ════════════════════════════════════════════════════════════════════════════
// ERRORS & TRAIT
// ════════════════════════════════════════════════════════════════════════════

/// Errors surfaced by ledger reads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The requested index is outside the ledger's known range.
    #[error("proposal {index} does not exist")]
    DoesNotExist { index: u64 },
    /// Transport or node-side failure.
    #[error("ledger rpc error: {0}")]
    Rpc(String),
    /// Return data did not decode into the expected shape.
    #[error("ledger decode error: {0}")]
    Decode(String),
}

/// Read-only access to the governance contract and its event history.
///
/// Implementors MUST be thread-safe (`Send + Sync`) and must never
/// block inside the async methods. The `String`-returning log scans
/// are infallible by contract: they degrade to the documented default
/// instead of erroring.
pub trait LedgerReader: Send + Sync {
    /// Next proposal index; valid indices are `0..count`.
    fn proposal_count(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Typed proposal struct. Fatal on any read or decode failure.
    fn proposal_struct(
        &self,
        index: u64,
    ) -> impl Future<Output = Result<ProposalStruct, LedgerError>> + Send;

    /// Timestamp of the latest block, in unix seconds.
    fn latest_block_timestamp(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Proposer recovered from the creation event log; empty string if
    /// the scan fails or the log does not decode.
    fn find_proposer(&self, index: u64) -> impl Future<Output = String> + Send;

    /// Transaction hash of the latest execution status-change log;
    /// empty string if none is found.
    fn execution_tx_hash(&self, index: u64) -> impl Future<Output = String> + Send;

    /// Human-readable date of the newest status-change log matching
    /// `status_code`, or the `EVENT_NOT_FOUND` / `EVENT_DATE_ERROR`
    /// sentinels.
    fn status_change_date(
        &self,
        index: u64,
        status_code: u8,
    ) -> impl Future<Output = String> + Send;

    /// Protocol-wide governance parameters.
    fn governance_params(
        &self,
    ) -> impl Future<Output = Result<GovernanceParams, LedgerError>> + Send;
}

// ════════════════════════════════════════════════════════════════════════════
// DATE FORMATTING
// ════════════════════════════════════════════════════════════════════════════

/// Format a block timestamp for display in the fixed UTC-3 timezone.
pub fn format_event_date(timestamp_secs: u64) -> Option<String> {
    let offset = chrono::FixedOffset::east_opt(EVENT_DATE_UTC_OFFSET_SECS)?;
    let dt = chrono::DateTime::from_timestamp(i64::try_from(timestamp_secs).ok()?, 0)?;
    Some(
        dt.with_timezone(&offset)
            .format("%d/%m/%Y, %H:%M:%S")
            .to_string(),
    )
}

// ════════════════════════════════════════════════════════════════════════════
// JSON-RPC BACKEND
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct RpcReply {
    result: Option<serde_json::Value>,
    error: Option<RpcFault>,
}

#[derive(Debug, Deserialize)]
struct RpcFault {
    code: i64,
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry {
    data: String,
    block_number: String,
    transaction_hash: String,
}

fn decoded<T>(result: Result<T, String>) -> Result<T, LedgerError> {
    result.map_err(LedgerError::Decode)
}

fn hex_u64(value: &str) -> Result<u64, String> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| format!("invalid hex quantity '{}': {}", value, e))
}

/// Ledger reader over an Ethereum-style JSON-RPC node.
#[derive(Clone)]
pub struct RpcLedger {
    rpc_url: String,
    contract: String,
    client: reqwest::Client,
}

impl RpcLedger {
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

    pub fn new(
        rpc_url: impl Into<String>,
        contract: impl Into<String>,
        timeout_ms: Option<u64>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(
                timeout_ms.unwrap_or(Self::DEFAULT_TIMEOUT_MS),
            ))
            .build()
            .unwrap_or_default();
        RpcLedger {
            rpc_url: rpc_url.into(),
            contract: contract.into(),
            client,
        }
    }

    async fn rpc(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(LedgerError::Rpc(format!(
                "{} returned {}",
                method,
                resp.status()
            )));
        }
        let reply = resp
            .json::<RpcReply>()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        if let Some(fault) = reply.error {
            return Err(LedgerError::Rpc(format!(
                "{} failed ({}): {}",
                method, fault.code, fault.message
            )));
        }
        reply
            .result
            .ok_or_else(|| LedgerError::Rpc(format!("{} returned no result", method)))
    }

    async fn call(&self, data: String) -> Result<abi::Words, LedgerError> {
        let params = serde_json::json!([
            { "to": self.contract, "data": data },
            "latest",
        ]);
        let result = self.rpc("eth_call", params).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| LedgerError::Decode("eth_call result is not a string".to_string()))?;
        abi::Words::parse(raw).map_err(LedgerError::Decode)
    }

    /// All logs for `event` on the contract, from block 0 to latest,
    /// optionally narrowed to one indexed proposal id.
    async fn logs(&self, event: &str, index: Option<u64>) -> Result<Vec<LogEntry>, LedgerError> {
        let mut topics = vec![serde_json::json!(abi::event_topic(event))];
        if let Some(index) = index {
            topics.push(serde_json::json!(abi::uint_word(index)));
        }
        let params = serde_json::json!([{
            "address": self.contract,
            "fromBlock": "0x0",
            "toBlock": "latest",
            "topics": topics,
        }]);
        let result = self.rpc("eth_getLogs", params).await?;
        serde_json::from_value::<Vec<LogEntry>>(result)
            .map_err(|e| LedgerError::Decode(format!("log entries: {}", e)))
    }

    async fn block_timestamp(&self, tag: &str) -> Result<u64, LedgerError> {
        let result = self
            .rpc("eth_getBlockByNumber", serde_json::json!([tag, false]))
            .await?;
        let raw = result
            .get("timestamp")
            .and_then(|v| v.as_str())
            .ok_or_else(|| LedgerError::Decode("block has no timestamp".to_string()))?;
        hex_u64(raw).map_err(LedgerError::Decode)
    }

    /// Status-change logs for `index`, newest block first.
    async fn status_logs_desc(&self, index: u64) -> Result<Vec<LogEntry>, LedgerError> {
        let mut logs = self.logs(STATUS_CHANGED_EVENT, Some(index)).await?;
        logs.sort_by_key(|log| std::cmp::Reverse(hex_u64(&log.block_number).unwrap_or(0)));
        Ok(logs)
    }

    async fn resolve_status_date(
        &self,
        index: u64,
        status_code: u8,
    ) -> Result<Option<String>, LedgerError> {
        for log in self.status_logs_desc(index).await? {
            let Ok(words) = abi::Words::parse(&log.data) else {
                continue;
            };
            let Ok(code) = words.uint(0) else {
                continue;
            };
            if code == u64::from(status_code) {
                let ts = self.block_timestamp(&log.block_number).await?;
                let date = format_event_date(ts).ok_or_else(|| {
                    LedgerError::Decode(format!("block timestamp {} out of range", ts))
                })?;
                return Ok(Some(date));
            }
        }
        Ok(None)
    }
}

impl LedgerReader for RpcLedger {
    async fn proposal_count(&self) -> Result<u64, LedgerError> {
        let words = self.call(abi::encode_call(GET_PROPOSAL_INDEX, &[])).await?;
        words.uint(0).map_err(LedgerError::Decode)
    }

    async fn proposal_struct(&self, index: u64) -> Result<ProposalStruct, LedgerError> {
        let words = self.call(abi::encode_call(GET_PROPOSAL, &[index])).await?;
        let status_word = decoded(words.uint(3))?;
        let status_code = u8::try_from(status_word)
            .map_err(|_| LedgerError::Decode(format!("status code {} exceeds u8", status_word)))?;
        Ok(ProposalStruct {
            content_pointer: decoded(words.string(0))?,
            start_timestamp: decoded(words.uint(1))?,
            end_timestamp: decoded(words.uint(2))?,
            status_code,
            votes_for: decoded(words.uint(4))?,
            votes_total: decoded(words.uint(5))?,
            quorum_snapshot: decoded(words.uint(6))?,
            executable: decoded(words.boolean(7))?,
            quadratic_voting: decoded(words.boolean(8))?,
        })
    }

    async fn latest_block_timestamp(&self) -> Result<u64, LedgerError> {
        self.block_timestamp("latest").await
    }

    async fn find_proposer(&self, index: u64) -> String {
        let logs = match self.logs(PROPOSED_EVENT, Some(index)).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(index, error = %e, "proposer log scan failed");
                return String::new();
            }
        };
        for log in logs {
            match abi::Words::parse(&log.data).and_then(|w| w.address(0)) {
                Ok(proposer) => return proposer,
                Err(e) => {
                    debug!(index, error = %e, "undecodable proposed event, skipping");
                }
            }
        }
        String::new()
    }

    async fn execution_tx_hash(&self, index: u64) -> String {
        let logs = match self.status_logs_desc(index).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(index, error = %e, "execution log scan failed");
                return String::new();
            }
        };
        for log in logs {
            let decoded = abi::Words::parse(&log.data).and_then(|w| w.uint(0));
            if decoded == Ok(u64::from(crate::status::ProposalStatus::Executed.code())) {
                return log.transaction_hash;
            }
        }
        String::new()
    }

    async fn status_change_date(&self, index: u64, status_code: u8) -> String {
        match self.resolve_status_date(index, status_code).await {
            Ok(Some(date)) => date,
            Ok(None) => EVENT_NOT_FOUND.to_string(),
            Err(e) => {
                warn!(index, status_code, error = %e, "event date resolution failed");
                EVENT_DATE_ERROR.to_string()
            }
        }
    }

    async fn governance_params(&self) -> Result<GovernanceParams, LedgerError> {
        let words = self
            .call(abi::encode_call(GET_GOVERNANCE_PARAMETERS, &[]))
            .await?;
        Ok(GovernanceParams {
            quorum: words.uint(0).map_err(LedgerError::Decode)?,
            voting_period_secs: words.uint(1).map_err(LedgerError::Decode)?,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MOCK BACKEND
// ════════════════════════════════════════════════════════════════════════════

/// One proposal as seen by the mock ledger.
#[derive(Debug, Clone)]
pub struct MockProposal {
    pub raw: ProposalStruct,
    pub proposer: String,
    pub execution_tx: String,
    pub event_date: Option<String>,
}

#[derive(Default)]
struct MockInner {
    proposals: HashMap<u64, MockProposal>,
    count: u64,
    latest_timestamp: u64,
    failing_structs: HashSet<u64>,
    params: Option<GovernanceParams>,
}

/// In-memory ledger for tests.
///
/// Tracks struct-read traffic so tests can assert how often the
/// "chain" was actually hit, and lets individual struct reads be
/// forced to fail.
#[derive(Default)]
pub struct MockLedger {
    inner: Mutex<MockInner>,
    struct_reads: AtomicU64,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, index: u64, proposal: MockProposal) {
        let mut inner = self.inner.lock();
        inner.count = inner.count.max(index + 1);
        inner.proposals.insert(index, proposal);
    }

    pub fn set_latest_timestamp(&self, ts: u64) {
        self.inner.lock().latest_timestamp = ts;
    }

    pub fn set_params(&self, params: GovernanceParams) {
        self.inner.lock().params = Some(params);
    }

    /// Make struct reads for `index` fail until cleared.
    pub fn fail_struct(&self, index: u64, failing: bool) {
        let mut inner = self.inner.lock();
        if failing {
            inner.failing_structs.insert(index);
        } else {
            inner.failing_structs.remove(&index);
        }
    }

    /// Number of struct reads served (including failed ones).
    pub fn struct_read_count(&self) -> u64 {
        self.struct_reads.load(Ordering::SeqCst)
    }
}

impl LedgerReader for MockLedger {
    async fn proposal_count(&self) -> Result<u64, LedgerError> {
        Ok(self.inner.lock().count)
    }

    async fn proposal_struct(&self, index: u64) -> Result<ProposalStruct, LedgerError> {
        self.struct_reads.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock();
        if inner.failing_structs.contains(&index) {
            return Err(LedgerError::Rpc("injected struct read failure".to_string()));
        }
        match inner.proposals.get(&index) {
            Some(p) => Ok(p.raw.clone()),
            None => Err(LedgerError::DoesNotExist { index }),
        }
    }

    async fn latest_block_timestamp(&self) -> Result<u64, LedgerError> {
        Ok(self.inner.lock().latest_timestamp)
    }

    async fn find_proposer(&self, index: u64) -> String {
        self.inner
            .lock()
            .proposals
            .get(&index)
            .map(|p| p.proposer.clone())
            .unwrap_or_default()
    }

    async fn execution_tx_hash(&self, index: u64) -> String {
        self.inner
            .lock()
            .proposals
            .get(&index)
            .map(|p| p.execution_tx.clone())
            .unwrap_or_default()
    }

    async fn status_change_date(&self, index: u64, _status_code: u8) -> String {
        self.inner
            .lock()
            .proposals
            .get(&index)
            .and_then(|p| p.event_date.clone())
            .unwrap_or_else(|| EVENT_NOT_FOUND.to_string())
    }

    async fn governance_params(&self) -> Result<GovernanceParams, LedgerError> {
        self.inner
            .lock()
            .params
            .ok_or_else(|| LedgerError::Rpc("no governance params configured".to_string()))
    }
}
