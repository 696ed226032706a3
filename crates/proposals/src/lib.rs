//! # Govsync Proposals Crate
//!
//! Proposal synchronization and caching engine for the governance
//! client. Reconstructs proposal state from the contract's storage and
//! event logs, merges it with off-chain content, derives eligibility
//! through pure state functions, and maintains a tiered cache with
//! permanence semantics.
//!
//! ## Modules
//! - `status`: status-code mapping and terminal classification
//! - `eligibility`: pure eligibility evaluator
//! - `types`: typed proposal records
//! - `abi`: minimal ABI encode/decode helpers
//! - `ledger`: `LedgerReader` trait, JSON-RPC and mock backends
//! - `assembler`: single-proposal assembly (`get_proposal`)
//! - `sync`: listing orchestration (`SyncEngine::get_all_proposals`)
//!
//! ## Data flow
//! ```text
//! SyncEngine ──> CacheStore (hits)
//!      │
//!      └──> get_proposal ──> LedgerReader ──┐
//!                       └──> ContentSource ─┴──> ProposalRecord
//! ```

pub mod abi;
pub mod assembler;
pub mod eligibility;
pub mod ledger;
pub mod status;
pub mod sync;
pub mod types;

pub use assembler::get_proposal;
pub use eligibility::{evaluate, Eligibility};
pub use ledger::{LedgerError, LedgerReader, MockLedger, MockProposal, RpcLedger};
pub use status::{status_label, ProposalStatus, INEXISTENT_STATUS};
pub use sync::{
    record_key, GetAllParams, StatusFilter, SyncConfig, SyncEngine, TypeFilter, INDEX_SET_KEY,
    RECORD_KEY_PREFIX,
};
pub use types::{
    GovernanceParams, ProposalRecord, ProposalStruct, EVENT_DATE_ERROR, EVENT_NOT_FOUND,
};
