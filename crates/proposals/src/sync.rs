//! # Proposal Sync Engine
//!
//! Reconstructs listings from the ledger while keeping a tiered cache
//! in front of it:
//!
//! - one serialized record per index under `proposal_res_<index>`
//! - an index set of known cached indices under `research_sc_indices`
//!
//! Terminal records (executed/completed/canceled) never change again
//! and are cached without expiry; live records are re-verified every
//! 15 minutes. Ledger reads are the dominant cost and are rate-limited
//! upstream, so misses are fetched in fixed-size concurrent batches,
//! one batch at a time.
//!
//! The cache is shared, eventually-consistent state with no
//! transactional guarantee: concurrent writers may race on the index
//! set. Read-repair handles that — a per-key miss despite an index
//! listing removes the stale index rather than taking a lock anywhere.
//!
//! If the backend does not answer the one liveness probe issued per
//! call, the engine degrades to direct ledger reads and performs zero
//! cache writes for that call.

use crate::assembler::get_proposal;
use crate::ledger::{LedgerError, LedgerReader};
use crate::status::ProposalStatus;
use crate::types::ProposalRecord;
use chrono::NaiveDate;
use futures::future::join_all;
use govsync_common::{CacheHealth, CacheStore, ContentSource};
use tracing::{debug, info, warn};

// ════════════════════════════════════════════════════════════════════════════
// KEYS & TUNING
// ════════════════════════════════════════════════════════════════════════════

/// Cache key prefix for per-proposal records.
pub const RECORD_KEY_PREFIX: &str = "proposal_res_";

/// Cache key of the known-indices set.
pub const INDEX_SET_KEY: &str = "research_sc_indices";

/// Cache key for one proposal record.
pub fn record_key(index: u64) -> String {
    format!("{}{}", RECORD_KEY_PREFIX, index)
}

/// Engine tuning. Defaults match production behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Proposals fetched concurrently per batch; batches run sequentially.
    pub batch_size: usize,
    /// TTL for records whose status may still change.
    pub temp_ttl_secs: u64,
    /// TTL for the index set.
    pub index_set_ttl_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            temp_ttl_secs: 900,
            index_set_ttl_secs: 7 * 24 * 3600,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FILTERS
// ════════════════════════════════════════════════════════════════════════════

/// Status filter of a listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ProposalStatus),
}

/// Execution-type filter of a listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    /// Proposals with an on-chain executable action.
    OnChain,
    /// Signaling proposals without one.
    OffChain,
}

/// Parameters of one `get_all_proposals` call.
///
/// The requested range is `[end_index, start_index]` inclusive, with
/// `start_index` the newest proposal. Dates are `YYYY-MM-DD` and bound
/// the proposal start date inclusively.
#[derive(Debug, Clone, Default)]
pub struct GetAllParams {
    pub start_index: u64,
    pub end_index: u64,
    pub status_filter: StatusFilter,
    pub type_filter: TypeFilter,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Only fetch indices the cache has never seen.
    pub fetch_only_new: bool,
}

/// Inclusive date-window check on the proposal start timestamp.
/// Fails open: an unparsable bound or out-of-range timestamp includes
/// the record rather than silently dropping it.
fn passes_date_window(start_timestamp: u64, start: Option<&str>, end: Option<&str>) -> bool {
    if start.is_none() && end.is_none() {
        return true;
    }
    let ts = match i64::try_from(start_timestamp)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
    {
        Some(ts) => ts,
        None => {
            warn!(start_timestamp, "unrepresentable start date, including record");
            return true;
        }
    };
    let day = ts.date_naive();
    if let Some(raw) = start {
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(bound) if day < bound => return false,
            Ok(_) => {}
            Err(e) => {
                warn!(raw, error = %e, "bad start date filter, including record");
                return true;
            }
        }
    }
    if let Some(raw) = end {
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(bound) if day > bound => return false,
            Ok(_) => {}
            Err(e) => {
                warn!(raw, error = %e, "bad end date filter, including record");
                return true;
            }
        }
    }
    true
}

// ════════════════════════════════════════════════════════════════════════════
// ENGINE
// ════════════════════════════════════════════════════════════════════════════

/// Sync orchestrator over a ledger, a content source, and a cache.
pub struct SyncEngine<L, C, S> {
    ledger: L,
    content: C,
    cache: S,
    cfg: SyncConfig,
}

impl<L, C, S> SyncEngine<L, C, S>
where
    L: LedgerReader,
    C: ContentSource,
    S: CacheStore,
{
    pub fn new(ledger: L, content: C, cache: S) -> Self {
        Self::with_config(ledger, content, cache, SyncConfig::default())
    }

    pub fn with_config(ledger: L, content: C, cache: S, cfg: SyncConfig) -> Self {
        Self {
            ledger,
            content,
            cache,
            cfg,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn cache(&self) -> &S {
        &self.cache
    }

    /// List proposals in the requested range, newest first.
    ///
    /// Prefers cache hits, batch-fetches misses through the assembler,
    /// and writes fresh records back with permanence-aware TTLs.
    /// Unfetchable indices are logged and omitted; the listing itself
    /// never fails.
    pub async fn get_all_proposals(&self, params: &GetAllParams) -> Vec<ProposalRecord> {
        let cache_alive = self.cache.ping().await == CacheHealth::Reachable;
        if !cache_alive {
            warn!("cache backend unreachable, serving from ledger only");
        }

        if params.start_index < params.end_index {
            return Vec::new();
        }
        let range: Vec<u64> = (params.end_index..=params.start_index).collect();

        let mut index_set = if cache_alive {
            self.read_index_set().await
        } else {
            Vec::new()
        };

        let mut records: Vec<ProposalRecord> = Vec::new();
        let mut to_fetch: Vec<u64> = Vec::new();
        let mut stale: Vec<u64> = Vec::new();

        for &index in &range {
            if !cache_alive || !index_set.contains(&index) {
                to_fetch.push(index);
                continue;
            }
            match self.cache.get(&record_key(index)).await {
                Ok(Some(raw)) if !raw.is_empty() => {
                    match serde_json::from_str::<ProposalRecord>(&raw) {
                        Ok(rec) => records.push(rec),
                        Err(e) => {
                            warn!(index, error = %e, "cached record corrupt, refetching");
                            stale.push(index);
                            to_fetch.push(index);
                        }
                    }
                }
                Ok(_) => {
                    debug!(index, "index listed but record missing");
                    stale.push(index);
                    to_fetch.push(index);
                }
                Err(e) => {
                    warn!(index, error = %e, "cache read failed, refetching");
                    to_fetch.push(index);
                }
            }
        }

        // Read-repair: in full mode a listed-but-missing record means the
        // index set is stale; drop those entries before writing it back.
        if !params.fetch_only_new {
            index_set.retain(|index| !stale.contains(index));
        }

        let fetched = self.fetch_batches(&to_fetch).await;

        if cache_alive {
            for rec in &fetched {
                if self.write_record(rec).await && !index_set.contains(&rec.index) {
                    index_set.push(rec.index);
                }
            }
            self.write_index_set(&mut index_set).await;
        }

        info!(
            requested = range.len(),
            hits = records.len(),
            fetched = fetched.len(),
            degraded = !cache_alive,
            "listing assembled"
        );

        records.extend(fetched);
        records.retain(|rec| self.passes_filters(rec, params));
        records.sort_by(|a, b| b.index.cmp(&a.index));
        records
    }

    /// Direct single-proposal refresh, bypassing cached state.
    /// The fresh record overwrites the cache when the backend is up.
    pub async fn refresh_proposal(&self, index: u64) -> Result<ProposalRecord, LedgerError> {
        let rec = get_proposal(&self.ledger, &self.content, index).await?;
        if self.cache.ping().await == CacheHealth::Reachable && self.write_record(&rec).await {
            let mut index_set = self.read_index_set().await;
            if !index_set.contains(&index) {
                index_set.push(index);
            }
            self.write_index_set(&mut index_set).await;
        }
        Ok(rec)
    }

    /// Evict one record. The cache interface has no delete, so the
    /// entry is overwritten with an empty tombstone that expires in a
    /// second, and the index is dropped from the index set.
    pub async fn invalidate(&self, index: u64) {
        if self.cache.ping().await != CacheHealth::Reachable {
            return;
        }
        if let Err(e) = self.cache.set(&record_key(index), "", Some(1)).await {
            warn!(index, error = %e, "tombstone write failed");
        }
        let mut index_set = self.read_index_set().await;
        index_set.retain(|i| *i != index);
        self.write_index_set(&mut index_set).await;
    }

    /// Drop the whole index set, e.g. after a new proposal shifted the
    /// valid range. Subsequent listings rebuild it from fetches.
    pub async fn invalidate_index_set(&self) {
        if self.cache.ping().await != CacheHealth::Reachable {
            return;
        }
        if let Err(e) = self.cache.set(INDEX_SET_KEY, "[]", Some(1)).await {
            warn!(error = %e, "index set invalidation failed");
        }
    }

    async fn read_index_set(&self) -> Vec<u64> {
        match self.cache.get(INDEX_SET_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<u64>>(&raw) {
                Ok(list) => list,
                Err(e) => {
                    warn!(error = %e, "index set payload corrupt, treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "index set read failed, treating as empty");
                Vec::new()
            }
        }
    }

    async fn write_index_set(&self, index_set: &mut Vec<u64>) {
        index_set.sort_unstable();
        index_set.dedup();
        match serde_json::to_string(index_set) {
            Ok(payload) => {
                if let Err(e) = self
                    .cache
                    .set(INDEX_SET_KEY, &payload, Some(self.cfg.index_set_ttl_secs))
                    .await
                {
                    warn!(error = %e, "index set write failed");
                }
            }
            Err(e) => warn!(error = %e, "index set serialization failed"),
        }
    }

    /// Write one record with a permanence-aware TTL. Terminal statuses
    /// persist indefinitely. Returns whether the write landed.
    async fn write_record(&self, rec: &ProposalRecord) -> bool {
        let ttl = if rec.status.is_terminal() {
            None
        } else {
            Some(self.cfg.temp_ttl_secs)
        };
        let payload = match serde_json::to_string(rec) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(index = rec.index, error = %e, "record serialization failed");
                return false;
            }
        };
        match self.cache.set(&record_key(rec.index), &payload, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(index = rec.index, error = %e, "record write failed");
                false
            }
        }
    }

    /// Fetch indices through the assembler in fixed-size batches.
    /// Batches run strictly one after another to bound concurrent load
    /// on the RPC endpoint; failures are logged and excluded without
    /// aborting siblings.
    async fn fetch_batches(&self, indices: &[u64]) -> Vec<ProposalRecord> {
        let mut out = Vec::with_capacity(indices.len());
        for chunk in indices.chunks(self.cfg.batch_size.max(1)) {
            let results = join_all(
                chunk
                    .iter()
                    .map(|&index| get_proposal(&self.ledger, &self.content, index)),
            )
            .await;
            for (index, result) in chunk.iter().zip(results) {
                match result {
                    Ok(rec) => out.push(rec),
                    Err(e) => warn!(index, error = %e, "proposal excluded from listing"),
                }
            }
        }
        out
    }

    fn passes_filters(&self, rec: &ProposalRecord, params: &GetAllParams) -> bool {
        if let StatusFilter::Only(status) = params.status_filter {
            if rec.status != status {
                return false;
            }
        }
        match params.type_filter {
            TypeFilter::All => {}
            TypeFilter::OnChain => {
                if !rec.executable {
                    return false;
                }
            }
            TypeFilter::OffChain => {
                if rec.executable {
                    return false;
                }
            }
        }
        passes_date_window(
            rec.start_timestamp,
            params.start_date.as_deref(),
            params.end_date.as_deref(),
        )
    }
}
