//! Sync Engine Integration Tests
//!
//! End-to-end tests of listing assembly against the mock ledger,
//! in-memory content source, and in-memory cache backend.

use govsync_common::{CacheStore, MemoryCache, MemoryContent, ProposalContent};
use govsync_proposals::{
    record_key, GetAllParams, LedgerError, MockLedger, MockProposal, ProposalStatus,
    ProposalStruct, StatusFilter, SyncEngine, TypeFilter, INDEX_SET_KEY,
};

const NOW: u64 = 1_700_100_000;

fn raw(status_code: u8, executable: bool) -> ProposalStruct {
    ProposalStruct {
        content_pointer: String::new(),
        start_timestamp: 1_700_000_000,
        end_timestamp: 1_700_000_900,
        status_code,
        votes_for: 30,
        votes_total: 50,
        quorum_snapshot: 40,
        executable,
        quadratic_voting: false,
    }
}

fn proposal(status_code: u8, executable: bool) -> MockProposal {
    MockProposal {
        raw: raw(status_code, executable),
        proposer: "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
        execution_tx: if status_code == 2 {
            "0xdead".to_string()
        } else {
            String::new()
        },
        event_date: Some("15/11/2023, 12:00:00".to_string()),
    }
}

/// Engine over five proposals: 0 canceled, 1 executed, 2 completed,
/// 3 scheduled, 4 active. Proposal 4 is not executable.
fn engine() -> SyncEngine<MockLedger, MemoryContent, MemoryCache> {
    let ledger = MockLedger::new();
    ledger.insert(0, proposal(4, true));
    ledger.insert(1, proposal(2, true));
    ledger.insert(2, proposal(3, true));
    ledger.insert(3, proposal(1, true));
    ledger.insert(4, proposal(0, false));
    ledger.set_latest_timestamp(NOW);
    SyncEngine::new(ledger, MemoryContent::new(), MemoryCache::new())
}

fn full_range() -> GetAllParams {
    GetAllParams {
        start_index: 4,
        end_index: 0,
        ..Default::default()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// A. LISTING BASICS
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn listing_is_sorted_descending() {
    let engine = engine();
    let records = engine.get_all_proposals(&full_range()).await;
    let indices: Vec<u64> = records.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![4, 3, 2, 1, 0]);
}

#[tokio::test]
async fn listing_is_idempotent() {
    // Second call is served from cache and must be field-for-field
    // identical to the cold fetch.
    let engine = engine();
    let cold = engine.get_all_proposals(&full_range()).await;
    let reads_after_cold = engine.ledger().struct_read_count();
    let warm = engine.get_all_proposals(&full_range()).await;
    assert_eq!(cold, warm);
    // Warm call hit the cache, not the ledger.
    assert_eq!(engine.ledger().struct_read_count(), reads_after_cold);
}

#[tokio::test]
async fn cached_record_roundtrip_is_identical() {
    let engine = engine();
    let fresh = engine.refresh_proposal(1).await.unwrap();
    let raw = engine
        .cache()
        .get(&record_key(1))
        .await
        .unwrap()
        .expect("record cached");
    let cached: govsync_proposals::ProposalRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(cached, fresh);
}

#[tokio::test]
async fn failed_index_is_omitted_not_fatal() {
    let engine = engine();
    engine.ledger().fail_struct(2, true);
    let records = engine.get_all_proposals(&full_range()).await;
    let indices: Vec<u64> = records.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![4, 3, 1, 0]);
}

#[tokio::test]
async fn inverted_range_is_empty() {
    let engine = engine();
    let params = GetAllParams {
        start_index: 0,
        end_index: 4,
        ..Default::default()
    };
    assert!(engine.get_all_proposals(&params).await.is_empty());
}

// ════════════════════════════════════════════════════════════════════════════
// B. TTL TIERING & INDEX SET
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn terminal_records_cache_without_expiry() {
    let engine = engine();
    engine.get_all_proposals(&full_range()).await;
    // Executed (1) is permanent, active (4) expires.
    assert_eq!(engine.cache().has_expiry(&record_key(1)), Some(false));
    assert_eq!(engine.cache().has_expiry(&record_key(4)), Some(true));
    assert_eq!(engine.cache().has_expiry(INDEX_SET_KEY), Some(true));
}

#[tokio::test]
async fn index_set_tracks_fetched_indices() {
    let engine = engine();
    engine.get_all_proposals(&full_range()).await;
    let raw = engine.cache().get(INDEX_SET_KEY).await.unwrap().unwrap();
    let set: Vec<u64> = serde_json::from_str(&raw).unwrap();
    assert_eq!(set, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn stale_index_listing_is_read_repaired() {
    let engine = engine();
    // Index set claims 0..=4 are cached, but no records exist.
    engine
        .cache()
        .set(INDEX_SET_KEY, "[0,1,2,3,4]", None)
        .await
        .unwrap();
    let records = engine.get_all_proposals(&full_range()).await;
    assert_eq!(records.len(), 5);
    // The set was rebuilt from actual fetches, not trusted blindly.
    let raw = engine.cache().get(INDEX_SET_KEY).await.unwrap().unwrap();
    let set: Vec<u64> = serde_json::from_str(&raw).unwrap();
    assert_eq!(set, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn fetch_only_new_skips_known_indices() {
    let engine = engine();
    let params = GetAllParams {
        start_index: 3,
        end_index: 0,
        ..Default::default()
    };
    engine.get_all_proposals(&params).await;
    let reads_before = engine.ledger().struct_read_count();

    // A new proposal appears; only-new mode must fetch just index 4.
    let params = GetAllParams {
        fetch_only_new: true,
        ..full_range()
    };
    let records = engine.get_all_proposals(&params).await;
    assert_eq!(records.len(), 5);
    assert_eq!(engine.ledger().struct_read_count(), reads_before + 1);
}

#[tokio::test]
async fn tombstone_invalidation_forces_refetch() {
    let engine = engine();
    engine.get_all_proposals(&full_range()).await;
    let reads = engine.ledger().struct_read_count();

    engine.invalidate(3).await;
    let records = engine.get_all_proposals(&full_range()).await;
    assert_eq!(records.len(), 5);
    // Exactly the invalidated proposal was re-fetched.
    assert_eq!(engine.ledger().struct_read_count(), reads + 1);
}

#[tokio::test]
async fn index_set_invalidation_rebuilds_from_fetches() {
    let engine = engine();
    engine.get_all_proposals(&full_range()).await;
    engine.invalidate_index_set().await;
    let raw = engine.cache().get(INDEX_SET_KEY).await.unwrap().unwrap();
    let set: Vec<u64> = serde_json::from_str(&raw).unwrap();
    assert!(set.is_empty());
}

// ════════════════════════════════════════════════════════════════════════════
// C. DEGRADED MODE
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn unreachable_cache_degrades_to_direct_fetch() {
    let engine = engine();
    engine.cache().set_failing(true);
    let records = engine.get_all_proposals(&full_range()).await;
    assert_eq!(records.len(), 5);
    // Degraded mode attempts zero cache writes.
    assert_eq!(engine.cache().set_count(), 0);
}

#[tokio::test]
async fn degraded_listing_matches_cached_listing() {
    let engine = engine();
    engine.cache().set_failing(true);
    let degraded = engine.get_all_proposals(&full_range()).await;
    engine.cache().set_failing(false);
    let healthy = engine.get_all_proposals(&full_range()).await;
    assert_eq!(degraded, healthy);
}

#[tokio::test]
async fn refresh_works_without_cache() {
    let engine = engine();
    engine.cache().set_failing(true);
    let rec = engine.refresh_proposal(1).await.unwrap();
    assert_eq!(rec.status, ProposalStatus::Executed);
    assert_eq!(engine.cache().set_count(), 0);
}

// ════════════════════════════════════════════════════════════════════════════
// D. FILTERS
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn status_filter_narrows_listing() {
    let engine = engine();
    let params = GetAllParams {
        status_filter: StatusFilter::Only(ProposalStatus::Executed),
        ..full_range()
    };
    let records = engine.get_all_proposals(&params).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 1);
}

#[tokio::test]
async fn type_filter_splits_on_executable() {
    let engine = engine();
    let params = GetAllParams {
        type_filter: TypeFilter::OffChain,
        ..full_range()
    };
    let records = engine.get_all_proposals(&params).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 4);

    let params = GetAllParams {
        type_filter: TypeFilter::OnChain,
        ..full_range()
    };
    assert_eq!(engine.get_all_proposals(&params).await.len(), 4);
}

#[tokio::test]
async fn date_filter_bounds_start_date() {
    let engine = engine();
    // All proposals start 2023-11-14 (UTC).
    let params = GetAllParams {
        start_date: Some("2023-11-14".to_string()),
        end_date: Some("2023-11-14".to_string()),
        ..full_range()
    };
    assert_eq!(engine.get_all_proposals(&params).await.len(), 5);

    let params = GetAllParams {
        end_date: Some("2023-11-13".to_string()),
        ..full_range()
    };
    assert!(engine.get_all_proposals(&params).await.is_empty());
}

#[tokio::test]
async fn filters_apply_to_cached_hits_too() {
    let engine = engine();
    engine.get_all_proposals(&full_range()).await;
    // Second (cached) pass with a filter.
    let params = GetAllParams {
        status_filter: StatusFilter::Only(ProposalStatus::Active),
        ..full_range()
    };
    let records = engine.get_all_proposals(&params).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 4);
}

// ════════════════════════════════════════════════════════════════════════════
// E. SINGLE-PROPOSAL PATH
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn refresh_of_missing_index_is_does_not_exist() {
    let engine = engine();
    let err = engine.refresh_proposal(99).await.unwrap_err();
    assert_eq!(err, LedgerError::DoesNotExist { index: 99 });
}

#[tokio::test]
async fn refresh_overwrites_stale_cache_state() {
    let engine = engine();
    engine.get_all_proposals(&full_range()).await;

    // Proposal 3 transitions scheduled -> executed on chain.
    engine.ledger().insert(3, proposal(2, true));
    let rec = engine.refresh_proposal(3).await.unwrap();
    assert_eq!(rec.status, ProposalStatus::Executed);

    // The cached copy now reflects the transition.
    let raw = engine
        .cache()
        .get(&record_key(3))
        .await
        .unwrap()
        .unwrap();
    let cached: govsync_proposals::ProposalRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(cached.status, ProposalStatus::Executed);
    assert_eq!(cached.execution_tx_hash, "0xdead");
}

#[tokio::test]
async fn content_flows_into_assembled_records() {
    let ledger = MockLedger::new();
    let mut p = proposal(0, true);
    p.raw.content_pointer = "bafy-rich".to_string();
    ledger.insert(0, p);
    ledger.set_latest_timestamp(NOW);
    let content = MemoryContent::new();
    content.insert(
        "bafy-rich",
        ProposalContent {
            title: "Wetland survey".to_string(),
            body: "Long body".to_string(),
            summary: "Survey".to_string(),
            execution_option: "none".to_string(),
        },
    );
    let engine = SyncEngine::new(ledger, content, MemoryCache::new());
    let rec = engine.refresh_proposal(0).await.unwrap();
    assert_eq!(rec.title, "Wetland survey");
    assert_eq!(rec.summary, "Survey");
}
