//! Cache Store Abstraction
//!
//! This module defines the `CacheStore` trait, the contract every cache
//! backend must satisfy, together with the two concrete backends used by
//! the sync engine:
//!
//! | Type | Role |
//! |------|------|
//! | `CacheStore` | Abstract key-value trait (`get`/`set`/`ping`) |
//! | `RestCache` | HTTP REST backend (Upstash-style endpoint) |
//! | `MemoryCache` | In-process backend for tests and offline runs |
//!
//! The engine never talks to a concrete backend directly; it is generic
//! over `CacheStore` so tests can substitute an in-memory or failing
//! backend without touching the sync logic.

use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

// ════════════════════════════════════════════════════════════════════════════
// ERRORS & HEALTH
// ════════════════════════════════════════════════════════════════════════════

/// Errors produced by cache backends.
///
/// Cache failures are always recoverable from the caller's point of
/// view: the sync engine degrades to direct ledger reads instead of
/// propagating these upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Backend did not answer the liveness probe.
    Unavailable,
    /// Transport-level failure talking to the backend.
    Network(String),
    /// Payload could not be encoded or decoded.
    Serialization(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Unavailable => write!(f, "cache backend unavailable"),
            CacheError::Network(msg) => write!(f, "cache network error: {}", msg),
            CacheError::Serialization(msg) => write!(f, "cache serialization error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}

/// Health of the cache backend as seen by the last probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheHealth {
    /// Backend answered the probe.
    Reachable,
    /// Backend did not answer; operate in degraded mode.
    Unreachable,
}

// ════════════════════════════════════════════════════════════════════════════
// CACHE STORE TRAIT
// ════════════════════════════════════════════════════════════════════════════

/// Abstract key-value cache with per-key TTL.
///
/// Implementors MUST be thread-safe (`Send + Sync`), must never block
/// inside the async methods, and must treat a missing key as
/// `Ok(None)` rather than an error. A `ttl_secs` of `None` means the
/// entry persists until explicitly overwritten.
pub trait CacheStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CacheError>> + Send;

    /// Store `value` under `key` with an optional expiry in seconds.
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl_secs: Option<u64>,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Probe backend liveness. Returns the observed health, never an error.
    fn ping(&self) -> impl Future<Output = CacheHealth> + Send;
}

// ════════════════════════════════════════════════════════════════════════════
// REST BACKEND
// ════════════════════════════════════════════════════════════════════════════

/// Wire shape of the REST backend's responses.
///
/// Every endpoint answers `{"result": ...}`; a `null` result on `get`
/// means the key is absent.
#[derive(Debug, Deserialize)]
struct RestReply {
    result: Option<serde_json::Value>,
}

/// Key-value cache backed by an Upstash-style REST endpoint.
///
/// Endpoints used:
/// - `GET  {base}/get/{key}`
/// - `POST {base}/set/{key}?EX={ttl}` (value in the request body)
/// - `GET  {base}/ping`
///
/// An optional bearer token is attached to every request.
#[derive(Clone)]
pub struct RestCache {
    base: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl RestCache {
    /// Default request timeout for cache round-trips.
    pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

    pub fn new(base: impl Into<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(Self::DEFAULT_TIMEOUT_MS))
            .build()
            .unwrap_or_default();
        RestCache {
            base: base.into().trim_end_matches('/').to_string(),
            token,
            client,
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

impl CacheStore for RestCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let url = format!("{}/get/{}", self.base, key);
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(|e| CacheError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CacheError::Network(format!(
                "get {} returned {}",
                key,
                resp.status()
            )));
        }
        let reply = resp
            .json::<RestReply>()
            .await
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        Ok(reply.result.map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), CacheError> {
        let url = match ttl_secs {
            Some(ttl) => format!("{}/set/{}?EX={}", self.base, key, ttl),
            None => format!("{}/set/{}", self.base, key),
        };
        let resp = self
            .authed(self.client.post(&url))
            .body(value.to_string())
            .send()
            .await
            .map_err(|e| CacheError::Network(e.to_string()))?;
        if resp.status().is_success() {
            debug!(key, ttl = ?ttl_secs, "cache set");
            Ok(())
        } else {
            Err(CacheError::Network(format!(
                "set {} returned {}",
                key,
                resp.status()
            )))
        }
    }

    async fn ping(&self) -> CacheHealth {
        let url = format!("{}/ping", self.base);
        match self.authed(self.client.get(&url)).send().await {
            Ok(resp) if resp.status().is_success() => CacheHealth::Reachable,
            Ok(resp) => {
                warn!(status = %resp.status(), "cache ping rejected");
                CacheHealth::Unreachable
            }
            Err(e) => {
                warn!(error = %e, "cache ping failed");
                CacheHealth::Unreachable
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// IN-MEMORY BACKEND
// ════════════════════════════════════════════════════════════════════════════

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

/// In-process cache backend.
///
/// Honors TTL semantics against a monotonic clock and exposes a
/// failure switch so tests can simulate an unreachable backend. The
/// write counter lets tests assert that degraded mode performs zero
/// writes.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    failing: AtomicBool,
    sets: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation behave as if the backend were down.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful `set` calls since construction.
    pub fn set_count(&self) -> u64 {
        self.sets.load(Ordering::SeqCst)
    }

    /// Whether `key` is present and whether it carries an expiry.
    /// `None` if absent, `Some(true)` if the entry expires.
    pub fn has_expiry(&self, key: &str) -> Option<bool> {
        self.entries
            .lock()
            .get(key)
            .map(|entry| entry.expires_at.is_some())
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) => {
                if let Some(deadline) = entry.expires_at {
                    if Instant::now() >= deadline {
                        entries.remove(key);
                        return None;
                    }
                }
                Some(entry.value.clone())
            }
            None => None,
        }
    }
}

impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable);
        }
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable);
        }
        let expires_at = ttl_secs.map(|ttl| Instant::now() + Duration::from_secs(ttl));
        self.entries.lock().insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        self.sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> CacheHealth {
        if self.failing.load(Ordering::SeqCst) {
            CacheHealth::Unreachable
        } else {
            CacheHealth::Reachable
        }
    }
}
