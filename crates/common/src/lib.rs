//! # Govsync Common Crate
//!
//! Shared utilities and the Cache Store abstraction layer.
//!
//! ## Modules
//! - `cache`: CacheStore trait definition plus REST and in-memory backends
//! - `content`: off-chain content resolver (content-addressed gateway)
//! - `config`: configuration management
//! - `retry`: cooldown-gated bounded retry policy
//!
//! ## Cache Layer Architecture
//! ```text
//! ┌─────────────────┐
//! │   CacheStore    │  <- Abstract trait
//! └────────┬────────┘
//!          │
//!    ┌─────┴──────┐
//!    │            │
//! ┌──▼──────┐ ┌───▼────────┐
//! │RestCache│ │MemoryCache │
//! └─────────┘ └────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let cache = RestCache::new("https://kv.example.com", Some(token));
//! cache.set("proposal_res_3", &payload, Some(900)).await?;
//! let hit = cache.get("proposal_res_3").await?;
//! ```

pub mod cache;
pub mod config;
pub mod content;
pub mod retry;

pub use cache::{CacheError, CacheHealth, CacheStore, MemoryCache, RestCache};
pub use config::Config;
pub use content::{ContentSource, GatewayResolver, MemoryContent, ProposalContent};
pub use retry::{RetryGate, RetryOutcome, RetryPolicy};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
