//! Off-chain content resolution.
//!
//! Proposal text lives off-chain behind a content-addressed gateway;
//! the ledger only stores the pointer. This module fetches the JSON
//! document for a pointer and normalizes missing fields to display
//! defaults. Resolution never fails: any network, HTTP, or parse
//! problem yields the placeholder content so a partial record is still
//! assemblable.

use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Placeholder shown when a field is absent from the document.
pub const DEFAULT_TITLE: &str = "N/A";
pub const DEFAULT_BODY: &str = "No body available";
pub const DEFAULT_SUMMARY: &str = "No summary available";
pub const DEFAULT_EXECUTION_OPTION: &str = "N/A";

/// Normalized proposal document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalContent {
    pub title: String,
    pub body: String,
    pub summary: String,
    pub execution_option: String,
}

impl Default for ProposalContent {
    fn default() -> Self {
        ProposalContent {
            title: DEFAULT_TITLE.to_string(),
            body: DEFAULT_BODY.to_string(),
            summary: DEFAULT_SUMMARY.to_string(),
            execution_option: DEFAULT_EXECUTION_OPTION.to_string(),
        }
    }
}

/// Raw gateway document; every field is optional on the wire.
#[derive(Debug, Deserialize)]
struct RawContent {
    title: Option<String>,
    body: Option<String>,
    summary: Option<String>,
    #[serde(rename = "executionOption")]
    execution_option: Option<String>,
}

impl From<RawContent> for ProposalContent {
    fn from(raw: RawContent) -> Self {
        ProposalContent {
            title: raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: raw.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            summary: raw.summary.unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
            execution_option: raw
                .execution_option
                .unwrap_or_else(|| DEFAULT_EXECUTION_OPTION.to_string()),
        }
    }
}

/// Source of off-chain proposal documents.
pub trait ContentSource: Send + Sync {
    /// Resolve a content pointer into a normalized document.
    /// Infallible: degraded lookups return the default placeholders.
    fn resolve(&self, pointer: &str) -> impl Future<Output = ProposalContent> + Send;
}

/// HTTP resolver against a content-addressed gateway.
#[derive(Clone)]
pub struct GatewayResolver {
    base: String,
    client: reqwest::Client,
}

impl GatewayResolver {
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

    pub fn new(base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(Self::DEFAULT_TIMEOUT_MS))
            .build()
            .unwrap_or_default();
        GatewayResolver {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn fetch(&self, pointer: &str) -> Result<ProposalContent, String> {
        let url = format!("{}/{}", self.base, pointer);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("gateway returned {}", resp.status()));
        }
        let raw = resp.json::<RawContent>().await.map_err(|e| e.to_string())?;
        Ok(raw.into())
    }
}

impl ContentSource for GatewayResolver {
    async fn resolve(&self, pointer: &str) -> ProposalContent {
        if pointer.is_empty() {
            return ProposalContent::default();
        }
        match self.fetch(pointer).await {
            Ok(content) => content,
            Err(reason) => {
                warn!(pointer, reason, "content resolution degraded to defaults");
                ProposalContent::default()
            }
        }
    }
}

/// In-memory content source for tests.
#[derive(Default)]
pub struct MemoryContent {
    entries: Mutex<HashMap<String, ProposalContent>>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, pointer: impl Into<String>, content: ProposalContent) {
        self.entries.lock().insert(pointer.into(), content);
    }
}

impl ContentSource for MemoryContent {
    async fn resolve(&self, pointer: &str) -> ProposalContent {
        self.entries
            .lock()
            .get(pointer)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let raw: RawContent = serde_json::from_str(r#"{"title":"Fund lab equipment"}"#).unwrap();
        let content = ProposalContent::from(raw);
        assert_eq!(content.title, "Fund lab equipment");
        assert_eq!(content.body, DEFAULT_BODY);
        assert_eq!(content.summary, DEFAULT_SUMMARY);
        assert_eq!(content.execution_option, DEFAULT_EXECUTION_OPTION);
    }

    #[test]
    fn execution_option_uses_wire_name() {
        let raw: RawContent =
            serde_json::from_str(r#"{"executionOption":"transfer"}"#).unwrap();
        let content = ProposalContent::from(raw);
        assert_eq!(content.execution_option, "transfer");
    }

    #[tokio::test]
    async fn memory_source_unknown_pointer_is_default() {
        let source = MemoryContent::new();
        let content = source.resolve("bafy-unknown").await;
        assert_eq!(content, ProposalContent::default());
    }

    #[tokio::test]
    async fn empty_pointer_short_circuits() {
        let resolver = GatewayResolver::new("http://127.0.0.1:1");
        let content = resolver.resolve("").await;
        assert_eq!(content, ProposalContent::default());
    }
}
