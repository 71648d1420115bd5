use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::ai_client::CompletionRequest;

/// Caches AI completions keyed by a SHA-256 digest of the request.
///
/// Re-scoring an unchanged lead against an unchanged offer produces the same prompt, so the
/// stored completion is reused instead of calling the backend again. Only successful
/// completions are inserted; failures always go back to the backend on the next attempt.
#[derive(Clone)]
pub struct CompletionCache {
    entries: Cache<String, String>,
}

impl CompletionCache {
    /// 1 hour TTL, 10k entries.
    pub fn new() -> Self {
        Self::with_limits(Duration::from_secs(3600), 10_000)
    }

    pub fn with_limits(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
        }
    }

    /// Hex-encoded SHA-256 over every request field that influences the completion.
    pub fn key_for(request: &CompletionRequest) -> String {
        let mut hasher = Sha256::new();
        hasher.update(request.system.as_bytes());
        hasher.update([0u8]);
        hasher.update(request.prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(request.max_tokens.to_le_bytes());
        hasher.update(request.temperature.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn get(&self, request: &CompletionRequest) -> Option<String> {
        self.entries.get(&Self::key_for(request)).await
    }

    pub async fn insert(&self, request: &CompletionRequest, completion: String) {
        self.entries
            .insert(Self::key_for(request), completion)
            .await;
    }
}

impl Default for CompletionCache {
    fn default() -> Self {
        Self::new()
    }
}
