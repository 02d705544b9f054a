use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;

/// In-memory cache for rendered API payloads, keyed by request path.
#[derive(Clone)]
pub struct ResponseCache {
    enabled: bool,
    capacity: usize,
    ttl: Duration,
    store: Arc<RwLock<HashMap<String, CachedResponse>>>,
}

struct CachedResponse {
    body: Value,
    expires_at: Instant,
}

impl ResponseCache {
    pub fn new(enabled: bool, capacity: usize, ttl_seconds: u64) -> Self {
        Self {
            enabled: enabled && ttl_seconds > 0,
            capacity,
            ttl: Duration::from_secs(ttl_seconds),
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, path: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }

        {
            let guard = self.store.read().await;
            match guard.get(path) {
                Some(entry) if Instant::now() <= entry.expires_at => {
                    return Some(entry.body.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        self.store.write().await.remove(path);
        None
    }

    pub async fn insert(&self, path: String, body: Value) {
        if !self.enabled {
            return;
        }

        let now = Instant::now();
        let mut guard = self.store.write().await;

        if guard.len() >= self.capacity {
            guard.retain(|_, entry| entry.expires_at > now);
        }
        if guard.len() >= self.capacity {
            // Evict whichever entry would have expired first.
            if let Some(oldest) = guard
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone())
            {
                guard.remove(&oldest);
            }
        }

        guard.insert(
            path,
            CachedResponse {
                body,
                expires_at: now + self.ttl,
            },
        );
    }
}
