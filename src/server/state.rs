use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::cache::ResponseCache;
use crate::store::Store;

const CACHE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<Store>,
    pub cache: ResponseCache,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<Store>) -> Self {
        let cache = ResponseCache::new(config.cache_enabled, CACHE_CAPACITY, config.api_cache_ttl);
        Self {
            config,
            store,
            cache,
        }
    }
}
