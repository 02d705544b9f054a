use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::error::AppError;
use crate::core::http_client::SourceClient;
use crate::store::Store;

/// Everything a job needs to talk to upstream and the database.
#[derive(Clone)]
pub struct JobContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<Store>,
    pub source: SourceClient,
}

impl JobContext {
    pub fn new(config: Arc<AppConfig>, store: Arc<Store>) -> Result<Self, AppError> {
        let source = SourceClient::new(config.disable_proxy)?;
        Ok(Self {
            config,
            store,
            source,
        })
    }
}
