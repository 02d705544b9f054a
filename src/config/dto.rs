use std::path::PathBuf;

use serde::Deserialize;

use crate::core::language::Language;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: String,
    pub hansard_cache_dir: PathBuf,
    pub language_model_path: PathBuf,
    pub source_base: String,
    pub bills_base: String,
    pub language: Language,
    pub save_activities: bool,
    pub disable_proxy: bool,
    pub cache_enabled: bool,
    pub api_cache_ttl: u64,
    pub admin_notify_url: Option<String>,
}

impl AppConfig {
    /// Settings suitable for tests and one-off tools: everything rooted under `root`.
    pub fn for_data_dir(root: &std::path::Path) -> Self {
        Self {
            port: 0,
            db_path: root.join("db").to_string_lossy().to_string(),
            hansard_cache_dir: root.join("document_cache"),
            language_model_path: root.join("language_models"),
            source_base: DEFAULT_SOURCE_BASE.to_string(),
            bills_base: DEFAULT_BILLS_BASE.to_string(),
            language: Language::En,
            save_activities: true,
            disable_proxy: false,
            cache_enabled: false,
            api_cache_ttl: 0,
            admin_notify_url: None,
        }
    }
}

pub const DEFAULT_SOURCE_BASE: &str = "https://www.ourcommons.ca";
pub const DEFAULT_BILLS_BASE: &str = "https://www.parl.ca";
