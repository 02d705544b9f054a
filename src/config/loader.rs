use std::env;
use std::path::PathBuf;

use crate::config::dto::{AppConfig, DEFAULT_BILLS_BASE, DEFAULT_SOURCE_BASE};
use crate::core::error::AppError;
use crate::core::language::Language;

pub fn load_config() -> Result<AppConfig, AppError> {
    dotenvy::dotenv().ok();

    let port = env::var("PARLIAMENT_PORT")
        .or_else(|_| env::var("PORT"))
        .unwrap_or_else(|_| "8000".to_string())
        .parse::<u16>()
        .map_err(|err| AppError::configuration(format!("invalid port: {err}")))?;

    let db_path =
        env::var("PARLIAMENT_DB_PATH").unwrap_or_else(|_| "data/openparliament.sled".to_string());
    let hansard_cache_dir = PathBuf::from(
        env::var("HANSARD_CACHE_DIR").unwrap_or_else(|_| "data/document_cache".to_string()),
    );
    let language_model_path = PathBuf::from(
        env::var("PARLIAMENT_LANGUAGE_MODEL_PATH")
            .unwrap_or_else(|_| "data/language_models".to_string()),
    );

    let source_base = trim_base(
        env::var("PARLIAMENT_SOURCE_BASE").unwrap_or_else(|_| DEFAULT_SOURCE_BASE.to_string()),
    );
    let bills_base = trim_base(
        env::var("PARLIAMENT_BILLS_BASE").unwrap_or_else(|_| DEFAULT_BILLS_BASE.to_string()),
    );

    let language = env::var("PARLIAMENT_LANGUAGE")
        .unwrap_or_else(|_| "en".to_string())
        .parse::<Language>()
        .map_err(|err| AppError::configuration(format!("invalid PARLIAMENT_LANGUAGE: {err}")))?;

    let api_cache_ttl = env::var("PARLIAMENT_API_CACHE_TTL")
        .unwrap_or_else(|_| "300".to_string())
        .parse::<u64>()
        .map_err(|err| {
            AppError::configuration(format!("invalid PARLIAMENT_API_CACHE_TTL: {err}"))
        })?;

    let admin_notify_url = env::var("PARLIAMENT_ADMIN_NOTIFY_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Ok(AppConfig {
        port,
        db_path,
        hansard_cache_dir,
        language_model_path,
        source_base,
        bills_base,
        language,
        save_activities: parse_bool_env("PARLIAMENT_SAVE_ACTIVITIES", true),
        disable_proxy: parse_bool_env("PARLIAMENT_DISABLE_PROXY", false),
        cache_enabled: parse_bool_env("PARLIAMENT_CACHE_ENABLED", true),
        api_cache_ttl,
        admin_notify_url,
    })
}

fn trim_base(value: String) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|value| matches!(value.as_str(), "true" | "1" | "TRUE" | "True"))
        .unwrap_or(default)
}
