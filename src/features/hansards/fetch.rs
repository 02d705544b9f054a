//! Downloading Hansard XML from ourcommons.ca and keeping the local copies.

use std::path::PathBuf;

use roxmltree::{Document as XmlDocument, ParsingOptions};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::core::error::AppError;
use crate::core::http_client::{SourceClient, parse_url};
use crate::core::language::Language;
use crate::features::hansards::dto::{Document, DocumentType};
use crate::features::hansards::importer::{ImportOptions, import_document};
use crate::features::sessions::Session;
use crate::store::Store;

pub fn hansard_url(base: &str, session: &Session, sitting: u32, language: Language) -> String {
    format!(
        "{base}/Content/House/{}{}/Debates/{sitting:03}/HAN{sitting:03}-{}.XML",
        session.parliamentnum,
        session.sessnum,
        language.letter()
    )
}

pub fn xml_path(config: &AppConfig, document: &Document, language: Language) -> PathBuf {
    config
        .hansard_cache_dir
        .join(document.filename(language.code()))
}

pub async fn cached_xml(
    config: &AppConfig,
    document: &Document,
    language: Language,
) -> Result<String, AppError> {
    if !document.downloaded {
        return Err(AppError::bad_request(format!(
            "document {} has not been downloaded",
            document.id
        )));
    }
    let path = xml_path(config, document, language);
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|err| AppError::internal(format!("failed to read {}: {err}", path.display())))
}

/// Writes both languages to the cache and marks the document downloaded.
pub async fn save_xml(
    store: &Store,
    config: &AppConfig,
    document: &mut Document,
    xml_en: &[u8],
    xml_fr: &[u8],
    overwrite: bool,
) -> Result<(), AppError> {
    let paths = [
        xml_path(config, document, Language::En),
        xml_path(config, document, Language::Fr),
    ];
    if !overwrite {
        for path in &paths {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(AppError::bad_request(format!(
                    "XML already exists at {}",
                    path.display()
                )));
            }
        }
    }
    tokio::fs::create_dir_all(&config.hansard_cache_dir)
        .await
        .map_err(|err| AppError::internal(format!("failed to create cache dir: {err}")))?;
    for (path, content) in paths.iter().zip([xml_en, xml_fr]) {
        tokio::fs::write(path, content).await.map_err(|err| {
            AppError::internal(format!("failed to write {}: {err}", path.display()))
        })?;
    }
    document.downloaded = true;
    store.save_document(document)
}

fn source_id_of(xml: &[u8]) -> Result<u64, AppError> {
    let text = std::str::from_utf8(xml)
        .map_err(|err| AppError::parse(format!("Hansard XML is not UTF-8: {err}")))?;
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let tree = XmlDocument::parse_with_options(text, options)
        .map_err(|err| AppError::parse(format!("failed to parse Hansard XML: {err}")))?;
    tree.root_element()
        .attribute("id")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| AppError::parse("Hansard XML has no numeric id".to_string()))
}

/// Downloads one sitting. `Ok(None)` means ourcommons.ca has nothing there yet.
pub async fn fetch_debate_for_sitting(
    store: &Store,
    source: &SourceClient,
    config: &AppConfig,
    session: &Session,
    sitting: u32,
) -> Result<Option<Document>, AppError> {
    let url = parse_url(&hansard_url(&config.source_base, session, sitting, Language::En))?;
    let (status, xml_en) = source.get_with_status(&url).await?;
    if !status.is_success() {
        if status != reqwest::StatusCode::NOT_FOUND {
            error!(%url, %status, "unexpected response for Hansard");
        }
        return Ok(None);
    }
    let url = parse_url(&hansard_url(&config.source_base, session, sitting, Language::Fr))?;
    let xml_fr = source.get_bytes(&url).await?;

    let source_id = source_id_of(&xml_en)?;
    if store.document_by_source_id(source_id)?.is_some() {
        return Err(AppError::upstream(format!(
            "document at source_id {source_id} already exists but not sitting {sitting}"
        )));
    }
    let french_id = source_id_of(&xml_fr)?;
    if french_id != source_id {
        return Err(AppError::upstream(format!(
            "French Hansard id {french_id} does not match English {source_id}"
        )));
    }

    let mut document =
        store.create_document(Document::new_debate(&session.id, source_id, &sitting.to_string()))?;
    save_xml(store, config, &mut document, &xml_en, &xml_fr, false).await?;
    info!(sitting = %document.number, source_id, "saved sitting");
    Ok(Some(document))
}

/// Probes for sittings after the highest one we have until one is missing.
pub async fn fetch_latest_debates(
    store: &Store,
    source: &SourceClient,
    config: &AppConfig,
    session: &Session,
) -> Result<usize, AppError> {
    // Special sittings such as 128-B are not numeric and are skipped here.
    let mut sitting = store
        .documents_in_session(&session.id, DocumentType::Debate)?
        .iter()
        .filter_map(|document| document.number.parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    let mut fetched = 0;
    loop {
        sitting += 1;
        match fetch_debate_for_sitting(store, source, config, session, sitting).await? {
            Some(_) => fetched += 1,
            None => break,
        }
    }
    Ok(fetched)
}

/// Downloads a debate's XML again and re-imports it.
pub async fn refresh_xml(
    store: &Store,
    source: &SourceClient,
    config: &AppConfig,
    mut document: Document,
) -> Result<Document, AppError> {
    if document.document_type != DocumentType::Debate {
        return Err(AppError::bad_request("only debates can be refreshed".to_string()));
    }
    let session = store
        .get_session(&document.session_id)?
        .ok_or_else(|| AppError::not_found(format!("no session {}", document.session_id)))?;
    let sitting: u32 = document.number.parse().map_err(|_| {
        AppError::bad_request(format!("sitting {} is not numeric", document.number))
    })?;

    let url_en = parse_url(&hansard_url(&config.source_base, &session, sitting, Language::En))?;
    let url_fr = parse_url(&hansard_url(&config.source_base, &session, sitting, Language::Fr))?;
    let xml_en = source.get_bytes(&url_en).await?;
    let xml_fr = source.get_bytes(&url_fr).await?;
    save_xml(store, config, &mut document, &xml_en, &xml_fr, true).await?;

    let options = ImportOptions {
        force: true,
        ..ImportOptions::default()
    };
    import_document(store, config, document, options).await
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn builds_hansard_urls() {
        let session = Session::new(44, 1, NaiveDate::from_ymd_opt(2021, 11, 22).expect("date"));
        assert_eq!(
            hansard_url("https://www.ourcommons.ca", &session, 7, Language::Fr),
            "https://www.ourcommons.ca/Content/House/441/Debates/007/HAN007-F.XML"
        );
    }

    #[test]
    fn reads_source_id_from_root() {
        let xml = br#"<?xml version="1.0"?><Hansard id="11412345" xml:lang="en-CA"/>"#;
        assert_eq!(source_id_of(xml).expect("id"), 11412345);
        assert!(source_id_of(b"<Hansard/>").is_err());
    }
}
