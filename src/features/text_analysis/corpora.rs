//! Background n-gram models that text analysis compares against.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::info;

use crate::core::error::AppError;
use crate::features::hansards::{DocumentType, Statement};
use crate::features::text_analysis::frequency::FrequencyModel;
use crate::store::Store;

/// Debates before this year are not modelled.
const FIRST_MODELLED_YEAR: i32 = 1994;

static R_UNSAFE_CORPUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("valid corpus regex"));

pub fn background_model_path(root: &Path, corpus: &str, n: usize) -> PathBuf {
    let corpus = R_UNSAFE_CORPUS.replace_all(corpus, "");
    root.join(format!("{corpus}.{n}gram"))
}

pub async fn load_background_model(
    root: &Path,
    corpus: &str,
    n: usize,
) -> Result<FrequencyModel, AppError> {
    let path = background_model_path(root, corpus, n);
    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            AppError::not_found(format!("no background model at {}", path.display()))
        } else {
            AppError::internal(format!("failed to read {}: {err}", path.display()))
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        AppError::parse(format!("invalid background model {}: {err}", path.display()))
    })
}

pub async fn generate_background_models(
    root: &Path,
    corpus: &str,
    statements: &[Statement],
    ngram_lengths: &[usize],
) -> Result<(), AppError> {
    tokio::fs::create_dir_all(root).await.map_err(|err| {
        AppError::internal(format!("failed to create {}: {err}", root.display()))
    })?;
    for &n in ngram_lengths {
        let min_count = if n < 3 { 5 } else { 3 };
        let model = FrequencyModel::from_statements(statements, n, min_count);
        let path = background_model_path(root, corpus, n);
        let data = serde_json::to_vec(&model)
            .map_err(|err| AppError::internal(format!("failed to encode model: {err}")))?;
        tokio::fs::write(&path, data).await.map_err(|err| {
            AppError::internal(format!("failed to write {}: {err}", path.display()))
        })?;
    }
    info!(
        corpus,
        statements = statements.len(),
        "generated background models"
    );
    Ok(())
}

fn statements_where(
    store: &Store,
    include_document: impl Fn(&crate::features::hansards::Document) -> bool,
    include_statement: impl Fn(&Statement) -> bool,
) -> Result<Vec<Statement>, AppError> {
    let mut statements = Vec::new();
    for document in store.documents()? {
        if include_document(&document) {
            statements.extend(
                store
                    .statements_for(document.id)?
                    .into_iter()
                    .filter(&include_statement),
            );
        }
    }
    Ok(statements)
}

pub async fn generate_for_debates(
    store: &Store,
    root: &Path,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    let since = now - Duration::days(365);
    let recent = |statement: &Statement| statement.time >= since;
    let debates = statements_where(
        store,
        |document| document.document_type == DocumentType::Debate,
        recent,
    )?;
    generate_background_models(root, "debates", &debates, &[1, 2, 3]).await?;
    let everything = statements_where(store, |_| true, recent)?;
    generate_background_models(root, "default", &everything, &[1, 2, 3]).await
}

pub async fn generate_for_old_debates(
    store: &Store,
    root: &Path,
    today: NaiveDate,
) -> Result<(), AppError> {
    let mut by_year: BTreeMap<i32, Vec<Statement>> = BTreeMap::new();
    for statement in statements_where(
        store,
        |document| document.document_type == DocumentType::Debate,
        |statement| (FIRST_MODELLED_YEAR..today.year()).contains(&statement.time.year()),
    )? {
        by_year
            .entry(statement.time.year())
            .or_default()
            .push(statement);
    }
    for (year, statements) in by_year {
        generate_background_models(root, &format!("debates-{year}"), &statements, &[1, 2, 3])
            .await?;
    }
    Ok(())
}

/// One corpus per committee that met in the current session, covering its
/// last three years of evidence.
pub async fn generate_for_committees(
    store: &Store,
    root: &Path,
    today: NaiveDate,
) -> Result<(), AppError> {
    let session = store.current_session()?;
    let since = today - Duration::days(365 * 3);
    let mut committees: Vec<String> = store
        .documents_in_session(&session.id, DocumentType::Evidence)?
        .into_iter()
        .filter_map(|document| document.committee_slug)
        .collect();
    committees.sort();
    committees.dedup();

    for slug in committees {
        let statements = statements_where(
            store,
            |document| {
                document.document_type == DocumentType::Evidence
                    && document.committee_slug.as_deref() == Some(slug.as_str())
                    && document.date.is_some_and(|date| date >= since)
            },
            |_| true,
        )?;
        generate_background_models(root, &slug, &statements, &[1, 2, 3]).await?;
    }
    Ok(())
}
