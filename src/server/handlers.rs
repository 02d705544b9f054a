use std::future::Future;

use axum::Json;
use axum::extract::{OriginalUri, Path, State};
use chrono::{Datelike, NaiveDate};
use serde_json::{Value, json};
use tracing::debug;

use crate::core::clock::{current_datetime, ottawa_today};
use crate::core::error::AppError;
use crate::features::activity::iter_recent;
use crate::features::hansards::Document;
use crate::features::text_analysis::{analyze_statements, top_word};
use crate::server::AppState;

const LATEST_DEBATES: usize = 20;

/// Serves `path` from the response cache; `build` only runs on a miss.
async fn cached<Fut>(state: &AppState, path: &str, build: Fut) -> Result<Json<Value>, AppError>
where
    Fut: Future<Output = Result<Value, AppError>>,
{
    if let Some(hit) = state.cache.get(path).await {
        debug!(path, "response cache hit");
        return Ok(Json(hit));
    }
    let body = build.await?;
    state.cache.insert(path.to_string(), body.clone()).await;
    Ok(Json(body))
}

fn debate_for(state: &AppState, year: i32, month: u32, day: u32) -> Result<Document, AppError> {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AppError::not_found(format!("no such date {year}-{month}-{day}")))?;
    state
        .store
        .debate_on(date)?
        .filter(|document| document.public)
        .ok_or_else(|| AppError::not_found(format!("no debate on {date}")))
}

fn document_summary(document: &Document) -> Value {
    let mut value = document.to_api_value(false);
    if let Some(map) = value.as_object_mut() {
        map.insert("url".into(), document.absolute_url().into());
    }
    value
}

pub async fn handle_healthcheck() -> Result<Json<Value>, AppError> {
    Ok(Json(json!({ "status": "ok", "time": current_datetime() })))
}

pub async fn handle_debates(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Value>, AppError> {
    cached(&state, uri.path(), async {
        let debates = state.store.latest_debates(LATEST_DEBATES)?;
        Ok(json!({ "objects": debates.iter().map(document_summary).collect::<Vec<_>>() }))
    })
    .await
}

pub async fn handle_debate(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path((year, month, day)): Path<(i32, u32, u32)>,
) -> Result<Json<Value>, AppError> {
    cached(&state, uri.path(), async {
        let document = debate_for(&state, year, month, day)?;
        let statements = state.store.statements_for(document.id)?;
        let mut value = document.to_api_value(true);
        if let Some(map) = value.as_object_mut() {
            map.insert("url".into(), document.absolute_url().into());
            map.insert(
                "statements".into(),
                statements
                    .iter()
                    .map(|statement| statement.to_api_value())
                    .collect(),
            );
        }
        Ok(value)
    })
    .await
}

/// Old debates are compared against a model of their own year.
fn debate_corpus(date: NaiveDate, today: NaiveDate) -> String {
    if date.year() < today.year() - 1 {
        format!("debates-{}", date.year())
    } else {
        "debates".to_string()
    }
}

pub async fn handle_debate_analysis(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path((year, month, day)): Path<(i32, u32, u32)>,
) -> Result<Json<Value>, AppError> {
    cached(&state, uri.path(), async {
        let mut document = debate_for(&state, year, month, day)?;
        let statements = state.store.statements_for(document.id)?;
        let corpus = debate_corpus(document.date.unwrap_or_else(ottawa_today), ottawa_today());
        let analysis =
            analyze_statements(&statements, &state.config.language_model_path, &corpus).await?;

        if let Some(word) = analysis.as_deref().and_then(top_word) {
            if word != document.most_frequent_word {
                document.most_frequent_word = word.to_string();
                state.store.save_document(&document)?;
            }
        }
        Ok(json!(analysis))
    })
    .await
}

pub async fn handle_vote(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path((session_id, number)): Path<(String, u32)>,
) -> Result<Json<Value>, AppError> {
    cached(&state, uri.path(), async {
        let vote = state
            .store
            .get_vote(&session_id, number)?
            .ok_or_else(|| AppError::not_found(format!("no vote {session_id}/{number}")))?;
        let bill_url = match vote.bill_id {
            Some(id) => state.store.get_bill(id)?.map(|bill| bill.absolute_url()),
            None => None,
        };

        let mut ballots = Vec::new();
        for ballot in state.store.ballots_for(&session_id, number)? {
            let politician = state.store.get_politician(ballot.politician_id)?;
            ballots.push(json!({
                "politician_url": politician.as_ref().map(|p| p.absolute_url()),
                "politician": politician.map(|p| p.name),
                "party": ballot.party,
                "riding": ballot.riding,
                "ballot": ballot.vote.label(),
                "dissent": ballot.dissent,
            }));
        }

        Ok(json!({
            "session": vote.session_id,
            "number": vote.number,
            "date": vote.date.to_string(),
            "description": { "en": vote.description_en, "fr": vote.description_fr },
            "result": vote.result,
            "yea_total": vote.yea_total,
            "nay_total": vote.nay_total,
            "paired_total": vote.paired_total,
            "bill_url": bill_url,
            "context_statement": vote.context_statement.as_ref().map(|context| context.url.clone()),
            "party_votes": vote.party_votes,
            "url": vote.absolute_url(),
            "ballots": ballots,
        }))
    })
    .await
}

pub async fn handle_politician_activity(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(slug): Path<String>,
) -> Result<Json<Value>, AppError> {
    cached(&state, uri.path(), async {
        let politician = state
            .store
            .politician_by_slug(&slug)?
            .ok_or_else(|| AppError::not_found(format!("no politician {slug}")))?;
        let recent = iter_recent(state.store.public_activities_for(politician.id)?);
        Ok(json!({
            "politician": politician.name,
            "url": politician.absolute_url(),
            "objects": recent
                .iter()
                .map(|activity| json!({
                    "date": activity.date.to_string(),
                    "variety": activity.variety,
                    "guid": activity.guid,
                    "payload": activity.payload,
                }))
                .collect::<Vec<_>>(),
        }))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_debates_use_the_shared_corpus() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).expect("date");
        let old = NaiveDate::from_ymd_opt(2019, 5, 2).expect("date");
        let last_year = NaiveDate::from_ymd_opt(2023, 5, 2).expect("date");
        assert_eq!(debate_corpus(old, today), "debates-2019");
        assert_eq!(debate_corpus(last_year, today), "debates");
    }
}
