//! Turns a downloaded Hansard or evidence transcript into stored statements.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::{Captures, Regex};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::core::error::AppError;
use crate::core::language::Language;
use crate::features::hansards::activity::save_document_activity;
use crate::features::hansards::align::align_sequences;
use crate::features::hansards::alpheus::{ParsedStatement, parse_string};
use crate::features::hansards::dto::{Document, OldSequenceMapping, Speaker, Statement};
use crate::features::hansards::fetch::cached_xml;
use crate::features::hansards::links::{RelatedLinks, process_related_links};
use crate::features::hansards::statement::set_slugs;
use crate::features::politicians::get_by_parl_affil_id;
use crate::features::sessions::Session;
use crate::features::text_analysis::WordCounter;
use crate::features::text_analysis::frequency::text_token_iterator;
use crate::features::votes::dto::ContextStatement;
use crate::store::Store;

const MAX_WHO_CHARS: usize = 300;
const MAX_FREQUENT_WORD_CHARS: usize = 20;

static R_PARAGRAPHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<p[^>]* data-HoCid=.+?</p>").expect("valid paragraph regex"));
static R_PARAGRAPH_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<p[^>]* data-HoCid="(\d+)""#).expect("valid paragraph id regex")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Replace existing statements.
    pub force: bool,
    /// Replace existing statements, recording where the old sequence numbers went.
    pub preserve_sequence: bool,
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

fn who_text(value: Option<&str>) -> String {
    truncate_chars(value.unwrap_or_default(), MAX_WHO_CHARS)
}

/// `0` for paragraphs without an id.
fn paragraph_id(paragraph: &str) -> u64 {
    R_PARAGRAPH_ID
        .captures(paragraph)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

fn paragraph_ids(content: &str) -> Vec<u64> {
    R_PARAGRAPHS
        .find_iter(content)
        .map(|m| paragraph_id(m.as_str()))
        .collect()
}

/// h1/h2/h3 for one language; a heading with no topic moves its subtopic up.
fn headings(parsed: &ParsedStatement) -> (String, String, String) {
    let h1 = parsed.h1.clone().unwrap_or_default();
    let mut h2 = parsed.h2.clone().unwrap_or_default();
    let mut h3 = parsed.h3.clone().unwrap_or_default();
    if !h1.is_empty() && h2.is_empty() {
        h2 = std::mem::take(&mut h3);
    }
    (h1, h2, h3)
}

fn build_statement(
    store: &Store,
    document: &Document,
    session: &Session,
    sequence: u32,
    parsed: &ParsedStatement,
) -> Result<Statement, AppError> {
    let date = document
        .date
        .ok_or_else(|| AppError::internal(format!("document {} has no date", document.id)))?;
    let midnight = date.and_time(NaiveTime::MIN);
    let (h1_en, h2_en, h3_en) = headings(parsed);
    let who_en = who_text(parsed.person_attribution.as_deref());

    let who_hocid = match parsed.person_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => match id.parse::<u32>() {
            Ok(hocid) => Some(hocid),
            Err(_) => {
                warn!(person_id = id, "could not parse person id");
                None
            }
        },
        None => None,
    };

    let mut statement = Statement {
        document_id: document.id,
        sequence,
        time: parsed.timestamp.unwrap_or(midnight),
        source_id: parsed.id.clone().unwrap_or_default(),
        h1_en,
        h2_en,
        h3_en,
        who_context_en: who_text(parsed.person_context.as_deref()),
        who_en,
        who_hocid,
        content_en: parsed.content.clone(),
        statement_type: parsed
            .intervention_type
            .as_deref()
            .unwrap_or_default()
            .to_lowercase(),
        written_question: parsed
            .written_question
            .as_deref()
            .unwrap_or_default()
            .to_uppercase()
            .chars()
            .take(1)
            .collect(),
        ..Statement::default()
    };

    // A person type marks witnesses and staff, who are never politicians.
    if let (Some(hocid), None) = (who_hocid, parsed.person_type.as_ref()) {
        match get_by_parl_affil_id(store, hocid, Some(session), Some(&statement.who_en))? {
            Some(politician) => {
                statement.member = politician.member_for(date).cloned();
                statement.politician = Some(Speaker {
                    id: politician.id,
                    name: politician.name,
                    slug: politician.slug,
                });
            }
            None => info!(hocid, who = %statement.who_en, "could not resolve speaking politician"),
        }
    }
    Ok(statement)
}

struct FrenchParagraphs<'a> {
    by_statement: HashMap<&'a str, &'a ParsedStatement>,
    by_id: HashMap<u64, String>,
    missing_ids: usize,
}

impl<'a> FrenchParagraphs<'a> {
    fn new(statements: &'a [ParsedStatement]) -> Self {
        let mut by_statement = HashMap::new();
        let mut by_id = HashMap::new();
        let mut missing_ids = 0;
        for statement in statements {
            if let Some(id) = statement.id.as_deref() {
                by_statement.insert(id, statement);
            }
            for paragraph in R_PARAGRAPHS.find_iter(&statement.content) {
                match paragraph_id(paragraph.as_str()) {
                    0 => missing_ids += 1,
                    id => {
                        by_id.insert(id, paragraph.as_str().to_string());
                    }
                }
            }
        }
        Self {
            by_statement,
            by_id,
            missing_ids,
        }
    }

    /// The English content with each paragraph swapped for its French twin.
    fn substitute(&self, content_en: &str, document_id: u64) -> String {
        R_PARAGRAPHS
            .replace_all(content_en, |caps: &Captures<'_>| {
                let paragraph = &caps[0];
                match paragraph_id(paragraph) {
                    0 => paragraph.to_string(),
                    id => self.by_id.get(&id).cloned().unwrap_or_else(|| {
                        error!(
                            paragraph = id,
                            document = document_id,
                            "paragraph not found in French"
                        );
                        paragraph.to_string()
                    }),
                }
            })
            .into_owned()
    }
}

/// Fills in French content and headings. Returns whether every statement
/// could be matched.
fn merge_french(
    store: &Store,
    document: &Document,
    statements: &mut [Statement],
    related: &mut [RelatedLinks],
    french: &[ParsedStatement],
) -> Result<bool, AppError> {
    if statements.len() != french.len() {
        info!(
            document = document.id,
            "French and English statement counts don't match"
        );
    }
    let paragraphs = FrenchParagraphs::new(french);
    if paragraphs.missing_ids > paragraphs.by_id.len() {
        error!(document = document.id, "French paragraphs not available");
        return Ok(false);
    }

    let mut multilingual = true;
    for (statement, links) in statements.iter_mut().zip(related.iter_mut()) {
        let fr_data = paragraphs
            .by_statement
            .get(statement.source_id.as_str())
            .copied();
        let ids_en = paragraph_ids(&statement.content_en);
        let ids_fr = fr_data.map(|fr| paragraph_ids(&fr.content));

        if let Some(fr) = fr_data.filter(|_| ids_fr.as_ref() == Some(&ids_en)) {
            statement.content_fr =
                process_related_links(store, &document.session_id, &fr.content, links)?;
        } else if ids_en.iter().all(|id| *id != 0) {
            let substituted = paragraphs.substitute(&statement.content_en, document.id);
            statement.content_fr =
                process_related_links(store, &document.session_id, &substituted, links)?;
        } else {
            warn!(statement = %statement.source_id, "could not do multilingual match");
            multilingual = false;
        }

        if let Some(fr) = fr_data {
            let (h1, h2, h3) = headings(fr);
            statement.h1_fr = h1;
            statement.h2_fr = h2;
            statement.h3_fr = h3;
            statement.who_fr = who_text(fr.person_attribution.as_deref());
            statement.who_context_fr = who_text(fr.person_context.as_deref());
        }
    }
    Ok(multilingual)
}

/// The most common meaningful word spoken in the substantive statements.
pub fn most_frequent_word(statements: &[Statement]) -> String {
    let mut counter = WordCounter::new();
    for statement in statements.iter().filter(|statement| !statement.procedural) {
        for token in text_token_iterator(&statement.text_plain(Language::En)) {
            if token.chars().count() > 2 {
                counter.add(&token);
            }
        }
    }
    counter
        .most_common(Some(1))
        .into_iter()
        .next()
        .map(|(word, _)| truncate_chars(&word, MAX_FREQUENT_WORD_CHARS))
        .unwrap_or_default()
}

/// Parses a document's cached XML and replaces its statements.
pub async fn import_document(
    store: &Store,
    config: &AppConfig,
    mut document: Document,
    options: ImportOptions,
) -> Result<Document, AppError> {
    let mut old_statements = Vec::new();
    if store.has_statements(document.id)? {
        if options.preserve_sequence {
            if !store.sequence_mappings_for(document.id)?.is_empty() {
                return Err(AppError::bad_request(format!(
                    "sequence mapping already exists for document {}",
                    document.id
                )));
            }
            old_statements = store.statements_for(document.id)?;
        } else if !options.force {
            return Err(AppError::bad_request(format!(
                "statements already exist for document {}",
                document.id
            )));
        }
    }

    let xml_en = cached_xml(config, &document, Language::En).await?;
    let xml_fr = cached_xml(config, &document, Language::Fr).await?;
    let parsed_en = parse_string(&xml_en)?;
    let parsed_fr = parse_string(&xml_fr)?;

    match document.date {
        Some(date) if date != parsed_en.meta.date && date != parsed_fr.meta.date => {
            error!(document = document.id, %date, parsed = %parsed_en.meta.date, "date mismatch");
        }
        Some(_) => {}
        None => document.date = Some(parsed_en.meta.date),
    }
    document.number = parsed_en.meta.document_number.clone();
    document.public = true;

    let session = store
        .get_session(&document.session_id)?
        .ok_or_else(|| AppError::not_found(format!("no session {}", document.session_id)))?;

    let mut statements = Vec::with_capacity(parsed_en.statements.len());
    let mut related = Vec::with_capacity(parsed_en.statements.len());
    for parsed in &parsed_en.statements {
        let sequence = u32::try_from(statements.len())
            .map_err(|_| AppError::internal("too many statements".to_string()))?;
        let mut statement = build_statement(store, &document, &session, sequence, parsed)?;
        let mut links = RelatedLinks::default();
        statement.content_en = process_related_links(
            store,
            &document.session_id,
            &statement.content_en,
            &mut links,
        )?;
        statements.push(statement);
        related.push(links);
    }

    document.multilingual = merge_french(
        store,
        &document,
        &mut statements,
        &mut related,
        &parsed_fr.statements,
    )?;

    set_slugs(&mut statements);

    let mappings: Vec<OldSequenceMapping> = if old_statements.is_empty() {
        Vec::new()
    } else {
        align_sequences(&statements, &old_statements)
            .into_iter()
            .map(|(sequence, slug)| OldSequenceMapping {
                document_id: document.id,
                sequence,
                slug,
            })
            .collect()
    };

    let mut votes = Vec::new();
    for (statement, links) in statements.iter_mut().zip(related) {
        statement.prepare_for_save(&document);
        statement.mentioned_politician_ids = links.politician_ids.into_iter().collect();
        statement.bill_ids = links.bill_ids.into_iter().collect();
        if let Some(mut vote) = links.vote {
            vote.context_statement = Some(ContextStatement {
                document_id: document.id,
                sequence: statement.sequence,
                url: statement.urlcache.clone(),
            });
            votes.push(vote);
        }
    }

    store.replace_statements(document.id, &statements)?;
    store.save_sequence_mappings(&mappings)?;
    for vote in &votes {
        store.save_vote(vote)?;
    }
    document.most_frequent_word = most_frequent_word(&statements);
    store.save_document(&document)?;
    info!(
        document = document.id,
        statements = statements.len(),
        multilingual = document.multilingual,
        "imported document"
    );

    save_document_activity(store, config, &document, &statements)?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_ids_come_from_data_attributes() {
        let content = r#"<p data-HoCid="12" data-originallang="en">One</p><p data-HoCid="" class="procedural">Two</p>"#;
        assert_eq!(paragraph_ids(content), [12, 0]);
    }

    #[test]
    fn headings_shift_up_when_topic_is_missing() {
        let parsed = ParsedStatement {
            h1: Some("Government Orders".into()),
            h3: Some("Budget Implementation Act".into()),
            ..ParsedStatement::default()
        };
        assert_eq!(
            headings(&parsed),
            (
                "Government Orders".to_string(),
                "Budget Implementation Act".to_string(),
                String::new()
            )
        );
    }

    #[test]
    fn most_frequent_word_skips_procedural_and_stopwords() {
        let statements = vec![
            Statement {
                content_en: "<p>The pharmacare plan, pharmacare now, said the member.</p>".into(),
                ..Statement::default()
            },
            Statement {
                content_en: "<p>Order order order.</p>".into(),
                procedural: true,
                ..Statement::default()
            },
        ];
        assert_eq!(most_frequent_word(&statements), "pharmacare");
    }
}
