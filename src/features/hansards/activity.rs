use serde_json::json;
use tracing::warn;

use crate::config::AppConfig;
use crate::core::error::AppError;
use crate::core::language::Language;
use crate::features::activity::{NewActivity, save_activity};
use crate::features::hansards::dto::{Document, DocumentType, Statement};
use crate::store::Store;

/// Members need to have said this much at a committee meeting for it to
/// show up in their activity feed.
const COMMITTEE_MIN_WORDS: u32 = 80;

struct TopicExcerpt {
    topic: String,
    text: String,
    url: String,
}

struct SpeakerSummary {
    politician_id: u64,
    wordcount: u32,
    topics: Vec<TopicExcerpt>,
}

fn summarize(statements: &[Statement]) -> Vec<SpeakerSummary> {
    let mut speakers: Vec<SpeakerSummary> = Vec::new();
    for statement in statements.iter().filter(|statement| !statement.procedural) {
        let Some(politician) = &statement.politician else {
            continue;
        };
        let position = speakers
            .iter()
            .position(|s| s.politician_id == politician.id);
        let index = match position {
            Some(index) => index,
            None => {
                speakers.push(SpeakerSummary {
                    politician_id: politician.id,
                    wordcount: 0,
                    topics: Vec::new(),
                });
                speakers.len() - 1
            }
        };
        let speaker = &mut speakers[index];
        speaker.wordcount += statement.wordcount;

        let text = statement.text_plain(Language::En);
        let slot = speaker
            .topics
            .iter_mut()
            .find(|t| t.topic == statement.topic());
        match slot {
            // The longest statement on a topic makes the best excerpt.
            Some(existing) if text.len() > existing.text.len() => {
                existing.text = text;
                existing.url = statement.urlcache.clone();
            }
            Some(_) => {}
            None => speaker.topics.push(TopicExcerpt {
                topic: statement.topic().to_string(),
                text,
                url: statement.urlcache.clone(),
            }),
        }
    }
    speakers
}

/// Adds activity items for everyone who spoke in `document`.
pub fn save_document_activity(
    store: &Store,
    config: &AppConfig,
    document: &Document,
    statements: &[Statement],
) -> Result<usize, AppError> {
    let Some(date) = document.date else {
        warn!(
            document = document.id,
            "document has no date; skipping activity"
        );
        return Ok(0);
    };

    let mut saved = 0;
    for speaker in summarize(statements) {
        match document.document_type {
            DocumentType::Debate => {
                for excerpt in speaker.topics {
                    let item = NewActivity {
                        variety: "statement".to_string(),
                        guid: format!("statement_{}", excerpt.url),
                        politician_id: speaker.politician_id,
                        date,
                        payload: json!({
                            "topic": excerpt.topic,
                            "url": excerpt.url,
                            "text": excerpt.text,
                        }),
                    };
                    if save_activity(store, config.save_activities, item)? {
                        saved += 1;
                    }
                }
            }
            DocumentType::Evidence => {
                if speaker.wordcount < COMMITTEE_MIN_WORDS {
                    continue;
                }
                let Some(excerpt) = speaker.topics.into_iter().max_by_key(|t| t.text.len()) else {
                    continue;
                };
                let item = NewActivity {
                    variety: "committee".to_string(),
                    guid: format!("cmte_{}", excerpt.url),
                    politician_id: speaker.politician_id,
                    date,
                    payload: json!({
                        "meeting": document.number,
                        "meeting_url": document.absolute_url(),
                        "committee": document.committee_name,
                        "text": excerpt.text,
                        "url": excerpt.url,
                        "wordcount": speaker.wordcount,
                    }),
                };
                if save_activity(store, config.save_activities, item)? {
                    saved += 1;
                }
            }
        }
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::features::hansards::dto::Speaker;

    fn spoken(politician_id: u64, topic: &str, text: &str, url: &str, wordcount: u32) -> Statement {
        Statement {
            h2_en: topic.to_string(),
            content_en: format!("<p>{text}</p>"),
            urlcache: url.to_string(),
            wordcount,
            politician: Some(Speaker {
                id: politician_id,
                name: format!("MP {politician_id}"),
                slug: format!("mp-{politician_id}"),
            }),
            ..Statement::default()
        }
    }

    #[test]
    fn one_activity_per_topic_with_longest_excerpt() {
        let store = Store::temporary().expect("store");
        let config = AppConfig::for_data_dir(std::path::Path::new("/tmp"));
        let mut debate = Document::new_debate("44-1", 1, "12");
        debate.date = NaiveDate::from_ymd_opt(2022, 2, 1);

        let statements = vec![
            spoken(1, "Housing", "Short.", "/debates/2022/2/1/mp-1-1/", 1),
            spoken(
                1,
                "Housing",
                "A much longer remark.",
                "/debates/2022/2/1/mp-1-2/",
                4,
            ),
            spoken(1, "Taxes", "On taxes.", "/debates/2022/2/1/mp-1-3/", 2),
            Statement {
                procedural: true,
                ..spoken(2, "Housing", "Order.", "/debates/2022/2/1/mp-2-1/", 1)
            },
        ];
        let count = save_document_activity(&store, &config, &debate, &statements)
            .expect("save");
        assert_eq!(count, 2);

        let saved = store
            .get_activity("statement_/debates/2022/2/1/mp-1-2/")
            .expect("lookup")
            .expect("housing activity");
        assert_eq!(saved.payload["text"], "A much longer remark.");
        assert!(store.public_activities_for(2).expect("lookup").is_empty());
    }

    #[test]
    fn committee_activity_needs_enough_words() {
        let store = Store::temporary().expect("store");
        let config = AppConfig::for_data_dir(std::path::Path::new("/tmp"));
        let mut meeting = Document::new_evidence("44-1", 2, "fina", "Finance");
        meeting.number = "3".into();
        meeting.date = NaiveDate::from_ymd_opt(2022, 2, 3);

        let statements = vec![
            spoken(
                1,
                "Budget",
                "Plenty to say.",
                "/committees/fina/44-1/3/mp-1-1/",
                120,
            ),
            spoken(
                2,
                "Budget",
                "Briefly.",
                "/committees/fina/44-1/3/mp-2-1/",
                10,
            ),
        ];
        let count = save_document_activity(&store, &config, &meeting, &statements)
            .expect("save");
        assert_eq!(count, 1);
        let feed = store.public_activities_for(1).expect("lookup");
        assert_eq!(feed[0].variety, "committee");
    }
}
