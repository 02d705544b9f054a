use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::features::politicians::Membership;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "D")]
    Debate,
    #[serde(rename = "E")]
    Evidence,
}

impl DocumentType {
    pub fn display(self) -> &'static str {
        match self {
            Self::Debate => "Debate",
            Self::Evidence => "Committee Evidence",
        }
    }
}

/// A House sitting's Hansard or a committee meeting's evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub document_type: DocumentType,
    pub date: Option<NaiveDate>,
    /// Sitting or meeting number; a few carry letters, e.g. `128-B`.
    pub number: String,
    pub session_id: String,
    pub source_id: u64,
    pub committee_slug: Option<String>,
    pub committee_name: Option<String>,
    #[serde(default)]
    pub most_frequent_word: String,
    pub downloaded: bool,
    pub skip_parsing: bool,
    pub public: bool,
    pub multilingual: bool,
}

impl Document {
    pub fn new_debate(session_id: &str, source_id: u64, number: &str) -> Self {
        Self {
            id: 0,
            document_type: DocumentType::Debate,
            date: None,
            number: number.to_string(),
            session_id: session_id.to_string(),
            source_id,
            committee_slug: None,
            committee_name: None,
            most_frequent_word: String::new(),
            downloaded: false,
            skip_parsing: false,
            public: false,
            multilingual: false,
        }
    }

    pub fn new_evidence(
        session_id: &str,
        source_id: u64,
        committee_slug: &str,
        committee_name: &str,
    ) -> Self {
        Self {
            document_type: DocumentType::Evidence,
            committee_slug: Some(committee_slug.to_string()),
            committee_name: Some(committee_name.to_string()),
            ..Self::new_debate(session_id, source_id, "")
        }
    }

    pub fn absolute_url(&self) -> Option<String> {
        match self.document_type {
            DocumentType::Debate => self
                .date
                .map(|date| format!("/debates/{}/{}/{}/", date.year(), date.month(), date.day())),
            DocumentType::Evidence => self.committee_slug.as_ref().map(|slug| {
                format!("/committees/{slug}/{}/{}/", self.session_id, self.number)
            }),
        }
    }

    pub fn text_analysis_url(&self) -> Option<String> {
        self.absolute_url()
            .map(|url| format!("{url}text-analysis/"))
    }

    pub fn source_url(&self) -> String {
        match self.document_type {
            DocumentType::Debate => format!(
                "https://www.ourcommons.ca/DocumentViewer/en/{}/house/sitting-{}/hansard",
                self.session_id, self.number
            ),
            DocumentType::Evidence => format!(
                "https://www.ourcommons.ca/DocumentViewer/en/{}/{}/meeting-{}/evidence",
                self.session_id,
                self.committee_slug
                    .as_deref()
                    .unwrap_or_default()
                    .to_uppercase(),

                self.number
            ),
        }
    }

    pub fn filename(&self, lang: &str) -> String {
        format!("{}-{lang}.xml", self.source_id)
    }

    pub fn to_api_value(&self, detail: bool) -> serde_json::Value {
        let mut value = serde_json::json!({
            "date": self.date.map(|date| date.to_string()),
            "number": self.number,
            "most_frequent_word": { "en": self.most_frequent_word },
        });
        if detail {
            if let Some(map) = value.as_object_mut() {
                map.insert("source_id".into(), self.source_id.into());
                map.insert("source_url".into(), self.source_url().into());
                map.insert("session".into(), self.session_id.clone().into());
                map.insert("document_type".into(), self.document_type.display().into());
            }
        }
        value
    }
}

/// The politician a statement is attributed to, denormalised for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Statement {
    pub document_id: u64,
    pub sequence: u32,
    pub time: NaiveDateTime,
    pub source_id: String,
    pub slug: String,
    pub urlcache: String,

    pub h1_en: String,
    pub h2_en: String,
    pub h3_en: String,
    pub h1_fr: String,
    pub h2_fr: String,
    pub h3_fr: String,

    pub politician: Option<Speaker>,
    pub member: Option<Membership>,
    pub who_en: String,
    pub who_fr: String,
    pub who_hocid: Option<u32>,
    pub who_context_en: String,
    pub who_context_fr: String,

    pub content_en: String,
    pub content_fr: String,
    pub wordcount: u32,
    pub wordcount_en: Option<u32>,
    pub procedural: bool,
    /// `Q` or `R` for written questions and responses.
    pub written_question: String,
    pub statement_type: String,

    #[serde(default)]
    pub bill_ids: Vec<u64>,
    #[serde(default)]
    pub mentioned_politician_ids: Vec<u64>,
}

/// Recorded when a document is re-imported, so old sequence-based links keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OldSequenceMapping {
    pub document_id: u64,
    pub sequence: u32,
    pub slug: String,
}
