//! Hansard XML to statement HTML.
//!
//! The document is walked depth-first; each element gets a handler call when
//! it opens and again when it closes, and the open call can stop descent.
//! Text is attributed the same way the House transcripts lay it out: an
//! element's own leading text is emitted when it opens, the text following
//! it when it closes.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use roxmltree::{Node, NodeId, ParsingOptions};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::core::error::AppError;
use crate::core::language::Language;
use crate::core::parsetools::{build_tag, escape_html, time_to_datetime, title_case};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

static R_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static R_HOUSEMET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?P<text>The\s+House\s+met\s+at|La\s+séance\s+est\s+ouverte\s+à)\s+(?P<number>\d[\d:\.]*)\s*(?P<ampm>[ap]\.m\.|)",
    )
    .expect("valid house-met regex")
});
static R_PERSON_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    let labels = [
        r"Mr\.?\s",
        r"Mrs\.?\s",
        r"Ms\.?\s",
        r"Miss\.?\s",
        r"Hon\.?\s",
        r"Right\sHon\.\s",
        r"The\sSpeaker",
        r"Le\sprésident",
        r"The\sChair",
        r"The\sDeputy",
        r"The\sActing",
        r"An\s[hH]on\.?\s",
        r"Une\svoix",
        r"Des\svoix",
        r"Some\s[hH]on\.\s",
        r"M\.\s",
        r"Acting\s",
        r"L.hon\.?\s",
        r"Le\strès\s",
        r"Assistant\s",
        r"Mme\.?\s",
        r"Mlle\.?\s",
        r"Dr\.?\s",
    ];
    Regex::new(&format!("^({})", labels.join("|"))).expect("valid person label regex")
});
static R_HONORIFIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(Mr\.?\s|Mrs\.?\s|Ms\.?\s|Miss\.?\s|Hon\.?\s|Right\sHon\.\s|M\.\s|L.hon\.?\s|Mme\.?\s|Mlle\.?\s|Dr\.?\s)",
    )
    .expect("valid honorific regex")
});
static R_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.+\)\s*").expect("valid parens regex"));
static R_INDETERMINATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(An?|Une)\s").expect("valid indeterminate regex"));
static R_CONTEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s?\((.+)\)\s*$").expect("valid context regex"));
static R_HE_SAID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([S]?[hH]e said:|--)\s*").expect("valid he-said regex"));
static R_PARAGRAPH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-HoCid="(\d+)""#).expect("valid paragraph id regex"));
static R_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+):(\d+)").expect("valid clock regex"));

/// Contents are discarded.
const EXCLUDE_TAGS: &[&str] = &["CatchLine", "Prayer", "QuestionID", "Appendix"];

/// Kept, attributes dropped, possibly renamed.
const PASSTHROUGH_TAGS: &[(&str, &str)] = &[
    ("I", "em"),
    ("Sup", "sup"),
    ("Sub", "sub"),
    ("table", "table"),
    ("row", "tr"),
    ("entry", "td"),
];

/// Text is kept; the tag itself produces nothing.
const IGNORE_TAGS: &[&str] = &[
    "Quote",
    "QuotePara",
    "ForceColumnBreak",
    "SubjectOfBusinessContent",
    "Content",
    "HansardBody",
    "Intro",
    "Poetry",
    "Query",
    "Motion",
    "MotionBody",
    "CommitteeQuote",
    "LegislationQuote",
    "Pause",
    "StartPause",
    "EndPause",
    "Date",
    "Insertion",
    "colspec",
    "tgroup",
    "tbody",
    "thead",
    "title",
    "EditorsNotes",
];

#[derive(Debug, Error)]
pub enum AlpheusError {
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("missing metadata item {0}")]
    MissingMetadata(String),
    #[error("I don't know how to handle tag {0:?}")]
    UnknownTag(String),
    #[error("trying to save a statement without content")]
    EmptyStatement,
    #[error("malformed document: {0}")]
    Malformed(String),
}

impl From<AlpheusError> for AppError {
    fn from(err: AlpheusError) -> Self {
        AppError::parse(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitteeMeta {
    pub acronym: String,
    pub name_en: String,
    pub name_fr: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentMeta {
    pub date: NaiveDate,
    pub parliament: u32,
    pub session: u32,
    pub language: String,
    pub document_type: String,
    pub document_number: String,
    pub committee: Option<CommitteeMeta>,
}

impl DocumentMeta {
    pub fn is_committee(&self) -> bool {
        self.document_type.eq_ignore_ascii_case("committee")
    }

    fn items(&self) -> Vec<(&'static str, String)> {
        let mut items = vec![
            ("date", self.date.to_string()),
            ("document_number", self.document_number.clone()),
            ("document_type", self.document_type.clone()),
            ("language", self.language.clone()),
            ("parliament", self.parliament.to_string()),
            ("session", self.session.to_string()),
        ];
        if let Some(committee) = &self.committee {
            items.push(("committee_acronym", committee.acronym.clone()));
            items.push(("committee_name_en", committee.name_en.clone()));
            items.push(("committee_name_fr", committee.name_fr.clone()));
        }
        items.sort_by(|a, b| a.0.cmp(b.0));
        items
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedStatement {
    pub id: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub language: Option<Language>,
    pub h1: Option<String>,
    pub h2: Option<String>,
    pub h3: Option<String>,
    pub person_attribution: Option<String>,
    pub person_id: Option<String>,
    pub person_type: Option<String>,
    pub person_context: Option<String>,
    pub intervention_type: Option<String>,
    pub written_question: Option<String>,
    pub has_non_procedural: bool,
    pub content: String,
}

impl ParsedStatement {
    fn clean_up_content(&mut self) {
        self.content = tame(&self.content).replace("</blockquote><blockquote>", "");
        if self.id.is_none() {
            self.id = R_PARAGRAPH_ID
                .captures(&self.content)
                .and_then(|caps| caps.get(1))
                .map(|id| format!("p{}", id.as_str()));
        }
    }

    pub fn as_html(&self) -> String {
        let mut attrs: Vec<(&str, String)> = vec![
            ("class", "statement".to_string()),
            (
                "data-timestamp",
                self.timestamp
                    .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default(),
            ),
        ];
        let optional = [
            ("id", &self.id),
            ("data-person-speaking-attribution", &self.person_attribution),
            ("data-person-speaking-HoCid", &self.person_id),
            ("data-person-speaking-type", &self.person_type),
            ("data-h1", &self.h1),
            ("data-h2", &self.h2),
            ("data-h3", &self.h3),
            ("data-intervention-type", &self.intervention_type),
            ("data-written-question", &self.written_question),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_ref().filter(|value| !value.is_empty()) {
                attrs.push((key, value.clone()));
            }
        }
        format!("{}{}</div>", build_tag("div", &attrs), self.content)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
    pub meta: DocumentMeta,
    pub statements: Vec<ParsedStatement>,
}

impl ParsedDocument {
    pub fn as_html(&self) -> String {
        let mut title = if self.meta.is_committee() {
            let committee = self.meta.committee.as_ref();
            if self.meta.language.starts_with("en") {
                committee.map(|c| c.name_en.clone()).unwrap_or_default()
            } else {
                committee.map(|c| c.name_fr.clone()).unwrap_or_default()
            }
        } else if self.meta.document_type.eq_ignore_ascii_case("debates") {
            if self.meta.language.starts_with("en") {
                "House Debates".to_string()
            } else {
                "Débats du Chambre".to_string()
            }
        } else {
            String::new()
        };
        title.push_str(&format!(", {}", self.meta.date));

        let metadata_rows: Vec<String> = self
            .meta
            .items()
            .into_iter()
            .map(|(key, value)| {
                format!(
                    "{}<th>{}</th><td>{}</td></tr>",
                    build_tag(
                        "tr",
                        &[
                            ("class", "metadata".to_string()),
                            ("data-name", key.to_string()),
                            ("data-value", value.clone()),
                        ],
                    ),
                    escape_html(key),
                    escape_html(&value)
                )
            })
            .collect();
        let statements: Vec<String> = self.statements.iter().map(|s| s.as_html()).collect();

        format!(
            r#"<!DOCTYPE html>
<html lang="{lang}"><head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" type="text/css" href="http://rhymeswithcycle.github.com/alpheus/alpheus.css">
</head>
<body><h1>{title}</h1>
<table>{rows}</table>
{statements}
<script type="text/javascript" src="http://rhymeswithcycle.github.com/alpheus/alpheus.js"></script>
</body></html>
"#,
            lang = self.meta.language,
            rows = metadata_rows.join("\n"),
            statements = statements.join("\n"),
        )
    }

    pub fn speaker_names(&self) -> Vec<String> {
        self.statements
            .iter()
            .map(|s| s.person_attribution.clone().unwrap_or_default())
            .collect()
    }
}

pub fn parse_string(xml: &str) -> Result<ParsedDocument, AlpheusError> {
    let cleaned = xml
        .replace("<B />", "")
        .replace("<ParaText />", "")
        .replace("&ccedil;", "&#231;")
        .replace("&eacute;", "&#233;");
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let tree = roxmltree::Document::parse_with_options(&cleaned, options)?;
    parse_tree(&tree)
}

fn parse_tree(tree: &roxmltree::Document<'_>) -> Result<ParsedDocument, AlpheusError> {
    let root = tree.root_element();
    if root.tag_name().name() != "Hansard" {
        return Err(AlpheusError::Malformed(format!(
            "root element is {}, not Hansard",
            root.tag_name().name()
        )));
    }

    let number = |key: &str| -> Result<u32, AlpheusError> {
        let value = meta_value(root, key)?;
        value
            .trim()
            .parse::<u32>()
            .map_err(|_| AlpheusError::Malformed(format!("{key} is not a number: {value:?}")))
    };
    let date = NaiveDate::from_ymd_opt(
        number("MetaDateNumYear")? as i32,
        number("MetaDateNumMonth")?,
        number("MetaDateNumDay")?,
    )
    .ok_or_else(|| AlpheusError::Malformed("invalid sitting date".to_string()))?;

    let language = root
        .attribute((XML_NS, "lang"))
        .ok_or_else(|| AlpheusError::Malformed("Hansard element has no xml:lang".to_string()))?
        .to_lowercase();
    let document_type = meta_value(root, "MetaDocumentCategory")?;
    let committee = if document_type == "Committee" {
        Some(CommitteeMeta {
            acronym: meta_value(root, "Acronyme")?,
            name_en: meta_value(root, "InstitutionDebateEn")?,
            name_fr: meta_value(root, "InstitutionDebateFr")?,
        })
    } else {
        None
    };
    let document_number = meta_value(root, "Number")?
        .split_whitespace()
        .last()
        .unwrap_or("")
        .trim_start_matches('0')
        .to_string();

    let meta = DocumentMeta {
        date,
        parliament: number("ParliamentNumber")?,
        session: number("SessionNumber")?,
        language,
        document_type,
        document_number,
        committee,
    };

    let body = root
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == "HansardBody")
        .ok_or_else(|| AlpheusError::Malformed("no HansardBody".to_string()))?;

    let mut handler = ParseHandler::new(&meta);
    handler.explore(body)?;
    let statements = handler.final_statements()?;
    Ok(ParsedDocument { meta, statements })
}

fn meta_value(root: Node<'_, '_>, key: &str) -> Result<String, AlpheusError> {
    root.descendants()
        .find(|node| {
            node.is_element()
                && node.tag_name().name() == "ExtractedItem"
                && node.attribute("Name") == Some(key)
        })
        .map(|node| element_text(node).unwrap_or("").to_string())
        .ok_or_else(|| AlpheusError::MissingMetadata(key.to_string()))
}

/// Text before an element's first child.
fn element_text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.first_child()
        .filter(|child| child.is_text())
        .and_then(|child| child.text())
}

/// Text between an element and its next sibling.
fn element_tail<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.next_sibling()
        .filter(|sibling| sibling.is_text())
        .and_then(|sibling| sibling.text())
}

fn next_non_text<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    let mut next = node.next_sibling();
    while let Some(candidate) = next {
        if !candidate.is_text() {
            return Some(candidate);
        }
        next = candidate.next_sibling();
    }
    None
}

fn is_tag(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn has_quote_para(node: Node<'_, '_>) -> bool {
    node.descendants().skip(1).any(|n| is_tag(n, "QuotePara"))
}

fn text_content(node: Node<'_, '_>) -> String {
    let raw: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    tame(&raw)
}

fn tame(value: &str) -> String {
    R_WHITESPACE.replace_all(value, " ").trim().to_string()
}

fn letters_only(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_ascii_alphabetic())
        .collect()
}

fn smart_title(value: &str) -> String {
    let has_cased = value
        .chars()
        .any(|ch| ch.is_uppercase() || ch.is_lowercase());
    let all_upper = !value.chars().any(|ch| ch.is_lowercase());
    let all_lower = !value.chars().any(|ch| ch.is_uppercase());
    if has_cased && (all_upper || all_lower) {
        title_case(value)
    } else {
        value.to_string()
    }
}

fn strip_person_name(name: &str) -> String {
    let without_parens = R_PARENS.replace_all(&tame(name), "").into_owned();
    R_HONORIFIC.replace(&without_parens, "").trim().to_string()
}

fn housemet_time(number: &str, ampm: &str) -> Result<NaiveTime, AlpheusError> {
    let ampm = ampm.replace('.', "").to_lowercase();
    let number = number.replace('.', ":");
    let (hour, minute) = match R_CLOCK.captures(&number) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (number.trim_end_matches(':').to_string(), "00".to_string()),
    };
    let invalid = || AlpheusError::Malformed(format!("invalid sitting time {number} {ampm}"));
    let mut hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;

    if !ampm.is_empty() {
        if !(1..=12).contains(&hour) {
            return Err(invalid());
        }
        hour %= 12;
        if ampm == "pm" {
            hour += 12;
        }
    }
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Descend,
    Skip,
}

/// Attributes inherited by every statement started while they are set.
#[derive(Debug, Default)]
struct Context {
    language: Option<Language>,
    timestamp: Option<NaiveDateTime>,
    h1: Option<String>,
    h2: Option<String>,
    h3: Option<String>,
}

/// Attributes consumed by the next statement to start.
#[derive(Debug, Default)]
struct Pending {
    id: Option<String>,
    person_attribution: Option<String>,
    person_id: Option<String>,
    person_type: Option<String>,
    person_context: Option<String>,
    intervention_type: Option<String>,
    written_question: Option<String>,
    has_non_procedural: bool,
}

#[derive(Debug, Clone)]
struct Speaker {
    hoc_id: Option<String>,
    name: String,
}

struct ParseHandler {
    statements: Vec<ParsedStatement>,
    current: Option<ParsedStatement>,
    document_language: String,
    context: Context,
    pending: Pending,
    in_para: bool,
    /// Parent of a one-line interjection; its next paragraph returns to the main speaker.
    one_liner: Option<NodeId>,
    people_seen: HashMap<String, String>,
    people_types_seen: HashMap<String, String>,
    people_contexts: HashMap<String, String>,
    date: NaiveDate,
    /// The last `PersonSpeaking`; `None` until the first one is seen.
    main_speaker: Option<Speaker>,
    parliament: u32,
    session: u32,
    skip_text: HashSet<NodeId>,
    text_overrides: HashMap<NodeId, String>,
    tail_overrides: HashMap<NodeId, String>,
}

impl ParseHandler {
    fn new(meta: &DocumentMeta) -> Self {
        let document_language = meta.language.to_lowercase();
        Self {
            statements: Vec::new(),
            current: None,
            context: Context {
                language: document_language.parse().ok(),
                ..Context::default()
            },
            document_language,
            pending: Pending::default(),
            in_para: false,
            one_liner: None,
            people_seen: HashMap::new(),
            people_types_seen: HashMap::new(),
            people_contexts: HashMap::new(),
            date: meta.date,
            main_speaker: None,
            parliament: meta.parliament,
            session: meta.session,
            skip_text: HashSet::new(),
            text_overrides: HashMap::new(),
            tail_overrides: HashMap::new(),
        }
    }

    fn language_letter(&self) -> String {
        self.document_language
            .chars()
            .next()
            .map(|ch| ch.to_ascii_uppercase().to_string())
            .unwrap_or_default()
    }

    fn text_of(&self, node: Node<'_, '_>) -> Option<String> {
        match self.text_overrides.get(&node.id()) {
            Some(text) => Some(text.clone()),
            None => element_text(node).map(str::to_string),
        }
    }

    fn tail_of(&self, node: Node<'_, '_>) -> Option<String> {
        match self.tail_overrides.get(&node.id()) {
            Some(tail) => Some(tail.clone()),
            None => element_tail(node).map(str::to_string),
        }
    }

    fn has_tail_text(&self, node: Node<'_, '_>) -> bool {
        self.tail_of(node)
            .is_some_and(|tail| !tail.trim().is_empty())
    }

    /// Next non-blank character after an element, without moving up the tree.
    fn following_char(&self, node: Node<'_, '_>) -> Option<char> {
        let first = self
            .tail_of(node)
            .and_then(|tail| tail.trim().chars().next());
        if let Some(ch) = first {
            return Some(ch);
        }
        next_non_text(node)
            .and_then(|next| self.text_of(next))
            .and_then(|text| text.trim().chars().next())
    }

    fn explore(&mut self, node: Node<'_, '_>) -> Result<(), AlpheusError> {
        if self.handle(node, Tag::Open)? == Walk::Descend {
            for child in node.children().filter(|child| !child.is_text()) {
                self.explore(child)?;
            }
            self.handle(node, Tag::Close)?;
        }
        Ok(())
    }

    fn handle(&mut self, node: Node<'_, '_>, tag: Tag) -> Result<Walk, AlpheusError> {
        if !node.is_element() {
            // Processing instructions and comments only carry the text after them.
            if tag == Tag::Close && self.in_para {
                self.add_text(self.tail_of(node).as_deref());
            }
            return Ok(Walk::Descend);
        }

        match node.tag_name().name() {
            "ParaText" | "ThroneSpeechPara" => self.handle_para_text(node, tag, false),
            "ProceduralText" => self.handle_procedural_text(node, tag),
            "ThroneSpeech" => {
                if tag == Tag::Open {
                    let speaker = if self.document_language.starts_with('e') {
                        "The Governor General"
                    } else {
                        "Le gouverneur général"
                    };
                    self.new_person(None, speaker, None)?;
                }
                Ok(Walk::Descend)
            }
            "B" => {
                if !self.skip_text.contains(&node.id()) {
                    self.add_code(if tag == Tag::Close { "</strong>" } else { "<strong>" });
                }
                self.add_tag_text(node, tag);
                Ok(Walk::Descend)
            }
            "Verse" => {
                self.add_code(if tag == Tag::Open { "<span class=\"verse\">" } else { "</span>" });
                self.add_tag_text(node, tag);
                Ok(Walk::Descend)
            }
            "Line" => {
                if tag == Tag::Close {
                    self.add_code("<br>");
                }
                self.add_tag_text(node, tag);
                Ok(Walk::Descend)
            }
            "PersonSpeaking" | "Questioner" | "Responder" => {
                if tag == Tag::Open {
                    self.handle_person_speaking(node)
                } else {
                    Ok(Walk::Descend)
                }
            }
            "Intervention" => {
                match tag {
                    Tag::Open => {
                        self.pending.intervention_type = node.attribute("Type").map(str::to_string);
                        self.pending.id = node.attribute("id").map(str::to_string);
                    }
                    Tag::Close => self.close_statement()?,
                }
                Ok(Walk::Descend)
            }
            "FloorLanguage" => {
                if tag == Tag::Open {
                    let lang = node.attribute("language").unwrap_or("").to_lowercase();
                    self.context.language = match lang.as_str() {
                        "en" => Some(Language::En),
                        "fr" => Some(Language::Fr),
                        _ => None,
                    };
                }
                Ok(Walk::Skip)
            }
            "Timestamp" => {
                if tag == Tag::Open {
                    self.handle_timestamp(node)?;
                }
                Ok(Walk::Skip)
            }
            "SubjectOfBusinessQualifier" => {
                self.context.h3 = Some(text_content(node));
                Ok(Walk::Skip)
            }
            "SubjectOfBusinessTitle" => {
                self.context.h2 = Some(text_content(node));
                Ok(Walk::Skip)
            }
            "SubjectOfBusiness" => {
                if tag == Tag::Close {
                    self.context.h3 = None;
                }
                Ok(Walk::Descend)
            }
            "OrderOfBusiness" => {
                if tag == Tag::Close {
                    self.context.h1 = None;
                    self.context.h2 = None;
                }
                Ok(Walk::Descend)
            }
            "OrderOfBusinessTitle" => {
                self.context.h1 = Some(smart_title(&text_content(node)));
                Ok(Walk::Skip)
            }
            "WrittenQuestionResponse" => {
                match tag {
                    Tag::Open => {
                        if let Some(question) = node.children().find(|c| is_tag(*c, "QuestionID")) {
                            self.context.h3 =
                                Some(text_content(question).replace("--", "").trim().to_string());
                        }
                    }
                    Tag::Close => {
                        if self
                            .context
                            .h3
                            .as_ref()
                            .is_some_and(|h3| h3.to_lowercase().starts_with("question"))
                        {
                            self.context.h3 = None;
                        }
                    }
                }
                Ok(Walk::Descend)
            }
            "QuestionContent" | "ResponseContent" => {
                match tag {
                    Tag::Open => {
                        let kind = if node.tag_name().name() == "QuestionContent" {
                            "question"
                        } else {
                            "response"
                        };
                        self.pending.written_question = Some(kind.to_string());
                    }
                    Tag::Close => self.close_statement()?,
                }
                Ok(Walk::Descend)
            }
            "Affiliation" => {
                let db_id = node
                    .attribute("DbId")
                    .filter(|_| !self.skip_text.contains(&node.id()));
                if let Some(db_id) = db_id {
                    match tag {
                        Tag::Open => {
                            let href = format!(
                                "http://www.parl.gc.ca/MembersOfParliament/ProfileMP.aspx?Key={db_id}&Language={}",
                                self.language_letter()
                            );
                            let link = build_tag(
                                "a",
                                &[
                                    ("href", href),
                                    ("data-HoCid", db_id.to_string()),
                                    ("class", "related_link politician".to_string()),
                                ],
                            );
                            self.add_code(&link);
                        }
                        Tag::Close => self.add_code("</a>"),
                    }
                }
                self.add_tag_text(node, tag);
                Ok(Walk::Descend)
            }
            "Document" => {
                if let Some(db_id) = node.attribute("DbId") {
                    match tag {
                        Tag::Open => {
                            let href = format!(
                                "http://www.parl.gc.ca/LegisInfo/BillDetails.aspx?&Mode=1&billId={db_id}&Language={}",
                                self.language_letter()
                            );
                            let link = build_tag(
                                "a",
                                &[
                                    ("href", href),
                                    ("data-HoCid", db_id.to_string()),
                                    ("class", "related_link legislation".to_string()),
                                ],
                            );
                            self.add_code(&link);
                        }
                        Tag::Close => self.add_code("</a>"),
                    }
                }
                self.add_tag_text(node, tag);
                Ok(Walk::Descend)
            }
            "Division" => {
                let number = node.attribute("DivisionNumber").unwrap_or("");
                let url = format!(
                    "http://www.parl.gc.ca/HouseChamberBusiness/ChamberVoteDetail.aspx?Language={}&Mode=1&Parl={}&Ses={}&Vote={number}",
                    self.language_letter(),
                    self.parliament,
                    self.session
                );
                let code = format!(
                    "{}{}Vote #{number}</a></p>",
                    build_tag("p", &[("class", "division procedural".to_string())]),
                    build_tag(
                        "a",
                        &[
                            ("class", "related_link vote".to_string()),
                            ("href", url),
                            ("data-number", number.to_string()),
                            ("data-HoCid", node.attribute("id").unwrap_or("").to_string()),
                        ],
                    ),
                );
                self.add_code(&code);
                Ok(Walk::Skip)
            }
            other => self.default_handler(node, other, tag),
        }
    }

    fn default_handler(
        &mut self,
        node: Node<'_, '_>,
        name: &str,
        tag: Tag,
    ) -> Result<Walk, AlpheusError> {
        if EXCLUDE_TAGS.contains(&name) {
            return Ok(Walk::Skip);
        }
        let passthrough = PASSTHROUGH_TAGS
            .iter()
            .find(|(source, _)| *source == name)
            .map(|(_, html)| *html);
        if let Some(html) = passthrough {
            let slash = if tag == Tag::Close { "/" } else { "" };
            self.add_code(&format!("<{slash}{html}>"));
        }
        if self.in_para {
            self.add_tag_text(node, tag);
        }
        if tag == Tag::Open && passthrough.is_none() && !IGNORE_TAGS.contains(&name) {
            return Err(AlpheusError::UnknownTag(name.to_string()));
        }
        Ok(Walk::Descend)
    }

    fn handle_procedural_text(
        &mut self,
        node: Node<'_, '_>,
        tag: Tag,
    ) -> Result<Walk, AlpheusError> {
        if self.has_tail_text(node) {
            return Err(AlpheusError::Malformed("text found after ProceduralText".to_string()));
        }
        if node.attribute("TocType") == Some("TPC") {
            // Table-of-contents headings.
            return Ok(if tag == Tag::Open { Walk::Skip } else { Walk::Descend });
        }
        self.handle_para_text(node, tag, true)
    }

    fn handle_para_text(
        &mut self,
        node: Node<'_, '_>,
        tag: Tag,
        mut procedural: bool,
    ) -> Result<Walk, AlpheusError> {
        if tag == Tag::Close {
            if !self.in_para {
                return Err(AlpheusError::Malformed(
                    "paragraph closed while not in a paragraph".to_string(),
                ));
            }
            self.in_para = false;
            self.add_code("</p>");
            if has_quote_para(node) {
                self.add_code("</blockquote>");
            }
            if self.has_tail_text(node) {
                return Err(AlpheusError::Malformed(format!(
                    "text found after paragraph {}",
                    node.attribute("id").unwrap_or("?")
                )));
            }
            return Ok(Walk::Descend);
        }

        let raw_text = self.text_of(node);
        let mytext = raw_text.as_deref().unwrap_or("").trim().to_string();

        let in_intro = node.parent().is_some_and(|parent| is_tag(parent, "Intro"));
        if in_intro && R_HOUSEMET.is_match(&mytext) {
            let caps = raw_text
                .as_deref()
                .and_then(|text| R_HOUSEMET.captures(text));
            if let Some(caps) = caps {
                let ampm = caps.name("ampm").map_or("", |m| m.as_str());
                let time = housemet_time(&caps["number"], ampm)?;
                self.context.timestamp = Some(self.date.and_time(time));
            }
            return Ok(Walk::Skip);
        }

        let first_child = node.children().find(|child| !child.is_text());
        let speaker_label =
            first_child.filter(|sub| mytext.is_empty() && self.is_speaker_label(node, *sub));

        if let Some(sub) = speaker_label {
            self.start_inline_speaker(node, sub)?;
        } else if let Some(parent) = self.one_liner.take() {
            if node.parent().map(|p| p.id()) == Some(parent) {
                let main = self.main_speaker.clone();
                let hoc_id = main.as_ref().and_then(|main| main.hoc_id.clone());
                let name = main.map(|main| main.name).unwrap_or_default();
                self.new_person(hoc_id.as_deref(), &name, None)?;
            }
        }

        self.in_para = true;

        if !self.is_person() {
            procedural = true;
        }

        if mytext.starts_with("moved") || mytext.starts_with("demande") {
            procedural = true;
            let mut next = next_non_text(node);
            while let Some(candidate) = next {
                if is_tag(candidate, "ParaText") && !has_quote_para(candidate) {
                    break;
                }
                next = next_non_text(candidate);
            }
            if let Some(candidate) = next {
                if let Some(text) = self.text_of(candidate).filter(|text| !text.is_empty()) {
                    let cleaned = R_HE_SAID.replace(&text, "").into_owned();
                    self.text_overrides.insert(candidate.id(), cleaned);
                }
            }
        }

        if mytext.starts_with(['(', '[']) {
            procedural = true;
        }

        let mut p_attrs: Vec<(&str, String)> =
            vec![("data-HoCid", node.attribute("id").unwrap_or("0").to_string())];
        if procedural {
            p_attrs.push(("class", "procedural".to_string()));
        } else {
            match self.current.as_mut() {
                Some(statement) => statement.has_non_procedural = true,
                None => self.pending.has_non_procedural = true,
            }
            if let Some(language) = self.context.language {
                p_attrs.push(("data-originallang", language.code().to_string()));
            }
        }

        if has_quote_para(node) {
            self.add_code("<blockquote>");
        }
        self.add_code(&build_tag("p", &p_attrs));
        self.add_tag_text(node, tag);
        Ok(Walk::Descend)
    }

    /// A paragraph opening with a bold or affiliation label usually means someone else is talking.
    fn is_speaker_label(&self, paragraph: Node<'_, '_>, sub: Node<'_, '_>) -> bool {
        if !(is_tag(sub, "B") || is_tag(sub, "Affiliation")) {
            return false;
        }
        let Some(text) = self.text_of(sub) else {
            return false;
        };
        let label = text.trim();
        if !label.chars().next().is_some_and(char::is_uppercase) {
            return false;
        }
        let Some(following) = self.following_char(sub) else {
            return false;
        };
        let interjection = paragraph.attribute("Interjection").unwrap_or("");
        label.ends_with(':')
            || following == ':'
            || !interjection.is_empty()
            || (R_PERSON_LABEL.is_match(label) && following.is_uppercase())
    }

    fn start_inline_speaker(
        &mut self,
        paragraph: Node<'_, '_>,
        sub: Node<'_, '_>,
    ) -> Result<(), AlpheusError> {
        let hoc_id = if is_tag(sub, "Affiliation") {
            sub.attribute("DbId").map(str::to_string)
        } else {
            None
        };
        let label = self.text_of(sub).unwrap_or_default();
        let attribution = tame(&label.replace(':', ""));

        let is_main = self.main_speaker.as_ref().is_some_and(|main| {
            hoc_id == main.hoc_id
                || letters_only(&main.name).starts_with(&letters_only(&attribution))
        });
        let returns_to_main = is_main || R_HONORIFIC.is_match(&attribution);
        self.one_liner = if returns_to_main {
            None
        } else {
            paragraph.parent().map(|parent| parent.id())
        };

        self.new_person(hoc_id.as_deref(), label.replace(':', "").trim(), None)?;

        if !label.ends_with(':') {
            let rest = self
                .tail_of(sub)
                .and_then(|tail| tail.strip_prefix(':').map(str::to_string));
            if let Some(rest) = rest {
                self.tail_overrides.insert(sub.id(), rest);
            }
        }
        self.skip_text.insert(sub.id());
        Ok(())
    }

    fn handle_person_speaking(&mut self, node: Node<'_, '_>) -> Result<Walk, AlpheusError> {
        let Some(affiliation) = node.children().find(|child| is_tag(*child, "Affiliation")) else {
            warn!(
                id = node.attribute("id").unwrap_or(""),
                "no affiliation in PersonSpeaking"
            );
            return Ok(Walk::Skip);
        };
        let name = element_text(affiliation).unwrap_or("").to_string();
        if name.is_empty() {
            warn!(id = node.attribute("id").unwrap_or(""), "empty affiliation");
            return Ok(Walk::Skip);
        }

        let hoc_id = affiliation.attribute("DbId");
        self.new_person(hoc_id, &name, affiliation.attribute("Type"))?;
        self.main_speaker = Some(Speaker {
            hoc_id: hoc_id.map(str::to_string),
            name,
        });

        if let Some(tail) = self.tail_of(affiliation) {
            let content = tail.replace(':', "").trim().to_string();
            if !content.is_empty() && !content.starts_with('(') {
                warn!(%content, "content inside PersonSpeaking");
                self.add_text(Some(&content));
            }
        }
        Ok(Walk::Skip)
    }

    fn handle_timestamp(&mut self, node: Node<'_, '_>) -> Result<(), AlpheusError> {
        let Some(hour) = node.attribute("Hr") else {
            return Ok(());
        };
        let invalid = || AlpheusError::Malformed(format!("invalid timestamp {hour}"));
        let hour: u32 = hour.replace(' ', "").parse().map_err(|_| invalid())?;
        let minute: u32 = node
            .attribute("Mn")
            .map(|mn| mn.trim().parse())
            .transpose()
            .map_err(|_| invalid())?
            .unwrap_or(0);
        let timestamp = time_to_datetime(hour, minute, self.date).ok_or_else(invalid)?;
        self.context.timestamp = Some(timestamp);

        if let Some(statement) = self.current.as_mut() {
            if !statement.has_non_procedural {
                statement.timestamp = Some(timestamp);
            }
        }
        Ok(())
    }

    fn start_statement(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.current = Some(ParsedStatement {
            id: pending.id,
            timestamp: self.context.timestamp,
            language: self.context.language,
            h1: self.context.h1.clone(),
            h2: self.context.h2.clone(),
            h3: self.context.h3.clone(),
            person_attribution: pending.person_attribution,
            person_id: pending.person_id,
            person_type: pending.person_type,
            person_context: pending.person_context,
            intervention_type: pending.intervention_type,
            written_question: pending.written_question,
            has_non_procedural: pending.has_non_procedural,
            content: String::new(),
        });
    }

    /// Appends markup to the current statement, starting one if needed.
    fn add_code(&mut self, code: &str) {
        if code.is_empty() {
            return;
        }
        if self.current.is_none() {
            self.start_statement();
        }
        if let Some(statement) = self.current.as_mut() {
            statement.content.push_str(code);
        }
    }

    fn add_text(&mut self, text: Option<&str>) {
        if let Some(text) = text.filter(|text| !text.is_empty()) {
            self.add_code(&escape_html(text));
        }
    }

    fn add_tag_text(&mut self, node: Node<'_, '_>, tag: Tag) {
        match tag {
            Tag::Open => {
                if !self.skip_text.contains(&node.id()) {
                    self.add_text(self.text_of(node).as_deref());
                }
            }
            Tag::Close => self.add_text(self.tail_of(node).as_deref()),
        }
    }

    fn close_statement(&mut self) -> Result<(), AlpheusError> {
        if let Some(mut statement) = self.current.take() {
            statement.clean_up_content();
            if statement.content.trim().is_empty() {
                return Err(AlpheusError::EmptyStatement);
            }
            self.statements.push(statement);
        }
        Ok(())
    }

    fn final_statements(mut self) -> Result<Vec<ParsedStatement>, AlpheusError> {
        if self
            .current
            .as_ref()
            .is_some_and(|statement| !statement.content.trim().is_empty())
        {
            self.close_statement()?;
        }
        Ok(self.statements)
    }

    fn is_person(&self) -> bool {
        let attribution = match &self.current {
            Some(statement) => statement.person_attribution.as_deref(),
            None => self.pending.person_attribution.as_deref(),
        };
        attribution.is_some_and(|name| !name.is_empty())
    }

    /// Someone has started speaking. Closes the current statement unless it is the same person.
    fn new_person(
        &mut self,
        hoc_id: Option<&str>,
        description: &str,
        affiliation_type: Option<&str>,
    ) -> Result<(), AlpheusError> {
        let description = tame(description);
        let stripped = strip_person_name(&description);

        if let Some(current) = &self.current {
            let same_person = match hoc_id {
                Some(id) if !id.is_empty() && current.person_id.as_deref() == Some(id) => true,
                Some(_) => false,
                None => current.person_attribution.as_deref().is_some_and(|attribution| {
                    letters_only(&stripped) == letters_only(&strip_person_name(attribution))
                }),
            };
            // "An hon. member" twice in a row can be two people.
            if same_person && !R_INDETERMINATE.is_match(&description) {
                return Ok(());
            }
            self.close_statement()?;
        }

        self.pending.person_attribution = Some(description.clone());
        match hoc_id.filter(|id| !id.is_empty()) {
            Some(id) => self.pending.person_id = Some(id.to_string()),
            None => {
                if let Some(id) = self.people_seen.get(&stripped) {
                    self.pending.person_id = Some(id.clone());
                }
            }
        }

        let affiliation_type = affiliation_type.filter(|kind| !kind.is_empty());
        match affiliation_type {
            Some("28") => self.pending.person_type = Some("witness".to_string()),
            Some("27") => self.pending.person_type = Some("clerk".to_string()),
            Some("26") => self.pending.person_type = Some("analyst".to_string()),
            Some(_) => {}
            None => {
                if let Some(kind) = self.people_types_seen.get(&stripped) {
                    self.pending.person_type = Some(kind.clone());
                }
            }
        }

        if let Some(caps) = R_CONTEXT.captures(&description) {
            self.pending.person_context = Some(caps[1].to_string());
        } else if let Some(context) = self.people_contexts.get(&stripped) {
            self.pending.person_context = Some(context.clone());
        }

        for key in [description, stripped] {
            if let Some(id) = hoc_id.filter(|id| !id.is_empty()) {
                self.people_seen.insert(key.clone(), id.to_string());
            }
            if let Some(kind) = &self.pending.person_type {
                self.people_types_seen.insert(key.clone(), kind.clone());
            }
            if let Some(context) = &self.pending.person_context {
                self.people_contexts.insert(key, context.clone());
            }
        }
        Ok(())
    }
}
