use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::core::language::Language;
use crate::core::parsetools::{
    R_MISTER, R_NOTAMEMBER, R_PARENS, R_POLITICALPOST, strip_tags, url_slug,
};
use crate::features::hansards::dto::{Document, Statement};

/// Statements this short by the Speaker or Chair are routine.
const PROCEDURAL_WORD_LIMIT: u32 = 300;

static R_CHAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Speaker|Chair|président)").expect("valid chair regex"));
static R_POST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((.+)\)").expect("valid post regex"));
static R_ORIGINAL_LANG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-originallang="(\w\w)""#).expect("valid lang regex"));

const ORIGINAL_LANG_ATTR: &str = "data-originallang=\"";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NameInfo {
    pub display_name: String,
    pub post: Option<String>,
    pub post_reminder: Option<String>,
    pub named: bool,
    pub url: Option<String>,
}

/// Puts each closing paragraph tag at the end of its own line.
fn normalize_content(content: &str) -> String {
    content
        .replace('\n', "")
        .replace("</p>", "</p>\n")
        .trim()
        .to_string()
}

fn is_spoken(paragraph: &str) -> bool {
    !paragraph.is_empty() && !paragraph.contains("class=\"procedural\"")
}

fn original_lang(paragraph: &str) -> Option<&str> {
    let idx = paragraph.find(ORIGINAL_LANG_ATTR)?;
    paragraph.get(idx + ORIGINAL_LANG_ATTR.len()..idx + ORIGINAL_LANG_ATTR.len() + 2)
}

impl Statement {
    pub fn content(&self, language: Language) -> &str {
        match language {
            Language::En => &self.content_en,
            Language::Fr => &self.content_fr,
        }
    }

    pub fn who(&self) -> &str {
        &self.who_en
    }

    pub fn who_context(&self) -> &str {
        &self.who_context_en
    }

    pub fn topic(&self) -> &str {
        &self.h2_en
    }

    pub fn date(&self) -> chrono::NaiveDate {
        self.time.date()
    }

    /// Normalises content, fills word counts and applies the routine-statement
    /// rule. Called on every statement before it is written.
    pub fn prepare_for_save(&mut self, document: &Document) {
        self.content_en = normalize_content(&self.content_en);
        self.content_fr = normalize_content(&self.content_fr);
        if self.wordcount_en.is_none() {
            self.generate_wordcounts();
        }
        if !self.procedural && self.wordcount <= PROCEDURAL_WORD_LIMIT && self.looks_routine() {
            self.procedural = true;
        }
        if self.urlcache.is_empty() {
            self.generate_url(document);
        }
    }

    fn looks_routine(&self) -> bool {
        let who = self.who();
        (R_NOTAMEMBER.is_match(who) && R_CHAIR.is_match(who))
            || who.is_empty()
            || !self.content_en.split('\n').any(is_spoken)
    }

    pub fn generate_wordcounts(&mut self) {
        let mut english = Vec::new();
        let mut french = Vec::new();
        for paragraph in self.content_en.split('\n') {
            match original_lang(paragraph) {
                None => {}
                Some("fr") => french.push(paragraph),
                Some("en") => english.push(paragraph),
                Some(other) => {
                    warn!(lang = other, "unrecognized language");
                    english.push(paragraph);
                }
            }
        }
        let count = |paragraphs: &[&str]| {
            let text = html_to_text(&paragraphs.join(" "));
            text.split_whitespace().count() as u32
        };
        let english_words = count(&english);
        self.wordcount = english_words + count(&french);
        self.wordcount_en = Some(english_words);
    }

    pub fn generate_url(&mut self, document: &Document) {
        let tail = if self.slug.is_empty() {
            self.sequence.to_string()
        } else {
            self.slug.clone()
        };
        self.urlcache = format!("{}{tail}/", document.absolute_url().unwrap_or_default());
    }

    pub fn absolute_url(&self) -> &str {
        &self.urlcache
    }

    pub fn text_plain(&self, language: Language) -> String {
        html_to_text(self.content(language))
    }

    /// The statement as originally spoken: each paragraph taken from the
    /// language it was delivered in.
    pub fn content_floor(&self) -> String {
        if self.content_fr.is_empty() {
            return self.content_en.clone();
        }
        let english: Vec<&str> = self.content_en.split('\n').collect();
        let french: Vec<&str> = self.content_fr.split('\n').collect();
        if english.len() != french.len() {
            error!(url = %self.urlcache, "different en/fr paragraphs");
            return self.content_en.clone();
        }
        english
            .iter()
            .zip(french.iter())
            .map(|(en, fr)| if original_lang(en) == Some("fr") { *fr } else { *en })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `content_floor`, but only when it would differ from `language`'s content.
    pub fn content_floor_if_necessary(&self, language: Language) -> String {
        if self.content_en.is_empty() || self.content_fr.is_empty() {
            return String::new();
        }
        let differs = R_ORIGINAL_LANG
            .captures_iter(self.content(language))
            .any(|caps| &caps[1] != language.code());
        if differs {
            self.content_floor()
        } else {
            String::new()
        }
    }

    pub fn name_info(&self) -> NameInfo {
        let who = self.who();
        let who_context = self.who_context();
        let mut info = NameInfo {
            named: true,
            ..NameInfo::default()
        };

        let Some(politician) = self.politician.as_ref().filter(|_| self.member.is_some()) else {
            info.display_name = R_MISTER.replace(who, "").into_owned();
            if !who_context.is_empty() {
                if who.contains(who_context) {
                    info.display_name = R_PARENS.replace(&info.display_name, "").into_owned();
                    info.post = Some(who_context.to_string());
                } else {
                    info.post_reminder = Some(who_context.to_string());
                }
                if let Some(hocid) = self.who_hocid {
                    let query = format!("Witness: \"{hocid}\"");
                    info.url = Some(format!("/search/?q={}", urlencoding::encode(&query)));
                }
            }
            return info;
        };

        info.url = Some(format!("/politicians/{}/", politician.slug));
        if R_NOTAMEMBER.is_match(who) {
            info.display_name = if who.contains(&politician.name) {
                R_POST.replace(who, "").into_owned()
            } else {
                who.to_string()
            };
            info.named = false;
        } else if !who.contains('(') || !R_POLITICALPOST.is_match(who) {
            info.display_name = politician.name.clone();
        } else {
            info.post = R_POST
                .captures(who)
                .and_then(|caps| caps[1].split(',').next().map(str::to_string));
            info.display_name = politician.name.clone();
        }
        info
    }

    pub fn to_api_value(&self) -> Value {
        let mut value = json!({
            "time": self.time.to_string(),
            "attribution": { "en": self.who_en, "fr": self.who_fr },
            "content": { "en": self.content_en, "fr": self.content_fr },
            "url": self.urlcache,
            "politician_url": self
                .politician
                .as_ref()
                .map(|politician| format!("/politicians/{}/", politician.slug)),
            "procedural": self.procedural,
            "source_id": self.source_id,
        });
        let Some(map) = value.as_object_mut() else {
            return value;
        };
        for (key, en, fr) in [
            ("h1", &self.h1_en, &self.h1_fr),
            ("h2", &self.h2_en, &self.h2_fr),
            ("h3", &self.h3_en, &self.h3_fr),
        ] {
            if !en.is_empty() {
                map.insert(key.into(), json!({ "en": en, "fr": fr }));
            }
        }
        if !self.urlcache.is_empty() {
            let trimmed = self.urlcache.trim_end_matches('/');
            let cut = trimmed.rfind('/').map_or(0, |idx| idx + 1);
            map.insert("document_url".into(), self.urlcache[..cut].into());
        }
        value
    }
}

pub fn html_to_text(text: &str) -> String {
    strip_tags(
        &text
            .replace('\n', "")
            .replace("<br>", "\n")
            .replace("</p>", "\n\n")
            .replace("&amp;", "&"),
    )
    .trim()
    .to_string()
}

/// Gives each statement a slug unique within its document: the speaker's
/// display name (or `procedural`) plus a running count.
pub fn set_slugs(statements: &mut [Statement]) {
    let mut counter: HashMap<String, u32> = HashMap::new();
    for statement in statements.iter_mut() {
        let mut slug: String = url_slug(&statement.name_info().display_name)
            .chars()
            .take(50)
            .collect();
        if slug.is_empty() {
            slug = "procedural".to_string();
        }
        let count = counter.entry(slug.clone()).or_insert(0);
        *count += 1;
        statement.slug = format!("{slug}-{count}");
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::features::hansards::dto::Speaker;
    use crate::features::politicians::Membership;

    fn document() -> Document {
        let mut document = Document::new_debate("44-1", 11_000_000, "100");
        document.date = NaiveDate::from_ymd_opt(2022, 6, 9);
        document
    }

    fn time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 6, 9)
            .and_then(|date| date.and_hms_opt(14, 0, 0))
            .expect("time")
    }

    fn member_statement(who: &str) -> Statement {
        Statement {
            time: time(),
            who_en: who.to_string(),
            politician: Some(Speaker {
                id: 1,
                name: "Chrystia Freeland".into(),
                slug: "chrystia-freeland".into(),
            }),
            member: Some(Membership {
                session_id: "44-1".into(),
                party: "Liberal".into(),
                riding: "University—Rosedale".into(),
                province: Some("ON".into()),
                start: NaiveDate::from_ymd_opt(2021, 11, 22).expect("date"),
                end: None,
            }),
            ..Statement::default()
        }
    }

    #[test]
    fn prepare_splits_paragraphs_and_counts_words() {
        let mut statement = member_statement("Hon. Chrystia Freeland");
        statement.content_en = "<p data-HoCid=\"1\" data-originallang=\"en\">Three words here.</p>\n<p data-HoCid=\"2\" data-originallang=\"fr\">Two words</p><p class=\"procedural\">(Motion agreed to)</p>".into();
        statement.prepare_for_save(&document());

        assert_eq!(statement.content_en.lines().count(), 3);
        assert_eq!(statement.wordcount, 5);
        assert_eq!(statement.wordcount_en, Some(3));
        assert!(!statement.procedural);
    }

    #[test]
    fn short_speaker_statements_are_procedural() {
        let mut statement = member_statement("The Speaker");
        statement.content_en = "<p data-HoCid=\"1\" data-originallang=\"en\">Order.</p>".into();
        statement.prepare_for_save(&document());
        assert!(statement.procedural);

        let mut statement = member_statement("Hon. Chrystia Freeland");
        statement.content_en = "<p data-HoCid=\"1\" data-originallang=\"en\">Mr. Speaker, the budget.</p>".into();
        statement.prepare_for_save(&document());
        assert!(!statement.procedural);
        assert_eq!(statement.urlcache, "/debates/2022/6/9/0/");
    }

    #[test]
    fn name_info_separates_post() {
        let statement =
            member_statement("Hon. Chrystia Freeland (Deputy Prime Minister and Minister of Finance, Lib.)");
        let info = statement.name_info();
        assert_eq!(info.display_name, "Chrystia Freeland");
        assert_eq!(
            info.post.as_deref(),
            Some("Deputy Prime Minister and Minister of Finance")
        );
        assert!(info.named);

        let mut statement = member_statement("The Acting Speaker (Mrs. Carol Hughes)");
        statement.politician = None;
        statement.member = None;
        assert_eq!(
            statement.name_info().display_name,
            "The Acting Speaker (Mrs. Carol Hughes)"
        );
    }

    #[test]
    fn slugs_are_numbered_per_speaker() {
        let mut statements = vec![
            member_statement("Hon. Chrystia Freeland"),
            Statement::default(),
            member_statement("Hon. Chrystia Freeland"),
        ];
        set_slugs(&mut statements);
        let slugs: Vec<&str> = statements.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(
            slugs.join(" "),
            "chrystia-freeland-1 procedural-1 chrystia-freeland-2"
        );
    }

    #[test]
    fn content_floor_uses_original_language() {
        let statement = Statement {
            content_en: "<p data-originallang=\"en\">Hello</p>\n<p data-originallang=\"fr\">Thanks</p>".into(),
            content_fr: "<p data-originallang=\"en\">Bonjour</p>\n<p data-originallang=\"fr\">Merci</p>".into(),
            ..Statement::default()
        };
        assert_eq!(
            statement.content_floor(),
            "<p data-originallang=\"en\">Hello</p>\n<p data-originallang=\"fr\">Merci</p>"
        );
        let floor = statement.content_floor();
        assert_eq!(statement.content_floor_if_necessary(Language::Fr), floor);
    }

    #[test]
    fn html_to_text_keeps_paragraph_breaks() {
        assert_eq!(
            html_to_text("<p>One &amp; two</p>\n<p>Three</p>"),
            "One & two\n\nThree"
        );
    }
}
