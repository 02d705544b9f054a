//! Rewrites the parser's `related_link` anchors into links to our own pages,
//! remembering which politicians, bills and votes a statement mentions.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{error, warn};

use crate::core::error::AppError;
use crate::core::parsetools::build_tag;
use crate::features::politicians::get_by_parl_affil_id;
use crate::features::votes::VoteQuestion;
use crate::store::Store;

static R_RELATED_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a class="related_link (\w+)" ([^>]+)>(.*?)</a>"#).expect("valid link regex")
});
static R_DATA_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-([\w-]+)="([^"]+)""#).expect("valid data attr regex"));
static R_BILL_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[CS]\-\d+[A-E]?\b").expect("valid bill number regex"));

/// What one statement's links point at.
#[derive(Debug, Default)]
pub struct RelatedLinks {
    pub politician_ids: BTreeSet<u64>,
    pub bill_ids: BTreeSet<u64>,
    pub vote: Option<VoteQuestion>,
}

pub fn process_related_links(
    store: &Store,
    session_id: &str,
    content: &str,
    related: &mut RelatedLinks,
) -> Result<String, AppError> {
    let mut output = String::with_capacity(content.len());
    let mut last = 0;
    for caps in R_RELATED_LINK.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        output.push_str(&content[last..whole.start()]);
        output.push_str(&process_related_link(store, session_id, &caps, related)?);
        last = whole.end();
    }
    output.push_str(&content[last..]);
    Ok(output)
}

fn data_attr<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    R_DATA_ATTR
        .captures_iter(attrs)
        .find(|caps| &caps[1] == name)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}

fn process_related_link(
    store: &Store,
    session_id: &str,
    caps: &Captures<'_>,
    related: &mut RelatedLinks,
) -> Result<String, AppError> {
    let (link_type, attrs, text) = (&caps[1], &caps[2], &caps[3]);
    let hocid: u64 = data_attr(attrs, "HoCid")
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| AppError::parse(format!("related link without a HoC id: {attrs}")))?;

    let (url, title) = match link_type {
        "politician" => {
            let found = u32::try_from(hocid)
                .ok()
                .map(|id| get_by_parl_affil_id(store, id, None, None))
                .transpose()?
                .flatten();
            let Some(politician) = found else {
                warn!(hocid, text, "could not resolve related politician");
                return Ok(text.to_string());
            };
            related.politician_ids.insert(politician.id);
            (politician.absolute_url(), Some(politician.name))
        }
        "legislation" => {
            let bill = match store.bill_by_legisinfo_id(hocid)? {
                Some(bill) => bill,
                None => {
                    let Some(number) = R_BILL_NUMBER.find(text) else {
                        error!(text, "invalid bill link");
                        return Ok(text.to_string());
                    };
                    store.create_temporary_bill(number.as_str(), session_id, Some(hocid))?
                }
            };
            related.bill_ids.insert(bill.id);
            (bill.absolute_url(), Some(bill.name().to_string()))
        }
        "vote" => {
            let number: u32 = data_attr(attrs, "number")
                .and_then(|value| value.parse().ok())
                .ok_or_else(|| AppError::parse(format!("vote link without a number: {attrs}")))?;
            match store.get_vote(session_id, number)? {
                Some(vote) => {
                    let link = (vote.absolute_url(), Some(vote.description_en.clone()));
                    related.vote = Some(vote);
                    link
                }
                // The vote is usually imported shortly after the debate.
                None => (format!("/votes/{session_id}/{number}/"), None),
            }
        }
        other => {
            return Err(AppError::parse(format!("unknown link type {other}")));
        }
    };

    let mut tag_attrs = vec![("href", url), ("data-HoCid", hocid.to_string())];
    if let Some(title) = title.filter(|title| !title.is_empty()) {
        tag_attrs.push(("title", title));
    }
    Ok(format!("{}{text}</a>", build_tag("a", &tag_attrs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bill_links_create_temporary_bills() {
        let store = Store::temporary().expect("store");
        let mut related = RelatedLinks::default();
        let content = r#"<p>On <a class="related_link legislation" data-HoCid="11551051" href="x">Bill C-11</a> today.</p>"#;

        let rewritten =
            process_related_links(&store, "44-1", content, &mut related).expect("links");
        assert_eq!(
            rewritten,
            r#"<p>On <a data-HoCid="11551051" href="/bills/44-1/C-11/" title="C-11">Bill C-11</a> today.</p>"#
        );
        assert_eq!(related.bill_ids.len(), 1);
        let bill = store
            .bill_by_legisinfo_id(11551051)
            .expect("lookup")
            .expect("bill");
        assert!(bill.temporary);
    }

    #[test]
    fn unknown_politicians_become_plain_text_and_votes_link_ahead() {
        let store = Store::temporary().expect("store");
        let mut related = RelatedLinks::default();
        let content = concat!(
            r#"<a class="related_link politician" data-HoCid="172" href="x">Mr. Smith</a> "#,
            r#"<a class="related_link vote" data-HoCid="4" data-number="12" href="y">Vote #12</a>"#,
        );

        let rewritten =
            process_related_links(&store, "44-1", content, &mut related).expect("links");
        assert_eq!(
            rewritten,
            r#"Mr. Smith
 <a data-HoCid="4" href="/votes/44-1/12/">Vote #12</a>"#
        );
        assert!(related.vote.is_none());
    }

    #[test]
    fn unknown_link_types_are_errors() {
        let store = Store::temporary().expect("store");
        let content = r#"<a class="related_link poem" data-HoCid="1">x</a>"#;
        assert!(
            process_related_links(&store, "44-1", content, &mut RelatedLinks::default()).is_err()
        );
    }
}
