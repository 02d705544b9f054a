//! Full bill text from parl.ca: the viewer page links to an XML export, which
//! holds the summary and the enacting body.

use std::sync::LazyLock;

use regex::Regex;
use roxmltree::Node;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::core::error::AppError;
use crate::core::http_client::{SourceClient, parse_url};
use crate::features::bills::dto::Bill;
use crate::store::Store;

static R_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\s[^>]*>").expect("valid anchor regex"));
static R_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\sclass\s*=\s*["']([^"']*)["']"#).expect("valid class regex")
});
static R_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\shref\s*=\s*["']([^"']*)["']"#).expect("valid href regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct BillText {
    pub summary: String,
    pub text: String,
}

/// The `href` of the first `a.btn-export-xml` on a page.
pub fn find_xml_export_link(html: &str) -> Option<String> {
    R_ANCHOR.find_iter(html).find_map(|anchor| {
        let tag = anchor.as_str();
        let classes = R_CLASS.captures(tag)?.get(1)?.as_str();
        if !classes
            .split_whitespace()
            .any(|class| class == "btn-export-xml")
        {
            return None;
        }
        R_HREF
            .captures(tag)
            .and_then(|caps| caps.get(1))
            .map(|href| href.as_str().replace("&amp;", "&"))
    })
}

pub fn parse_bill_xml(xml: &str) -> Result<BillText, AppError> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|err| AppError::parse(format!("invalid bill XML: {err}")))?;
    let find = |name: &str| {
        doc.descendants()
            .find(|node| node.is_element() && node.tag_name().name() == name)
    };

    let summary_node =
        find("Summary").ok_or_else(|| AppError::parse("bill XML has no Summary".to_string()))?;
    let body = find("Body").ok_or_else(|| AppError::parse("bill XML has no Body".to_string()))?;

    let mut parts = Vec::new();
    collect_summary(summary_node, &mut parts);
    let summary = parts.join(" ").trim().to_string();

    let text = body
        .descendants()
        .filter(|node| node.is_text())
        .filter_map(|node| node.text())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(BillText { summary, text })
}

/// Text of a summary in document order. A `TitleText` is dropped along with the text after it.
fn collect_summary(node: Node<'_, '_>, parts: &mut Vec<String>) {
    let mut skip_text = false;
    for child in node.children() {
        if child.is_text() {
            if !skip_text {
                if let Some(text) = child.text() {
                    parts.push(text.replace('\n', ""));
                }
            }
            skip_text = false;
            continue;
        }
        skip_text = false;
        if !child.is_element() {
            continue;
        }
        match child.tag_name().name() {
            "TitleText" => {
                skip_text = true;
                continue;
            }
            "Provision" => parts.push("\n".to_string()),
            _ => {}
        }
        collect_summary(child, parts);
    }
}

pub async fn fetch_bill_text(source: &SourceClient, page_url: &str) -> Result<BillText, AppError> {
    let page = parse_url(page_url)?;
    let html = source.get_text(&page).await?;
    let href = find_xml_export_link(&html)
        .ok_or_else(|| AppError::parse(format!("no XML export link on {page_url}")))?;
    let xml_url = page
        .join(&href)
        .map_err(|err| AppError::parse(format!("invalid XML link {href}: {err}")))?;
    let xml = source.get_text(&xml_url).await?;
    parse_bill_xml(&xml)
}

/// Fills in summaries and text for the current session's bills that lack them.
pub async fn import_bill_texts(
    store: &Store,
    source: &SourceClient,
    config: &AppConfig,
) -> Result<usize, AppError> {
    let session = store.current_session()?;
    let mut updated = 0;
    let pending: Vec<Bill> = store
        .bills_in_session(&session.id)?
        .into_iter()
        .filter(|bill| bill.text_en.is_none())
        .collect();

    for mut bill in pending {
        let url = bill.billtext_url(&config.bills_base);
        match fetch_bill_text(source, &url).await {
            Ok(text) => {
                bill.summary_en = Some(text.summary);
                bill.text_en = Some(text.text);
                store.save_bill(&bill)?;
                updated += 1;
            }
            Err(err) => warn!(number = %bill.number, %err, "could not fetch bill text"),
        }
    }
    info!(updated, session = %session.id, "bill texts imported");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_export_link() {
        let html = r#"<div><a class="btn btn-default" href="/x">No</a>
<a href="/Content/Bills/441/Government/C-11/C-11_1/C-11_E.xml" class="btn btn-export-xml">XML</a></div>"#;
        assert_eq!(
            find_xml_export_link(html).as_deref(),
            Some("/Content/Bills/441/Government/C-11/C-11_1/C-11_E.xml")
        );
        assert!(find_xml_export_link("<a href='/nothing'>x</a>").is_none());
    }

    #[test]
    fn extracts_summary_and_body() {
        let xml = r#"<Bill>
<Summary><TitleText>SUMMARY</TitleText>
<Provision><Text>This enactment amends the
Broadcasting Act.</Text></Provision><Provision><Text>It also does more.</Text></Provision></Summary>
<Body><Section>Clause <Emphasis>one</Emphasis>.</Section></Body>
</Bill>"#;
        let text = parse_bill_xml(xml).expect("parse");
        assert_eq!(
            text.summary,
            "This enactment amends theBroadcasting Act. \n It also does more."
        );
        assert_eq!(text.text, "Clause  one .");
    }
}
