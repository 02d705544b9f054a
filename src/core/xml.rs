//! Helpers for the flat record-style XML served by ourcommons.ca.

use chrono::NaiveDate;
use roxmltree::Node;

/// Trimmed text of the first child element called `name`; empty text is `None`.
pub fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(name))
        .and_then(|child| child.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Accepts `2021-11-22` and `2021-11-22T10:00:00`.
pub fn parse_xml_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let iso = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()
}

pub fn child_flag(node: Node<'_, '_>, name: &str) -> bool {
    child_text(node, name).is_some_and(|text| text.eq_ignore_ascii_case("true"))
}
