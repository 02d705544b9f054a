//! String clean-up shared by the importers: names, whitespace, slugs and the
//! small amount of HTML the parser emits.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub static R_POLITICALPOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(Minister|Leader|Secretary|Solicitor|Attorney|Speaker|Deputy |Soliciter|Chair |Parliamentary|President |for )",
    )
    .expect("valid political post regex")
});

pub static R_NOTAMEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(The|A|Some|Acting|Santa|One|Assistant|An\.?|Le|La|Une|Des|Voices)")
        .expect("valid not-a-member regex")
});

pub static R_MISTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Mr|Mrs|Ms|Miss|Hon|Right Hon|M|Mme)\.?\s+").expect("valid mister regex")
});

pub static R_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.+\)\s*$").expect("valid parens regex"));

static R_EXTRA_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\s*").expect("valid whitespace regex"));
static R_LEADING_ABBREVIATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+\. ").expect("valid abbreviation regex"));
static R_REPEATED_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--+").expect("valid dash regex"));
static R_NON_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\D").expect("valid digit regex"));
static R_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d\d:\d\d:\d\d)").expect("valid clock regex"));
static R_POSTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ABCEGHJKLMNPRSTVXYZ]\d[A-Z] \d[A-Z]\d$").expect("valid postcode regex")
});
static R_SLUG_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static R_SLUG_JOIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid slug join regex"));
static R_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Hansard occasionally records times like 25:10; those belong to the next day.
pub fn time_to_datetime(hour: u32, minute: u32, date: NaiveDate) -> Option<NaiveDateTime> {
    let time = NaiveTime::from_hms_opt(hour % 24, minute, 0)?;
    let day = date.checked_add_signed(Duration::days(i64::from(hour / 24)))?;
    Some(day.and_time(time))
}

pub fn remove_accents(value: &str) -> String {
    value.nfkd().filter(|ch| !is_combining_mark(*ch)).collect()
}

pub fn strip_honorific(value: &str) -> String {
    let mut stripped = value.to_string();
    for honorific in ["The Honourable ", "The Right Honourable ", "The Rt. ", "The "] {
        stripped = stripped.replace(honorific, "");
    }
    R_LEADING_ABBREVIATION.replace(&stripped, "").into_owned()
}

/// Capitalises the first letter of every alphabetic run, lowercasing the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_is_letter = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(ch);
            previous_is_letter = false;
        }
    }
    out
}

pub fn title_if_necessary(value: &str) -> String {
    if value.chars().any(|ch| ch.is_lowercase()) {
        value.to_string()
    } else {
        title_case(value)
    }
}

pub fn tame_whitespace(value: &str) -> String {
    R_EXTRA_WHITESPACE
        .replace_all(&value.replace('\n', " "), " ")
        .into_owned()
}

pub fn sane_quotes(value: &str) -> String {
    value.replace("``", "\"").replace("''", "\"")
}

pub fn slugify(value: &str, allow_numbers: bool) -> String {
    let base = remove_accents(&value.trim().to_lowercase());
    let replaced: String = base
        .chars()
        .map(|ch| {
            let keep = ch.is_ascii_alphabetic() || (allow_numbers && ch.is_ascii_digit());
            if keep { ch } else { '-' }
        })
        .collect();
    R_REPEATED_DASH.replace_all(&replaced, "-").into_owned()
}

/// Slug for URLs: ASCII letters, digits and single dashes, no leading or trailing dash.
pub fn url_slug(value: &str) -> String {
    let ascii: String = remove_accents(value)
        .chars()
        .filter(|ch| ch.is_ascii())
        .collect();
    let lowered = ascii.to_lowercase();
    let stripped = R_SLUG_STRIP.replace_all(&lowered, "");
    R_SLUG_JOIN
        .replace_all(&stripped, "-")
        .trim_matches(|ch| ch == '-' || ch == '_')
        .to_string()
}

pub fn normalize_name(value: &str) -> String {
    tame_whitespace(&remove_accents(&strip_honorific(value).to_lowercase()))
        .trim()
        .replace('\u{2019}', "'")
}

pub fn munge_date(value: &str) -> Option<&str> {
    if value.contains("0000") || value.is_empty() || value == "&nbsp" {
        None
    } else {
        Some(value)
    }
}

pub fn munge_decimal(value: &str) -> f64 {
    value.replace(',', "").trim().parse::<f64>().unwrap_or(0.0)
}

pub fn munge_int(value: &str) -> Option<i64> {
    let digits = R_NON_DIGIT.replace_all(value, "");
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok()
}

pub fn munge_time(value: &str) -> Option<String> {
    R_CLOCK
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn munge_postcode(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    let mut code = value.to_uppercase();
    if code.chars().count() == 6 {
        let (head, tail) = code.split_at(3);
        code = format!("{head} {tail}");
    }
    R_POSTCODE.is_match(&code).then_some(code)
}

/// Escapes text content. Quotation marks are left alone.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Quotes an attribute value, choosing single quotes when the value holds double quotes.
pub fn quote_attr(value: &str) -> String {
    let escaped = escape_html(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;");
    if escaped.contains('"') {
        if escaped.contains('\'') {
            format!("\"{}\"", escaped.replace('"', "&quot;"))
        } else {
            format!("'{escaped}'")
        }
    } else {
        format!("\"{escaped}\"")
    }
}

/// Opening tag with attributes in sorted key order.
pub fn build_tag(name: &str, attrs: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = attrs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let rendered: String = sorted
        .iter()
        .map(|(key, value)| format!(" {key}={}", quote_attr(value)))
        .collect();
    format!("<{name}{rendered}>")
}

pub fn strip_tags(value: &str) -> String {
    let mut current = value.to_string();
    // Removing one tag can expose another (e.g. "<<b>i>").
    loop {
        let next = R_TAG.replace_all(&current, "").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_sittings_roll_into_next_day() {
        let date = NaiveDate::from_ymd_opt(2021, 6, 22).expect("date");
        let dt = time_to_datetime(25, 10, date).expect("datetime");
        assert_eq!(dt.to_string(), "2021-06-23 01:10:00");
        assert_eq!(
            time_to_datetime(14, 5, date).expect("datetime").to_string(),
            "2021-06-22 14:05:00"
        );
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(
            normalize_name("The Honourable  Mélanie Joly"),
            "melanie joly"
        );

        assert_eq!(strip_honorific("Mr. Pierre Poilievre"), "Pierre Poilievre");
        assert_eq!(normalize_name("Seamus O\u{2019}Regan"), "seamus o'regan");
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify(" Trois-Rivières ", false), "trois-rivieres");
        assert_eq!(slugify("Bill C-11", true), "bill-c-11");
        assert_eq!(url_slug("Hon. Chrystia Freeland"), "hon-chrystia-freeland");
        assert_eq!(url_slug("Élisabeth Brière"), "elisabeth-briere");
    }

    #[test]
    fn munging() {
        assert_eq!(munge_date("0000-00-00"), None);
        assert_eq!(munge_date("2020-01-01"), Some("2020-01-01"));
        assert_eq!(munge_int("1,234 votes"), Some(1234));
        assert_eq!(munge_int("none"), None);
        assert!((munge_decimal("1,234.5") - 1234.5).abs() < f64::EPSILON);
        assert_eq!(munge_decimal("n/a"), 0.0);
        assert_eq!(munge_time("at 13:05:00 EST"), Some("13:05:00".to_string()));
        assert_eq!(munge_postcode("k1a0a6"), Some("K1A 0A6".to_string()));
        assert_eq!(munge_postcode("D1A 0A6"), None);
    }

    #[test]
    fn titles() {
        assert_eq!(title_if_necessary("GOVERNMENT ORDERS"), "Government Orders");
        assert_eq!(title_if_necessary("Oral Questions"), "Oral Questions");
    }

    #[test]
    fn tags_are_built_sorted_and_quoted() {
        let tag = build_tag(
            "p",
            &[("data-HoCid", "12".to_string()), ("class", "procedural".to_string())],
        );
        assert_eq!(tag, r#"<p class="procedural" data-HoCid="12">"#);
        assert_eq!(quote_attr(r#"say "hi""#), r#"'say "hi"'"#);
        assert_eq!(strip_tags("<p>a <strong>b</strong></p>"), "a b");
    }
}
