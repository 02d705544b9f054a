use std::collections::HashSet;

use chrono::NaiveDate;
use roxmltree::Document;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::core::error::AppError;
use crate::core::http_client::{SourceClient, parse_url};
use crate::core::parsetools::normalize_name;
use crate::core::xml::{child_text, parse_xml_date};
use crate::features::elections::normalize_province;
use crate::features::politicians::dto::MemberDetails;
use crate::features::politicians::service::ensure_membership;
use crate::store::Store;

const MEMBERS_LIST_PATH: &str = "/Members/en/search/XML";

#[derive(Debug, Clone, PartialEq)]
pub struct ListedMember {
    pub details: MemberDetails,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, PartialEq)]
pub struct MpImportSummary {
    pub created: usize,
    pub updated: usize,
    pub retired: usize,
}

pub fn parse_member_list(xml: &str) -> Result<Vec<ListedMember>, AppError> {
    let document = Document::parse(xml)
        .map_err(|err| AppError::parse(format!("failed to parse member list: {err}")))?;

    let members = document
        .root_element()
        .children()
        .filter(|node| node.has_tag_name("MemberOfParliament"))
        .map(|node| {
            let province = child_text(node, "ConstituencyProvinceTerritoryName")
                .map(|name| normalize_province(&name).unwrap_or(name));
            ListedMember {
                details: MemberDetails {
                    first_name: child_text(node, "PersonOfficialFirstName").unwrap_or_default(),
                    last_name: child_text(node, "PersonOfficialLastName").unwrap_or_default(),
                    party: child_text(node, "CaucusShortName").unwrap_or_default(),
                    riding: child_text(node, "ConstituencyName").unwrap_or_default(),
                    province,
                },
                from: child_text(node, "FromDateTime").and_then(|text| parse_xml_date(&text)),
                to: child_text(node, "ToDateTime").and_then(|text| parse_xml_date(&text)),
            }
        })
        .filter(|member| !member.details.last_name.is_empty())
        .collect();

    Ok(members)
}

/// Brings the current session's memberships in line with the ourcommons.ca
/// list of sitting members. Members no longer listed have their membership
/// closed as of `today`.
pub async fn update_mps_from_ourcommons(
    store: &Store,
    source: &SourceClient,
    config: &AppConfig,
    today: NaiveDate,
) -> Result<MpImportSummary, AppError> {
    let url = parse_url(&format!("{}{MEMBERS_LIST_PATH}", config.source_base))?;
    let xml = source.get_text(&url).await?;
    let listed = parse_member_list(&xml)?;
    apply_member_list(store, &listed, today)
}

pub fn apply_member_list(
    store: &Store,
    listed: &[ListedMember],
    today: NaiveDate,
) -> Result<MpImportSummary, AppError> {
    let session = store.current_session()?;
    let mut politicians = store.politicians()?;
    let mut summary = MpImportSummary::default();
    let mut seen = HashSet::new();

    for member in listed.iter().filter(|member| member.to.is_none()) {
        let name_key = normalize_name(&member.details.full_name());
        let riding_key = normalize_name(&member.details.riding);

        let position = politicians
            .iter()
            .position(|politician| {
                politician.normalized_name() == name_key
                    && politician
                        .membership_in(&session.id)
                        .is_some_and(|membership| normalize_name(&membership.riding) == riding_key)
            })
            .or_else(|| {
                politicians.iter().position(|politician| {
                    politician.normalized_name() == name_key
                        && politician
                            .memberships
                            .iter()
                            .any(|membership| normalize_name(&membership.riding) == riding_key)
                })
            });

        let mut politician = match position {
            Some(index) => {
                summary.updated += 1;
                politicians.swap_remove(index)
            }
            None => {
                summary.created += 1;
                info!(name = %member.details.full_name(), "new MP");
                store.create_politician(&member.details.full_name())?
            }
        };

        let since = member.from.unwrap_or(session.start).max(session.start);
        ensure_membership(&mut politician, &session, &member.details, since.min(today));
        store.save_politician(&politician)?;
        seen.insert(politician.id);
        politicians.push(politician);
    }

    for politician in politicians.iter_mut().filter(|p| !seen.contains(&p.id)) {
        let mut changed = false;
        for membership in politician
            .memberships
            .iter_mut()
            .filter(|membership| membership.session_id == session.id && membership.end.is_none())
        {
            membership.end = Some(today);
            changed = true;
        }
        if changed {
            warn!(name = %politician.name, "MP no longer listed; closing membership");
            store.save_politician(politician)?;
            summary.retired += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::sessions::Session;

    const MEMBER_LIST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ArrayOfMemberOfParliament xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <MemberOfParliament>
    <PersonShortHonorific>Hon.</PersonShortHonorific>
    <PersonOfficialFirstName>Ziad</PersonOfficialFirstName>
    <PersonOfficialLastName>Aboultaif</PersonOfficialLastName>
    <ConstituencyName>Edmonton Manning</ConstituencyName>
    <ConstituencyProvinceTerritoryName>Alberta</ConstituencyProvinceTerritoryName>
    <CaucusShortName>Conservative</CaucusShortName>
    <FromDateTime>2021-09-20T00:00:00</FromDateTime>
    <ToDateTime xsi:nil="true" />
  </MemberOfParliament>
  <MemberOfParliament>
    <PersonOfficialFirstName>Scott</PersonOfficialFirstName>
    <PersonOfficialLastName>Aitchison</PersonOfficialLastName>
    <ConstituencyName>Parry Sound—Muskoka</ConstituencyName>
    <ConstituencyProvinceTerritoryName>Ontario</ConstituencyProvinceTerritoryName>
    <CaucusShortName>Conservative</CaucusShortName>
    <FromDateTime>2021-09-20T00:00:00</FromDateTime>
    <ToDateTime />
  </MemberOfParliament>
</ArrayOfMemberOfParliament>"#;

    #[test]
    fn parses_member_list() {
        let members = parse_member_list(MEMBER_LIST).expect("parse");
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].details.full_name(), "Ziad Aboultaif");
        assert_eq!(members[0].details.province.as_deref(), Some("AB"));
        assert_eq!(members[1].details.riding, "Parry Sound—Muskoka");
        assert!(members[1].to.is_none());
    }

    #[test]
    fn applying_list_creates_and_retires() {
        let store = Store::temporary().expect("store");
        let session = Session::new(44, 1, NaiveDate::from_ymd_opt(2021, 11, 22).expect("date"));
        store.save_session(&session).expect("session");
        let today = NaiveDate::from_ymd_opt(2022, 1, 10).expect("date");

        let members = parse_member_list(MEMBER_LIST).expect("parse");
        let first = apply_member_list(&store, &members, today).expect("apply");
        assert_eq!(first.created, 2);

        let second = apply_member_list(&store, &members[..1], today).expect("apply");
        assert_eq!(
            second,
            MpImportSummary {
                created: 0,
                updated: 1,
                retired: 1
            }
        );

        let aitchison = store
            .politician_by_slug("scott-aitchison")
            .expect("lookup")
            .expect("exists");
        assert_eq!(aitchison.memberships[0].end, Some(today));
        assert_eq!(aitchison.memberships[0].start, session.start);
    }
}
