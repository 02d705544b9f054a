use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use roxmltree::{Document, Node};
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::core::error::AppError;
use crate::core::http_client::{SourceClient, parse_url};
use crate::core::xml::{child_flag, child_text};
use crate::features::activity::{NewActivity, save_activity};
use crate::features::elections::normalize_province;
use crate::features::politicians::{MemberDetails, get_by_parl_mp_id};
use crate::features::sessions::Session;
use crate::features::votes::dto::{Ballot, MemberVote, VoteQuestion, VoteResult};
use crate::features::votes::labels::label_party_votes;
use crate::store::Store;

const MIN_EXPECTED_VOTERS: i64 = 100;

/// One `Vote` from the ourcommons.ca division list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedVote {
    pub number: u32,
    pub parliament: u32,
    pub session: u32,
    pub date: NaiveDate,
    pub yea_total: i64,
    pub nay_total: i64,
    pub paired_total: i64,
    pub decision: String,
    pub bill_number: Option<String>,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub person_id: u32,
    pub details: MemberDetails,
    pub ballot: Option<Ballot>,
}

#[derive(Debug, Default, PartialEq)]
pub struct VoteImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

fn parse_number<T: std::str::FromStr>(node: Node<'_, '_>, name: &str) -> Result<T, AppError> {
    let text = child_text(node, name)
        .ok_or_else(|| AppError::parse(format!("vote record is missing {name}")))?;
    text.parse::<T>()
        .map_err(|_| AppError::parse(format!("{name} is not a number: {text}")))
}

pub fn parse_vote_list(xml: &str) -> Result<Vec<ListedVote>, AppError> {
    let document = Document::parse(xml)
        .map_err(|err| AppError::parse(format!("failed to parse vote list: {err}")))?;

    document
        .root_element()
        .children()
        .filter(|node| node.has_tag_name("Vote"))
        .map(|node| -> Result<ListedVote, AppError> {
            let number: u32 = parse_number(node, "DecisionDivisionNumber")?;
            let date_text = child_text(node, "DecisionEventDateTime").unwrap_or_default();
            let date = NaiveDateTime::parse_from_str(&date_text, "%Y-%m-%dT%H:%M:%S")
                .map(|dt| dt.date())
                .map_err(|err| {
                    AppError::parse(format!(
                        "vote #{number} has an invalid date {date_text:?}: {err}"
                    ))
                })?;
            Ok(ListedVote {
                number,
                parliament: parse_number(node, "ParliamentNumber")?,
                session: parse_number(node, "SessionNumber")?,
                date,
                yea_total: parse_number(node, "DecisionDivisionNumberOfYeas")?,
                nay_total: parse_number(node, "DecisionDivisionNumberOfNays")?,
                paired_total: parse_number(node, "DecisionDivisionNumberOfPaired")?,
                decision: child_text(node, "DecisionResultName").unwrap_or_default(),
                bill_number: child_text(node, "BillNumberCode"),
                subject: child_text(node, "DecisionDivisionSubject").unwrap_or_default(),
            })
        })
        .collect()
}

pub fn parse_participants(xml: &str) -> Result<Vec<Participant>, AppError> {
    let document = Document::parse(xml)
        .map_err(|err| AppError::parse(format!("failed to parse vote detail: {err}")))?;

    document
        .root_element()
        .children()
        .filter(|node| node.has_tag_name("VoteParticipant"))
        .map(|node| -> Result<Participant, AppError> {
            let ballot = if child_flag(node, "IsVoteYea") {
                Some(Ballot::Yes)
            } else if child_flag(node, "IsVoteNay") {
                Some(Ballot::No)
            } else if child_flag(node, "IsVotePaired") {
                Some(Ballot::Paired)
            } else {
                None
            };
            Ok(Participant {
                person_id: parse_number(node, "PersonId")?,
                details: MemberDetails {
                    first_name: child_text(node, "PersonOfficialFirstName").unwrap_or_default(),
                    last_name: child_text(node, "PersonOfficialLastName").unwrap_or_default(),
                    party: child_text(node, "CaucusShortName").unwrap_or_default(),
                    riding: child_text(node, "ConstituencyName").unwrap_or_default(),
                    province: child_text(node, "ConstituencyProvinceTerritoryName")
                        .map(|name| normalize_province(&name).unwrap_or(name)),
                },
                ballot,
            })
        })
        .collect()
}

pub fn parse_result(decision: &str) -> Result<VoteResult, AppError> {
    match decision {
        "Agreed to" | "Agreed To" => Ok(VoteResult::Passed),
        "Negatived" => Ok(VoteResult::Failed),
        "Tie" => Ok(VoteResult::Tie),
        other => Err(AppError::parse(format!("couldn't process vote result {other:?}"))),
    }
}

/// Imports every division on the ourcommons.ca list that isn't stored yet.
pub async fn import_votes(
    store: &Store,
    source: &SourceClient,
    config: &AppConfig,
) -> Result<VoteImportSummary, AppError> {
    let list_en = fetch_list(source, config, "en").await?;
    let list_fr = fetch_list(source, config, "fr").await?;
    let mut summary = VoteImportSummary::default();

    for listed in &list_en {
        let session = store
            .get_session_by_numbers(listed.parliament, listed.session)?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "session {}-{} for vote #{}",
                    listed.parliament, listed.session, listed.number
                ))
            })?;
        if store.get_vote(&session.id, listed.number)?.is_some() {
            summary.skipped += 1;
            continue;
        }
        info!(number = listed.number, session = %session.id, "processing vote");

        let description_fr = list_fr
            .iter()
            .find(|vote| vote.number == listed.number && vote.session == listed.session)
            .map(|vote| vote.subject.clone());
        if description_fr.is_none() {
            error!(
                number = listed.number,
                "couldn't get french description for vote"
            );
        }

        let detail_url = parse_url(&format!(
            "{}/members/en/votes/{}/{}/{}/xml",
            config.source_base, session.parliamentnum, session.sessnum, listed.number
        ))?;
        let participants = parse_participants(&source.get_text(&detail_url).await?)?;

        let vote = build_vote_question(store, &session, listed, description_fr)?;
        let ballots = resolve_ballots(store, &session, &vote, &participants)?;
        record_vote(store, config.save_activities, vote, ballots)?;
        summary.imported += 1;
    }

    Ok(summary)
}

async fn fetch_list(
    source: &SourceClient,
    config: &AppConfig,
    lang: &str,
) -> Result<Vec<ListedVote>, AppError> {
    let url = parse_url(&format!("{}/members/{lang}/votes/xml", config.source_base))?;
    parse_vote_list(&source.get_text(&url).await?)
}

fn build_vote_question(
    store: &Store,
    session: &Session,
    listed: &ListedVote,
    description_fr: Option<String>,
) -> Result<VoteQuestion, AppError> {
    if listed.yea_total + listed.nay_total < MIN_EXPECTED_VOTERS {
        warn!(number = listed.number, "fewer than 100 votes recorded");
    }
    let result = parse_result(&listed.decision)?;

    let bill_id = match &listed.bill_number {
        Some(number) => {
            let bill = match store.bill_by_number(&session.id, number)? {
                Some(bill) => bill,
                None => {
                    warn!(%number, vote = listed.number, "temporary bill created for vote");
                    store.create_temporary_bill(number, &session.id, None)?
                }
            };
            Some(bill.id)
        }
        None => None,
    };

    Ok(VoteQuestion {
        session_id: session.id.clone(),
        number: listed.number,
        date: listed.date,
        description_en: listed.subject.clone(),
        description_fr: description_fr.unwrap_or_default(),
        result,
        yea_total: listed.yea_total,
        nay_total: listed.nay_total,
        paired_total: listed.paired_total,
        bill_id,
        context_statement: None,
        party_votes: Vec::new(),
    })
}

/// Ballots for every participant, plus `Absent` for sitting members who didn't vote.
fn resolve_ballots(
    store: &Store,
    session: &Session,
    vote: &VoteQuestion,
    participants: &[Participant],
) -> Result<Vec<MemberVote>, AppError> {
    let mut ballots = Vec::with_capacity(participants.len());
    let mut voted = HashSet::new();

    for participant in participants {
        let ballot = participant.ballot.ok_or_else(|| {
            AppError::parse(format!(
                "couldn't parse recorded vote for {} in vote {}",
                participant.details.full_name(),
                vote.number
            ))
        })?;
        let politician = get_by_parl_mp_id(
            store,
            participant.person_id,
            session,
            &participant.details,
            vote.date,
        )?;
        let (party, riding) = politician
            .member_for(vote.date)
            .map(|membership| (membership.party.clone(), membership.riding.clone()))
            .unwrap_or_else(|| {
                (
                    participant.details.party.clone(),
                    participant.details.riding.clone(),
                )
            });
        voted.insert(politician.id);
        ballots.push(MemberVote {
            session_id: vote.session_id.clone(),
            number: vote.number,
            politician_id: politician.id,
            party,
            riding,
            vote: ballot,
            dissent: false,
        });
    }

    for politician in store.politicians_in_session(&session.id)? {
        if voted.contains(&politician.id) {
            continue;
        }
        if let Some(membership) = politician
            .member_for(vote.date)
            .filter(|membership| membership.session_id == session.id)
        {
            ballots.push(MemberVote {
                session_id: vote.session_id.clone(),
                number: vote.number,
                politician_id: politician.id,
                party: membership.party.clone(),
                riding: membership.riding.clone(),
                vote: Ballot::Absent,
                dissent: false,
            });
        }
    }

    Ok(ballots)
}

fn record_vote(
    store: &Store,
    save_activities: bool,
    mut vote: VoteQuestion,
    mut ballots: Vec<MemberVote>,
) -> Result<(), AppError> {
    vote.party_votes = label_party_votes(&mut ballots);
    store.save_vote_with_ballots(&vote, &ballots)?;

    for ballot in &ballots {
        let item = NewActivity {
            variety: "membervote".to_string(),
            guid: format!(
                "membervote_{}_{}_{}",
                vote.session_id, vote.number, ballot.politician_id
            ),
            politician_id: ballot.politician_id,
            date: vote.date,
            payload: json!({
                "url": vote.absolute_url(),
                "number": vote.number,
                "description": vote.description_en,
                "vote": ballot.vote.label(),
                "result": vote.result,
                "dissent": ballot.dissent,
            }),
        };
        save_activity(store, save_activities, item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_results() {
        assert_eq!(parse_result("Agreed To").ok(), Some(VoteResult::Passed));
        assert_eq!(parse_result("Negatived").ok(), Some(VoteResult::Failed));
        assert!(parse_result("Withdrawn").is_err());
    }

    #[test]
    fn parses_participants() {
        let xml = r#"<ArrayOfVoteParticipant>
  <VoteParticipant>
    <PersonId>89156</PersonId>
    <PersonOfficialFirstName>Ziad</PersonOfficialFirstName>
    <PersonOfficialLastName>Aboultaif</PersonOfficialLastName>
    <ConstituencyName>Edmonton Manning</ConstituencyName>
    <CaucusShortName>Conservative</CaucusShortName>
    <IsVoteYea>false</IsVoteYea>
    <IsVoteNay>true</IsVoteNay>
    <IsVotePaired>false</IsVotePaired>
  </VoteParticipant>
  <VoteParticipant>
    <PersonId>1</PersonId>
    <IsVoteYea>false</IsVoteYea>
    <IsVoteNay>false</IsVoteNay>
    <IsVotePaired>false</IsVotePaired>
  </VoteParticipant>
</ArrayOfVoteParticipant>"#;
        let participants = parse_participants(xml).expect("parse");
        assert_eq!(participants[0].person_id, 89156);
        assert_eq!(participants[0].ballot, Some(Ballot::No));
        assert_eq!(participants[1].ballot, None);
    }
}
