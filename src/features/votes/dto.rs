use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteResult {
    #[serde(rename = "Y")]
    Passed,
    #[serde(rename = "N")]
    Failed,
    #[serde(rename = "T")]
    Tie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ballot {
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
    #[serde(rename = "P")]
    Paired,
    #[serde(rename = "A")]
    Absent,
}

impl Ballot {
    pub fn label(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Paired => "Paired",
            Self::Absent => "Didn't vote",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyVote {
    pub party: String,
    pub vote: Ballot,
    /// Share of the caucus voting against the party line.
    pub disagreement: f64,
}

/// The Hansard statement in which a division was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextStatement {
    pub document_id: u64,
    pub sequence: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteQuestion {
    pub session_id: String,
    pub number: u32,
    pub date: NaiveDate,
    pub description_en: String,
    pub description_fr: String,
    pub result: VoteResult,
    pub yea_total: i64,
    pub nay_total: i64,
    pub paired_total: i64,
    pub bill_id: Option<u64>,
    pub context_statement: Option<ContextStatement>,
    #[serde(default)]
    pub party_votes: Vec<PartyVote>,
}

impl VoteQuestion {
    pub fn key(session_id: &str, number: u32) -> String {
        format!("{session_id}/{number:05}")
    }

    pub fn absolute_url(&self) -> String {
        format!("/votes/{}/{}/", self.session_id, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberVote {
    pub session_id: String,
    pub number: u32,
    pub politician_id: u64,
    pub party: String,
    pub riding: String,
    pub vote: Ballot,
    pub dissent: bool,
}

impl MemberVote {
    pub fn key(&self) -> String {
        format!(
            "{}/{:020}",
            VoteQuestion::key(&self.session_id, self.number),
            self.politician_id
        )
    }
}
