use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::parsetools::normalize_name;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Politician {
    pub id: u64,
    pub name: String,
    pub slug: String,
    /// The `DbId` used on `Affiliation` tags in Hansard.
    pub parl_affil_id: Option<u32>,
    /// The `PersonId` used by the ourcommons.ca members and votes data.
    pub parl_mp_id: Option<u32>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
}

/// One stint as an elected member: a riding and party within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub session_id: String,
    pub party: String,
    pub riding: String,
    pub province: Option<String>,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl Membership {
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.is_none_or(|end| date <= end)
    }
}

impl Politician {
    pub fn member_for(&self, date: NaiveDate) -> Option<&Membership> {
        self.memberships
            .iter()
            .filter(|membership| membership.covers(date))
            .max_by_key(|membership| membership.start)
    }

    pub fn membership_in(&self, session_id: &str) -> Option<&Membership> {
        self.memberships
            .iter()
            .filter(|membership| membership.session_id == session_id)
            .max_by_key(|membership| membership.start)
    }

    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.memberships
            .iter()
            .any(|membership| membership.end.is_none_or(|end| end >= today))
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn absolute_url(&self) -> String {
        format!("/politicians/{}/", self.slug)
    }
}

/// What the upstream member listings tell us about a sitting MP.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDetails {
    pub first_name: String,
    pub last_name: String,
    pub party: String,
    pub riding: String,
    pub province: Option<String>,
}

impl MemberDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}
