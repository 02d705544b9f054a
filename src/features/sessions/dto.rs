use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub parliamentnum: u32,
    pub sessnum: u32,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub name: String,
}

impl Session {
    pub fn new(parliamentnum: u32, sessnum: u32, start: NaiveDate) -> Self {
        Self {
            id: Self::session_id(parliamentnum, sessnum),
            parliamentnum,
            sessnum,
            start,
            end: None,
            name: format!(
                "{} Parliament, {} Session",
                ordinal(parliamentnum),
                ordinal(sessnum)
            ),
        }
    }

    pub fn session_id(parliamentnum: u32, sessnum: u32) -> String {
        format!("{parliamentnum}-{sessnum}")
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.is_none_or(|end| date <= end)
    }
}

fn ordinal(number: u32) -> String {
    let suffix = match (number % 10, number % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{number}{suffix}")
}
