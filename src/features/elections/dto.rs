use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidacy {
    pub election: NaiveDate,
    pub edid: String,
    pub riding_name: String,
    pub first_name: String,
    pub last_name: String,
    pub party: String,
    pub votetotal: u64,
    pub votepercent: f64,
    pub elected: Option<bool>,
}

impl Candidacy {
    pub fn key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.election,
            self.edid,
            self.last_name.to_lowercase(),
            self.first_name.to_lowercase()
        )
    }
}
