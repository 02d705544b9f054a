use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Insertion order; newer items sort first on the same date.
    pub id: u64,
    pub guid: String,
    pub date: NaiveDate,
    pub variety: String,
    pub politician_id: u64,
    pub payload: Value,
    pub active: bool,
}

/// An item to record in a politician's activity feed.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub variety: String,
    pub guid: String,
    pub politician_id: u64,
    pub date: NaiveDate,
    pub payload: Value,
}
