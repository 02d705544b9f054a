use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: u64,
    /// e.g. `C-11`
    pub number: String,
    pub session_ids: Vec<String>,
    pub legisinfo_id: Option<u64>,
    pub name_en: String,
    #[serde(default)]
    pub name_fr: String,
    /// Created from a passing reference; details not imported yet.
    pub temporary: bool,
    pub summary_en: Option<String>,
    pub text_en: Option<String>,
}

impl Bill {
    pub fn latest_session(&self) -> Option<&str> {
        self.session_ids.iter().max().map(String::as_str)
    }

    pub fn absolute_url(&self) -> String {
        format!(
            "/bills/{}/{}/",
            self.latest_session().unwrap_or_default(),
            self.number
        )
    }

    pub fn billtext_url(&self, bills_base: &str) -> String {
        format!(
            "{bills_base}/DocumentViewer/en/{}/bill/{}/first-reading",
            self.latest_session().unwrap_or_default(),
            self.number
        )
    }

    pub fn name(&self) -> &str {
        if self.name_en.is_empty() {
            &self.number
        } else {
            &self.name_en
        }
    }
}
