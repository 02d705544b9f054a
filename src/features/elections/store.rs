use chrono::NaiveDate;

use crate::core::error::AppError;
use crate::features::elections::dto::Candidacy;
use crate::store::{Store, put_json, scan_json};

impl Store {
    pub fn save_candidacy(&self, candidacy: &Candidacy) -> Result<(), AppError> {
        put_json(&self.candidacies, candidacy.key().as_bytes(), candidacy)
    }

    pub fn candidacies_for(&self, election: NaiveDate) -> Result<Vec<Candidacy>, AppError> {
        scan_json(&self.candidacies, format!("{election}/").as_bytes())
    }
}
