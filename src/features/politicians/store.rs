use crate::core::error::AppError;
use crate::core::parsetools::url_slug;
use crate::features::politicians::dto::Politician;
use crate::store::{Store, get_json, id_key, put_json, scan_json};

impl Store {
    pub fn save_politician(&self, politician: &Politician) -> Result<(), AppError> {
        put_json(&self.politicians, id_key(politician.id), politician)
    }

    pub fn get_politician(&self, id: u64) -> Result<Option<Politician>, AppError> {
        get_json(&self.politicians, id_key(id))
    }

    pub fn politicians(&self) -> Result<Vec<Politician>, AppError> {
        scan_json(&self.politicians, b"")
    }

    pub fn politician_by_slug(&self, slug: &str) -> Result<Option<Politician>, AppError> {
        Ok(self
            .politicians()?
            .into_iter()
            .find(|politician| politician.slug == slug))
    }

    pub fn politicians_in_session(&self, session_id: &str) -> Result<Vec<Politician>, AppError> {
        Ok(self
            .politicians()?
            .into_iter()
            .filter(|politician| politician.membership_in(session_id).is_some())
            .collect())
    }

    /// Creates and stores a politician with a slug not yet taken by anyone else.
    pub fn create_politician(&self, name: &str) -> Result<Politician, AppError> {
        let existing = self.politicians()?;
        let base = match url_slug(name) {
            slug if slug.is_empty() => "politician".to_string(),
            slug => slug,
        };
        let mut slug = base.clone();
        let mut counter = 2;
        while existing.iter().any(|politician| politician.slug == slug) {
            slug = format!("{base}-{counter}");
            counter += 1;
        }

        let politician = Politician {
            id: self.generate_id()?,
            name: name.trim().to_string(),
            slug,
            parl_affil_id: None,
            parl_mp_id: None,
            memberships: Vec::new(),
        };
        self.save_politician(&politician)?;
        Ok(politician)
    }
}
