use crate::core::error::AppError;
use crate::features::sessions::dto::Session;
use crate::store::{Store, get_json, put_json, scan_json};

impl Store {
    pub fn save_session(&self, session: &Session) -> Result<(), AppError> {
        put_json(&self.sessions, session.id.as_bytes(), session)
    }

    pub fn get_session(&self, id: &str) -> Result<Option<Session>, AppError> {
        get_json(&self.sessions, id.as_bytes())
    }

    pub fn get_session_by_numbers(
        &self,
        parliamentnum: u32,
        sessnum: u32,
    ) -> Result<Option<Session>, AppError> {
        self.get_session(&Session::session_id(parliamentnum, sessnum))
    }

    pub fn sessions(&self) -> Result<Vec<Session>, AppError> {
        scan_json(&self.sessions, b"")
    }

    /// The session that started most recently.
    pub fn current_session(&self) -> Result<Session, AppError> {
        self.sessions()?
            .into_iter()
            .max_by_key(|session| session.start)
            .ok_or_else(|| AppError::not_found("no sessions have been set up".to_string()))
    }
}
