//! sled-backed record storage. One tree per record kind, values are JSON.
//!
//! Feature modules add their own `impl Store` blocks with typed queries; this
//! module only knows how to open the database and move JSON in and out of trees.

pub mod helpers;

use std::path::Path;

use sled::{Db, Tree};

use crate::core::error::AppError;

pub use helpers::{decode, encode, get_json, id_key, put_json, scan_json};

pub struct Store {
    db: Db,
    pub sessions: Tree,
    pub politicians: Tree,
    pub documents: Tree,
    /// `source_id` to document id.
    pub documents_by_source: Tree,
    /// Sitting date and document id of each debate.
    pub debates_by_date: Tree,
    pub statements: Tree,
    pub sequence_mappings: Tree,
    pub bills: Tree,
    pub votes: Tree,
    pub member_votes: Tree,
    pub activities: Tree,
    /// Politician id and guid of each activity.
    pub activities_by_politician: Tree,
    pub candidacies: Tree,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|err| {
            AppError::storage(format!("failed to open sled database at {}: {err}", path.display()))
        })?;
        Self::from_db(db)
    }

    /// A throwaway database, removed when dropped.
    pub fn temporary() -> Result<Self, AppError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|err| AppError::storage(format!("failed to open temporary database: {err}")))?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, AppError> {
        let open = |name: &str| {
            db.open_tree(name)
                .map_err(|err| AppError::storage(format!("failed to open {name} tree: {err}")))
        };

        Ok(Self {
            sessions: open("sessions")?,
            politicians: open("politicians")?,
            documents: open("documents")?,
            documents_by_source: open("documents_by_source")?,
            debates_by_date: open("debates_by_date")?,
            statements: open("statements")?,
            sequence_mappings: open("sequence_mappings")?,
            bills: open("bills")?,
            votes: open("votes")?,
            member_votes: open("member_votes")?,
            activities: open("activities")?,
            activities_by_politician: open("activities_by_politician")?,
            candidacies: open("candidacies")?,
            db,
        })
    }

    pub fn generate_id(&self) -> Result<u64, AppError> {
        self.db
            .generate_id()
            .map_err(|err| AppError::storage(format!("failed to generate id: {err}")))
    }

    pub async fn flush(&self) -> Result<(), AppError> {
        self.db
            .flush_async()
            .await
            .map_err(|err| AppError::storage(format!("failed to flush database: {err}")))?;
        Ok(())
    }
}
