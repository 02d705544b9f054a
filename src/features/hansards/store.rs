use chrono::NaiveDate;
use sled::Batch;

use crate::core::error::AppError;
use crate::features::hansards::dto::{Document, DocumentType, OldSequenceMapping, Statement};
use crate::store::{Store, encode, get_json, id_key, put_json, scan_json};

fn statement_key(document_id: u64, sequence: u32) -> [u8; 12] {
    let mut key = [0u8; 12];
    key[..8].copy_from_slice(&document_id.to_be_bytes());
    key[8..].copy_from_slice(&sequence.to_be_bytes());
    key
}

fn debate_date_key(date: NaiveDate, document_id: u64) -> Vec<u8> {
    let mut key = date.format("%Y-%m-%d").to_string().into_bytes();
    key.extend_from_slice(&id_key(document_id));
    key
}

fn debate_key(document: &Document) -> Option<Vec<u8>> {
    match (document.document_type, document.date) {
        (DocumentType::Debate, Some(date)) => Some(debate_date_key(date, document.id)),
        _ => None,
    }
}

fn by_date(mut documents: Vec<Document>) -> Vec<Document> {
    documents.sort_by_key(|document| (document.date, document.id));
    documents
}

impl Store {
    /// Writes the document along with its source id and sitting date indexes.
    pub fn save_document(&self, document: &Document) -> Result<(), AppError> {
        let write_failed =
            |err: sled::Error| AppError::storage(format!("index write failed: {err}"));
        if let Some(previous) = self.get_document(document.id)? {
            if previous.source_id != document.source_id {
                self.documents_by_source
                    .remove(id_key(previous.source_id))
                    .map_err(write_failed)?;
            }
            if let Some(key) = debate_key(&previous) {
                self.debates_by_date.remove(key).map_err(write_failed)?;
            }
        }

        put_json(&self.documents, id_key(document.id), document)?;
        self.documents_by_source
            .insert(id_key(document.source_id), &id_key(document.id)[..])
            .map_err(write_failed)?;
        if let Some(key) = debate_key(document) {
            self.debates_by_date
                .insert(key, &id_key(document.id)[..])
                .map_err(write_failed)?;
        }
        Ok(())
    }

    /// Stores a new document under a freshly generated id.
    pub fn create_document(&self, mut document: Document) -> Result<Document, AppError> {
        document.id = self.generate_id()?;
        self.save_document(&document)?;
        Ok(document)
    }

    pub fn get_document(&self, id: u64) -> Result<Option<Document>, AppError> {
        get_json(&self.documents, id_key(id))
    }

    pub fn documents(&self) -> Result<Vec<Document>, AppError> {
        scan_json(&self.documents, b"")
    }

    pub fn document_by_source_id(&self, source_id: u64) -> Result<Option<Document>, AppError> {
        let Some(id) = self
            .documents_by_source
            .get(id_key(source_id))
            .map_err(|err| AppError::storage(format!("lookup failed: {err}")))?
        else {
            return Ok(None);
        };
        get_json(&self.documents, id)
    }

    /// The first debate recorded for a sitting date.
    pub fn debate_on(&self, date: NaiveDate) -> Result<Option<Document>, AppError> {
        let prefix = date.format("%Y-%m-%d").to_string();
        match self.debates_by_date.scan_prefix(prefix).next() {
            Some(entry) => {
                let (_, id) =
                    entry.map_err(|err| AppError::storage(format!("scan failed: {err}")))?;
                get_json(&self.documents, id)
            }
            None => Ok(None),
        }
    }

    pub fn documents_in_session(
        &self,
        session_id: &str,
        document_type: DocumentType,
    ) -> Result<Vec<Document>, AppError> {
        Ok(by_date(
            self.documents()?
                .into_iter()
                .filter(|document| {
                    document.session_id == session_id && document.document_type == document_type
                })
                .collect(),
        ))
    }

    pub fn has_statements(&self, document_id: u64) -> Result<bool, AppError> {
        match self.statements.scan_prefix(id_key(document_id)).next() {
            Some(entry) => entry
                .map(|_| true)
                .map_err(|err| AppError::storage(format!("scan failed: {err}"))),
            None => Ok(false),
        }
    }

    /// Documents of `document_type` with no statements yet, oldest first.
    pub fn unparsed_documents(
        &self,
        document_type: DocumentType,
    ) -> Result<Vec<Document>, AppError> {
        let mut unparsed = Vec::new();
        for document in self.documents()? {
            if document.document_type == document_type
                && !document.skip_parsing
                && !self.has_statements(document.id)?
            {
                unparsed.push(document);
            }
        }
        Ok(by_date(unparsed))
    }

    /// Public debates, newest first.
    pub fn latest_debates(&self, limit: usize) -> Result<Vec<Document>, AppError> {
        let mut debates: Vec<Document> = self
            .documents()?
            .into_iter()
            .filter(|document| document.document_type == DocumentType::Debate && document.public)
            .collect();
        debates.sort_by(|a, b| b.date.cmp(&a.date));
        debates.truncate(limit);
        Ok(debates)
    }

    pub fn statements_for(&self, document_id: u64) -> Result<Vec<Statement>, AppError> {
        scan_json(&self.statements, id_key(document_id))
    }

    pub fn save_statement(&self, statement: &Statement) -> Result<(), AppError> {
        put_json(
            &self.statements,
            statement_key(statement.document_id, statement.sequence),
            statement,
        )
    }

    /// Swaps a document's statements for a new set in a single batch.
    pub fn replace_statements(
        &self,
        document_id: u64,
        statements: &[Statement],
    ) -> Result<(), AppError> {
        let mut batch = Batch::default();
        for entry in self.statements.scan_prefix(id_key(document_id)) {
            let (key, _) = entry.map_err(|err| AppError::storage(format!("scan failed: {err}")))?;
            batch.remove(key);
        }
        for statement in statements {
            batch.insert(
                &statement_key(document_id, statement.sequence)[..],
                encode(statement)?,
            );
        }
        self.statements
            .apply_batch(batch)
            .map_err(|err| AppError::storage(format!("failed to write statements: {err}")))
    }

    pub fn sequence_mappings_for(
        &self,
        document_id: u64,
    ) -> Result<Vec<OldSequenceMapping>, AppError> {
        scan_json(&self.sequence_mappings, id_key(document_id))
    }

    pub fn save_sequence_mappings(&self, mappings: &[OldSequenceMapping]) -> Result<(), AppError> {
        let mut batch = Batch::default();
        for mapping in mappings {
            batch.insert(
                &statement_key(mapping.document_id, mapping.sequence)[..],
                encode(mapping)?,
            );
        }
        self.sequence_mappings
            .apply_batch(batch)
            .map_err(|err| AppError::storage(format!("failed to write sequence mappings: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn replacing_statements_drops_the_old_set() {
        let store = Store::temporary().expect("store");
        let mut debate = Document::new_debate("44-1", 1, "1");
        debate.date = NaiveDate::from_ymd_opt(2022, 1, 31);
        let debate = store.create_document(debate).expect("create");

        let statement = |sequence| Statement {
            document_id: debate.id,
            sequence,
            ..Statement::default()
        };
        store
            .replace_statements(debate.id, &[statement(0), statement(1), statement(2)])
            .expect("write");
        store
            .replace_statements(debate.id, &[statement(0)])
            .expect("rewrite");

        assert_eq!(store.statements_for(debate.id).expect("scan").len(), 1);
        assert!(
            store
                .unparsed_documents(DocumentType::Debate)
                .expect("unparsed")
                .is_empty()
        );
    }

    #[test]
    fn finds_documents_by_source_id_and_sitting_date() {
        let store = Store::temporary().expect("store");
        let sitting = NaiveDate::from_ymd_opt(2022, 1, 31).expect("date");
        let mut debate = Document::new_debate("44-1", 11500000, "20");
        debate.date = Some(sitting);
        let debate = store.create_document(debate).expect("create");
        let mut meeting = Document::new_evidence("44-1", 11500001, "fina", "Finance");
        meeting.date = Some(sitting);
        let meeting = store.create_document(meeting).expect("create");

        let by_source = store
            .document_by_source_id(11500001)
            .expect("lookup")
            .expect("document");
        assert_eq!(by_source.id, meeting.id);
        assert!(store.document_by_source_id(1).expect("lookup").is_none());

        let on_date = store.debate_on(sitting).expect("lookup").expect("debate");
        assert_eq!(on_date.id, debate.id);
    }

    #[test]
    fn redating_a_debate_moves_its_index_entry() {
        let store = Store::temporary().expect("store");
        let first = NaiveDate::from_ymd_opt(2022, 1, 31).expect("date");
        let second = NaiveDate::from_ymd_opt(2022, 2, 1).expect("date");
        let mut debate = Document::new_debate("44-1", 11500000, "20");
        debate.date = Some(first);
        let mut debate = store.create_document(debate).expect("create");

        debate.date = Some(second);
        store.save_document(&debate).expect("save");
        assert!(store.debate_on(first).expect("lookup").is_none());
        let found = store.debate_on(second).expect("lookup").expect("debate");
        assert_eq!(found.date, Some(second));
    }

    #[test]
    fn statements_sort_by_sequence() {
        let store = Store::temporary().expect("store");
        for sequence in [300u32, 2, 17] {
            store
                .save_statement(&Statement {
                    document_id: 5,
                    sequence,
                    ..Statement::default()
                })
                .expect("save");
        }
        let sequences: Vec<u32> = store
            .statements_for(5)
            .expect("scan")
            .iter()
            .map(|statement| statement.sequence)
            .collect();
        assert_eq!(sequences, [2, 17, 300]);
    }
}
