use tracing::info;

use crate::core::error::AppError;
use crate::features::bills::dto::Bill;
use crate::store::{Store, get_json, id_key, put_json, scan_json};

impl Store {
    pub fn save_bill(&self, bill: &Bill) -> Result<(), AppError> {
        put_json(&self.bills, id_key(bill.id), bill)
    }

    pub fn get_bill(&self, id: u64) -> Result<Option<Bill>, AppError> {
        get_json(&self.bills, id_key(id))
    }

    pub fn bills(&self) -> Result<Vec<Bill>, AppError> {
        scan_json(&self.bills, b"")
    }

    pub fn bill_by_legisinfo_id(&self, legisinfo_id: u64) -> Result<Option<Bill>, AppError> {
        Ok(self
            .bills()?
            .into_iter()
            .find(|bill| bill.legisinfo_id == Some(legisinfo_id)))
    }

    pub fn bill_by_number(&self, session_id: &str, number: &str) -> Result<Option<Bill>, AppError> {
        Ok(self.bills()?.into_iter().find(|bill| {
            bill.number.eq_ignore_ascii_case(number)
                && bill.session_ids.iter().any(|id| id == session_id)
        }))
    }

    pub fn bills_in_session(&self, session_id: &str) -> Result<Vec<Bill>, AppError> {
        Ok(self
            .bills()?
            .into_iter()
            .filter(|bill| bill.session_ids.iter().any(|id| id == session_id))
            .collect())
    }

    /// Placeholder for a bill mentioned before its details are imported.
    pub fn create_temporary_bill(
        &self,
        number: &str,
        session_id: &str,
        legisinfo_id: Option<u64>,
    ) -> Result<Bill, AppError> {
        if let Some(mut existing) = self.bill_by_number(session_id, number)? {
            if existing.legisinfo_id.is_none() && legisinfo_id.is_some() {
                existing.legisinfo_id = legisinfo_id;
                self.save_bill(&existing)?;
            }
            return Ok(existing);
        }

        let bill = Bill {
            id: self.generate_id()?,
            number: number.to_uppercase(),
            session_ids: vec![session_id.to_string()],
            legisinfo_id,
            name_en: String::new(),
            name_fr: String::new(),
            temporary: true,
            summary_en: None,
            text_en: None,
        };
        self.save_bill(&bill)?;
        info!(number = %bill.number, session = session_id, "created temporary bill");
        Ok(bill)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::Store;

    #[test]
    fn temporary_bills_are_reused() {
        let store = Store::temporary().expect("store");
        let first = store
            .create_temporary_bill("c-11", "44-1", None)
            .expect("create");
        assert_eq!(first.number, "C-11");
        assert!(first.temporary);

        let second = store
            .create_temporary_bill("C-11", "44-1", Some(11_000))
            .expect("reuse");
        assert_eq!(second.id, first.id);
        assert_eq!(
            store
                .bill_by_legisinfo_id(11_000)
                .expect("lookup")
                .map(|b| b.id),

            Some(first.id)
        );
        assert_eq!(second.absolute_url(), "/bills/44-1/C-11/");
    }
}
