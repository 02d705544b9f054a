use crate::core::error::AppError;
use crate::features::activity::dto::Activity;
use crate::store::{Store, get_json, id_key, put_json};

fn politician_key(politician_id: u64, guid: &str) -> Vec<u8> {
    let mut key = id_key(politician_id).to_vec();
    key.extend_from_slice(guid.as_bytes());
    key
}

impl Store {
    pub fn get_activity(&self, guid: &str) -> Result<Option<Activity>, AppError> {
        get_json(&self.activities, guid)
    }

    pub fn save_activity_record(&self, activity: &Activity) -> Result<(), AppError> {
        let write_failed =
            |err: sled::Error| AppError::storage(format!("index write failed: {err}"));
        if let Some(previous) = self.get_activity(&activity.guid)? {
            if previous.politician_id != activity.politician_id {
                self.activities_by_politician
                    .remove(politician_key(previous.politician_id, &previous.guid))
                    .map_err(write_failed)?;
            }
        }

        put_json(&self.activities, &activity.guid, activity)?;
        self.activities_by_politician
            .insert(
                politician_key(activity.politician_id, &activity.guid),
                activity.guid.as_bytes(),
            )
            .map_err(write_failed)?;
        Ok(())
    }

    /// Active items for a politician, newest first.
    pub fn public_activities_for(&self, politician_id: u64) -> Result<Vec<Activity>, AppError> {
        let mut items = Vec::new();
        let prefix = id_key(politician_id);
        for entry in self.activities_by_politician.scan_prefix(prefix) {
            let (_, guid) = entry.map_err(|err| AppError::storage(format!("scan failed: {err}")))?;
            if let Some(activity) = get_json::<Activity>(&self.activities, guid)? {
                if activity.active {
                    items.push(activity);
                }
            }
        }
        items.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn activity(id: u64, guid: &str, politician_id: u64, day: u32) -> Activity {
        Activity {
            id,
            guid: guid.to_string(),
            date: NaiveDate::from_ymd_opt(2022, 3, day).expect("date"),
            variety: "statement".to_string(),
            politician_id,
            payload: json!({}),
            active: true,
        }
    }

    #[test]
    fn lists_only_the_politicians_own_items() {
        let store = Store::temporary().expect("store");
        store
            .save_activity_record(&activity(1, "a", 7, 1))
            .expect("save");
        store
            .save_activity_record(&activity(2, "b", 8, 2))
            .expect("save");
        store
            .save_activity_record(&activity(3, "c", 7, 3))
            .expect("save");
        store
            .save_activity_record(&Activity {
                active: false,
                ..activity(4, "d", 7, 4)
            })
            .expect("save");

        let guids: Vec<String> = store
            .public_activities_for(7)
            .expect("list")
            .into_iter()
            .map(|activity| activity.guid)
            .collect();
        assert_eq!(guids, vec!["c", "a"]);
    }

    #[test]
    fn reassigned_item_moves_to_the_new_politician() {
        let store = Store::temporary().expect("store");
        store
            .save_activity_record(&activity(1, "a", 7, 1))
            .expect("save");
        store
            .save_activity_record(&activity(1, "a", 8, 1))
            .expect("save");

        assert!(store.public_activities_for(7).expect("list").is_empty());
        assert_eq!(store.public_activities_for(8).expect("list").len(), 1);
    }
}
