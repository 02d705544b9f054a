use chrono::NaiveDate;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::core::error::AppError;
use crate::features::activity::dto::{Activity, NewActivity};
use crate::store::Store;

const MAX_GUID_LEN: usize = 50;
const PRUNE_AFTER_DAYS: i64 = 4;

/// How many items of each variety a feed shows.
pub const ACTIVITY_MAX: &[(&str, usize)] = &[
    ("twitter", 6),
    ("gnews", 6),
    ("membervote", 5),
    ("statement", 8),
    ("billsponsor", 7),
    ("committee", 8),
];

fn max_for(variety: &str) -> i64 {
    ACTIVITY_MAX
        .iter()
        .find(|(name, _)| *name == variety)
        .map_or(0, |(_, max)| *max as i64)
}

pub fn normalize_guid(guid: &str) -> String {
    if guid.len() > MAX_GUID_LEN {
        hex::encode(Sha1::digest(guid.as_bytes()))
    } else {
        guid.to_string()
    }
}

/// Records an activity item. Returns `false` when recording is disabled or
/// an item with the same guid already exists.
pub fn save_activity(store: &Store, enabled: bool, item: NewActivity) -> Result<bool, AppError> {
    if !enabled {
        return Ok(false);
    }

    let guid = normalize_guid(&item.guid);
    if store.get_activity(&guid)?.is_some() {
        debug!(%guid, "activity already recorded");
        return Ok(false);
    }

    let activity = Activity {
        id: store.generate_id()?,
        guid,
        date: item.date,
        variety: item.variety,
        politician_id: item.politician_id,
        payload: item.payload,
        active: true,
    };
    store.save_activity_record(&activity)?;
    Ok(true)
}

/// The items a feed would show, given items sorted newest first.
pub fn iter_recent(activities: impl IntoIterator<Item = Activity>) -> Vec<Activity> {
    let mut remaining: Vec<(&str, usize)> = ACTIVITY_MAX.to_vec();
    let mut recent = Vec::new();
    for activity in activities {
        let slot = remaining
            .iter_mut()
            .find(|(name, _)| *name == activity.variety);
        if let Some((_, count)) = slot {
            if *count > 0 {
                *count -= 1;
                recent.push(activity);
            }
        }
    }
    recent
}

/// Deactivates items beyond each variety's maximum, once they are a few days old.
/// Returns the number of items deactivated.
pub fn prune(
    store: &Store,
    activities: Vec<Activity>,
    today: NaiveDate,
) -> Result<usize, AppError> {
    let mut counts: Vec<(String, i64)> = Vec::new();
    let mut pruned = 0;

    for mut activity in activities {
        let position = counts
            .iter()
            .position(|(name, _)| *name == activity.variety);
        let index = match position {
            Some(index) => index,
            None => {
                counts.push((activity.variety.clone(), max_for(&activity.variety)));
                counts.len() - 1
            }
        };
        let count = &mut counts[index].1;

        if *count >= 0 {
            *count -= 1;
        } else if (today - activity.date).num_days() >= PRUNE_AFTER_DAYS {
            activity.active = false;
            store.save_activity_record(&activity)?;
            pruned += 1;
        }
    }
    Ok(pruned)
}
