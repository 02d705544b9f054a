use chrono::NaiveDate;
use tracing::info;

use crate::core::error::AppError;
use crate::core::parsetools::{R_MISTER, R_PARENS, normalize_name};
use crate::features::politicians::dto::{MemberDetails, Membership, Politician};
use crate::features::sessions::Session;
use crate::store::Store;

/// Reduces a Hansard speaker label such as "Hon. Mona Fortier (President of the
/// Treasury Board, Lib.)" to a comparable name key.
pub fn speaker_name_key(attribution: &str) -> String {
    let without_post = R_PARENS.replace(attribution.trim(), "");
    let without_title = R_MISTER.replace(without_post.trim(), "");
    normalize_name(&without_title)
}

/// Finds the politician behind a Hansard `Affiliation/@DbId`.
///
/// When no politician carries the id yet but exactly one member of `session`
/// has the speaker's name, the id is learned and stored on that politician.
pub fn get_by_parl_affil_id(
    store: &Store,
    hocid: u32,
    session: Option<&Session>,
    attribution: Option<&str>,
) -> Result<Option<Politician>, AppError> {
    let politicians = store.politicians()?;
    if let Some(found) = politicians
        .iter()
        .find(|politician| politician.parl_affil_id == Some(hocid))
    {
        return Ok(Some(found.clone()));
    }

    let (Some(session), Some(attribution)) = (session, attribution) else {
        return Ok(None);
    };
    let wanted = speaker_name_key(attribution);
    if wanted.is_empty() {
        return Ok(None);
    }

    let mut candidates = politicians.into_iter().filter(|politician| {
        politician.parl_affil_id.is_none()
            && politician.membership_in(&session.id).is_some()
            && politician.normalized_name() == wanted
    });
    let (Some(mut politician), None) = (candidates.next(), candidates.next()) else {
        return Ok(None);
    };

    politician.parl_affil_id = Some(hocid);
    store.save_politician(&politician)?;
    info!(politician = %politician.name, hocid, "learned Hansard affiliation id");
    Ok(Some(politician))
}

/// Finds (or creates) the politician behind a vote participant's `PersonId`,
/// and makes sure they have a membership covering `date`.
pub fn get_by_parl_mp_id(
    store: &Store,
    person_id: u32,
    session: &Session,
    details: &MemberDetails,
    date: NaiveDate,
) -> Result<Politician, AppError> {
    let politicians = store.politicians()?;
    let name = normalize_name(&details.full_name());
    let riding = normalize_name(&details.riding);

    let found = politicians
        .iter()
        .find(|politician| politician.parl_mp_id == Some(person_id))
        .or_else(|| {
            politicians.iter().find(|politician| {
                politician.parl_mp_id.is_none()
                    && politician.normalized_name() == name
                    && politician
                        .membership_in(&session.id)
                        .is_some_and(|membership| normalize_name(&membership.riding) == riding)
            })
        })
        .cloned();

    let mut politician = match found {
        Some(politician) => politician,
        None => {
            info!(name = %details.full_name(), person_id, "creating politician from vote data");
            store.create_politician(&details.full_name())?
        }
    };

    politician.parl_mp_id = Some(person_id);
    ensure_membership(&mut politician, session, details, date);
    store.save_politician(&politician)?;
    Ok(politician)
}

/// Adds a membership in `session` unless one already covers `date`. A party
/// change closes the covering membership the day before `date` and opens a
/// new one, so the earlier affiliation stays on record.
pub fn ensure_membership(
    politician: &mut Politician,
    session: &Session,
    details: &MemberDetails,
    date: NaiveDate,
) {
    let covering = politician
        .memberships
        .iter_mut()
        .filter(|membership| membership.session_id == session.id && membership.covers(date))
        .max_by_key(|membership| membership.start);

    let start = match covering {
        Some(existing) if details.party.is_empty() || existing.party == details.party => return,
        Some(existing) if existing.start >= date => {
            existing.party = details.party.clone();
            return;
        }
        Some(existing) => {
            existing.end = date.pred_opt();
            info!(
                politician = %politician.name,
                from = %existing.party,
                to = %details.party,
                "recorded party change"
            );
            date
        }
        None => session.start.min(date),
    };

    politician.memberships.push(Membership {
        session_id: session.id.clone(),
        party: details.party.clone(),
        riding: details.riding.clone(),
        province: details.province.clone(),
        start,
        end: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> MemberDetails {
        MemberDetails {
            first_name: "Elizabeth".to_string(),
            last_name: "May".to_string(),
            party: "Green Party".to_string(),
            riding: "Saanich—Gulf Islands".to_string(),
            province: Some("BC".to_string()),
        }
    }

    fn session() -> Session {
        Session::new(44, 1, NaiveDate::from_ymd_opt(2021, 11, 22).expect("date"))
    }

    #[test]
    fn speaker_labels_reduce_to_names() {
        assert_eq!(
            speaker_name_key("Hon. Mona Fortier (President of the Treasury Board, Lib.)"),
            "mona fortier"
        );
        assert_eq!(speaker_name_key("Mr. Gérard Deltell"), "gerard deltell");
    }

    #[test]
    fn mp_id_lookup_creates_then_reuses() {
        let store = Store::temporary().expect("store");
        let session = session();
        let date = NaiveDate::from_ymd_opt(2022, 3, 1).expect("date");

        let created = get_by_parl_mp_id(&store, 2897, &session, &details(), date).expect("create");
        assert_eq!(created.slug, "elizabeth-may");
        assert_eq!(created.memberships.len(), 1);

        let again = get_by_parl_mp_id(&store, 2897, &session, &details(), date).expect("lookup");
        assert_eq!(again.id, created.id);
        assert_eq!(again.memberships.len(), 1);
        assert_eq!(store.politicians().expect("list").len(), 1);
    }

    #[test]
    fn riding_and_name_match_within_session_is_reused() {
        let store = Store::temporary().expect("store");
        let session = session();
        let mut seeded = store
            .create_politician("Elizabeth May")
            .expect("politician");
        ensure_membership(&mut seeded, &session, &details(), session.start);
        store.save_politician(&seeded).expect("save");

        let date = NaiveDate::from_ymd_opt(2022, 3, 1).expect("date");
        let found = get_by_parl_mp_id(&store, 2897, &session, &details(), date).expect("lookup");
        assert_eq!(found.id, seeded.id);
        assert_eq!(found.parl_mp_id, Some(2897));
        assert_eq!(found.memberships.len(), 1);
        assert_eq!(store.politicians().expect("list").len(), 1);
    }

    #[test]
    fn namesake_from_another_session_and_riding_stays_separate() {
        let store = Store::temporary().expect("store");
        let earlier = Session::new(43, 1, NaiveDate::from_ymd_opt(2019, 12, 5).expect("date"));
        let halifax = MemberDetails {
            riding: "Halifax".to_string(),
            province: Some("NS".to_string()),
            ..details()
        };
        let mut namesake = store
            .create_politician("Elizabeth May")
            .expect("politician");
        ensure_membership(&mut namesake, &earlier, &halifax, earlier.start);
        store.save_politician(&namesake).expect("save");

        let session = session();
        let date = NaiveDate::from_ymd_opt(2022, 3, 1).expect("date");
        let found = get_by_parl_mp_id(&store, 9999, &session, &details(), date).expect("lookup");
        assert_ne!(found.id, namesake.id);
        assert_eq!(found.slug, "elizabeth-may-2");
        assert_eq!(store.politicians().expect("list").len(), 2);

        let untouched = store
            .get_politician(namesake.id)
            .expect("lookup")
            .expect("politician");
        assert_eq!(untouched.parl_mp_id, None);
        assert_eq!(untouched.memberships.len(), 1);
    }

    #[test]
    fn namesake_in_a_different_riding_of_the_same_session_stays_separate() {
        let store = Store::temporary().expect("store");
        let session = session();
        let halifax = MemberDetails {
            riding: "Halifax".to_string(),
            ..details()
        };
        let mut namesake = store
            .create_politician("Elizabeth May")
            .expect("politician");
        ensure_membership(&mut namesake, &session, &halifax, session.start);
        store.save_politician(&namesake).expect("save");

        let date = NaiveDate::from_ymd_opt(2022, 3, 1).expect("date");
        let found = get_by_parl_mp_id(&store, 9999, &session, &details(), date).expect("lookup");
        assert_ne!(found.id, namesake.id);
        assert_eq!(store.politicians().expect("list").len(), 2);
    }

    #[test]
    fn party_change_closes_the_old_membership() {
        let store = Store::temporary().expect("store");
        let session = session();
        let mut politician = store
            .create_politician("Elizabeth May")
            .expect("politician");
        ensure_membership(&mut politician, &session, &details(), session.start);

        let crossed = NaiveDate::from_ymd_opt(2022, 6, 15).expect("date");
        let independent = MemberDetails {
            party: "Independent".to_string(),
            ..details()
        };
        ensure_membership(&mut politician, &session, &independent, crossed);
        assert_eq!(politician.memberships.len(), 2);

        let before = NaiveDate::from_ymd_opt(2022, 6, 14).expect("date");
        let old = politician.member_for(before).expect("old membership");
        assert_eq!(old.party, "Green Party");
        assert_eq!(old.end, Some(before));
        let new = politician.member_for(crossed).expect("new membership");
        assert_eq!(new.party, "Independent");
        assert_eq!(new.start, crossed);
        assert_eq!(new.end, None);

        // Same party again is a no-op.
        ensure_membership(&mut politician, &session, &independent, crossed);
        assert_eq!(politician.memberships.len(), 2);
    }

    #[test]
    fn affil_id_is_learned_from_unique_name() {
        let store = Store::temporary().expect("store");
        let session = session();
        let date = NaiveDate::from_ymd_opt(2022, 3, 1).expect("date");
        let created = get_by_parl_mp_id(&store, 2897, &session, &details(), date).expect("create");

        let found = get_by_parl_affil_id(&store, 551, Some(&session), Some("Ms. Elizabeth May"))
            .expect("lookup")
            .expect("found");
        assert_eq!(found.id, created.id);
        assert_eq!(found.parl_affil_id, Some(551));

        let direct = get_by_parl_affil_id(&store, 551, None, None).expect("lookup");
        assert_eq!(direct.map(|politician| politician.id), Some(created.id));
        assert!(
            get_by_parl_affil_id(&store, 999, None, None)
                .expect("lookup")
                .is_none()
        );
    }
}
