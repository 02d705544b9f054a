use std::collections::BTreeMap;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use tracing::{info, warn};

use crate::core::error::AppError;
use crate::core::parsetools::munge_decimal;
use crate::features::elections::dto::Candidacy;
use crate::store::Store;

pub const EC_RESULTS_URL: &str = "http://enr.elections.ca/DownloadResults.aspx";

const COL_EDID: usize = 0;
const COL_RIDING: usize = 1;
const COL_RESULT_TYPE: usize = 3;
const COL_LAST_NAME: usize = 5;
const COL_FIRST_NAME: usize = 7;
const COL_PARTY: usize = 8;
const COL_VOTES: usize = 10;
const COL_PERCENT: usize = 11;

/// Imports results in the tab-separated format published on enr.elections.ca.
/// Returns the number of candidacies stored.
pub fn import_ec_results(
    store: &Store,
    election: NaiveDate,
    body: &str,
    allow_preliminary: bool,
) -> Result<usize, AppError> {
    let mut preliminary: BTreeMap<String, Vec<StringRecord>> = BTreeMap::new();
    let mut validated: BTreeMap<String, Vec<StringRecord>> = BTreeMap::new();

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(body.as_bytes());

    for record in reader.records() {
        let record =
            record.map_err(|err| AppError::parse(format!("unreadable results line: {err}")))?;
        let edid = record.get(COL_EDID).unwrap_or("").trim().to_string();
        if edid.is_empty() || !edid.chars().all(|ch| ch.is_ascii_digit()) {
            continue;
        }
        match record.get(COL_RESULT_TYPE).map(str::trim) {
            Some("preliminary") => preliminary.entry(edid).or_default().push(record),
            Some("validated") => validated.entry(edid).or_default().push(record),
            other => {
                return Err(AppError::parse(format!(
                    "{} not an acceptable result type",
                    other.unwrap_or("<missing>")
                )));
            }
        }
    }

    if !allow_preliminary && preliminary.len() > validated.len() {
        return Err(AppError::bad_request(
            "some results are only preliminary, stopping".to_string(),
        ));
    }
    if validated.len() > preliminary.len() {
        return Err(AppError::parse("more validated ridings than preliminary ones".to_string()));
    }

    let mut stored = 0;
    for (edid, preliminary_lines) in &preliminary {
        let lines = match validated.get(edid) {
            Some(lines) => lines,
            None if allow_preliminary => preliminary_lines,
            None => {
                return Err(AppError::bad_request(format!(
                    "riding {edid} has only preliminary results"
                )));
            }
        };

        for line in lines {
            let candidacy = candidacy_from_line(election, edid, line)?;
            store.save_candidacy(&candidacy)?;
            stored += 1;
        }
    }

    label_winners(store, election)?;
    info!(%election, stored, "imported election results");
    Ok(stored)
}

fn candidacy_from_line(
    election: NaiveDate,
    edid: &str,
    line: &StringRecord,
) -> Result<Candidacy, AppError> {
    let field = |index: usize| -> Result<String, AppError> {
        line.get(index)
            .map(|value| value.trim().to_string())
            .ok_or_else(|| AppError::parse(format!("riding {edid}: missing column {index}")))
    };

    let votetotal = field(COL_VOTES)?
        .parse::<u64>()
        .map_err(|err| AppError::parse(format!("riding {edid}: invalid vote total: {err}")))?;
    let party = field(COL_PARTY)?;
    if party.is_empty() {
        warn!(edid, "candidate without a party name");
    }

    Ok(Candidacy {
        election,
        edid: edid.to_string(),
        riding_name: field(COL_RIDING)?,
        first_name: field(COL_FIRST_NAME)?,
        last_name: field(COL_LAST_NAME)?,
        party,
        votetotal,
        votepercent: munge_decimal(&field(COL_PERCENT)?),
        elected: None,
    })
}

/// Marks the top vote-getter in each riding as elected.
pub fn label_winners(store: &Store, election: NaiveDate) -> Result<(), AppError> {
    let mut by_riding: BTreeMap<String, Vec<Candidacy>> = BTreeMap::new();
    for candidacy in store.candidacies_for(election)? {
        by_riding
            .entry(candidacy.edid.clone())
            .or_default()
            .push(candidacy);
    }

    for candidacies in by_riding.values_mut() {
        let top = candidacies
            .iter()
            .map(|candidacy| candidacy.votetotal)
            .max()
            .unwrap_or(0);
        for candidacy in candidacies.iter_mut() {
            candidacy.elected = Some(candidacy.votetotal == top && top > 0);
            store.save_candidacy(candidacy)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(edid: &str, kind: &str, last: &str, first: &str, party: &str, votes: u64) -> String {
        [
            edid,
            "Avalon",
            "Avalon",
            kind,
            "",
            last,
            "",
            first,
            party,
            "",
            &votes.to_string(),
            "40.5",
        ]
        .join("\t")
    }

    #[test]
    fn imports_validated_results_and_labels_winner() {
        let store = Store::temporary().expect("store");
        let election = NaiveDate::from_ymd_opt(2021, 9, 20).expect("date");
        let body = [
            "Electoral district number\tname".to_string(),
            line("10001", "preliminary", "McDonald", "Ken", "Liberal", 100),
            line("10001", "validated", "McDonald", "Ken", "Liberal", 19_000),
            line(
                "10001",
                "validated",
                "Baird",
                "Matthew",
                "Conservative",
                15_000,
            ),
        ]
        .join("\n");

        let stored = import_ec_results(&store, election, &body, false).expect("import");
        assert_eq!(stored, 2);

        let candidacies = store.candidacies_for(election).expect("list");
        let winner = candidacies
            .iter()
            .find(|candidacy| candidacy.elected == Some(true))
            .expect("winner");
        assert_eq!(winner.last_name, "McDonald");
        assert_eq!(winner.votetotal, 19_000);
        assert!((winner.votepercent - 40.5).abs() < f64::EPSILON);
    }

    #[test]
    fn refuses_preliminary_results() {
        let store = Store::temporary().expect("store");
        let election = NaiveDate::from_ymd_opt(2021, 9, 20).expect("date");
        let body = line("10001", "preliminary", "McDonald", "Ken", "Liberal", 100);

        let err = import_ec_results(&store, election, &body, false).expect_err("should refuse");
        assert!(matches!(err, AppError::BadRequest(_)));
        let forced = import_ec_results(&store, election, &body, true).expect("import");
        assert_eq!(forced, 1);
    }
}
