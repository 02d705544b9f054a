use std::collections::BTreeMap;

use crate::features::votes::dto::{Ballot, MemberVote, PartyVote};

fn is_independent(party: &str) -> bool {
    let lowered = party.trim().to_lowercase();
    lowered.is_empty() || lowered.starts_with("ind")
}

/// Works out each caucus's position from its members' ballots and flags the
/// members who voted the other way. A caucus split evenly has no position.
pub fn label_party_votes(ballots: &mut [MemberVote]) -> Vec<PartyVote> {
    let mut tallies: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for ballot in ballots.iter() {
        if is_independent(&ballot.party) {
            continue;
        }
        let tally = tallies.entry(ballot.party.clone()).or_default();
        match ballot.vote {
            Ballot::Yes => tally.0 += 1,
            Ballot::No => tally.1 += 1,
            Ballot::Paired | Ballot::Absent => {}
        }
    }

    let party_votes: Vec<PartyVote> = tallies
        .into_iter()
        .filter_map(|(party, (yeas, nays))| {
            let total = yeas + nays;
            if total == 0 || yeas == nays {
                return None;
            }
            let (vote, against) = if yeas > nays {
                (Ballot::Yes, nays)
            } else {
                (Ballot::No, yeas)
            };
            Some(PartyVote {
                party,
                vote,
                disagreement: against as f64 / total as f64,
            })
        })
        .collect();

    for ballot in ballots.iter_mut() {
        ballot.dissent = matches!(ballot.vote, Ballot::Yes | Ballot::No)
            && party_votes
                .iter()
                .find(|party_vote| party_vote.party == ballot.party)
                .is_some_and(|party_vote| party_vote.vote != ballot.vote);
    }
    party_votes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(politician_id: u64, party: &str, vote: Ballot) -> MemberVote {
        MemberVote {
            session_id: "44-1".to_string(),
            number: 3,
            politician_id,
            party: party.to_string(),
            riding: String::new(),
            vote,
            dissent: false,
        }
    }

    #[test]
    fn flags_dissenters() {
        let mut ballots = vec![
            ballot(1, "Liberal", Ballot::Yes),
            ballot(2, "Liberal", Ballot::Yes),
            ballot(3, "Liberal", Ballot::No),
            ballot(4, "Conservative", Ballot::No),
            ballot(5, "Conservative", Ballot::Absent),
            ballot(6, "Independent", Ballot::Yes),
            ballot(7, "NDP", Ballot::Yes),
            ballot(8, "NDP", Ballot::No),
        ];
        let party_votes = label_party_votes(&mut ballots);

        assert_eq!(party_votes.len(), 2);
        let liberal = party_votes
            .iter()
            .find(|p| p.party == "Liberal")
            .expect("liberal");

        assert_eq!(liberal.vote, Ballot::Yes);
        assert!((liberal.disagreement - 1.0 / 3.0).abs() < 1e-9);

        let dissenters: Vec<u64> = ballots
            .iter()
            .filter(|ballot| ballot.dissent)
            .map(|ballot| ballot.politician_id)
            .collect();
        assert_eq!(dissenters, vec![3]);
    }
}
