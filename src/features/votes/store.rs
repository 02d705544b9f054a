use sled::Batch;

use crate::core::error::AppError;
use crate::features::votes::dto::{MemberVote, VoteQuestion};
use crate::store::{Store, encode, get_json, put_json, scan_json};

impl Store {
    pub fn get_vote(
        &self,
        session_id: &str,
        number: u32,
    ) -> Result<Option<VoteQuestion>, AppError> {
        get_json(&self.votes, VoteQuestion::key(session_id, number))
    }

    pub fn save_vote(&self, vote: &VoteQuestion) -> Result<(), AppError> {
        put_json(
            &self.votes,
            VoteQuestion::key(&vote.session_id, vote.number),
            vote,
        )
    }

    pub fn votes_in_session(&self, session_id: &str) -> Result<Vec<VoteQuestion>, AppError> {
        scan_json(&self.votes, format!("{session_id}/"))
    }

    /// Writes a division and its ballots; the question goes in last.
    pub fn save_vote_with_ballots(
        &self,
        vote: &VoteQuestion,
        ballots: &[MemberVote],
    ) -> Result<(), AppError> {
        let mut batch = Batch::default();
        for ballot in ballots {
            batch.insert(ballot.key().as_bytes(), encode(ballot)?);
        }
        self.member_votes
            .apply_batch(batch)
            .map_err(|err| AppError::storage(format!("failed to write ballots: {err}")))?;
        self.save_vote(vote)
    }

    pub fn ballots_for(&self, session_id: &str, number: u32) -> Result<Vec<MemberVote>, AppError> {
        scan_json(
            &self.member_votes,
            format!("{}/", VoteQuestion::key(session_id, number)),
        )
    }
}
