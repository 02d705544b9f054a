pub mod client;
pub mod dto;
pub mod labels;
mod store;

pub use client::import_votes;
pub use dto::{Ballot, MemberVote, VoteQuestion, VoteResult};
