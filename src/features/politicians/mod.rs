pub mod client;
pub mod dto;
pub mod service;
mod store;

pub use client::update_mps_from_ourcommons;
pub use dto::{MemberDetails, Membership, Politician};
pub use service::{get_by_parl_affil_id, get_by_parl_mp_id, speaker_name_key};
