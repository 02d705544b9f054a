pub mod activity;
pub mod bills;
pub mod elections;
pub mod hansards;
pub mod jobs;
pub mod politicians;
pub mod sessions;
pub mod text_analysis;
pub mod votes;
