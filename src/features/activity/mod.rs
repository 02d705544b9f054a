pub mod dto;
pub mod service;
mod store;

pub use dto::{Activity, NewActivity};
pub use service::{ACTIVITY_MAX, iter_recent, prune, save_activity};
