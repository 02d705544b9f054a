pub mod dto;
mod store;

pub use dto::Session;
