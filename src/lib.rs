pub mod config;
pub mod core;
pub mod features;
pub mod server;
pub mod store;
