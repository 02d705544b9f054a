pub mod cache;
pub mod clock;
pub mod error;
pub mod http_client;
pub mod language;
pub mod parsetools;
pub mod xml;
