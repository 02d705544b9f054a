pub mod activity;
pub mod align;
pub mod alpheus;
pub mod dto;
pub mod fetch;
pub mod importer;
pub mod links;
pub mod statement;
mod store;

pub use dto::{Document, DocumentType, OldSequenceMapping, Speaker, Statement};
pub use fetch::{fetch_debate_for_sitting, fetch_latest_debates, refresh_xml, save_xml};
pub use importer::{ImportOptions, import_document};
