pub mod billtext;
pub mod dto;
mod store;

pub use billtext::{fetch_bill_text, import_bill_texts};
pub use dto::Bill;
