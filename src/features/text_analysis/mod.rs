pub mod analyze;
pub mod corpora;
pub mod frequency;

pub use analyze::{AnalysisItem, analyze_statements, top_word};
pub use frequency::{FrequencyModel, WordAndAttributeCounter, WordCounter};
