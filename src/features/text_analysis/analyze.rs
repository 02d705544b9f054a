use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::AppError;
use crate::features::hansards::Statement;
use crate::features::text_analysis::corpora::load_background_model;
use crate::features::text_analysis::frequency::{FrequencyModel, STOPWORDS};

/// Below this many words there is too little text to say anything useful.
const MIN_WORDS: u32 = 1000;

/// (n-gram length, how many to keep), longest first.
const NGRAM_LENGTHS: [(usize, usize); 3] = [(3, 3), (2, 8), (1, 20)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisItem {
    pub text: String,
    pub score: f64,
}

/// The phrases most characteristic of `statements` compared to the `corpus`
/// background models.
pub async fn analyze_statements(
    statements: &[Statement],
    model_root: &Path,
    corpus: &str,
) -> Result<Option<Vec<AnalysisItem>>, AppError> {
    let words: u32 = statements.iter().map(|statement| statement.wordcount).sum();
    if words < MIN_WORDS {
        return Ok(None);
    }

    let mut seen: HashSet<String> = STOPWORDS.iter().map(|word| word.to_string()).collect();
    let mut results = Vec::new();
    for (length, max_count) in NGRAM_LENGTHS {
        let background = load_background_model(model_root, corpus, length).await?;
        let diff = FrequencyModel::from_statements(statements, length, 1).diff(&background);
        let mut count = 0;
        for (text, score) in diff.most_common(50) {
            if count >= max_count {
                break;
            }
            let words: Vec<&str> = text.split(' ').collect();
            let (Some(first), Some(last)) = (words.first(), words.last()) else {
                continue;
            };
            if seen.contains(*first) || seen.contains(*last) {
                continue;
            }
            seen.extend(words.iter().map(|word| word.to_string()));
            count += 1;
            results.push(AnalysisItem {
                text: text.clone(),
                score: score * 1000.0,
            });
        }
    }
    Ok(Some(results))
}

/// The highest-scoring single word.
pub fn top_word(items: &[AnalysisItem]) -> Option<&str> {
    items
        .iter()
        .filter(|item| !item.text.contains(' '))
        .max_by(|a, b| a.score.total_cmp(&b.score))

        .map(|item| item.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::text_analysis::corpora::generate_background_models;

    fn statement(text: &str, wordcount: u32) -> Statement {
        Statement {
            content_en: format!("<p>{text}</p>"),
            wordcount,
            ..Statement::default()
        }
    }

    #[tokio::test]
    async fn short_documents_are_not_analysed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = analyze_statements(&[statement("Hello there", 2)], dir.path(), "debates")
            .await
            .expect("analyze");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn characteristic_words_outscore_the_background() {
        let dir = tempfile::tempdir().expect("tempdir");
        let background: Vec<Statement> = (0..10)
            .map(|_| statement("budget deficit spending budget deficit spending", 6))
            .collect();
        generate_background_models(dir.path(), "debates", &background, &[1, 2, 3])
            .await
            .expect("generate");

        // Single-word statements: every bigram and trigram spans a separator.
        let sitting: Vec<Statement> = (0..10).map(|_| statement("Pharmacare!", 100)).collect();
        let items = analyze_statements(&sitting, dir.path(), "debates")
            .await
            .expect("analyze")
            .expect("enough words");
        assert_eq!(items.len(), 1);
        assert_eq!(top_word(&items), Some("pharmacare"));
        assert!((items[0].score - 1000.0).abs() < 1e-6);
    }
}
