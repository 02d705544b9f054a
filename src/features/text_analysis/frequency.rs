use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::language::Language;
use crate::features::hansards::Statement;

/// nltk's English list.
const ENGLISH_STOPWORDS: &str = "i me my myself we our ours ourselves you your yours yourself \
    yourselves he him his himself she her hers herself it its itself they them their theirs \
    themselves what which who whom this that these those am is are was were be been being have \
    has had having do does did doing a an the and but if or because as until while of at by for \
    with about against between into through during before after above below to from up down in \
    out on off over under again further then once here there when where why how all any both \
    each few more most other some such no nor not only own same so than too very s t can will \
    just don should now";

const PARLIAMENTARY_STOPWORDS: &str = "it's we're we'll they're can't won't isn't don't he's \
    she's i'm aren't government house committee would speaker motion mr mrs ms member minister \
    canada members time prime one parliament us bill act like canadians people said want could \
    issue today hon order party canadian think also new get many say look country legislation \
    law department two day days madam must that's okay thank really much there's yes";

pub static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    ENGLISH_STOPWORDS
        .split_whitespace()
        .chain(PARLIAMENTARY_STOPWORDS.split_whitespace())
        .collect()
});

static R_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\s\w'’—-]").expect("valid punctuation regex"));
static R_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s—]+").expect("valid whitespace regex"));

/// Separates statements in a token stream so n-grams never span two of them.
pub const STATEMENT_SEPARATOR: &str = "/";

pub fn text_token_iterator(text: &str) -> Vec<String> {
    let cleaned = R_PUNCTUATION
        .replace_all(&text.to_lowercase(), "")
        .into_owned();
    R_WHITESPACE.split(&cleaned).map(str::to_string).collect()
}

pub fn statements_token_iterator(statements: &[Statement], separator: Option<&str>) -> Vec<String> {
    let mut tokens = Vec::new();
    for statement in statements {
        tokens.extend(text_token_iterator(&statement.text_plain(Language::En)));
        if let Some(separator) = separator {
            tokens.push(separator.to_string());
        }
    }
    tokens
}

pub fn ngram_iterator(tokens: &[String], n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    tokens.windows(n).map(|window| window.join(" ")).collect()
}

fn by_score_desc<V: PartialOrd>(a: &(String, V), b: &(String, V)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

fn top<V: PartialOrd + Copy>(map: &HashMap<String, V>, n: Option<usize>) -> Vec<(String, V)> {
    let mut items: Vec<(String, V)> = map
        .iter()
        .map(|(key, value)| (key.clone(), *value))
        .collect();
    items.sort_by(by_score_desc);
    if let Some(n) = n {
        items.truncate(n);
    }
    items
}

/// Probability of each item among all counted items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyModel {
    pub probabilities: HashMap<String, f64>,
    pub count: u64,
}

impl FrequencyModel {
    /// Items of two characters or fewer, and anything containing the statement
    /// separator, are not counted.
    pub fn new(items: impl IntoIterator<Item = String>, min_count: u64) -> Self {
        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut total = 0u64;
        for item in items {
            if item.chars().count() > 2 && !item.contains(STATEMENT_SEPARATOR) {
                *counts.entry(item).or_insert(0) += 1;
                total += 1;
            }
        }
        let probabilities = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .map(|(item, count)| (item, count as f64 / total as f64))
            .collect();
        Self {
            probabilities,
            count: total,
        }
    }

    pub fn from_statements(statements: &[Statement], ngram: usize, min_count: u64) -> Self {
        let tokens = statements_token_iterator(statements, Some(STATEMENT_SEPARATOR));
        if ngram > 1 {
            Self::new(ngram_iterator(&tokens, ngram), min_count)
        } else {
            Self::new(tokens, min_count)
        }
    }

    pub fn get(&self, key: &str) -> f64 {
        self.probabilities.get(key).copied().unwrap_or(0.0)
    }

    /// How much more likely each non-stopword item is here than in `background`.
    pub fn diff(&self, background: &FrequencyModel) -> FrequencyDiff {
        FrequencyDiff(
            self.probabilities
                .iter()
                .filter(|(key, _)| !STOPWORDS.contains(key.as_str()))
                .map(|(key, probability)| (key.clone(), probability - background.get(key)))
                .collect(),
        )
    }

    pub fn item_count(&self, key: &str) -> u64 {
        (self.get(key) * self.count as f64).round() as u64
    }

    pub fn most_common(&self, n: Option<usize>) -> Vec<(String, f64)> {
        top(&self.probabilities, n)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyDiff(pub HashMap<String, f64>);

impl FrequencyDiff {
    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn most_common(&self, n: usize) -> Vec<(String, f64)> {
        top(&self.0, Some(n))
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordCounter {
    counts: HashMap<String, u64>,
}

impl WordCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, word: &str) {
        if !STOPWORDS.contains(word) {
            *self.counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }

    pub fn get(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    pub fn most_common(&self, n: Option<usize>) -> Vec<(String, u64)> {
        top(&self.counts, n)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordAttributeCount {
    pub count: u64,
    pub attributes: HashMap<String, u64>,
}

impl WordAttributeCount {
    fn add(&mut self, attribute: &str) {
        *self.attributes.entry(attribute.to_string()).or_insert(0) += 1;
        self.count += 1;
    }

    pub fn winning_attribute(&self) -> Option<&str> {
        self.attributes
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(attribute, _)| attribute.as_str())
    }
}

/// Counts words along with a tally of some attribute of each use, e.g. the
/// party of the member who said it.
#[derive(Debug, Clone, Default)]
pub struct WordAndAttributeCounter {
    counter: HashMap<String, WordAttributeCount>,
}

impl WordAndAttributeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, word: &str, attribute: &str) {
        if !STOPWORDS.contains(word) && word.chars().count() > 2 {
            self.counter
                .entry(word.to_string())
                .or_default()
                .add(attribute);
        }
    }

    pub fn most_common(&self, n: Option<usize>) -> Vec<(&str, &WordAttributeCount)> {
        let mut items: Vec<(&str, &WordAttributeCount)> = self
            .counter
            .iter()
            .map(|(word, count)| (word.as_str(), count))
            .collect();
        items.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        if let Some(n) = n {
            items.truncate(n);
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_drop_punctuation_but_keep_apostrophes() {
        assert_eq!(
            text_token_iterator("Mr. Speaker, it's the carbon tax—again!"),
            ["mr", "speaker", "it's", "the", "carbon", "tax", "again"]
        );
    }

    #[test]
    fn ngrams_do_not_cross_statements() {
        let tokens: Vec<String> = ["carbon", "tax", "/", "dental", "care"]
            .iter()
            .map(|token| token.to_string())
            .collect();
        let model = FrequencyModel::new(ngram_iterator(&tokens, 2), 1);
        assert_eq!(model.count, 2);
        assert!((model.get("carbon tax") - 0.5).abs() < 1e-9);
        assert_eq!(model.get("tax /"), 0.0);
        assert_eq!(model.item_count("dental care"), 1);
    }

    #[test]
    fn diff_skips_stopwords_and_subtracts_background() {
        let words = |text: &str| text.split(' ').map(str::to_string).collect::<Vec<_>>();
        let model = FrequencyModel::new(words("housing housing housing government"), 1);
        let background = FrequencyModel::new(words("housing government government government"), 1);
        let diff = model.diff(&background);
        assert_eq!(diff.get("government"), 0.0);
        assert!((diff.get("housing") - 0.5).abs() < 1e-9);
        assert_eq!(diff.most_common(5)[0].0, "housing");
    }

    #[test]
    fn counters_ignore_stopwords() {
        let mut counter = WordCounter::new();
        for word in ["the", "pharmacare", "pharmacare", "dental"] {
            counter.add(word);
        }
        assert_eq!(counter.get("the"), 0);
        assert_eq!(
            counter.most_common(Some(1)),
            [("pharmacare".to_string(), 2)]
        );

        let mut by_party = WordAndAttributeCounter::new();
        by_party.add("pharmacare", "NDP");
        by_party.add("pharmacare", "NDP");
        by_party.add("pharmacare", "Liberal");
        by_party.add("to", "Liberal");
        let top = by_party.most_common(None);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].1.count, 3);
        assert_eq!(top[0].1.winning_attribute(), Some("NDP"));
    }
}
