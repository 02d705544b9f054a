//! Matches statements from a re-import to the ones they replace, so that links
//! to old sequence numbers can be redirected to the new slugs.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::core::language::Language;
use crate::features::hansards::dto::Statement;

static R_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Similarity of two sequences as `2 * matches / total length`, where matches
/// are found the way difflib's SequenceMatcher finds them (including its
/// popular-element heuristic for long sequences).
pub fn sequence_ratio<T: Eq + std::hash::Hash>(a: &[T], b: &[T]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = SequenceMatcher::new(a, b).matching_size();
    2.0 * matches as f64 / total as f64
}

struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    b2j: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + std::hash::Hash> SequenceMatcher<'a, T> {
    fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b2j: HashMap<&T, Vec<usize>> = HashMap::new();
        for (j, item) in b.iter().enumerate() {
            b2j.entry(item).or_default().push(j);
        }
        if b.len() >= 200 {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, indices| indices.len() <= limit);
        }
        Self { a, b, b2j }
    }

    fn longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(indices) = self.b2j.get(&self.a[i]) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let previous = j.checked_sub(1).and_then(|prev| j2len.get(&prev));
                    let k = previous.copied().unwrap_or(0) + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular elements were left out of b2j; grow the match over them.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }
        (besti, bestj, bestsize)
    }

    fn matching_size(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        total
    }
}

fn comparison_sequence(text: &str) -> Vec<&str> {
    R_WHITESPACE.split(text).collect()
}

fn similarity(old: &Statement, new: &Statement, already_chosen: bool) -> f64 {
    let mut score = if old.time == new.time { 0.8 } else { 0.0 };
    if already_chosen {
        score -= 0.01;
    }
    let (old_text, new_text) = (old.text_plain(Language::En), new.text_plain(Language::En));
    let text_similarity = if old_text.contains(&new_text) {
        1.0
    } else {
        sequence_ratio(
            &comparison_sequence(&old_text),
            &comparison_sequence(&new_text),
        )
    };
    (score + text_similarity) / 1.8
}

fn by_speaker(statements: &[Statement]) -> Vec<(String, Vec<usize>)> {
    let mut grouped: Vec<(String, Vec<usize>)> = Vec::new();
    for (index, statement) in statements.iter().enumerate() {
        let name = statement.name_info().display_name;
        match grouped.iter_mut().find(|(speaker, _)| *speaker == name) {
            Some((_, indices)) => indices.push(index),
            None => grouped.push((name, vec![index])),
        }
    }
    grouped
}

/// Pairs each old statement with a new one, returning
/// `(old sequence, new slug)` mappings.
pub fn align_sequences(new: &[Statement], old: &[Statement]) -> Vec<(u32, String)> {
    let new_speakers = by_speaker(new);
    let mut mappings = Vec::new();
    let mut chosen: HashSet<usize> = HashSet::new();

    for (speaker, olds) in by_speaker(old) {
        let news: &[usize] = new_speakers
            .iter()
            .find(|(name, _)| *name == speaker)
            .map(|(_, indices)| indices.as_slice())
            .unwrap_or_default();

        if !speaker.is_empty() && olds.len() == news.len() {
            for (&old_index, &new_index) in olds.iter().zip(news) {
                let taken = chosen.contains(&new_index);
                let score = similarity(&old[old_index], &new[new_index], taken);
                if score < 0.9 {
                    warn!(score, speaker = %speaker, "low similarity for easy match");
                }
                mappings.push((old[old_index].sequence, new[new_index].slug.clone()));
            }
            continue;
        }

        let candidates: Vec<usize> = if news.is_empty() {
            warn!(speaker = %speaker, "no new statements for speaker");
            (0..new.len()).collect()
        } else {
            info!(speaker = %speaker, "count mismatch for speaker");
            news.to_vec()
        };
        for &old_index in &olds {
            let mut best: Option<(usize, f64)> = None;
            for &candidate in &candidates {
                let taken = chosen.contains(&candidate);
                let score = similarity(&old[old_index], &new[candidate], taken);
                if best.is_none_or(|(_, best_score)| score > best_score) {
                    best = Some((candidate, score));
                }
            }
            let Some((choice, score)) = best else {
                continue;
            };
            chosen.insert(choice);
            if score < 0.75 {
                warn!(score, speaker = %speaker, "low-score similarity match");
            }
            mappings.push((old[old_index].sequence, new[choice].slug.clone()));
        }
    }
    mappings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(sequence: u32, who: &str, slug: &str, text: &str) -> Statement {
        Statement {
            sequence,
            who_en: who.to_string(),
            slug: slug.to_string(),
            content_en: format!("<p>{text}</p>"),
            ..Statement::default()
        }
    }

    #[test]
    fn ratio_matches_difflib() {
        let a: Vec<&str> = "the quick brown fox".split(' ').collect();
        let b: Vec<&str> = "the slow brown fox".split(' ').collect();
        assert!((sequence_ratio(&a, &b) - 0.75).abs() < 1e-9);
        assert_eq!(sequence_ratio::<&str>(&[], &[]), 1.0);
    }

    #[test]
    fn equal_counts_zip_in_order() {
        let old = vec![
            statement(0, "Mr. Smith", "old-a", "First point"),
            statement(1, "Mr. Smith", "old-b", "Second point"),
        ];
        let new = vec![
            statement(0, "Mr. Smith", "smith-1", "First point, revised"),
            statement(1, "Mr. Smith", "smith-2", "Second point"),
        ];
        assert_eq!(
            align_sequences(&new, &old),
            [(0, "smith-1".to_string()), (1, "smith-2".to_string())]
        );
    }

    #[test]
    fn split_statements_pick_the_closest_text() {
        let motion = "We support the motion on housing";
        let old = vec![statement(4, "Ms. Jones", "old", motion)];
        let new = vec![
            statement(0, "Ms. Jones", "jones-1", "Thank you."),
            statement(1, "Ms. Jones", "jones-2", motion),
        ];
        assert_eq!(align_sequences(&new, &old), [(4, "jones-2".to_string())]);
    }
}
