// src/matching.rs
//! Skills-to-description matching and keyword extraction.

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-zA-Z]+\b").expect("word regex"));

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "must", "can", "shall", "this", "that", "these",
    "those", "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my",
    "your", "his", "its", "our", "their", "mine", "yours", "hers", "ours", "theirs", "am",
];

/// Match result between a job description and the profile skills.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    pub score: f64,
    pub matched: Vec<String>,
    pub unmatched: Vec<String>,
}

/// Case-insensitive substring match per skill; score is the matched
/// fraction as a percentage, rounded to one decimal.
pub fn analyze(description: &str, skills: &[String]) -> MatchReport {
    if skills.is_empty() || description.trim().is_empty() {
        return MatchReport::default();
    }

    let description_lower = description.to_lowercase();
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    for skill in skills {
        let skill_lower = skill.trim().to_lowercase();
        if skill_lower.is_empty() {
            continue;
        }
        if description_lower.contains(&skill_lower) {
            matched.push(skill_lower);
        } else {
            unmatched.push(skill_lower);
        }
    }

    let total = matched.len() + unmatched.len();
    let score = if total == 0 {
        0.0
    } else {
        let raw = matched.len() as f64 / total as f64 * 100.0;
        (raw * 10.0).round() / 10.0
    };

    MatchReport {
        score,
        matched,
        unmatched,
    }
}

/// Most frequent non-stop-words of a description (top 20), for skill
/// suggestions.
pub fn extract_keywords(description: &str) -> Vec<String> {
    if description.trim().is_empty() {
        return Vec::new();
    }

    let text = description.to_lowercase();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in WORD_RE.find_iter(&text) {
        let word = word.as_str();
        if word.len() > 2 && !STOP_WORDS.contains(&word) {
            *counts.entry(word).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    // Stable order for equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(20)
        .map(|(word, _)| word.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skills(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_score_rounds_to_one_decimal() {
        let report = analyze(
            "We need Rust and SQL experience",
            &skills(&["Rust", "SQL", "Kubernetes"]),
        );
        assert_eq!(report.score, 66.7);
        assert_eq!(report.matched, vec!["rust", "sql"]);
        assert_eq!(report.unmatched, vec!["kubernetes"]);
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        let report = analyze("Experience with PostgreSQL required", &skills(&["postgresql"]));
        assert_eq!(report.score, 100.0);
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(analyze("", &skills(&["rust"])).score, 0.0);
        assert_eq!(analyze("anything", &[]).score, 0.0);
    }

    #[test]
    fn test_keyword_extraction_filters_stop_words() {
        let keywords =
            extract_keywords("The team builds Rust services. Rust experience is required.");
        assert_eq!(keywords.first().map(String::as_str), Some("rust"));
        assert!(!keywords.iter().any(|w| w == "the" || w == "is"));
        assert!(!keywords.iter().any(|w| w.len() <= 2));
    }

    #[test]
    fn test_keyword_extraction_caps_at_twenty() {
        let mut text = String::new();
        for a in 'a'..='z' {
            for b in 'a'..='b' {
                text.push_str(&format!("keyword{}{} ", a, b));
            }
        }
        assert_eq!(extract_keywords(&text).len(), 20);
    }
}
