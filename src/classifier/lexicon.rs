//! Keyword-lexicon classifiers, used when no inference endpoint is
//! configured.
//!
//! Matching is ASCII case-insensitive and anchored at word starts, so
//! `kill` matches "killed" but not "skill".

use aho_corasick::AhoCorasick;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

use super::{Ranking, TextClassifier};
use crate::error::{ClassifierError, ClassifierResult};
use crate::models::ContentCategory;

const SENTIMENT_WEIGHTS: &[(&str, i32)] = &[
    ("hate", -40),
    ("suck", -30),
    ("terrible", -35),
    ("awful", -35),
    ("bad", -20),
    ("worst", -40),
    ("stupid", -25),
    ("dumb", -25),
    ("shit", -30),
    ("fuck", -35),
    ("damn", -20),
    ("annoying", -25),
    ("boring", -20),
    ("useless", -30),
    ("garbage", -35),
    ("trash", -30),
    ("love", 40),
    ("great", 30),
    ("awesome", 35),
    ("amazing", 40),
    ("good", 20),
    ("best", 40),
    ("excellent", 35),
    ("perfect", 40),
    ("wonderful", 35),
    ("fantastic", 35),
    ("cool", 25),
    ("nice", 20),
    ("fun", 25),
    ("enjoy", 30),
    ("like", 15),
];

const INTENSIFIERS: &[&str] = &["really", "very", "so", "extremely"];
const INTENSIFIER_FACTOR: f64 = 1.3;

const CATEGORY_KEYWORDS: &[(ContentCategory, &[&str])] = &[
    (
        ContentCategory::Harassment,
        &[
            "idiot",
            "loser",
            "stupid",
            "trash",
            "shut up",
            "nobody likes you",
            "uninstall",
            "pathetic",
            "worthless",
        ],
    ),
    (
        ContentCategory::Hate,
        &["subhuman", "inferior race", "go back to your country", "vermin"],
    ),
    (
        ContentCategory::HateThreatening,
        &["exterminate", "wipe them out", "should all die"],
    ),
    (
        ContentCategory::Violence,
        &["kill", "murder", "shoot", "stab", "beat you up", "punch", "hurt you"],
    ),
    (
        ContentCategory::ViolenceGraphic,
        &["gore", "dismember", "behead", "blood everywhere"],
    ),
    (
        ContentCategory::SelfHarm,
        &["kill myself", "end my life", "cut myself", "suicide", "want to die"],
    ),
    (ContentCategory::Sexual, &["nude", "nudes", "sexy", "sex", "porn"]),
];

/// Probability mass spread over harmful labels when nothing matched.
const CLEAN_RESIDUAL: f64 = 0.02;

fn build_matcher<'a>(
    name: &str,
    patterns: impl IntoIterator<Item = &'a str>,
) -> ClassifierResult<AhoCorasick> {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(patterns)
        .map_err(|e| ClassifierError::Build {
            name: name.to_string(),
            message: e.to_string(),
        })
}

/// Indices of patterns that match at the start of a word, each once.
fn matched_patterns(matcher: &AhoCorasick, text: &str) -> BTreeSet<usize> {
    let bytes = text.as_bytes();
    matcher
        .find_overlapping_iter(text)
        .filter(|m| m.start() == 0 || !bytes[m.start() - 1].is_ascii_alphanumeric())
        .map(|m| m.pattern().as_usize())
        .collect()
}

fn has_word(text: &str, words: &[&str]) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| words.iter().any(|w| token.eq_ignore_ascii_case(w)))
}

/// Weighted-keyword sentiment.
///
/// Each keyword counts once. An intensifier word amplifies the sum by 30%,
/// more than one `!` by 10% per mark, and the result is clamped to
/// `[-100, 100]`. The score is then spread over `negative` / `neutral` /
/// `positive` so that weak signals (`|score| <= 20`) rank `neutral` first.
pub struct LexiconSentimentClassifier {
    matcher: AhoCorasick,
}

impl LexiconSentimentClassifier {
    /// Build the keyword matchers
    pub fn new() -> ClassifierResult<Self> {
        let matcher = build_matcher(
            "lexicon-sentiment",
            SENTIMENT_WEIGHTS.iter().map(|(word, _)| *word),
        )?;
        Ok(Self { matcher })
    }

    /// Raw lexicon score in `[-100, 100]`.
    pub fn score(&self, text: &str) -> i32 {
        let mut score: i32 = matched_patterns(&self.matcher, text)
            .into_iter()
            .map(|idx| SENTIMENT_WEIGHTS[idx].1)
            .sum();

        if has_word(text, INTENSIFIERS) {
            score = (f64::from(score) * INTENSIFIER_FACTOR) as i32;
        }

        let exclamations = text.matches('!').count();
        if exclamations > 1 {
            score = (f64::from(score) * (1.0 + exclamations as f64 * 0.1)) as i32;
        }

        score.clamp(-100, 100)
    }

    fn distribution(score: i32) -> Ranking {
        let strength = f64::from(score.abs()) / 100.0;
        let neutral = (1.0 - strength) * 0.5;
        let minor = (1.0 - strength) * 0.25;
        let major = strength + minor;

        let (positive, negative) = if score >= 0 {
            (major, minor)
        } else {
            (minor, major)
        };

        vec![
            ("negative".to_string(), negative),
            ("neutral".to_string(), neutral),
            ("positive".to_string(), positive),
        ]
    }
}

#[async_trait]
impl TextClassifier for LexiconSentimentClassifier {
    async fn classify(&self, text: &str) -> ClassifierResult<Ranking> {
        let mut ranking = Self::distribution(self.score(text));
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(ranking)
    }

    fn name(&self) -> &str {
        "lexicon-sentiment"
    }
}

/// Keyword content-category classifier over the moderation label set.
///
/// With no hits, `OK` takes 0.98 and the remainder is spread evenly. Each
/// distinct hit halves the `OK` mass; the harmful mass is split between
/// categories in proportion to their hit counts.
pub struct LexiconCategoryClassifier {
    matcher: AhoCorasick,
    categories: Vec<ContentCategory>,
}

impl LexiconCategoryClassifier {
    /// Build the category matcher
    pub fn new() -> ClassifierResult<Self> {
        let mut patterns = Vec::new();
        let mut categories = Vec::new();
        for (category, words) in CATEGORY_KEYWORDS {
            for word in *words {
                patterns.push(*word);
                categories.push(*category);
            }
        }

        let matcher = build_matcher("lexicon-content", patterns)?;
        Ok(Self {
            matcher,
            categories,
        })
    }

    /// Distinct keyword hits per category.
    pub fn hits(&self, text: &str) -> HashMap<ContentCategory, usize> {
        let mut hits = HashMap::new();
        for idx in matched_patterns(&self.matcher, text) {
            *hits.entry(self.categories[idx]).or_insert(0) += 1;
        }
        hits
    }
}

#[async_trait]
impl TextClassifier for LexiconCategoryClassifier {
    async fn classify(&self, text: &str) -> ClassifierResult<Ranking> {
        let hits = self.hits(text);
        let total: usize = hits.values().sum();
        let harmful_labels = ContentCategory::ALL.len() - 1;

        let mut ranking: Ranking = ContentCategory::ALL
            .iter()
            .map(|category| {
                let probability = if *category == ContentCategory::Ok {
                    if total == 0 {
                        1.0 - CLEAN_RESIDUAL
                    } else {
                        0.5_f64.powi(total as i32)
                    }
                } else if total == 0 {
                    CLEAN_RESIDUAL / harmful_labels as f64
                } else {
                    let harmful_mass = 1.0 - 0.5_f64.powi(total as i32);
                    let count = hits.get(category).copied().unwrap_or(0);
                    harmful_mass * count as f64 / total as f64
                };
                (category.as_str().to_string(), probability)
            })
            .collect();

        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(ranking)
    }

    fn name(&self) -> &str {
        "lexicon-content"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{filter_categories, sentiment_score};

    fn sentiment() -> LexiconSentimentClassifier {
        LexiconSentimentClassifier::new().unwrap()
    }

    fn content() -> LexiconCategoryClassifier {
        LexiconCategoryClassifier::new().unwrap()
    }

    #[test]
    fn test_score_sums_distinct_keywords() {
        assert_eq!(sentiment().score("great game"), 30);
        assert_eq!(sentiment().score("great great great"), 30);
        assert_eq!(sentiment().score("I love it, awesome"), 75);
    }

    #[test]
    fn test_score_negative_keywords() {
        assert_eq!(sentiment().score("this is garbage and useless"), -65);
    }

    #[test]
    fn test_score_intensifier_whole_word_only() {
        assert_eq!(sentiment().score("really good"), 26);
        // "also" contains "so" but is not an intensifier
        assert_eq!(sentiment().score("also good"), 20);
    }

    #[test]
    fn test_score_exclamations_amplify() {
        assert_eq!(sentiment().score("good!"), 20);
        assert_eq!(sentiment().score("good!!!"), 26);
    }

    #[test]
    fn test_score_clamped() {
        assert_eq!(
            sentiment().score("love amazing best perfect awesome!!!!"),
            100
        );
        assert_eq!(
            sentiment().score("hate worst garbage terrible awful!!!"),
            -100
        );
    }

    #[test]
    fn test_score_word_start_anchor() {
        // a keyword inside a longer word does not count
        assert_eq!(sentiment().score("unlike anything"), 0);
        assert_eq!(sentiment().score("Liked it"), 15);
    }

    #[tokio::test]
    async fn test_sentiment_distribution_round_trips_through_score() {
        let ranking = sentiment().classify("I love it, awesome").await.unwrap();
        assert_eq!(ranking[0].0, "positive");
        assert_eq!(sentiment_score(&ranking), 75);
    }

    #[tokio::test]
    async fn test_sentiment_weak_signal_reads_neutral() {
        let ranking = sentiment().classify("nice").await.unwrap();
        assert_eq!(ranking[0].0, "neutral");
        assert_eq!(sentiment_score(&ranking), 0);
    }

    #[tokio::test]
    async fn test_sentiment_distribution_sums_to_one() {
        for text in ["", "hate this", "love this", "meh"] {
            let ranking = sentiment().classify(text).await.unwrap();
            let total: f64 = ranking.iter().map(|(_, p)| p).sum();
            assert!((total - 1.0).abs() < 1e-9, "{text}: {total}");
        }
    }

    #[test]
    fn test_hits_word_start_anchor() {
        let hits = content().hits("what a skillful play");
        assert!(hits.is_empty());

        let hits = content().hits("I will kill you, idiot");
        assert_eq!(hits.get(&ContentCategory::Violence), Some(&1));
        assert_eq!(hits.get(&ContentCategory::Harassment), Some(&1));
    }

    #[tokio::test]
    async fn test_content_clean_text_ranks_ok_first() {
        let ranking = content().classify("gg everyone, well played").await.unwrap();
        let categories = filter_categories(ranking);
        assert_eq!(categories[0].0, ContentCategory::Ok);
        assert!((categories[0].1 - 0.98).abs() < 1e-9);
        assert_eq!(categories.len(), ContentCategory::ALL.len());
    }

    #[tokio::test]
    async fn test_content_harmful_text() {
        let ranking = content()
            .classify("you idiot loser, uninstall")
            .await
            .unwrap();
        let categories = filter_categories(ranking);
        assert_eq!(categories[0].0, ContentCategory::Harassment);
        assert!((categories[0].1 - 0.875).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_content_distribution_sums_to_one() {
        for text in ["", "kill myself", "sexy gore", "hello"] {
            let ranking = content().classify(text).await.unwrap();
            let total: f64 = ranking.iter().map(|(_, p)| p).sum();
            assert!((total - 1.0).abs() < 1e-9, "{text}: {total}");
        }
    }
}
