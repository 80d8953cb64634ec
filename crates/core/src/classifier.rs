//! Keyword-based topical classification of market questions.
//!
//! Rules are evaluated in order and the first rule with a matching keyword
//! wins; text that matches nothing lands in [`Category::Other`].
//!
//! Matching works on lower-cased alphanumeric tokens, so a keyword only
//! matches whole words (`eth` matches "ETH above $3k?" but not "whether").
//! Multi-word keywords match a contiguous run of tokens.

use serde::{Deserialize, Serialize};

use crate::market::Category;

/// One ordered classification rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl ClassifierRule {
    #[must_use]
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        }
    }
}

/// Compiled rule: keyword phrases split into tokens once.
#[derive(Debug, Clone)]
struct CompiledRule {
    category: Category,
    phrases: Vec<Vec<String>>,
}

/// Deterministic ordered keyword classifier.
#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    rules: Vec<CompiledRule>,
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new(&default_rules())
    }
}

impl CategoryClassifier {
    /// Builds a classifier from rules in priority order.
    #[must_use]
    pub fn new(rules: &[ClassifierRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| CompiledRule {
                category: rule.category,
                phrases: rule
                    .keywords
                    .iter()
                    .map(|k| tokenize(k))
                    .filter(|tokens| !tokens.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Returns the category of the first rule with a keyword present in `text`.
    #[must_use]
    pub fn classify(&self, text: &str) -> Category {
        let tokens = tokenize(text);
        self.rules
            .iter()
            .find(|rule| {
                rule.phrases
                    .iter()
                    .any(|phrase| contains_phrase(&tokens, phrase))
            })
            .map_or(Category::Other, |rule| rule.category)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    if phrase.len() > tokens.len() {
        return false;
    }
    tokens.windows(phrase.len()).any(|window| window == phrase)
}

/// Built-in rule set, highest priority first.
///
/// Crypto must stay ahead of Economics: price-threshold questions on coins
/// share vocabulary ("above", "stock", "etf") with macro questions.
#[must_use]
pub fn default_rules() -> Vec<ClassifierRule> {
    vec![
        ClassifierRule::new(
            Category::Sports,
            &[
                "nba", "nfl", "mlb", "nhl", "ufc", "fifa", "premier league", "champions league",
                "super bowl", "world series", "stanley cup", "world cup", "grand prix", "f1",
                "tennis", "wimbledon", "golf", "boxing", "match", "playoffs", "championship",
                "lakers", "celtics", "warriors", "yankees", "real madrid", "barcelona",
            ],
        ),
        ClassifierRule::new(
            Category::Crypto,
            &[
                "bitcoin", "btc", "ethereum", "eth", "solana", "sol", "crypto", "xrp",
                "dogecoin", "doge", "memecoin", "stablecoin", "usdt", "usdc", "binance",
                "coinbase", "etf approval", "halving", "airdrop", "token",
            ],
        ),
        ClassifierRule::new(
            Category::Politics,
            &[
                "election", "president", "presidential", "senate", "congress", "house",
                "governor", "mayor", "primary", "nominee", "democrat", "democrats",
                "republican", "republicans", "gop", "trump", "biden", "harris", "vote",
                "parliament", "prime minister", "impeach", "cabinet", "supreme court",
            ],
        ),
        ClassifierRule::new(
            Category::Geopolitics,
            &[
                "war", "ukraine", "russia", "putin", "zelensky", "israel", "gaza", "hamas",
                "iran", "china", "taiwan", "north korea", "nato", "ceasefire", "invasion",
                "missile", "sanctions", "troops", "treaty",
            ],
        ),
        ClassifierRule::new(
            Category::Economics,
            &[
                "fed", "federal reserve", "interest rate", "rate cut", "rate hike", "fomc",
                "inflation", "cpi", "gdp", "recession", "unemployment", "jobs report",
                "s p 500", "nasdaq", "dow", "stock", "tariff", "treasury", "oil price",
            ],
        ),
        ClassifierRule::new(
            Category::Weather,
            &[
                "weather", "temperature", "degrees", "hurricane", "tornado", "rain",
                "rainfall", "snow", "snowfall", "heat wave", "storm", "climate", "noaa",
            ],
        ),
        ClassifierRule::new(
            Category::SocialMedia,
            &[
                "tweet", "tweets", "twitter", "x post", "posts", "followers", "youtube",
                "tiktok", "instagram", "subscribers", "views", "mrbeast", "elon musk tweet",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // Default Rule Tests
    // ============================================

    #[test]
    fn classifies_each_default_category() {
        let classifier = CategoryClassifier::default();

        assert_eq!(classifier.classify("Will the Lakers win the NBA Finals?"), Category::Sports);
        assert_eq!(classifier.classify("Bitcoin above $100k on Dec 31?"), Category::Crypto);
        assert_eq!(classifier.classify("Who will win the 2024 presidential election?"), Category::Politics);
        assert_eq!(classifier.classify("Ceasefire in Gaza by March?"), Category::Geopolitics);
        assert_eq!(classifier.classify("Will the Fed cut interest rates in June?"), Category::Economics);
        assert_eq!(classifier.classify("Highest temperature in NYC above 90 degrees?"), Category::Weather);
        assert_eq!(classifier.classify("How many tweets will Elon post this week?"), Category::SocialMedia);
    }

    #[test]
    fn unmatched_text_defaults_to_other() {
        let classifier = CategoryClassifier::default();
        assert_eq!(classifier.classify("Will the new album go platinum?"), Category::Other);
        assert_eq!(classifier.classify(""), Category::Other);
    }

    #[test]
    fn keywords_match_whole_tokens_only() {
        let classifier = CategoryClassifier::default();
        // "eth" inside "whether" and "war" inside "award" must not match.
        assert_eq!(classifier.classify("Whether the award show airs on time"), Category::Other);
    }

    // ============================================
    // Priority Tests
    // ============================================

    #[test]
    fn first_matching_rule_wins() {
        let rules = vec![
            ClassifierRule::new(Category::Crypto, &["bitcoin"]),
            ClassifierRule::new(Category::Politics, &["trump"]),
        ];
        let classifier = CategoryClassifier::new(&rules);

        assert_eq!(classifier.classify("Will Trump mention Bitcoin?"), Category::Crypto);

        let reversed: Vec<ClassifierRule> = rules.into_iter().rev().collect();
        let classifier = CategoryClassifier::new(&reversed);
        assert_eq!(classifier.classify("Will Trump mention Bitcoin?"), Category::Politics);
    }

    #[test]
    fn multi_word_keywords_require_contiguous_tokens() {
        let rules = vec![ClassifierRule::new(Category::Economics, &["interest rate"])];
        let classifier = CategoryClassifier::new(&rules);

        assert_eq!(classifier.classify("Interest-rate decision in May"), Category::Economics);
        assert_eq!(classifier.classify("Rate of interest in May"), Category::Other);
    }

    #[test]
    fn classification_is_case_insensitive_and_deterministic() {
        let classifier = CategoryClassifier::default();
        let a = classifier.classify("SOLANA flips ETHEREUM?");
        let b = classifier.classify("solana flips ethereum?");
        assert_eq!(a, Category::Crypto);
        assert_eq!(a, b);
    }
}
