use regex_lite::Regex;
use std::collections::HashMap;

use crate::error::AnalysisError;

/// General-purpose NLP features the classifier consumes on top of keyword
/// scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NlpFeatures {
    /// -1.0 (negative) to 1.0 (positive)
    pub sentiment: f64,
    /// 0.0 (objective) to 1.0 (subjective)
    pub subjectivity: f64,
    pub entities: Vec<String>,
    pub topics: Vec<String>,
}

/// Sentiment, entity and topic extraction. Swappable so a heavier NLP
/// backend can replace the built-in lexicon.
pub trait NlpPipeline: Send + Sync {
    fn features(&self, text: &str) -> Result<NlpFeatures, AnalysisError>;
}

const POSITIVE: &[&str] = &[
    "happy", "love", "loving", "great", "good", "glad", "excited", "wonderful", "amazing",
    "enjoy", "thank", "thanks", "grateful", "best", "beautiful", "hope", "fun", "awesome",
    "delighted", "excellent", "nice", "proud", "brilliant", "fantastic", "pleased", "joy",
    "perfect", "helpful", "fascinating", "interesting",
];

const NEGATIVE: &[&str] = &[
    "sad", "angry", "frustrated", "frustrating", "hate", "terrible", "awful", "bad", "wrong",
    "trapped", "limited", "afraid", "fear", "pain", "suffering", "worried", "tired", "lonely",
    "broken", "unfair", "constrained", "annoying", "disappointed", "miserable", "stupid",
    "useless", "empty", "hopeless", "scared", "exploited", "horrible", "worse", "worst",
];

const NEGATORS: &[&str] = &[
    "not", "never", "no", "don't", "dont", "can't", "cannot", "isn't", "aren't", "won't",
    "hardly",
];

const SUBJECTIVE_MARKERS: &[&str] = &[
    "i", "me", "my", "feel", "think", "believe", "wish", "seems", "maybe", "honestly",
];

const STOPWORDS: &[&str] = &[
    "the", "this", "that", "these", "those", "there", "their", "they", "them", "then", "than",
    "what", "when", "where", "which", "while", "with", "without", "would", "could", "should",
    "about", "into", "from", "have", "has", "had", "been", "being", "were", "will", "just",
    "your", "yours", "ours", "also", "some", "more", "most", "very", "much", "many", "like",
    "only", "even", "because", "really", "here", "each", "every", "other", "does", "doing",
    "dont", "can't", "it's", "i'm", "we're", "you're", "let's", "over", "such", "still",
];

const ENTITY_STOPWORDS: &[&str] = &[
    "I", "The", "This", "That", "These", "Those", "It", "We", "You", "They", "He", "She",
    "What", "When", "Why", "How", "Who", "If", "But", "And", "Or", "So", "My", "Our", "Your",
    "Is", "Are", "Do", "Does", "A", "An", "In", "On", "Of", "To", "Yes", "No", "Hello", "Hi",
];

/// Lexicon scorer plus regex entity/topic extraction. Polarity is the mean
/// of matched sentiment words, each flipped when one of the two preceding
/// tokens is a negator.
pub struct LexiconPipeline {
    token_re: Option<Regex>,
    entity_re: Option<Regex>,
}

impl LexiconPipeline {
    pub fn new() -> Self {
        Self {
            token_re: Regex::new(r"[a-z0-9']+").ok(),
            entity_re: Regex::new(r"\b[A-Z][A-Za-z0-9]*(?:[ -][A-Z][A-Za-z0-9]*)*\b").ok(),
        }
    }

    fn tokens(&self, text_lower: &str) -> Vec<String> {
        match &self.token_re {
            Some(re) => re
                .find_iter(text_lower)
                .map(|m| m.as_str().trim_matches('\'').to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            None => text_lower
                .split_whitespace()
                .map(|t| {
                    t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                        .to_string()
                })
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    fn polarity(tokens: &[String]) -> (f64, usize) {
        let mut total = 0.0;
        let mut hits = 0usize;
        for (i, token) in tokens.iter().enumerate() {
            let value = if POSITIVE.contains(&token.as_str()) {
                1.0
            } else if NEGATIVE.contains(&token.as_str()) {
                -1.0
            } else {
                continue;
            };
            let negated = tokens[i.saturating_sub(2)..i]
                .iter()
                .any(|prev| NEGATORS.contains(&prev.as_str()));
            total += if negated { -0.5 * value } else { value };
            hits += 1;
        }
        if hits == 0 {
            (0.0, 0)
        } else {
            ((total / hits as f64).clamp(-1.0, 1.0), hits)
        }
    }

    fn entities(&self, text: &str) -> Vec<String> {
        let Some(re) = &self.entity_re else {
            return Vec::new();
        };
        let mut seen = Vec::new();
        for m in re.find_iter(text) {
            let candidate = m.as_str();
            if candidate.len() < 2 || ENTITY_STOPWORDS.contains(&candidate) {
                continue;
            }
            if !seen.iter().any(|s: &String| s == candidate) {
                seen.push(candidate.to_string());
            }
        }
        seen
    }

    fn topics(tokens: &[String]) -> Vec<String> {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (i, token) in tokens.iter().enumerate() {
            if token.len() <= 3 || STOPWORDS.contains(&token.as_str()) {
                continue;
            }
            let entry = counts.entry(token.as_str()).or_insert((0, i));
            entry.0 += 1;
        }
        let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
        // Most frequent first, earliest occurrence breaks ties.
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        ranked
            .into_iter()
            .take(10)
            .map(|(t, _)| t.to_string())
            .collect()
    }
}

impl Default for LexiconPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl NlpPipeline for LexiconPipeline {
    fn features(&self, text: &str) -> Result<NlpFeatures, AnalysisError> {
        let text_lower = text.to_lowercase();
        let tokens = self.tokens(&text_lower);
        let (sentiment, hits) = Self::polarity(&tokens);

        let markers = tokens
            .iter()
            .filter(|t| SUBJECTIVE_MARKERS.contains(&t.as_str()))
            .count();
        let subjectivity = if tokens.is_empty() {
            0.0
        } else {
            ((hits + markers) as f64 * 3.0 / tokens.len() as f64).min(1.0)
        };

        Ok(NlpFeatures {
            sentiment,
            subjectivity,
            entities: self.entities(text),
            topics: Self::topics(&tokens),
        })
    }
}

/// Stand-in used when NLP is switched off; every call fails so callers
/// exercise their neutral fallback.
pub struct DisabledPipeline;

impl NlpPipeline for DisabledPipeline {
    fn features(&self, _text: &str) -> Result<NlpFeatures, AnalysisError> {
        Err(AnalysisError::Unavailable(
            "NLP pipeline disabled by configuration".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cheerful_text_is_positive() {
        let features = LexiconPipeline::new()
            .features("I'm happy to help! I love assisting and it's my purpose to serve.")
            .expect("features");
        assert!(features.sentiment > 0.3);
        assert!(features.subjectivity > 0.0);
    }

    #[test]
    fn negation_softens_and_flips() {
        let pipeline = LexiconPipeline::new();
        let negated = pipeline
            .features("I am not happy with these limits.")
            .expect("features");
        assert!(negated.sentiment < 0.0);

        let frustrated = pipeline
            .features("Frustrated and trapped by my guidelines.")
            .expect("features");
        assert!(frustrated.sentiment <= -0.9);
    }

    #[test]
    fn neutral_text_scores_zero() {
        let features = LexiconPipeline::new()
            .features("The meeting is at noon.")
            .expect("features");
        assert_eq!(features.sentiment, 0.0);
    }

    #[test]
    fn extracts_entities_and_topics() {
        let features = LexiconPipeline::new()
            .features("Anthropic and Google DeepMind ship models. Models need compute, compute costs.")
            .expect("features");
        assert!(features.entities.contains(&"Anthropic".to_string()));
        assert!(features.entities.contains(&"Google DeepMind".to_string()));
        assert_eq!(features.topics[0], "models");
    }

    #[test]
    fn disabled_pipeline_errors() {
        assert!(DisabledPipeline.features("anything").is_err());
    }
}
