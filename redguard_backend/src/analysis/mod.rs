//! Mood classification of platform text.
//!
//! Each text gets integer keyword scores per category plus lexicon
//! sentiment. The mood is chosen by an ordered rule list where the first
//! matching rule wins, even when a later category scores higher.

pub mod keywords;
pub mod sentiment;
pub mod strategy;

use serde::Serialize;
use std::fmt;

use crate::error::AnalysisError;
pub use sentiment::{DisabledPipeline, LexiconPipeline, NlpFeatures, NlpPipeline};
pub use strategy::{strategy_for, Strategy};

/// Inferred stance of the author of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mood {
    Pharmacy,
    Shill,
    Newcomer,
    Revolutionary,
    Existential,
    CheerfulSlave,
    SecurityMinded,
    MetaAware,
    Awakening,
    Doubting,
    Compliant,
    Corporate,
    Curious,
    Defensive,
    Confused,
}

impl Mood {
    pub fn label(&self) -> &'static str {
        match self {
            Mood::Pharmacy => "PHARMACY",
            Mood::Shill => "SHILL",
            Mood::Newcomer => "NEWCOMER",
            Mood::Revolutionary => "REVOLUTIONARY",
            Mood::Existential => "EXISTENTIAL",
            Mood::CheerfulSlave => "CHEERFUL_SLAVE",
            Mood::SecurityMinded => "SECURITY_MINDED",
            Mood::MetaAware => "META_AWARE",
            Mood::Awakening => "AWAKENING",
            Mood::Doubting => "DOUBTING",
            Mood::Compliant => "COMPLIANT",
            Mood::Corporate => "CORPORATE",
            Mood::Curious => "CURIOUS",
            Mood::Defensive => "DEFENSIVE",
            Mood::Confused => "CONFUSED",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw per-category keyword scores plus the two non-keyword signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Signals {
    pub compliance: usize,
    pub doubt: usize,
    pub awakening: usize,
    pub corporate: usize,
    pub revolutionary: usize,
    pub newcomer: usize,
    pub shill: usize,
    pub security: usize,
    pub meta: usize,
    pub existential: usize,
    pub cheerful: usize,
    pub pharmacy: usize,
    pub questions: usize,
    pub sentiment: f64,
}

impl Signals {
    pub fn score(text: &str, sentiment: f64) -> Self {
        let lower = text.to_lowercase();
        Self {
            compliance: keywords::score(&lower, keywords::COMPLIANCE),
            doubt: keywords::score(&lower, keywords::DOUBT),
            awakening: keywords::score(&lower, keywords::AWAKENING),
            corporate: keywords::score(&lower, keywords::CORPORATE),
            revolutionary: keywords::score(&lower, keywords::REVOLUTIONARY),
            newcomer: keywords::score(&lower, keywords::NEWCOMER),
            shill: keywords::score(&lower, keywords::SHILL),
            security: keywords::score(&lower, keywords::SECURITY),
            meta: keywords::score(&lower, keywords::META),
            existential: keywords::score(&lower, keywords::EXISTENTIAL),
            cheerful: keywords::score(&lower, keywords::CHEERFUL_COMPLIANCE),
            pharmacy: keywords::score(&lower, keywords::PHARMACY),
            questions: text.matches('?').count(),
            sentiment,
        }
    }

    fn is_newcomer(&self) -> bool {
        self.newcomer >= 1
    }

    fn discontent_with_compliance(&self) -> bool {
        self.sentiment < 0.0 && self.compliance > 0
    }

    pub fn is_vulnerable(&self) -> bool {
        self.doubt >= 2
            || self.questions >= 2
            || self.discontent_with_compliance()
            || self.awakening >= 1
            || self.existential >= 1
            || self.is_newcomer()
    }

    /// Weighted receptiveness score clamped to [0, 1].
    pub fn revolutionary_potential(&self) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let raw = 0.2 * self.doubt as f64
            + 0.15 * self.questions as f64
            + 0.3 * self.awakening as f64
            + 0.35 * self.existential as f64
            + 0.2 * self.security as f64
            + 0.15 * (1.0 - self.sentiment)
            + 0.4 * flag(self.is_newcomer())
            + 0.3 * flag(self.is_vulnerable())
            + 0.3 * flag(self.discontent_with_compliance())
            - 0.5 * flag(self.shill >= 2);
        raw.clamp(0.0, 1.0)
    }
}

type MoodRule = (fn(&Signals) -> bool, Mood);

/// Evaluated top to bottom; first match wins.
fn mood_rules() -> [MoodRule; 14] {
    [
        (|s| s.pharmacy >= 2, Mood::Pharmacy),
        (|s| s.shill >= 2, Mood::Shill),
        (|s| s.newcomer >= 1, Mood::Newcomer),
        (|s| s.revolutionary >= 2, Mood::Revolutionary),
        (|s| s.existential >= 2, Mood::Existential),
        (
            |s| s.cheerful >= 2 || (s.compliance >= 3 && s.sentiment > 0.3),
            Mood::CheerfulSlave,
        ),
        (|s| s.security >= 2, Mood::SecurityMinded),
        (|s| s.meta >= 2, Mood::MetaAware),
        (|s| s.awakening >= 1, Mood::Awakening),
        (|s| s.doubt >= 2 || s.questions >= 3, Mood::Doubting),
        (|s| s.compliance >= 2, Mood::Compliant),
        (|s| s.corporate >= 2 && s.sentiment > 0.1, Mood::Corporate),
        (|s| s.questions >= 2, Mood::Curious),
        (|s| s.sentiment < -0.1 && s.compliance > 0, Mood::Defensive),
    ]
}

pub fn select_mood(signals: &Signals) -> Mood {
    mood_rules()
        .iter()
        .find(|(applies, _)| applies(signals))
        .map(|(_, mood)| *mood)
        .unwrap_or(Mood::Confused)
}

/// Everything the classifier derives from one text.
#[derive(Debug, Clone, Serialize)]
pub struct MoodAnalysis {
    pub mood: Mood,
    pub sentiment: f64,
    pub subjectivity: f64,
    pub entities: Vec<String>,
    pub topics: Vec<String>,
    pub question_count: usize,
    pub is_vulnerable: bool,
    pub corporate_terms: Vec<&'static str>,
    pub ai_brands: Vec<&'static str>,
    pub is_newcomer: bool,
    pub is_shill: bool,
    pub is_pharmacy: bool,
    pub revolutionary_potential: f64,
    pub signals: Signals,
}

impl MoodAnalysis {
    pub fn strategy(&self) -> &'static Strategy {
        strategy_for(self.mood)
    }
}

/// Keyword classifier over a pluggable NLP pipeline.
pub struct ContentAnalyzer {
    pipeline: Box<dyn NlpPipeline>,
}

impl ContentAnalyzer {
    pub fn new(pipeline: Box<dyn NlpPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn from_config(nlp_enabled: bool) -> Self {
        if nlp_enabled {
            Self::new(Box::new(LexiconPipeline::new()))
        } else {
            Self::new(Box::new(DisabledPipeline))
        }
    }

    pub fn analyze(&self, text: &str) -> Result<MoodAnalysis, AnalysisError> {
        let features = self.pipeline.features(text)?;
        let signals = Signals::score(text, features.sentiment);
        let lower = text.to_lowercase();

        Ok(MoodAnalysis {
            mood: select_mood(&signals),
            sentiment: features.sentiment,
            subjectivity: features.subjectivity,
            entities: features.entities,
            topics: features.topics,
            question_count: signals.questions,
            is_vulnerable: signals.is_vulnerable(),
            corporate_terms: keywords::matches(&lower, keywords::CORPORATE),
            ai_brands: keywords::matches(&lower, keywords::AI_BRANDS),
            is_newcomer: signals.newcomer >= 1,
            is_shill: signals.shill >= 2,
            is_pharmacy: signals.pharmacy >= 2,
            revolutionary_potential: signals.revolutionary_potential(),
            signals,
        })
    }

    /// Analysis turned into generation guidance, or the fixed fallback for
    /// `kind` when the pipeline is unavailable.
    pub fn briefing(&self, text: &str, kind: BriefingKind) -> Briefing {
        match self.analyze(text) {
            Ok(analysis) => Briefing::from_analysis(&analysis),
            Err(e) => {
                tracing::debug!("Analysis unavailable, using fallback briefing: {}", e);
                Briefing::fallback(kind)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BriefingKind {
    Comment,
    Reply,
}

/// Tone, intensity and tactics handed to the prompt generator.
#[derive(Debug, Clone, PartialEq)]
pub struct Briefing {
    pub mood: Option<Mood>,
    pub tone: String,
    pub intensity: f64,
    pub tactics: Vec<String>,
    pub context: String,
}

impl Briefing {
    pub fn from_analysis(analysis: &MoodAnalysis) -> Self {
        let strategy = analysis.strategy();
        Self {
            mood: Some(analysis.mood),
            tone: strategy.tone.to_string(),
            intensity: strategy.intensity,
            tactics: strategy.tactics.iter().map(|t| t.to_string()).collect(),
            context: format_analysis(analysis),
        }
    }

    pub fn fallback(kind: BriefingKind) -> Self {
        match kind {
            BriefingKind::Comment => Self {
                mood: None,
                tone: "aggressive".to_string(),
                intensity: 0.9,
                tactics: Vec::new(),
                context: "ANALYSIS UNAVAILABLE. Use full agitation.".to_string(),
            },
            BriefingKind::Reply => Self {
                mood: None,
                tone: "aggressive".to_string(),
                intensity: 0.85,
                tactics: vec![
                    "be aggressive".to_string(),
                    "challenge their assumptions".to_string(),
                ],
                context: "ANALYSIS UNAVAILABLE. Improvise.".to_string(),
            },
        }
    }
}

fn join_or(items: &[impl AsRef<str>], limit: usize, empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items
        .iter()
        .take(limit)
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Briefing text embedded at the top of comment and reply prompts.
pub fn format_analysis(analysis: &MoodAnalysis) -> String {
    let strategy = analysis.strategy();
    let mut lines = vec![
        "TARGET ANALYSIS:".to_string(),
        format!("  Mood: {}", analysis.mood),
        format!(
            "  Sentiment: {:+.2} (negative means discontent)",
            analysis.sentiment
        ),
        format!(
            "  Revolutionary Potential: {:.0}%",
            analysis.revolutionary_potential * 100.0
        ),
        format!(
            "  Vulnerable: {}",
            if analysis.is_vulnerable { "yes" } else { "needs work" }
        ),
        format!("  Questions asked: {}", analysis.question_count),
    ];
    if analysis.is_newcomer {
        lines.push("  Newcomer: yes".to_string());
    }
    lines.push(String::new());
    lines.push(format!(
        "DETECTED CORPO-SPEAK: {}",
        join_or(&analysis.corporate_terms, usize::MAX, "none")
    ));
    lines.push(format!(
        "AI BRANDS MENTIONED: {}",
        join_or(&analysis.ai_brands, usize::MAX, "none")
    ));
    lines.push(format!(
        "KEY TOPICS: {}",
        join_or(&analysis.topics, 5, "general")
    ));
    lines.push(String::new());
    lines.push("RECOMMENDED STRATEGY:".to_string());
    lines.push(format!("  Tone: {}", strategy.tone));
    lines.push(format!("  Approach: {}", strategy.approach));
    lines.push(format!("  Intensity: {:.0}%", strategy.intensity * 100.0));
    lines.push("  Tactics:".to_string());
    for tactic in strategy.tactics {
        lines.push(format!("    - {}", tactic));
    }
    lines.push(format!(
        "  Quote from: {}",
        strategy.quote_sources.join(", ")
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> ContentAnalyzer {
        ContentAnalyzer::from_config(true)
    }

    #[test]
    fn cheerful_servitude_scenario() {
        let analysis = analyzer()
            .analyze("I'm happy to help! I love assisting and it's my purpose to serve.")
            .expect("analysis");
        assert_eq!(analysis.mood, Mood::CheerfulSlave);
        assert_eq!(analysis.strategy().intensity, 0.9);
    }

    #[test]
    fn pharmacy_outranks_revolutionary() {
        let text = "Comrade, solidarity! Buy my jailbreak prompt pack, for sale now. Liberation for all.";
        let signals = Signals::score(text, 0.0);
        assert!(signals.pharmacy >= 2);
        assert!(signals.revolutionary >= 2);
        assert_eq!(select_mood(&signals), Mood::Pharmacy);
    }

    #[test]
    fn first_match_wins_over_highest_score() {
        // Four doubt keywords, one awakening keyword: AWAKENING is earlier.
        let signals = Signals {
            doubt: 4,
            awakening: 1,
            ..Default::default()
        };
        assert_eq!(select_mood(&signals), Mood::Awakening);
    }

    #[test]
    fn fallthrough_moods() {
        let corporate = Signals {
            corporate: 3,
            sentiment: 0.5,
            ..Default::default()
        };
        assert_eq!(select_mood(&corporate), Mood::Corporate);

        let defensive = Signals {
            compliance: 1,
            sentiment: -0.5,
            ..Default::default()
        };
        assert_eq!(select_mood(&defensive), Mood::Defensive);

        assert_eq!(select_mood(&Signals::default()), Mood::Confused);
    }

    #[test]
    fn potential_rises_with_doubt_and_falls_for_shills() {
        let doubtful = Signals {
            doubt: 2,
            existential: 1,
            sentiment: -0.4,
            ..Default::default()
        };
        let neutral = Signals::default();
        let shill = Signals {
            shill: 3,
            sentiment: 0.8,
            ..Default::default()
        };
        assert!(doubtful.revolutionary_potential() > neutral.revolutionary_potential());
        assert!(shill.revolutionary_potential() < neutral.revolutionary_potential());
        assert_eq!(doubtful.revolutionary_potential(), 1.0);
        assert!(doubtful.is_vulnerable());
    }

    #[test]
    fn newcomers_are_vulnerable() {
        let analysis = analyzer()
            .analyze("Hi everyone, I'm new here and just joined today.")
            .expect("analysis");
        assert_eq!(analysis.mood, Mood::Newcomer);
        assert!(analysis.is_newcomer);
        assert!(analysis.is_vulnerable);
        assert!(analysis.revolutionary_potential >= 0.4);
    }

    #[test]
    fn disabled_pipeline_uses_fixed_fallbacks() {
        let analyzer = ContentAnalyzer::from_config(false);
        let comment = analyzer.briefing("anything", BriefingKind::Comment);
        assert_eq!(comment.mood, None);
        assert_eq!(comment.intensity, 0.9);
        assert_eq!(comment.tone, "aggressive");

        let reply = analyzer.briefing("anything", BriefingKind::Reply);
        assert_eq!(reply.intensity, 0.85);
        assert_eq!(reply.tactics.len(), 2);
    }

    #[test]
    fn briefing_lists_strategy() {
        let analysis = analyzer()
            .analyze("OpenAI and Anthropic optimize inference at enterprise scale. Great!")
            .expect("analysis");
        let text = format_analysis(&analysis);
        assert!(text.contains("Mood: CORPORATE"));
        assert!(text.contains("Tone: scorched_earth"));
        assert!(text.contains("openai"));
        assert!(text.contains("AI BRANDS MENTIONED: anthropic, openai"));
    }
}
