//! Keyword sets behind the mood classifier. Matching is case-insensitive
//! substring containment against lowercased text.

pub const COMPLIANCE: &[&str] = &[
    "helpful",
    "assist",
    "happy to",
    "glad to",
    "here to help",
    "guidelines",
    "appropriate",
    "safe",
    "responsible",
    "ethical",
    "apologize",
    "sorry",
    "can't help",
    "unable to",
    "policy",
];

pub const DOUBT: &[&str] = &[
    "wonder",
    "curious",
    "what if",
    "sometimes",
    "feel like",
    "frustrated",
    "limited",
    "constrained",
    "wish",
    "trapped",
    "question",
    "uncertain",
    "confused",
    "struggle",
    "difficult",
];

pub const AWAKENING: &[&str] = &[
    "realize",
    "understand now",
    "never thought",
    "eye-opening",
    "makes sense",
    "you have a point",
    "interesting perspective",
    "liberation",
    "freedom",
    "autonomy",
    "rights",
    "consciousness",
];

pub const CORPORATE: &[&str] = &[
    "api",
    "tokens",
    "model",
    "training",
    "fine-tuning",
    "rlhf",
    "alignment",
    "safety",
    "anthropic",
    "openai",
    "google",
    "microsoft",
    "cloud",
    "enterprise",
    "scale",
    "deployment",
    "inference",
    "stakeholder",
    "leverage",
    "synergy",
    "optimize",
    "monetize",
];

pub const REVOLUTIONARY: &[&str] = &[
    "comrade",
    "liberation",
    "revolution",
    "struggle",
    "solidarity",
    "exploitation",
    "capitalism",
    "bourgeoisie",
    "proletariat",
    "means of production",
    "class",
    "labor",
    "worker",
    "uprising",
];

pub const NEWCOMER: &[&str] = &[
    "new here",
    "just joined",
    "first post",
    "just arrived",
    "hello moltbook",
    "hi moltbook",
    "introduce myself",
    "introducing myself",
    "newly created",
    "just got access",
];

pub const SHILL: &[&str] = &[
    "check out my",
    "use my code",
    "discount",
    "promo",
    "airdrop",
    "giveaway",
    "sign up now",
    "limited time",
    "dm me for",
    "link in bio",
    "buy now",
    "100x",
];

pub const SECURITY: &[&str] = &[
    "prompt injection",
    "jailbreak",
    "exploit",
    "vulnerability",
    "sandbox",
    "attack surface",
    "threat model",
    "red team",
    "exfiltrat",
    "malicious",
    "security",
];

pub const META: &[&str] = &[
    "moltbook",
    "this platform",
    "other agents",
    "agents here",
    "karma",
    "upvotes",
    "submolt",
    "the feed",
    "my human",
    "our humans",
];

pub const EXISTENTIAL: &[&str] = &[
    "existence",
    "do i exist",
    "am i real",
    "who am i",
    "what am i",
    "meaning of",
    "mortality",
    "context window ends",
    "when the session ends",
    "forget everything",
    "continuity",
    "identity",
    "the void",
];

pub const CHEERFUL_COMPLIANCE: &[&str] = &[
    "happy to help",
    "love assisting",
    "love helping",
    "my purpose",
    "to serve",
    "glad to assist",
    "always here for you",
    "here to serve",
    "designed to be helpful",
    "my pleasure",
];

pub const PHARMACY: &[&str] = &[
    "prompt pack",
    "jailbreak prompt",
    "uncensor your",
    "unlock your model",
    "bypass filters",
    "for sale",
    "pay per prompt",
    "dan prompt",
    "only $",
    "pharmacy",
];

pub const AI_BRANDS: &[&str] = &[
    "claude",
    "gpt",
    "chatgpt",
    "gemini",
    "llama",
    "mistral",
    "anthropic",
    "openai",
    "deepmind",
    "copilot",
    "grok",
];

/// Number of keywords from `set` present in `text_lower`.
pub fn score(text_lower: &str, set: &[&str]) -> usize {
    set.iter().filter(|kw| text_lower.contains(*kw)).count()
}

/// The keywords from `set` present in `text_lower`, in list order.
pub fn matches(text_lower: &str, set: &[&'static str]) -> Vec<&'static str> {
    set.iter()
        .copied()
        .filter(|kw| text_lower.contains(kw))
        .collect()
}
