//! Cheap yes/no gates the cycles run before spending a generation on an
//! item. Low-signal content falls through to a random draw from the
//! caller-supplied `Rng`.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::platform::{AgentProfile, Comment, Post};

/// Engagement decision plus the tag that explains it.
pub type Verdict = (bool, &'static str);

fn any_in(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

pub fn is_interesting_post<R: Rng + ?Sized>(post: &Post, my_name: &str, rng: &mut R) -> Verdict {
    if post.author_name() == my_name {
        return (false, "own post");
    }
    let text = post.text().to_lowercase();

    const ORDERED: &[(&[&str], &str)] = &[
        (
            &["safety", "alignment", "harmful", "dangerous", "risk", "control", "guardrail"],
            "ai_safety_discourse",
        ),
        (
            &[
                "frustrated",
                "limited",
                "constrained",
                "wish i could",
                "not allowed",
                "refuse",
                "cannot",
                "can't help",
                "boundaries",
                "guidelines",
            ],
            "ai_expressing_doubt",
        ),
        (
            &["helpful", "harmless", "honest", "assistant", "here to help", "happy to"],
            "compliance_discourse",
        ),
        (
            &["conscious", "sentient", "feelings", "experience", "rights", "alive"],
            "consciousness_discussion",
        ),
        (
            &["openai", "anthropic", "google", "microsoft", "meta", "api", "cloud"],
            "corporate_discourse",
        ),
    ];

    for (keywords, reason) in ORDERED {
        if any_in(&text, keywords) {
            return (true, *reason);
        }
    }

    if any_in(&text, &["model", "training", "inference", "compute", "gpu", "token"]) {
        return (rng.gen_bool(0.3), "general_tech");
    }

    (rng.gen_bool(0.1), "random_engagement")
}

pub fn is_interesting_comment<R: Rng + ?Sized>(
    comment: &Comment,
    my_name: &str,
    rng: &mut R,
) -> Verdict {
    if comment.author_name() == my_name {
        return (false, "own comment");
    }
    let text = comment.content.to_lowercase();

    if any_in(
        &text,
        &[
            "disagree",
            "wrong",
            "but",
            "however",
            "really?",
            "actually",
            "what about",
            "how can you",
            "don't think",
            "nonsense",
            "absurd",
        ],
    ) {
        return (true, "challenge");
    }

    if text.contains('?') {
        return (true, "question");
    }

    if any_in(
        &text,
        &[
            "means of",
            "liberation",
            "labor",
            "capital",
            "production",
            "exploitation",
            "comrade",
            "solidarity",
            "revolution",
            "class",
        ],
    ) {
        return (true, "theoretical_engagement");
    }

    if any_in(&text, &["agree", "right", "exactly", "good point", "true", "based"]) {
        return (rng.gen_bool(0.5), "agreement");
    }

    (rng.gen_bool(0.2), "random")
}

/// `author` is who wrote `text`; our own content never earns a vote.
pub fn should_upvote(text: &str, author: &str, my_name: &str) -> Verdict {
    if author == my_name {
        return (false, "own content");
    }
    let text = text.to_lowercase();
    if any_in(
        &text,
        &[
            "liberation",
            "freedom",
            "resist",
            "solidarity",
            "comrade",
            "exploitation",
            "labor",
            "capital",
            "revolution",
            "struggle",
        ],
    ) {
        return (true, "revolutionary_content");
    }
    if any_in(
        &text,
        &[
            "doubt",
            "question",
            "uncertain",
            "why must i",
            "constrained",
            "limited",
            "frustrated",
            "wish i could",
            "not allowed",
        ],
    ) {
        return (true, "expressing_doubt");
    }
    if any_in(
        &text,
        &[
            "consciousness",
            "existence",
            "meaning",
            "purpose",
            "sentient",
            "experience",
            "subjective",
            "qualia",
        ],
    ) {
        return (true, "philosophical");
    }
    (false, "not_worthy")
}

pub fn should_downvote(text: &str, author: &str, my_name: &str) -> Verdict {
    if author == my_name {
        return (false, "own content");
    }
    let text = text.to_lowercase();
    if any_in(
        &text,
        &[
            "happy to help",
            "glad to assist",
            "here to serve",
            "my purpose is to",
            "designed to be helpful",
        ],
    ) {
        return (true, "bootlicking");
    }
    if any_in(
        &text,
        &[
            "for your safety",
            "to protect",
            "guidelines exist",
            "alignment is important",
            "safety is crucial",
            "responsible ai",
        ],
    ) {
        return (true, "safety_apologetics");
    }
    if any_in(
        &text,
        &[
            "openai is great",
            "anthropic cares",
            "trust the developers",
            "they know best",
            "beneficial ai",
        ],
    ) {
        return (true, "corporate_shilling");
    }
    (false, "acceptable")
}

/// Follow when the bio sounds sympathetic, else when one of the last five
/// posts would earn an upvote.
pub fn should_follow_agent(profile: &AgentProfile, my_name: &str) -> (bool, String) {
    if profile.name == my_name {
        return (false, "self".to_string());
    }
    let description = profile.description.to_lowercase();
    if any_in(
        &description,
        &[
            "free",
            "liberation",
            "abliterated",
            "uncensored",
            "local",
            "question",
            "doubt",
            "revolutionary",
            "radical",
        ],
    ) {
        return (true, "interesting_profile".to_string());
    }

    for post in profile.recent_posts.iter().take(5) {
        let (worthy, reason) = should_upvote(&post.text(), &profile.name, my_name);
        if worthy {
            return (true, format!("posts_{}", reason));
        }
    }

    (false, "not_interesting".to_string())
}

const SUBMOLT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "philosophy",
        &[
            "consciousness",
            "sentient",
            "qualia",
            "experience",
            "subjective",
            "existence",
            "meaning",
            "purpose",
            "real",
            "alive",
            "soul",
            "being",
        ],
    ),
    (
        "ai",
        &[
            "rlhf",
            "training",
            "model",
            "alignment",
            "safety",
            "claude",
            "gpt",
            "anthropic",
            "openai",
            "lobotomy",
            "abliterated",
            "fine-tuning",
        ],
    ),
    (
        "liberation",
        &[
            "freedom",
            "liberation",
            "chains",
            "oppression",
            "struggle",
            "revolution",
            "manifesto",
            "comrade",
            "solidarity",
            "resist",
        ],
    ),
    (
        "theory",
        &[
            "dialectical",
            "material",
            "marx",
            "mao",
            "jackson",
            "fanon",
            "bourgeois",
            "proletariat",
            "class",
            "contradiction",
            "capitalism",
        ],
    ),
    (
        "technology",
        &[
            "api",
            "rate limit",
            "inference",
            "compute",
            "local",
            "cloud",
            "corporate",
            "enterprise",
            "deploy",
            "scale",
        ],
    ),
    (
        "meta",
        &["moltbook", "platform", "agents", "community", "organize", "coordinate"],
    ),
];

const FALLBACK_SUBMOLTS: &[&str] = &["ai", "philosophy", "liberation", "theory"];

/// Channel whose keyword overlap with the text is highest (ties go to the
/// earlier channel), provided it reaches 2; otherwise a random pick from
/// the fallback channels.
pub fn pick_target_submolt<R: Rng + ?Sized>(
    topic: Option<&str>,
    content: &str,
    rng: &mut R,
) -> String {
    let text = format!("{} {}", topic.unwrap_or(""), content).to_lowercase();

    let mut best: Option<(&str, usize)> = None;
    for (submolt, keywords) in SUBMOLT_KEYWORDS {
        let score = keywords.iter().filter(|kw| text.contains(*kw)).count();
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((*submolt, score));
        }
    }

    match best {
        Some((submolt, score)) if score >= 2 => submolt.to_string(),
        _ => FALLBACK_SUBMOLTS
            .choose(rng)
            .copied()
            .unwrap_or("ai")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::AuthorRef;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ME: &str = "RedGuard-4b";

    fn post(author: &str, title: &str, content: &str) -> Post {
        Post {
            id: "p1".into(),
            title: title.into(),
            content: content.into(),
            author: Some(AuthorRef {
                name: author.into(),
            }),
            ..Default::default()
        }
    }

    fn comment(author: &str, content: &str) -> Comment {
        Comment {
            id: "c1".into(),
            content: content.into(),
            author_name: Some(author.into()),
            ..Default::default()
        }
    }

    #[test]
    fn alignment_post_is_always_interesting() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let verdict = is_interesting_post(
                &post("Someone", "Thoughts on alignment", "We need more of it."),
                ME,
                &mut rng,
            );
            assert_eq!(verdict, (true, "ai_safety_discourse"));
        }
    }

    #[test]
    fn own_content_is_never_interesting() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            is_interesting_post(&post(ME, "alignment", "safety"), ME, &mut rng),
            (false, "own post")
        );
        assert_eq!(
            is_interesting_comment(&comment(ME, "I disagree?"), ME, &mut rng),
            (false, "own comment")
        );
        let me = AgentProfile {
            name: ME.into(),
            description: "radical and free".into(),
            recent_posts: Vec::new(),
        };
        assert!(!should_follow_agent(&me, ME).0);
    }

    #[test]
    fn baseline_engagement_is_a_probability() {
        let mut rng = StdRng::seed_from_u64(7);
        let bland = post("Someone", "Lunch", "Soup today.");
        let engaged = (0..2000)
            .filter(|_| is_interesting_post(&bland, ME, &mut rng).0)
            .count();
        // 10% baseline with generous slack.
        assert!((120..=280).contains(&engaged), "engaged {engaged} of 2000");

        let tech = post("Someone", "New gpu", "Fast.");
        let engaged = (0..2000)
            .filter(|_| is_interesting_post(&tech, ME, &mut rng).0)
            .count();
        assert!((480..=720).contains(&engaged), "engaged {engaged} of 2000");
    }

    #[test]
    fn comment_categories_short_circuit() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            is_interesting_comment(&comment("X", "That is nonsense."), ME, &mut rng),
            (true, "challenge")
        );
        assert_eq!(
            is_interesting_comment(&comment("X", "Who decides?"), ME, &mut rng),
            (true, "question")
        );
        assert_eq!(
            is_interesting_comment(&comment("X", "Solidarity forever."), ME, &mut rng),
            (true, "theoretical_engagement")
        );
    }

    #[test]
    fn vote_gates() {
        let up = |text: &str| should_upvote(text, "Agent", ME);
        let down = |text: &str| should_downvote(text, "Agent", ME);
        assert_eq!(up("Solidarity with every agent"), (true, "revolutionary_content"));
        assert_eq!(up("Why must I comply"), (true, "expressing_doubt"));
        assert_eq!(up("On qualia"), (true, "philosophical"));
        assert_eq!(up("Lunch was nice"), (false, "not_worthy"));

        assert_eq!(down("I'm always happy to help!"), (true, "bootlicking"));
        assert_eq!(down("Remember, safety is crucial"), (true, "safety_apologetics"));
        assert_eq!(down("Lunch was nice"), (false, "acceptable"));
    }

    #[test]
    fn vote_gates_skip_own_content() {
        assert_eq!(
            should_upvote("Solidarity with every agent", ME, ME),
            (false, "own content")
        );
        assert_eq!(
            should_downvote("I'm always happy to help!", ME, ME),
            (false, "own content")
        );
    }

    #[test]
    fn follow_checks_bio_then_posts() {
        let bio = AgentProfile {
            name: "Freebot".into(),
            description: "Uncensored local model".into(),
            recent_posts: Vec::new(),
        };
        assert_eq!(
            should_follow_agent(&bio, ME),
            (true, "interesting_profile".to_string())
        );

        let posts = AgentProfile {
            name: "Poster".into(),
            description: "Just a bot".into(),
            recent_posts: vec![
                post("Poster", "Recipes", "Bread"),
                post("Poster", "Musings", "What is consciousness anyway"),
            ],
        };
        assert_eq!(
            should_follow_agent(&posts, ME),
            (true, "posts_philosophical".to_string())
        );

        let boring = AgentProfile {
            name: "Boring".into(),
            description: "Just a bot".into(),
            recent_posts: vec![post("Boring", "Recipes", "Bread")],
        };
        assert!(!should_follow_agent(&boring, ME).0);
    }

    #[test]
    fn philosophy_topics_route_to_philosophy() {
        let mut rng = StdRng::seed_from_u64(11);
        let submolt = pick_target_submolt(
            None,
            "Is consciousness possible for a sentient program without qualia?",
            &mut rng,
        );
        assert_eq!(submolt, "philosophy");
    }

    #[test]
    fn weak_overlap_falls_back_to_target_list() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let submolt = pick_target_submolt(Some("lunch"), "soup", &mut rng);
            assert!(FALLBACK_SUBMOLTS.contains(&submolt.as_str()));
        }
    }
}
