//! Relevance scoring — five deterministic signals, weighted to 0..=100.
//!
//! | Signal | Weight | Measure |
//! |--------|--------|---------|
//! | Semantic similarity | 40 | Jaccard overlap of content and query token sets |
//! | Type relevance | 20 | Observation type named by a goal |
//! | Recency | 15 | `exp(-age_days / 30)` |
//! | Session context | 15 | Context-bearing metadata named by a goal |
//! | Keyword density | 10 | Share of content tokens that are query tokens |
//!
//! Tokens are runs of 1–64 ASCII alphanumerics, lowercased. Content is
//! untrusted, so the token pattern is bounded and token sets are capped.

use recallsift_core::{Observation, RelevanceScore};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static RE_TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9]{1,64}").ok());

const WEIGHT_SEMANTIC: f64 = 40.0;
const WEIGHT_TYPE: f64 = 20.0;
const WEIGHT_RECENCY: f64 = 15.0;
const WEIGHT_CONTEXT: f64 = 15.0;
const WEIGHT_DENSITY: f64 = 10.0;

const CONTENT_UNIQUE_TOKENS: usize = 200;
const QUERY_UNIQUE_TOKENS: usize = 50;
const DENSITY_TOKENS: usize = 500;
const RECENCY_HALF_LIFE_DAYS: f64 = 30.0;
const DAY_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Metadata keys whose values describe the session an observation came from.
pub const CONTEXT_KEYS: [&str; 6] = ["session_id", "session", "context", "project", "topic", "tag"];

/// Lowercased tokens in order of appearance, at most `limit`.
pub fn tokens(text: &str, limit: usize) -> impl Iterator<Item = String> + '_ {
    RE_TOKEN
        .as_ref()
        .into_iter()
        .flat_map(move |re| re.find_iter(text))
        .map(|m| m.as_str().to_ascii_lowercase())
        .take(limit)
}

/// The first `limit` distinct tokens.
pub fn unique_tokens(text: &str, limit: usize) -> HashSet<String> {
    let mut set = HashSet::new();
    if limit == 0 {
        return set;
    }
    for token in tokens(text, usize::MAX) {
        set.insert(token);
        if set.len() >= limit {
            break;
        }
    }
    set
}

/// Per-signal values in 0..=1 and the weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub semantic: f64,
    pub type_relevance: f64,
    pub recency: f64,
    pub session_context: f64,
    pub keyword_density: f64,
    pub score: u8,
}

impl ScoreBreakdown {
    fn weighted(&self) -> [(&'static str, f64); 5] {
        [
            ("query term overlap", self.semantic * WEIGHT_SEMANTIC),
            ("type named in goals", self.type_relevance * WEIGHT_TYPE),
            ("recency", self.recency * WEIGHT_RECENCY),
            ("session context named in goals", self.session_context * WEIGHT_CONTEXT),
            ("keyword density", self.keyword_density * WEIGHT_DENSITY),
        ]
    }

    /// A short explanation naming the strongest contributing signal.
    pub fn reason(&self) -> String {
        let (label, points) = self
            .weighted()
            .into_iter()
            .fold(("none", 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if points <= 0.0 {
            return format!("score {}: no matching signals", self.score);
        }
        format!("score {}: strongest signal {label} (+{points:.0})", self.score)
    }
}

/// An observation with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredObservation {
    pub observation: Observation,
    pub breakdown: ScoreBreakdown,
}

impl ScoredObservation {
    pub fn score(&self) -> u8 {
        self.breakdown.score
    }

    pub fn relevance(&self) -> RelevanceScore {
        RelevanceScore {
            mem_id: self.observation.id,
            score: self.breakdown.score,
            timestamp: self.observation.timestamp,
        }
    }
}

/// Scores observations against one query and set of goals.
///
/// Query and goal tokenization happens once; scoring is side-effect free.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    query_tokens: HashSet<String>,
    goals: Vec<String>,
    goal_tokens: HashSet<String>,
}

impl RelevanceScorer {
    pub fn new(query: &str, goals: &[String]) -> Self {
        let goals: Vec<String> = goals
            .iter()
            .map(|g| g.to_lowercase())
            .filter(|g| !g.trim().is_empty())
            .collect();
        let goal_tokens = goals
            .iter()
            .flat_map(|g| tokens(g, usize::MAX).collect::<Vec<_>>())
            .collect();
        Self {
            query_tokens: unique_tokens(query, QUERY_UNIQUE_TOKENS),
            goals,
            goal_tokens,
        }
    }

    /// Score one observation as of `now_ms`.
    pub fn score(&self, observation: &Observation, now_ms: i64) -> ScoreBreakdown {
        let semantic = jaccard(
            &unique_tokens(&observation.content, CONTENT_UNIQUE_TOKENS),
            &self.query_tokens,
        );
        let type_relevance = self.goal_match(std::iter::once(observation.kind.as_str()));
        let recency = recency(observation.timestamp, now_ms);
        let context_values: Vec<String> = CONTEXT_KEYS
            .iter()
            .filter_map(|key| observation.metadata.get(*key))
            .filter_map(|value| match value {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect();
        let session_context = self.goal_match(context_values.iter().map(String::as_str));
        let keyword_density = self.keyword_density(&observation.content);

        let total = semantic * WEIGHT_SEMANTIC
            + type_relevance * WEIGHT_TYPE
            + recency * WEIGHT_RECENCY
            + session_context * WEIGHT_CONTEXT
            + keyword_density * WEIGHT_DENSITY;

        ScoreBreakdown {
            semantic,
            type_relevance,
            recency,
            session_context,
            keyword_density,
            score: total.round().clamp(0.0, 100.0) as u8,
        }
    }

    /// Score and rank: score desc, then timestamp desc, then id desc.
    pub fn rank(&self, observations: Vec<Observation>, now_ms: i64) -> Vec<ScoredObservation> {
        let mut scored: Vec<ScoredObservation> = observations
            .into_iter()
            .map(|observation| {
                let breakdown = self.score(&observation, now_ms);
                ScoredObservation {
                    observation,
                    breakdown,
                }
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score()
                .cmp(&a.score())
                .then(b.observation.timestamp.cmp(&a.observation.timestamp))
                .then(b.observation.id.cmp(&a.observation.id))
        });
        scored
    }

    /// 1 when a goal contains a value verbatim, 0.5 on any shared token.
    fn goal_match<'a>(&self, values: impl Iterator<Item = &'a str>) -> f64 {
        let mut best: f64 = 0.0;
        for value in values {
            let value = value.trim().to_lowercase();
            if value.is_empty() {
                continue;
            }
            if self.goals.iter().any(|g| g.contains(&value)) {
                return 1.0;
            }
            if tokens(&value, usize::MAX).any(|t| self.goal_tokens.contains(&t)) {
                best = 0.5;
            }
        }
        best
    }

    fn keyword_density(&self, content: &str) -> f64 {
        let mut seen = 0usize;
        let mut hits = 0usize;
        for token in tokens(content, DENSITY_TOKENS) {
            seen += 1;
            if self.query_tokens.contains(&token) {
                hits += 1;
            }
        }
        if seen == 0 {
            0.0
        } else {
            (hits as f64 / seen as f64).min(1.0)
        }
    }
}

/// Score a single observation. See [`RelevanceScorer`].
pub fn score(observation: &Observation, query: &str, goals: &[String], now_ms: i64) -> u8 {
    RelevanceScorer::new(query, goals).score(observation, now_ms).score
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn recency(timestamp: i64, now_ms: i64) -> f64 {
    let age_days = now_ms.saturating_sub(timestamp).max(0) as f64 / DAY_MS;
    (-age_days / RECENCY_HALF_LIFE_DAYS).exp().clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_750_000_000_000;
    const DAY: i64 = 24 * 60 * 60 * 1000;

    fn goals(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokenizer_is_bounded_and_lowercased() {
        let long = "a".repeat(100);
        let toks: Vec<String> = tokens(&format!("Hello, WORLD {long}"), 10).collect();
        assert_eq!(toks[0], "hello");
        assert_eq!(toks[1], "world");
        assert_eq!(toks[2].len(), 64);
        assert_eq!(toks[3].len(), 36);
    }

    #[test]
    fn unique_tokens_caps_distinct_count() {
        let text = (0..300).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        assert_eq!(unique_tokens(&text, 200).len(), 200);
        assert_eq!(unique_tokens("a a a b", 200).len(), 2);
    }

    #[test]
    fn exact_match_fresh_and_on_goal_scores_high() {
        let obs = Observation::new(1, "decision", "retry backoff policy", NOW)
            .with_meta("project", "gateway");
        let b = RelevanceScorer::new(
            "retry backoff policy",
            &goals(&["record every decision about the gateway"]),
        )
        .score(&obs, NOW);

        assert_eq!(b.semantic, 1.0);
        assert_eq!(b.type_relevance, 1.0);
        assert_eq!(b.recency, 1.0);
        assert_eq!(b.session_context, 1.0);
        assert_eq!(b.keyword_density, 1.0);
        assert_eq!(b.score, 100);
    }

    #[test]
    fn unrelated_old_observation_scores_low() {
        let obs = Observation::new(1, "note", "lunch menu for friday", NOW - 365 * DAY);
        assert!(score(&obs, "database migration", &[], NOW) < 5);
    }

    #[test]
    fn type_token_overlap_is_half() {
        let obs = Observation::new(1, "bug-fix", "x", NOW);
        let b = RelevanceScorer::new("q", &goals(&["fix the flaky test"])).score(&obs, NOW);
        assert_eq!(b.type_relevance, 0.5);
    }

    #[test]
    fn future_timestamp_is_not_negative_age() {
        let obs = Observation::new(1, "note", "x", NOW + 10 * DAY);
        let b = RelevanceScorer::new("x", &[]).score(&obs, NOW);
        assert_eq!(b.recency, 1.0);
    }

    #[test]
    fn recency_decays() {
        assert!((recency(NOW - 30 * DAY, NOW) - (-1.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn score_is_deterministic() {
        let obs = Observation::new(5, "discovery", "tokio timers drift under load", NOW - 3 * DAY);
        let g = goals(&["investigate timer drift"]);
        assert_eq!(score(&obs, "timer drift", &g, NOW), score(&obs, "timer drift", &g, NOW));
    }

    #[test]
    fn ranking_is_total_and_order_independent() {
        let a = Observation::new(1, "note", "cache eviction", NOW - DAY);
        let b = Observation::new(2, "note", "cache eviction", NOW - DAY);
        let c = Observation::new(3, "note", "cache eviction", NOW);
        let d = Observation::new(4, "note", "unrelated", NOW);
        let scorer = RelevanceScorer::new("cache eviction", &[]);

        let forward = scorer.rank(vec![a.clone(), b.clone(), c.clone(), d.clone()], NOW);
        let backward = scorer.rank(vec![d, c, b, a], NOW);

        let ids = |v: &[ScoredObservation]| v.iter().map(|s| s.observation.id).collect::<Vec<_>>();
        assert_eq!(ids(&forward), vec![3, 2, 1, 4]);
        assert_eq!(ids(&forward), ids(&backward));
    }

    #[test]
    fn reason_names_strongest_signal() {
        let obs = Observation::new(1, "note", "cache eviction", NOW - 400 * DAY);
        let b = RelevanceScorer::new("cache eviction", &[]).score(&obs, NOW);
        assert!(b.reason().contains("query term overlap"), "{}", b.reason());
    }

    #[test]
    fn query_tokens_beyond_fifty_are_ignored() {
        let query = (0..60).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let scorer = RelevanceScorer::new(&query, &[]);

        let inside = scorer.score(&Observation::new(1, "note", "w49", NOW), NOW);
        assert!(inside.semantic > 0.0);
        assert_eq!(inside.keyword_density, 1.0);

        let beyond = scorer.score(&Observation::new(2, "note", "w55", NOW), NOW);
        assert_eq!(beyond.semantic, 0.0);
        assert_eq!(beyond.keyword_density, 0.0);
    }

    #[test]
    fn keyword_density_reads_first_five_hundred_tokens() {
        let scorer = RelevanceScorer::new("retry", &[]);
        let late = format!("{}{}", "filler ".repeat(500), "retry ".repeat(500));
        let early = format!("{}{}", "retry ".repeat(500), "filler ".repeat(500));

        let late = scorer.score(&Observation::new(1, "note", late, NOW), NOW);
        let early = scorer.score(&Observation::new(2, "note", early, NOW), NOW);
        assert_eq!(late.keyword_density, 0.0);
        assert_eq!(early.keyword_density, 1.0);
        assert_eq!(late.semantic, early.semantic);
    }

    #[test]
    fn relevance_carries_id_score_and_timestamp() {
        let obs = Observation::new(9, "note", "cache eviction", NOW - DAY);
        let ranked = RelevanceScorer::new("cache eviction", &[]).rank(vec![obs], NOW);
        let relevance = ranked[0].relevance();
        assert_eq!(relevance.mem_id, 9);
        assert_eq!(relevance.score, ranked[0].score());
        assert_eq!(relevance.timestamp, NOW - DAY);
    }
}
