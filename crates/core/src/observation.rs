//! Observations — timestamped notes recorded by the upstream tool-use tracker.
//!
//! An [`Observation`] is read-only inside RecallSift. The memory bridge hands
//! back [`RawObservation`]s in the store's own shape; [`RawObservation::into_observation`]
//! maps them into the internal form.

use serde::{Deserialize, Serialize};

/// Arbitrary descriptive fields attached to an observation.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single recorded observation, the unit that gets ranked and filtered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Observation {
    /// Identity within the upstream store.
    pub id: i64,

    /// Observation kind (e.g. "decision", "bugfix", "discovery").
    #[serde(rename = "type")]
    pub kind: String,

    /// The note text.
    pub content: String,

    /// Everything else the store knows about the note.
    #[serde(default)]
    pub metadata: Metadata,

    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
}

impl Observation {
    pub fn new(id: i64, kind: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id,
            kind: kind.into(),
            content: content.into(),
            metadata: Metadata::new(),
            timestamp,
        }
    }

    /// Attach a metadata entry (builder style).
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// String value of a metadata key, if present and textual.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// An observation as returned by the external store.
///
/// Content may live in any of `narrative`, `text` or `title`; all other
/// fields are captured verbatim in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawObservation {
    pub id: i64,

    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Creation time, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at_epoch: Option<i64>,

    #[serde(flatten)]
    pub extra: Metadata,
}

impl RawObservation {
    /// The first usable content field, in narrative → text → title order.
    pub fn content(&self) -> Option<&str> {
        [&self.narrative, &self.text, &self.title]
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .find(|s| !s.trim().is_empty())
    }

    /// Map into the internal shape. Returns `None` when there is no usable content.
    pub fn into_observation(self) -> Option<Observation> {
        let content = self.content()?.to_string();

        let mut metadata = self.extra;
        for (key, value) in [
            ("narrative", self.narrative),
            ("text", self.text),
            ("title", self.title),
        ] {
            if let Some(v) = value.filter(|v| v.as_str() != content && !v.trim().is_empty()) {
                metadata.insert(key.into(), serde_json::Value::String(v));
            }
        }

        Some(Observation {
            id: self.id,
            kind: if self.kind.is_empty() { "observation".into() } else { self.kind },
            content,
            metadata,
            timestamp: self.created_at_epoch.unwrap_or(0).max(0),
        })
    }
}

/// A derived relevance score for one observation. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceScore {
    pub mem_id: i64,
    /// 0..=100
    pub score: u8,
    pub timestamp: i64,
}

/// Relevance bucket of a scored observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceBucket {
    High,
    Medium,
    Low,
}

impl RelevanceBucket {
    /// Bucket membership is a pure function of the score.
    pub fn for_score(score: u8) -> Self {
        match score {
            80.. => Self::High,
            60..=79 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// An observation projected for the caller's follow-up lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemId {
    pub id: i64,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub relevance_score: u8,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_reason: Option<String>,
}

impl MemId {
    pub fn reference_for(kind: &str, id: i64) -> String {
        format!("mem://{kind}/{id}")
    }
}
