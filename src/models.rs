use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The three model variants under review. Score records are always keyed by
/// these canonical identifiers; the shuffled display letters (A/B/C) exist
/// only for presentation and are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Spark,
    Glm,
    O4,
}

impl Model {
    /// All models, in canonical order
    pub const ALL: [Model; 3] = [Model::Spark, Model::Glm, Model::O4];

    /// The key used for this model in score records and sample fields
    pub fn key(&self) -> &'static str {
        match self {
            Model::Spark => "spark",
            Model::Glm => "glm",
            Model::O4 => "o4",
        }
    }
}

/// Which half of a dimension entry a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Scores,
    Comments,
}

impl Field {
    /// Suffix appended to the dimension id to form the record key
    pub fn suffix(&self) -> &'static str {
        match self {
            Field::Scores => "scores",
            Field::Comments => "comments",
        }
    }
}

/// Per-model record: `"{dimension}_scores"` / `"{dimension}_comments"` → value
pub type ModelScores = BTreeMap<String, Value>;

/// Per-sample record: model key → per-model record
pub type SampleScores = BTreeMap<String, ModelScores>;

/// Full in-memory score state: sample id → per-sample record
pub type ScoreMap = BTreeMap<String, SampleScores>;

/// One generated-question sample from a reviewer's batch.
///
/// Only `result` is ever rewritten by this tool; every other field (including
/// ones this tool does not know about) round-trips through load and save
/// unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Sample identifier, unique within a reviewer's batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q_id: Option<String>,
    /// Score record attached once the reviewer has scored this sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SampleScores>,
    /// Remaining sample fields (query, generated questions, anything else)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Sample {
    /// The user request the questions were generated from
    pub fn query(&self) -> &str {
        self.extra
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// The question text a given model generated for this sample
    pub fn gen_question(&self, model: Model) -> &str {
        self.extra
            .get(&format!("gen_question_{}", model.key()))
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}
