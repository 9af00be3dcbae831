use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// How much a sample needs before navigation treats it as complete.
///
/// The two observed deployments of this tool disagreed: one required only the
/// scale scores, the other also required every comment and the rank. Both are
/// kept and the integrator picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionPolicy {
    /// Scores, comments and rank must all be filled; navigating away from an
    /// incomplete sample is blocked outright
    Strict,
    /// Only scores are required; leaving an incomplete sample asks for an
    /// explicit confirm-and-save
    Lenient,
}

/// Widget kind backing a rubric dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    /// Single-choice rating with a per-model comment box
    Scale,
    /// Single-choice 1..3 rank, no comment
    Rank,
}

/// One rubric dimension: an explicit structured schema entry, decoupled from
/// its human-readable label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    /// Stable identifier, used as the key prefix in score records
    pub id: String,
    /// Display label shown to the reviewer
    pub label: String,
    /// Control kind
    pub control: ControlKind,
    /// Enumerated option set for this dimension
    pub options: Vec<Value>,
    /// Whether the strict completion policy demands a comment here
    #[serde(default = "default_requires_comment")]
    pub requires_comment: bool,
}

fn default_requires_comment() -> bool {
    true
}

impl Dimension {
    /// Record key holding this dimension's score
    pub fn score_key(&self) -> String {
        format!("{}_scores", self.id)
    }

    /// Record key holding this dimension's comment
    pub fn comment_key(&self) -> String {
        format!("{}_comments", self.id)
    }
}

/// Tool configuration: where reviewer batches live, how completion is judged,
/// and the dimension schema. The schema must stay identical across all
/// reviewers of one campaign; changing it orphans stored option values (they
/// resolve back to "unset" on reload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the per-reviewer `data_{ID}.json` files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Completion policy gating navigation
    #[serde(default = "default_policy")]
    pub policy: CompletionPolicy,
    /// Rubric dimensions, in display order
    #[serde(default = "default_dimensions")]
    pub dimensions: Vec<Dimension>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_policy() -> CompletionPolicy {
    CompletionPolicy::Strict
}

/// The original seven-dimension rubric for generated exam questions
fn default_dimensions() -> Vec<Dimension> {
    let scale = |id: &str, label: &str, options: Vec<Value>| Dimension {
        id: id.to_string(),
        label: label.to_string(),
        control: ControlKind::Scale,
        options,
        requires_comment: true,
    };

    vec![
        scale(
            "知识点匹配度",
            "知识点匹配度：生成题目是否准确识别并体现用户输入的知识点",
            vec![json!(0), json!(1), json!(2)],
        ),
        scale(
            "题型匹配度",
            "题型匹配度：题目类型是否与用户选择的题型一致并符合该题型的格式规范",
            vec![json!(0), json!(1), json!(2)],
        ),
        scale(
            "题目准确性",
            "题目准确性：表达是否清晰、指向是否明确、术语是否规范，题目可解且答案确定",
            vec![json!(0), json!(1), json!(2)],
        ),
        scale(
            "解析准确性",
            "解析准确性：解析的正确性、严谨性与详细程度，知识点与目标学段相适配",
            vec![json!(0), json!(1), json!(2)],
        ),
        scale(
            "素养导向性",
            "素养导向性：题目是否设置了具体情景（文化生活场景、学科应用情景等）",
            vec![json!(0), json!(2)],
        ),
        scale(
            "题目难度",
            "题目难度：简单 / 中等 / 困难",
            vec![json!("简单"), json!("中等"), json!("困难")],
        ),
        Dimension {
            id: "模型回答质量排名".to_string(),
            label: "模型回答质量排名：第1名 / 第2名 / 第3名".to_string(),
            control: ControlKind::Rank,
            options: vec![json!("1"), json!("2"), json!("3")],
            requires_comment: false,
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            policy: default_policy(),
            dimensions: default_dimensions(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Load from a file when one is given, otherwise use the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Dimensions scored per model (everything except the rank control)
    pub fn scored_dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions
            .iter()
            .filter(|d| d.control == ControlKind::Scale)
    }

    /// The rank dimension, if the schema has one
    pub fn rank_dimension(&self) -> Option<&Dimension> {
        self.dimensions
            .iter()
            .find(|d| d.control == ControlKind::Rank)
    }
}
