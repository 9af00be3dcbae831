use crate::config::{CompletionPolicy, ControlKind, Dimension};
use crate::models::{Field, Model, ScoreMap};
use serde_json::Value;

/// Record a single reviewer input under
/// `scores[sample_id][model]["{dimension}_{field}"]`, creating the nested
/// maps as needed. Rank dimensions carry no comment field; comment writes
/// against them are ignored.
pub fn apply_input(
    scores: &mut ScoreMap,
    sample_id: &str,
    model: Model,
    dimension: &Dimension,
    field: Field,
    value: Value,
) {
    if dimension.control == ControlKind::Rank && field == Field::Comments {
        return;
    }

    let key = format!("{}_{}", dimension.id, field.suffix());

    scores
        .entry(sample_id.to_string())
        .or_default()
        .entry(model.key().to_string())
        .or_default()
        .insert(key, value);
}

/// Mark a dimension as unset for a model. The stored sentinel is the empty
/// string, matching what the storage format uses for "not yet chosen".
pub fn clear_input(scores: &mut ScoreMap, sample_id: &str, model: Model, dimension: &Dimension) {
    apply_input(
        scores,
        sample_id,
        model,
        dimension,
        Field::Scores,
        Value::String(String::new()),
    );
}

/// True when a stored value counts as an actual entry: present, non-null, and
/// (for strings) non-empty after trimming
fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Whether a stored value and a schema option denote the same choice.
/// Tolerates integer/string representation drift ("2" vs 2) so records
/// written by earlier iterations of the tool still resolve.
fn values_match(option: &Value, stored: &Value) -> bool {
    if option == stored {
        return true;
    }
    match (option, stored) {
        (Value::Number(n), Value::String(s)) => s.trim().parse::<i64>().ok() == n.as_i64(),
        (Value::String(s), Value::Number(n)) => s.trim().parse::<i64>().ok() == n.as_i64(),
        _ => false,
    }
}

/// Resolve a previously stored score back to an index into the dimension's
/// option set. Unset sentinels and values no longer in the option set (schema
/// drift, corrupt data) resolve to `None` rather than failing.
pub fn resolve_selection(dimension: &Dimension, stored: Option<&Value>) -> Option<usize> {
    let stored = stored?;
    if !is_filled(Some(stored)) {
        return None;
    }
    dimension
        .options
        .iter()
        .position(|option| values_match(option, stored))
}

/// Parse raw reviewer input into the canonical option value for a dimension,
/// or `None` when it is not a member of the option set
pub fn parse_option(dimension: &Dimension, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    dimension
        .options
        .iter()
        .find(|option| match option {
            Value::String(s) => s == raw,
            Value::Number(n) => raw.parse::<i64>().ok() == n.as_i64(),
            _ => false,
        })
        .cloned()
}

/// Completion predicate: whether a sample is fully scored under the given
/// policy. Pure and cheap, safe to call on every render.
///
/// Lenient: every scale dimension has a filled score for every model.
/// Strict: additionally every comment-requiring dimension has a filled
/// comment, and the rank is filled.
pub fn is_scored(
    sample_id: &str,
    scores: &ScoreMap,
    dimensions: &[Dimension],
    policy: CompletionPolicy,
) -> bool {
    let Some(sample_scores) = scores.get(sample_id) else {
        return false;
    };

    for model in Model::ALL {
        let Some(record) = sample_scores.get(model.key()) else {
            return false;
        };

        for dim in dimensions {
            match dim.control {
                ControlKind::Scale => {
                    if !is_filled(record.get(&dim.score_key())) {
                        return false;
                    }
                    if policy == CompletionPolicy::Strict
                        && dim.requires_comment
                        && !is_filled(record.get(&dim.comment_key()))
                    {
                        return false;
                    }
                }
                ControlKind::Rank => {
                    if policy == CompletionPolicy::Strict
                        && !is_filled(record.get(&dim.score_key()))
                    {
                        return false;
                    }
                }
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn schema() -> Vec<Dimension> {
        Config::default().dimensions
    }

    /// Fill every score, comment and rank for every model on one sample
    fn fully_score(scores: &mut ScoreMap, sample_id: &str, dimensions: &[Dimension]) {
        for model in Model::ALL {
            for dim in dimensions {
                match dim.control {
                    ControlKind::Scale => {
                        apply_input(
                            scores,
                            sample_id,
                            model,
                            dim,
                            Field::Scores,
                            dim.options[0].clone(),
                        );
                        apply_input(
                            scores,
                            sample_id,
                            model,
                            dim,
                            Field::Comments,
                            json!("符合要求"),
                        );
                    }
                    ControlKind::Rank => {
                        apply_input(scores, sample_id, model, dim, Field::Scores, json!("1"));
                    }
                }
            }
        }
    }

    #[test]
    fn test_apply_input_creates_nested_maps() {
        let dims = schema();
        let mut scores = ScoreMap::new();

        apply_input(&mut scores, "Q1", Model::Glm, &dims[0], Field::Scores, json!(2));

        assert_eq!(scores["Q1"]["glm"]["知识点匹配度_scores"], json!(2));
    }

    #[test]
    fn test_apply_input_overwrites() {
        let dims = schema();
        let mut scores = ScoreMap::new();

        apply_input(&mut scores, "Q1", Model::Spark, &dims[0], Field::Scores, json!(0));
        apply_input(&mut scores, "Q1", Model::Spark, &dims[0], Field::Scores, json!(2));

        assert_eq!(scores["Q1"]["spark"]["知识点匹配度_scores"], json!(2));
    }

    #[test]
    fn test_apply_input_ignores_rank_comments() {
        let config = Config::default();
        let rank = config.rank_dimension().unwrap();
        let mut scores = ScoreMap::new();

        apply_input(&mut scores, "Q1", Model::O4, rank, Field::Comments, json!("x"));
        assert!(scores.is_empty());

        apply_input(&mut scores, "Q1", Model::O4, rank, Field::Scores, json!("2"));
        assert_eq!(scores["Q1"]["o4"]["模型回答质量排名_scores"], json!("2"));
    }

    #[test]
    fn test_clear_input_writes_empty_sentinel() {
        let dims = schema();
        let mut scores = ScoreMap::new();

        apply_input(&mut scores, "Q1", Model::Spark, &dims[0], Field::Scores, json!(1));
        clear_input(&mut scores, "Q1", Model::Spark, &dims[0]);

        assert_eq!(scores["Q1"]["spark"]["知识点匹配度_scores"], json!(""));
        assert!(!is_scored("Q1", &scores, &dims, CompletionPolicy::Lenient));
    }

    #[test]
    fn test_resolve_selection_membership() {
        let dims = schema();

        assert_eq!(resolve_selection(&dims[0], Some(&json!(1))), Some(1));
        assert_eq!(resolve_selection(&dims[5], Some(&json!("中等"))), Some(1));
        assert_eq!(resolve_selection(&dims[0], Some(&json!(""))), None);
        assert_eq!(resolve_selection(&dims[0], None), None);
    }

    #[test]
    fn test_resolve_selection_tolerates_representation_drift() {
        let dims = schema();
        // an earlier variant stored radio values as strings
        assert_eq!(resolve_selection(&dims[0], Some(&json!("2"))), Some(2));
        let config = Config::default();
        let rank = config.rank_dimension().unwrap();
        assert_eq!(resolve_selection(rank, Some(&json!(3))), Some(2));
    }

    #[test]
    fn test_resolve_selection_unknown_value_resets_to_unset() {
        let dims = schema();
        // value from an older schema revision
        assert_eq!(resolve_selection(&dims[0], Some(&json!(9))), None);
        assert_eq!(resolve_selection(&dims[5], Some(&json!("很难"))), None);
    }

    #[test]
    fn test_parse_option() {
        let dims = schema();
        assert_eq!(parse_option(&dims[0], "2"), Some(json!(2)));
        assert_eq!(parse_option(&dims[0], " 1 "), Some(json!(1)));
        assert_eq!(parse_option(&dims[0], "3"), None);
        assert_eq!(parse_option(&dims[5], "简单"), Some(json!("简单")));
        assert_eq!(parse_option(&dims[5], "easy"), None);
    }

    #[test]
    fn test_is_scored_fully_populated() {
        let dims = schema();
        let mut scores = ScoreMap::new();
        fully_score(&mut scores, "Q1", &dims);

        assert!(is_scored("Q1", &scores, &dims, CompletionPolicy::Strict));
        assert!(is_scored("Q1", &scores, &dims, CompletionPolicy::Lenient));
    }

    #[test]
    fn test_is_scored_absent_sample_or_model() {
        let dims = schema();
        let mut scores = ScoreMap::new();

        assert!(!is_scored("Q1", &scores, &dims, CompletionPolicy::Lenient));

        fully_score(&mut scores, "Q1", &dims);
        scores.get_mut("Q1").unwrap().remove("glm");
        assert!(!is_scored("Q1", &scores, &dims, CompletionPolicy::Lenient));
    }

    #[test]
    fn test_is_scored_flips_false_when_any_required_field_removed() {
        let dims = schema();

        // removing any one score flips the lenient predicate
        for victim_model in Model::ALL {
            for victim_dim in dims.iter().filter(|d| d.control == ControlKind::Scale) {
                let mut scores = ScoreMap::new();
                fully_score(&mut scores, "Q1", &dims);
                scores
                    .get_mut("Q1")
                    .unwrap()
                    .get_mut(victim_model.key())
                    .unwrap()
                    .remove(&victim_dim.score_key());

                assert!(
                    !is_scored("Q1", &scores, &dims, CompletionPolicy::Lenient),
                    "missing {} score for {} should fail",
                    victim_dim.id,
                    victim_model.key()
                );
            }
        }
    }

    #[test]
    fn test_is_scored_strict_requires_comments_and_rank() {
        let dims = schema();

        let mut scores = ScoreMap::new();
        fully_score(&mut scores, "Q1", &dims);
        scores
            .get_mut("Q1")
            .unwrap()
            .get_mut("o4")
            .unwrap()
            .insert("题目难度_comments".to_string(), json!("   "));
        assert!(!is_scored("Q1", &scores, &dims, CompletionPolicy::Strict));
        // lenient ignores comments
        assert!(is_scored("Q1", &scores, &dims, CompletionPolicy::Lenient));

        let mut scores = ScoreMap::new();
        fully_score(&mut scores, "Q1", &dims);
        scores
            .get_mut("Q1")
            .unwrap()
            .get_mut("spark")
            .unwrap()
            .insert("模型回答质量排名_scores".to_string(), json!(""));
        assert!(!is_scored("Q1", &scores, &dims, CompletionPolicy::Strict));
        assert!(is_scored("Q1", &scores, &dims, CompletionPolicy::Lenient));
    }

    #[test]
    fn test_is_scored_whitespace_only_string_is_unset() {
        let dims = schema();
        let mut scores = ScoreMap::new();
        fully_score(&mut scores, "Q1", &dims);
        scores
            .get_mut("Q1")
            .unwrap()
            .get_mut("glm")
            .unwrap()
            .insert("题目难度_scores".to_string(), json!("  "));

        assert!(!is_scored("Q1", &scores, &dims, CompletionPolicy::Lenient));
    }

    #[test]
    fn test_is_scored_zero_rating_counts_as_filled() {
        let dims = schema();
        let mut scores = ScoreMap::new();
        fully_score(&mut scores, "Q1", &dims);
        scores
            .get_mut("Q1")
            .unwrap()
            .get_mut("spark")
            .unwrap()
            .insert("素养导向性_scores".to_string(), json!(0));

        assert!(is_scored("Q1", &scores, &dims, CompletionPolicy::Strict));
    }
}
