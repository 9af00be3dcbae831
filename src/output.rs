use crate::config::{Config, ControlKind};
use crate::models::{Sample, ScoreMap};
use crate::scoring;
use crate::shuffle::DisplayOrder;

/// One piece of a free-text block: either a math run (delimiters included) or
/// plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Inline (`$...$`) or block (`$$...$$`) math, delimiters kept
    Math(String),
    /// Plain text; newlines inside it are line breaks
    Text(String),
}

/// Split a text block into math and plain segments.
///
/// Math runs are delimited by `$...$` or `$$...$$` and may span newlines. An
/// unterminated delimiter is treated as plain text.
pub fn segments(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(start) = rest.find('$') {
        let (before, from_dollar) = rest.split_at(start);
        let delim = if from_dollar.starts_with("$$") { "$$" } else { "$" };
        let body = &from_dollar[delim.len()..];

        match body.find(delim) {
            Some(end) => {
                plain.push_str(before);
                if !plain.is_empty() {
                    out.push(Segment::Text(std::mem::take(&mut plain)));
                }
                let math_end = delim.len() + end + delim.len();
                out.push(Segment::Math(from_dollar[..math_end].to_string()));
                rest = &from_dollar[math_end..];
            }
            None => {
                // no closing delimiter: keep the dollar sign as literal text
                plain.push_str(before);
                plain.push_str(delim);
                rest = body;
            }
        }
    }

    plain.push_str(rest);
    if !plain.is_empty() {
        out.push(Segment::Text(plain));
    }
    out
}

/// Render a text block for the terminal: plain segments keep their line
/// breaks, block math lands on its own lines, inline math stays in-flow
pub fn render_text(text: &str) -> String {
    let mut out = String::new();
    for segment in segments(text) {
        match segment {
            Segment::Text(t) => out.push_str(&t),
            Segment::Math(m) => {
                if m.starts_with("$$") {
                    if !out.ends_with('\n') && !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&m);
                    out.push('\n');
                } else {
                    out.push_str(&m);
                }
            }
        }
    }
    out
}

/// Print the current sample: position, query, the three anonymized model
/// outputs in display order, and the scoring grid state
pub fn print_sample(
    sample: &Sample,
    q_id: &str,
    index: usize,
    total: usize,
    order: DisplayOrder,
    scores: &ScoreMap,
    config: &Config,
) {
    println!("=== Sample {}/{} — {} ===", index + 1, total, q_id);
    println!();
    println!("Query:");
    println!("{}", render_text(sample.query()));
    println!();

    for (slot, model) in order.models().iter().enumerate() {
        println!("--- Model {} ---", DisplayOrder::slot_label(slot));
        println!("{}", render_text(sample.gen_question(*model)));
        println!();
    }

    print_scoring_grid(q_id, order, scores, config);
}

/// Per-dimension, per-slot state of the scoring grid. Real model identities
/// stay hidden behind the slot letters.
fn print_scoring_grid(q_id: &str, order: DisplayOrder, scores: &ScoreMap, config: &Config) {
    println!("Scoring (options in brackets):");
    let record_for = |model: crate::models::Model| {
        scores
            .get(q_id)
            .and_then(|sample_scores| sample_scores.get(model.key()))
    };

    for (dim_index, dim) in config.dimensions.iter().enumerate() {
        let options: Vec<String> = dim.options.iter().map(display_value).collect();
        println!("  [{}] {} ({})", dim_index + 1, dim.label, options.join(", "));

        for (slot, model) in order.models().iter().enumerate() {
            let record = record_for(*model);
            let stored = record.and_then(|r| r.get(&dim.score_key()));
            let selection = match scoring::resolve_selection(dim, stored) {
                Some(option_index) => format!("✅ {}", options[option_index]),
                None => "⚠️ 尚未评分".to_string(),
            };

            match dim.control {
                ControlKind::Scale => {
                    let comment = record
                        .and_then(|r| r.get(&dim.comment_key()))
                        .and_then(|v| v.as_str())
                        .map(str::trim)
                        .filter(|s| !s.is_empty());
                    let comment_state = match comment {
                        Some(text) => format!("评语: {text}"),
                        None => "评语: —".to_string(),
                    };
                    println!(
                        "      {}: {:<14} {}",
                        DisplayOrder::slot_label(slot),
                        selection,
                        comment_state
                    );
                }
                ControlKind::Rank => {
                    println!("      {}: {}", DisplayOrder::slot_label(slot), selection);
                }
            }
        }
    }
}

/// Completion panel: totals and rate over the whole batch
pub fn print_progress(total: usize, completed: usize) {
    let rate = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    println!("Samples: {total}  Completed: {completed}  ({rate:.1}%)");
}

/// Per-sample completion listing for the status command
pub fn print_status(samples: &[Sample], scores: &ScoreMap, config: &Config) {
    for (index, sample) in samples.iter().enumerate() {
        let q_id = sample
            .q_id
            .clone()
            .unwrap_or_else(|| format!("id_{index}"));
        let done = scoring::is_scored(&q_id, scores, &config.dimensions, config.policy);
        println!("  {} {}", if done { "✅" } else { "⚠️" }, q_id);
    }
}

/// Option values as the reviewer sees them: strings bare, everything else in
/// JSON form
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
