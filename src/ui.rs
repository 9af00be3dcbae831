use crate::config::{Config, ControlKind};
use crate::models::Field;
use crate::output;
use crate::scoring;
use crate::session::{NavOutcome, ReviewSession};
use anyhow::Result;
use std::io::{BufRead, Write};

/// One reviewer command, parsed from an input line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Record a score: slot letter, 1-based dimension number, raw value
    Score { slot: char, dim: usize, value: String },
    /// Record a comment: slot letter, 1-based dimension number, free text
    Comment { slot: char, dim: usize, text: String },
    /// Reset a score back to unset
    Clear { slot: char, dim: usize },
    Next,
    Prev,
    Jump(String),
    Save,
    Export,
    Show,
    Status,
    Help,
    Quit { force: bool },
}

/// Parse a reviewer input line. Returns `None` for empty or unrecognized
/// input.
fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let head = parts.next()?.to_lowercase();

    // Everything after the first `fields` whitespace-separated fields, so a
    // trailing free-text argument keeps its internal spacing
    let rest_after = |fields: usize| {
        let mut rest = line;
        for _ in 0..fields {
            rest = rest.trim_start();
            match rest.find(char::is_whitespace) {
                Some(cut) => rest = &rest[cut..],
                None => return "",
            }
        }
        rest.trim()
    };

    match head.as_str() {
        "score" | "s" => {
            let slot = parts.next()?.chars().next()?;
            let dim = parts.next()?.parse().ok()?;
            let value = rest_after(3);
            if value.is_empty() {
                return None;
            }
            Some(Command::Score { slot, dim, value: value.to_string() })
        }
        "comment" | "c" => {
            let slot = parts.next()?.chars().next()?;
            let dim = parts.next()?.parse().ok()?;
            let text = rest_after(3).to_string();
            Some(Command::Comment { slot, dim, text })
        }
        "clear" => {
            let slot = parts.next()?.chars().next()?;
            let dim = parts.next()?.parse().ok()?;
            Some(Command::Clear { slot, dim })
        }
        "next" | "n" => Some(Command::Next),
        "prev" | "p" => Some(Command::Prev),
        "jump" | "j" => Some(Command::Jump(parts.next()?.to_string())),
        "save" => Some(Command::Save),
        "export" => Some(Command::Export),
        "show" => Some(Command::Show),
        "status" | "st" => Some(Command::Status),
        "help" | "h" | "?" => Some(Command::Help),
        "quit" | "q" => Some(Command::Quit { force: false }),
        "quit!" | "q!" => Some(Command::Quit { force: true }),
        _ => None,
    }
}

fn print_help() {
    println!("Commands:");
    println!("  score <A|B|C> <dim#> <value>    record a score (s)");
    println!("  comment <A|B|C> <dim#> <text>   record a comment (c)");
    println!("  clear <A|B|C> <dim#>            reset a score to unset");
    println!("  next / prev                     save and move (n / p)");
    println!("  jump <q_id>                     save and jump to a sample (j)");
    println!("  save                            write progress to disk");
    println!("  export                          write a timestamped export");
    println!("  show                            reprint the current sample");
    println!("  status                          per-sample completion (st)");
    println!("  quit                            save and exit (quit! skips the save)");
}

/// Run the interactive review loop for a reviewer.
///
/// When no reviewer id is given (or the given one has no backing file) the
/// loop falls back to prompting for an id, so a typo never kills the process.
pub fn run(config: Config, reviewer: Option<String>, verbose: bool) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut pending = reviewer;

    let mut session = loop {
        let raw = match pending.take() {
            Some(id) => id,
            None => {
                print!("Reviewer id (e.g. T001): ");
                std::io::stdout().flush()?;
                match lines.next() {
                    Some(line) => line?,
                    None => return Ok(()),
                }
            }
        };
        if raw.trim().is_empty() {
            continue;
        }

        match ReviewSession::open(config.clone(), &raw) {
            Ok(session) => break session,
            Err(err) => {
                eprintln!("Cannot open batch: {err:#}");
                eprintln!("Check the id and try again.");
            }
        }
    };

    if verbose {
        println!(
            "Loaded {} samples for reviewer {}",
            session.len(),
            session.reviewer_id()
        );
    }

    let mut rng = rand::thread_rng();
    let mut redraw = true;

    loop {
        if redraw {
            show_current(&mut session, &mut rng);
            redraw = false;
        }

        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        let Some(command) = parse_command(&line) else {
            if !line.trim().is_empty() {
                println!("Unrecognized input; type `help` for commands.");
            }
            continue;
        };

        match command {
            Command::Score { slot, dim, value } => {
                apply_score(&mut session, &mut rng, slot, dim, &value);
            }
            Command::Comment { slot, dim, text } => {
                apply_comment(&mut session, &mut rng, slot, dim, text);
            }
            Command::Clear { slot, dim } => {
                clear_score(&mut session, &mut rng, slot, dim);
            }
            Command::Next => {
                redraw = navigate(&mut session, &mut lines, true)?;
            }
            Command::Prev => {
                redraw = navigate(&mut session, &mut lines, false)?;
            }
            Command::Jump(q_id) => match session.jump(&q_id) {
                Ok(NavOutcome::Moved) => redraw = true,
                Ok(_) => {}
                Err(err) => eprintln!("Jump failed: {err:#}"),
            },
            Command::Save => match session.save() {
                Ok(()) => println!("✅ Progress saved."),
                Err(err) => {
                    eprintln!("❌ Save failed: {err:#}");
                    eprintln!("Entered scores are kept in memory; fix the problem and retry.");
                }
            },
            Command::Export => match session.export(None) {
                Ok(path) => println!("✅ Exported to {}", path.display()),
                Err(err) => eprintln!("❌ Export failed: {err:#}"),
            },
            Command::Show => redraw = true,
            Command::Status => {
                output::print_progress(session.len(), session.completed_count());
                output::print_status(session.samples(), session.scores(), session.config());
            }
            Command::Help => print_help(),
            Command::Quit { force } => {
                if force {
                    break;
                }
                match session.save() {
                    Ok(()) => {
                        if verbose {
                            println!("Progress saved.");
                        }
                        break;
                    }
                    Err(err) => {
                        eprintln!("❌ Save failed: {err:#}");
                        eprintln!("Nothing was lost; retry `quit`, or `quit!` to exit without saving.");
                    }
                }
            }
        }
    }

    Ok(())
}

fn show_current(session: &mut ReviewSession, rng: &mut impl rand::Rng) {
    let order = session.display_order(rng);
    output::print_progress(session.len(), session.completed_count());
    output::print_sample(
        session.current(),
        &session.current_qid(),
        session.page(),
        session.len(),
        order,
        session.scores(),
        session.config(),
    );
}

fn apply_score(
    session: &mut ReviewSession,
    rng: &mut impl rand::Rng,
    slot: char,
    dim_number: usize,
    raw: &str,
) {
    let order = session.display_order(rng);
    let Some(model) = order.model_for_label(slot) else {
        println!("Unknown slot {slot:?}; use A, B or C.");
        return;
    };
    let Some(dim) = dim_number
        .checked_sub(1)
        .and_then(|i| session.config().dimensions.get(i))
        .cloned()
    else {
        println!("No dimension #{dim_number}; `show` lists them.");
        return;
    };

    let Some(value) = scoring::parse_option(&dim, raw) else {
        let options: Vec<String> = dim.options.iter().map(output::display_value).collect();
        println!("{raw:?} is not an option for {}; expected one of: {}", dim.id, options.join(", "));
        return;
    };

    let q_id = session.current_qid();
    scoring::apply_input(session.scores_mut(), &q_id, model, &dim, Field::Scores, value);
    println!("✅ {} #{} = {} (slot {})", dim.id, dim_number, raw, slot.to_ascii_uppercase());
}

fn clear_score(
    session: &mut ReviewSession,
    rng: &mut impl rand::Rng,
    slot: char,
    dim_number: usize,
) {
    let order = session.display_order(rng);
    let Some(model) = order.model_for_label(slot) else {
        println!("Unknown slot {slot:?}; use A, B or C.");
        return;
    };
    let Some(dim) = dim_number
        .checked_sub(1)
        .and_then(|i| session.config().dimensions.get(i))
        .cloned()
    else {
        println!("No dimension #{dim_number}; `show` lists them.");
        return;
    };

    let q_id = session.current_qid();
    scoring::clear_input(session.scores_mut(), &q_id, model, &dim);
    println!("✅ {} reset for slot {}", dim.id, slot.to_ascii_uppercase());
}

fn apply_comment(
    session: &mut ReviewSession,
    rng: &mut impl rand::Rng,
    slot: char,
    dim_number: usize,
    text: String,
) {
    let order = session.display_order(rng);
    let Some(model) = order.model_for_label(slot) else {
        println!("Unknown slot {slot:?}; use A, B or C.");
        return;
    };
    let Some(dim) = dim_number
        .checked_sub(1)
        .and_then(|i| session.config().dimensions.get(i))
        .cloned()
    else {
        println!("No dimension #{dim_number}; `show` lists them.");
        return;
    };
    if dim.control == ControlKind::Rank {
        println!("The rank dimension takes no comment.");
        return;
    }

    let q_id = session.current_qid();
    scoring::apply_input(
        session.scores_mut(),
        &q_id,
        model,
        &dim,
        Field::Comments,
        serde_json::Value::String(text),
    );
    println!("✅ Comment recorded for {} (slot {})", dim.id, slot.to_ascii_uppercase());
}

/// Handle next/prev including the lenient confirm-and-save flow. Returns
/// whether the view moved and needs a redraw.
fn navigate(
    session: &mut ReviewSession,
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
    forward: bool,
) -> Result<bool> {
    let outcome = if forward { session.next()? } else { session.prev()? };

    match outcome {
        NavOutcome::Moved => Ok(true),
        NavOutcome::AtEdge => {
            println!("Already at the {} of the batch.", if forward { "end" } else { "start" });
            Ok(false)
        }
        NavOutcome::Blocked => {
            println!("⚠️ This sample still has unscored items; finish it before moving on.");
            Ok(false)
        }
        NavOutcome::NeedsConfirm => {
            print!("⚠️ This sample is incomplete. Save and move anyway? [y/N] ");
            std::io::stdout().flush()?;
            let answer = match lines.next() {
                Some(line) => line?,
                None => return Ok(false),
            };
            if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                let outcome = if forward {
                    session.confirm_next()?
                } else {
                    session.confirm_prev()?
                };
                Ok(outcome == NavOutcome::Moved)
            } else {
                Ok(false)
            }
        }
    }
}
