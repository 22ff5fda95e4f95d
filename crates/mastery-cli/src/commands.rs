//! Command handlers

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use colored::Colorize;
use mastery_core::{
    CardInput, DueCard, DueQuery, PreviewResults, ReviewReceipt, ReviewRequest, Storage,
};
use serde::Serialize;

use crate::{Cli, Commands};

/// Envelope for `due --json`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DueListing<'a> {
    user_id: &'a str,
    scope_id: &'a str,
    cards: &'a [DueCard],
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let storage = open_storage(cli.data_dir)?;
    let json = cli.json;

    match cli.command {
        Commands::AddCard {
            user,
            deck,
            front,
            back,
        } => run_add_card(&storage, json, user, deck, front, back),
        Commands::Review {
            user,
            card,
            quality,
        } => {
            let receipt = storage.submit_review(&user, &card, quality)?;
            print_receipt(&receipt, json)
        }
        Commands::Submit { user, request } => run_submit(&storage, json, &user, request),
        Commands::Due { user, deck, limit } => run_due(&storage, json, &user, &deck, limit),
        Commands::Preview { user, card } => {
            let preview = storage.preview_review(&user, &card)?;
            print_preview(&preview, json)
        }
        Commands::History { user, card, limit } => run_history(&storage, json, &user, &card, limit),
        Commands::Stats { user } => run_stats(&storage, json, &user),
        Commands::DeleteCard { id } => run_delete(&storage, json, &id),
    }
}

fn open_storage(data_dir: Option<PathBuf>) -> anyhow::Result<Storage> {
    let storage = match data_dir {
        Some(dir) => Storage::in_dir(&dir)
            .with_context(|| format!("opening store in {}", dir.display()))?,
        None => Storage::new(None).context("opening default store")?,
    };
    tracing::debug!(path = %storage.path().display(), "Using database");
    Ok(storage)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run add-card command
fn run_add_card(
    storage: &Storage,
    json: bool,
    user: String,
    deck: String,
    front: String,
    back: String,
) -> anyhow::Result<()> {
    let card = storage.create_card(CardInput {
        owner_id: user,
        deck_id: deck,
        front,
        back,
    })?;

    if json {
        return print_json(&card);
    }
    println!("{} {}", "Card created:".green().bold(), card.id);
    println!("{}: {}", "Deck".white().bold(), card.deck_id);
    println!("{}: {}", "Front".white().bold(), card.front);
    Ok(())
}

/// Run submit command: validate a wire request, then score it
fn run_submit(storage: &Storage, json: bool, user: &str, request: Option<String>) -> anyhow::Result<()> {
    let body = match request {
        Some(body) => body,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading request from stdin")?;
            buf
        }
    };

    let request: ReviewRequest = serde_json::from_str(&body).context("parsing review request")?;
    let quality = request.quality()?;
    let receipt = storage.submit_review(user, &request.card_id, quality)?;
    print_receipt(&receipt, json)
}

fn print_receipt(receipt: &ReviewReceipt, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(receipt);
    }

    let verdict = if receipt.was_lapse {
        "Lapse".red().bold()
    } else {
        "Recalled".green().bold()
    };
    println!("{} {}", verdict, receipt.card_id.dimmed());
    println!(
        "{}: {} ({} day{})",
        "Next Review".white().bold(),
        receipt.next_review.format("%Y-%m-%d %H:%M"),
        receipt.new_interval,
        if receipt.new_interval == 1 { "" } else { "s" }
    );
    println!("{}: {:.2}", "Ease".white().bold(), receipt.ease);
    println!("{}: {}  {}: {}", "Streak".white().bold(), receipt.reps, "Lapses".white().bold(), receipt.lapses);
    if !receipt.event_logged {
        println!("{}", "Warning: review saved but not written to the history log".yellow());
    }
    Ok(())
}

/// Run due command
fn run_due(storage: &Storage, json: bool, user: &str, deck: &str, limit: usize) -> anyhow::Result<()> {
    let due = storage.due_cards(&DueQuery::new(user, deck, limit))?;

    if json {
        return print_json(&DueListing {
            user_id: user,
            scope_id: deck,
            cards: &due,
        });
    }

    println!("{}", format!("=== Due in {} ({}) ===", deck, due.len()).cyan().bold());
    if due.is_empty() {
        println!("{}", "Nothing due. Come back later.".dimmed());
        return Ok(());
    }

    let now = Utc::now();
    for entry in &due {
        let when = match &entry.mastery {
            None => "new".blue().to_string(),
            Some(m) => {
                let overdue = (now - m.due_at).num_days();
                if overdue > 0 {
                    format!("{} d overdue", overdue).red().to_string()
                } else {
                    "due".yellow().to_string()
                }
            }
        };
        println!("  {} {} [{}]", entry.card.id.dimmed(), entry.card.front, when);
    }
    Ok(())
}

fn print_preview(preview: &PreviewResults, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(preview);
    }

    println!("{}", "=== Review Preview ===".cyan().bold());
    for entry in &preview.entries {
        let label = if entry.was_lapse {
            format!("q={}", entry.quality).red()
        } else {
            format!("q={}", entry.quality).green()
        };
        println!(
            "  {}  interval {:>5} d  ease {:.2}",
            label, entry.new_interval, entry.ease
        );
    }
    Ok(())
}

/// Run history command
fn run_history(storage: &Storage, json: bool, user: &str, card: &str, limit: usize) -> anyhow::Result<()> {
    let events = storage.review_history(user, card, limit)?;

    if json {
        return print_json(&events);
    }

    println!("{}", "=== Review History ===".cyan().bold());
    if events.is_empty() {
        println!("{}", "No reviews recorded.".dimmed());
    }
    for event in &events {
        let q = event.quality.to_string();
        let q = if event.quality.is_lapse() { q.red() } else { q.green() };
        println!("  {}  quality {}", event.reviewed_at.format("%Y-%m-%d %H:%M:%S"), q);
    }
    Ok(())
}

/// Run stats command
fn run_stats(storage: &Storage, json: bool, user: &str) -> anyhow::Result<()> {
    let stats = storage.get_stats(user, Utc::now())?;

    if json {
        return print_json(&stats);
    }

    println!("{}", "=== Mastery Statistics ===".cyan().bold());
    println!();
    println!("{}: {}", "Scheduled Cards".white().bold(), stats.scheduled_cards);
    println!("{}: {}", "Due Now".white().bold(), stats.cards_due);
    println!("{}: {}", "Reviewed".white().bold(), stats.cards_reviewed);
    println!("{}: {}", "Total Reviews".white().bold(), stats.total_reviews);
    println!("{}: {}", "Total Lapses".white().bold(), stats.total_lapses);
    println!("{}: {:.2}", "Average Ease".white().bold(), stats.average_ease);

    let lapse_rate = if stats.total_reviews > 0 {
        stats.total_lapses as f64 / stats.total_reviews as f64 * 100.0
    } else {
        0.0
    };
    println!("{}: {:.1}%", "Lapse Rate".white().bold(), lapse_rate);
    Ok(())
}

/// Run delete-card command
fn run_delete(storage: &Storage, json: bool, id: &str) -> anyhow::Result<()> {
    let deleted = storage.delete_card(id)?;

    if json {
        return print_json(&serde_json::json!({ "id": id, "deleted": deleted }));
    }
    if deleted {
        println!("{} {}", "Deleted".green().bold(), id);
    } else {
        println!("{} {}", "No such card:".yellow(), id);
    }
    Ok(())
}
