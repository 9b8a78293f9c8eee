//! Interactive table session.
//!
//! A small REPL around the roller: type a notation to roll it, `set` to
//! define character stats, `history`/`summary` to inspect the room log.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use wt_dice::StatBlock;
use wt_table::{RollLog, RollRequest, Roller};

const HELP: &str = "\
  <notation>            roll, e.g. 2d20kh1 + FOR
  blind <notation>      roll without seeing the result yourself
  set NAME RAW [mod]    define a stat (mod = ability-modifier transform)
  stats                 list defined stats
  history               show the room's roll log
  summary               aggregate statistics for the room
  quit                  leave the table";

pub async fn run(seed: Option<u64>, user: &str, room: &str) -> Result<(), String> {
    let log = Arc::new(RollLog::new());
    let mut roller = super::build_roller(seed, true, log.clone());
    let mut stats = StatBlock::new();

    println!("  {} '{room}' as {user}", "Joined table".bold());
    println!("  Type 'help' for commands, 'quit' to exit.\n");

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break, // EOF
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match dispatch(input, &mut roller, &mut stats, &log, user, room).await {
            Ok(Reply::Text(output)) => {
                if !output.is_empty() {
                    println!("{output}\n");
                }
            }
            Ok(Reply::Quit) => break,
            Err(e) => println!("{}\n", e.yellow()),
        }
    }

    Ok(())
}

enum Reply {
    Text(String),
    Quit,
}

async fn dispatch(
    input: &str,
    roller: &mut Roller,
    stats: &mut StatBlock,
    log: &RollLog,
    user: &str,
    room: &str,
) -> Result<Reply, String> {
    let mut words = input.split_whitespace();
    let head = words.next().unwrap_or_default();

    match head.to_ascii_lowercase().as_str() {
        "quit" | "q" => Ok(Reply::Quit),
        "help" => Ok(Reply::Text(HELP.to_owned())),
        "set" => {
            let name = words.next().ok_or("usage: set NAME RAW [mod]")?;
            let raw: i32 = words
                .next()
                .ok_or("usage: set NAME RAW [mod]")?
                .parse()
                .map_err(|_| "stat value must be a number".to_owned())?;
            let use_ability_modifier = matches!(words.next(), Some("mod"));
            stats.set(
                name,
                wt_dice::StatValue {
                    raw,
                    use_ability_modifier,
                },
            );
            Ok(Reply::Text(format!("  {name} set")))
        }
        "stats" => {
            let mut names: Vec<&str> = stats.names().collect();
            names.sort_unstable();
            if names.is_empty() {
                return Ok(Reply::Text("  (no stats defined)".to_owned()));
            }
            let lines: Vec<String> = names
                .iter()
                .filter_map(|name| {
                    stats.get(name).map(|value| {
                        format!("  {name}: {} (effective {})", value.raw, value.effective())
                    })
                })
                .collect();
            Ok(Reply::Text(lines.join("\n")))
        }
        "history" => Ok(Reply::Text(render_history(log, room))),
        "summary" => {
            let s = log.stats(room);
            Ok(Reply::Text(format!(
                "  {} rolls, {} dice thrown, totals sum {}",
                s.rolls, s.dice_thrown, s.total_sum
            )))
        }
        "blind" => {
            let notation = input[head.len()..].trim();
            roll_line(roller, stats, user, room, notation, true).await
        }
        _ => roll_line(roller, stats, user, room, input, false).await,
    }
}

async fn roll_line(
    roller: &mut Roller,
    stats: &StatBlock,
    user: &str,
    room: &str,
    notation: &str,
    blind: bool,
) -> Result<Reply, String> {
    let mut request = RollRequest::new(notation).with_user(user).with_room(room);
    if blind {
        request = request.blind();
    }
    let resolution = roller
        .roll(request, stats)
        .await
        .map_err(|e| e.to_string())?;
    match resolution.visible_breakdown() {
        Some(breakdown) => Ok(Reply::Text(format!(
            "  {breakdown}\n  {} {}",
            "Total:".bold(),
            resolution.outcome.total.to_string().bold()
        ))),
        None => Ok(Reply::Text(
            format!("  {} result hidden, recorded", "Blind roll:".bold()),
        )),
    }
}

fn render_history(log: &RollLog, room: &str) -> String {
    let records = log.records(room);
    if records.is_empty() {
        return "  (no rolls yet)".to_owned();
    }
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["User", "Notation", "Result", "Total"]);
    for record in &records {
        // Blind results stay hidden in the roller's own history view.
        let (result, total) = if record.is_blind {
            ("(hidden)".to_owned(), "—".to_owned())
        } else {
            (record.output.clone(), record.total.to_string())
        };
        table.add_row(vec![
            record.user_name.clone(),
            record.notation.clone(),
            result,
            total,
        ]);
    }
    table.to_string()
}
