use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::build_controller;
use crate::config::Config;
use crate::services::{SearchOutcome, SearchSnapshot};

fn print_snapshot(snapshot: &SearchSnapshot) {
    if let Some(reason) = snapshot.no_options_reason() {
        println!("[{:?}] {}", snapshot.status, reason.message());
        return;
    }

    println!(
        "[{:?}] {} option(s) for '{}'{}",
        snapshot.status,
        snapshot.options.len(),
        snapshot.query.trim(),
        if snapshot.has_more { " (:more for next page)" } else { "" }
    );
    for (i, option) in snapshot.options.iter().enumerate() {
        println!("  {i:>2}. {}", option.display_line());
    }
}

pub async fn cmd_lookup(config: &Config, endpoint_name: &str) -> anyhow::Result<()> {
    let controller = build_controller(config, endpoint_name)?;

    println!("Interactive lookup on '{endpoint_name}'.");
    println!("Each line replaces the input. Commands: :more, :pick <n>, :clear, :quit");

    let mut updates = controller.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if !snapshot.loading {
                print_snapshot(&snapshot);
            }
        }
    });

    let mut quit = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" | ":q" => {
                quit = true;
                break;
            }
            ":clear" => controller.on_select(None),
            ":more" => {
                if controller.load_more().await == SearchOutcome::Skipped {
                    println!("Nothing more to load.");
                }
            }
            cmd if cmd.starts_with(":pick") => {
                let options = controller.snapshot().options;
                let picked = cmd
                    .trim_start_matches(":pick")
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| options.get(i).cloned());

                match picked {
                    Some(suggestion) => {
                        println!("Selected {} (ID {})", suggestion.label, suggestion.id);
                        controller.on_select(Some(suggestion));
                    }
                    None => println!("Usage: :pick <index of a listed option>"),
                }
            }
            _ => controller.on_query_changed(&line),
        }
    }

    if !quit {
        // Piped input: let the last debounced search finish before exiting.
        tokio::time::sleep(controller.settings().debounce + Duration::from_millis(50)).await;
        let mut settled = controller.subscribe();
        let _ = settled.wait_for(|s| !s.loading).await;
    }

    debug!("Lookup input closed, tearing down");
    controller.teardown();
    printer.abort();
    Ok(())
}
