use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use traitwatch_cli::commands::{self, Repl};
use traitwatch_cli::config::AppConfig;
use traitwatch_cli::{logging, prompt};
use traitwatch_core::clock::epoch_millis;
use traitwatch_core::load_catalog;
use traitwatch_types::GuildId;

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = logging::init_logging();

    let config = AppConfig::load();
    let catalog = load_catalog(
        config.builtin_catalog_dir().as_deref(),
        config.custom_catalog_dir().as_deref(),
    )
    .map_err(|e| e.to_string())?;
    catalog.validate(&config.engine).map_err(|e| e.to_string())?;
    tracing::info!(traits = catalog.len(), guild_id = config.guild_id, "traitwatch ready");

    let mut repl = Repl::new(config, catalog);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    loop {
        let deadline = repl.store.next_deadline();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.map_err(|e| e.to_string())? else {
                    break;
                };
                let line = line.trim();
                if !line.is_empty() {
                    match respond(line, &mut repl) {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(err) => println!("{err}"),
                    }
                    repl.flush(epoch_millis());
                }
                prompt()?;
            }
            _ = sleep_until(deadline) => {
                repl.tick(epoch_millis());
            }
        }
    }

    Ok(())
}

/// Sleep until an epoch-millisecond deadline, forever if there is none
async fn sleep_until(deadline_ms: Option<i64>) {
    match deadline_ms {
        Some(deadline) => {
            let wait = u64::try_from(deadline - epoch_millis()).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        None => std::future::pending().await,
    }
}

#[derive(Parser)]
#[command(version, about = "traitwatch")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a match
    Start,
    /// End the match
    End,
    /// End (if running) and start the next match
    Next,
    /// Reveal the hunter's trait
    Use { key: String },
    /// Use the revealed trait again
    Reuse { key: String },
    /// Swap the revealed trait (once per match)
    Swap { key: String },
    Status {
        #[arg(long)]
        json: bool,
    },
    Traits,
    /// Act on another guild
    Guild { id: GuildId },
    Exit,
}

fn respond(line: &str, repl: &mut Repl) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "traitwatch".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::Start) => commands::start(repl)?,
        Some(Commands::End) => commands::end(repl)?,
        Some(Commands::Next) => commands::next(repl)?,
        Some(Commands::Use { key }) => commands::use_trait(repl, key)?,
        Some(Commands::Reuse { key }) => commands::reuse_trait(repl, key)?,
        Some(Commands::Swap { key }) => commands::swap(repl, key)?,
        Some(Commands::Status { json }) => commands::status(repl, *json)?,
        Some(Commands::Traits) => commands::list_traits(repl)?,
        Some(Commands::Guild { id }) => commands::set_guild(repl, *id)?,
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
