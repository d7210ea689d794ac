pub mod commands;
pub mod config;
pub mod logging;
pub mod sinks;

use std::io::Write;

/// Print the REPL prompt
pub fn prompt() -> Result<(), String> {
    write!(std::io::stdout(), "$ ").map_err(|e| e.to_string())?;
    std::io::stdout().flush().map_err(|e| e.to_string())
}
