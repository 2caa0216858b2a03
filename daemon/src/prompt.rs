use anyhow::{Context, Result};
use dialoguer::Input;
use std::io::IsTerminal;
use std::path::Path;

use crate::watchlist::WatchList;

pub const SUGGESTED_PROCESSES: &str = "brave,firefox,chrome,safari,signal,keybase";

/// Whether to ask the user for a watch list: only when nothing is configured
/// and there is a terminal to ask on.
pub fn should_prompt(configured: &WatchList, interactive: bool) -> bool {
    configured.is_empty() && interactive
}

pub fn stdin_is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

/// First line shown above the prompt.  `used` is the config file that was
/// loaded, if any; `hint` is where one would be looked for.
pub fn empty_list_notice(used: Option<&Path>, hint: &str) -> String {
    match used {
        Some(path) => format!("Config file {} lists no processes.", path.display()),
        None => format!("No config file found at: {hint}"),
    }
}

/// Asks once for a comma-separated list of process names.
/// The result may be empty if the user enters nothing usable.
pub fn ask_for_processes(notice: &str) -> Result<WatchList> {
    println!("{notice}");
    println!("Please type the processes you want to monitor below.");
    println!("Typical use: {SUGGESTED_PROCESSES}");
    println!();

    let answer: String = Input::new()
        .with_prompt("Type process names")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read process names from the terminal")?;
    println!();

    Ok(WatchList::parse(&answer))
}
