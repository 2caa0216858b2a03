mod config;
mod error;
mod event;
mod monitor;
mod paths;
mod process;
mod prompt;
mod sampler;
mod stats;
mod status;
mod sweep;
mod watchlist;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tokio::sync::{mpsc, watch};

use crate::event::MonitorEvent;
use crate::monitor::{Monitor, MonitorOutcome};
use crate::process::{ProcessDirectory, SystemDirectory};
use crate::sampler::UdpSampler;
use crate::status::{MonitorState, MonitorStatus};

/// VPN companion that kills processes if your IP changes.
#[derive(Parser, Debug)]
#[command(
    name = "krueger",
    version = env!("KRUEGER_VERSION"),
    long_about = "Krueger is designed to run alongside your VPN connection.\n\
If for any reason your outbound IP changes while you are connected to a VPN,\n\
all the processes you have listed are killed immediately."
)]
struct Cli {
    /// Config file (default is $HOME/.krueger.toml or $HOME/.config/.krueger.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the matched processes at start-up and enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(cli.debug)),
    )
    .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", " ERROR ".on_red());
        std::process::exit(1);
    }
}

fn default_log_filter(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Configuration ─────────────────────────────────────────────────────────
    let candidates = paths::config_candidates();
    let (mut cfg, used) = config::resolve(cli.config.as_deref(), &candidates)?;
    if let Some(path) = &used {
        println!("Using config file: {}\n", path.display().to_string().yellow());
    }
    cfg.apply_processes_override(std::env::var(config::PROCESSES_ENV_VAR).ok().as_deref());

    let mut watch_list = cfg.watch_list();
    if prompt::should_prompt(&watch_list, prompt::stdin_is_interactive()) {
        let hint = candidates
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| paths::CONFIG_FILE_NAME.to_string());
        let notice = prompt::empty_list_notice(used.as_deref(), &hint.yellow().to_string());
        watch_list = prompt::ask_for_processes(&notice)?;
    }
    let watch_list = Arc::new(watch_list);

    let mut directory = SystemDirectory::new();
    let table = cli
        .debug
        .then(|| stats::matching_table(&directory.list_processes(), &watch_list));

    let monitor = Monitor::new(
        Arc::clone(&watch_list),
        UdpSampler::new(cfg.probe()?),
        directory,
        cfg.monitor_settings(),
    )?;

    println!("{}", "KRUEGER".bold().truecolor(255, 150, 40));
    println!("{}\n", env!("KRUEGER_VERSION").dimmed());
    if let Some(table) = table {
        println!("{table}");
    }

    // ── Status file ───────────────────────────────────────────────────────────
    let status_path = paths::status_file_path();
    let mut current_status = MonitorStatus::new(watch_list.terms());
    let write_status = |status: &MonitorStatus| {
        if let Some(path) = &status_path {
            status::write_status(path, status);
        }
    };

    // ── Monitor task ──────────────────────────────────────────────────────────
    let (event_tx, mut event_rx) = mpsc::channel::<MonitorEvent>(64);
    let (stop_tx, stop_rx) = watch::channel(false);
    let monitor_task = tokio::spawn(monitor.run(event_tx, stop_rx));

    // Ctrl+C only stops an armed monitor; a running sweep always finishes.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(true);
        }
    });

    let mut stats_task = None;

    // ── Event loop ────────────────────────────────────────────────────────────
    while let Some(evt) = event_rx.recv().await {
        match evt {
            MonitorEvent::Armed(baseline) => {
                println!(
                    "Monitoring connection. You are currently {}.\n",
                    " SAFE ".black().on_green()
                );
                current_status.mark_armed(baseline);
                write_status(&current_status);
                stats_task = Some(tokio::spawn(stats::run(
                    Arc::clone(&watch_list),
                    baseline,
                    cfg.effective_stats_interval(),
                )));
            }

            MonitorEvent::Tick(address) => log::trace!("Sampled {address}"),

            MonitorEvent::Triggered { old, new } => {
                if let Some(task) = stats_task.take() {
                    task.abort();
                }
                println!(
                    "{} Your IP has changed from: {} to: {}",
                    " ATTENTION ".on_red(),
                    old.to_string().magenta(),
                    new.to_string().red()
                );
                println!("{} Terminating Processes and Krueger...", " GOODNIGHT ".on_bright_black());
                current_status.mark_triggered(new, chrono::Local::now());
                write_status(&current_status);
            }

            MonitorEvent::KillFailed(failure) => {
                println!(
                    "{} Could not kill {} (pid {})",
                    " WARNING ".black().on_yellow(),
                    failure.name,
                    failure.pid
                );
            }

            MonitorEvent::SweepComplete(report) => {
                println!("Killed {} process(es).", report.killed.len());
                for name in &report.exhausted {
                    println!("{} {name} is still running", " WARNING ".black().on_yellow());
                }
                current_status.record_sweep(&report);
                write_status(&current_status);
            }
        }
    }

    if let Some(task) = stats_task.take() {
        task.abort();
    }

    // The channel closes once the monitor returns.
    let result = monitor_task
        .await
        .context("Monitor task panicked")
        .and_then(|res| res.map_err(anyhow::Error::from));
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            current_status.mark_failed(format!("{e:#}"));
            write_status(&current_status);
            return Err(e);
        }
    };
    if let MonitorOutcome::Cancelled { baseline } = outcome {
        println!("Stopped. Your IP is still {}.", baseline.to_string().magenta());
        current_status.state = MonitorState::Stopped;
        write_status(&current_status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_is_the_default_log_level() {
        assert_eq!(default_log_filter(false), "info");
        assert_eq!(default_log_filter(true), "debug");
    }

    #[test]
    fn cli_accepts_config_and_debug() {
        let cli = Cli::try_parse_from(["krueger", "--config", "/tmp/k.toml", "-d"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/k.toml")));
        assert!(cli.debug);
    }
}
