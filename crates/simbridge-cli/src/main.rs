//! `simbridge-cli` – simbridge Command Line Interface
//!
//! Subcommands:
//!
//! 1. `run` – drive a simulated vehicle against a live ROS1, ROS2 or Cyber
//!    RT endpoint until **Ctrl-C** (or `--duration` elapses), reconnecting
//!    whenever the link drops.
//! 2. `export-hdmap` – turn a JSON map description into Apollo's
//!    `base_map.txt` or `base_map.bin`.
//! 3. `init` – write the default `~/.simbridge/config.toml`.
//! 4. `config` – print the effective configuration (file plus environment
//!    overrides).

mod config;
mod export;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use simbridge_middleware::BridgeBuilder;
use simbridge_runtime::{Agent, Stack, telemetry};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "simbridge")]
#[command(about = "Bridge a simulated vehicle to ROS1, ROS2 or Apollo Cyber RT")]
#[command(version)]
struct Args {
    /// Configuration file (default: ~/.simbridge/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the reference vehicle against a bridge endpoint
    Run {
        /// ros1, ros2 or cyber
        #[arg(short, long)]
        protocol: Option<String>,

        /// host[:port]
        #[arg(short, long)]
        address: Option<String>,

        /// apollo or lgsvl message family
        #[arg(short, long, value_parser = parse_stack)]
        stack: Option<Stack>,

        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Convert a JSON HD map into Apollo map files
    ExportHdmap {
        /// JSON map description
        #[arg(short, long)]
        input: PathBuf,

        /// Output file, or a map directory
        #[arg(short, long)]
        output: PathBuf,

        /// Write binary protobuf (base_map.bin) instead of text
        #[arg(long)]
        binary: bool,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Config,
}

fn parse_stack(s: &str) -> Result<Stack, String> {
    match s.to_ascii_lowercase().as_str() {
        "apollo" => Ok(Stack::Apollo),
        "lgsvl" => Ok(Stack::Lgsvl),
        other => Err(format!("unknown stack '{other}' (expected apollo or lgsvl)")),
    }
}

fn main() -> ExitCode {
    // RUST_LOG selects the level (default "info"); SIMBRIDGE_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let _telemetry = telemetry::init_tracing("simbridge");
    let args = Args::parse();

    let result = match args.command {
        Commands::Run {
            protocol,
            address,
            stack,
            duration,
        } => run(args.config, protocol, address, stack, duration),
        Commands::ExportHdmap { input, output, binary } => export::export_hdmap(&input, &output, binary).map(|done| {
            println!(
                "  {} {} ({} lane(s), {} bytes)",
                "✓".green().bold(),
                done.path.display().to_string().bold(),
                done.lanes,
                done.bytes
            );
        }),
        Commands::Init { force } => init(args.config, force),
        Commands::Config => show_config(args.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// run
// ─────────────────────────────────────────────────────────────────────────────

fn run(
    config_path: Option<PathBuf>,
    protocol: Option<String>,
    address: Option<String>,
    stack: Option<Stack>,
    duration: Option<f64>,
) -> Result<(), String> {
    let mut cfg = config::load(config_path.as_deref())?;
    if let Some(protocol) = protocol {
        cfg.bridge.protocol = protocol;
    }
    if let Some(address) = address {
        cfg.bridge.address = address;
    }
    if let Some(stack) = stack {
        cfg.agent.stack = stack;
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – disconnecting …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;

    runtime.block_on(async move {
        let bridge = BridgeBuilder::from_config(&cfg.bridge)
            .and_then(|builder| builder.build())
            .map_err(|e| e.to_string())?;
        let endpoint = bridge
            .endpoint()
            .map(ToString::to_string)
            .unwrap_or_default();
        let mut agent = Agent::new(bridge, &cfg.agent).map_err(|e| e.to_string())?;

        println!(
            "  {} {} as {:?} stack ({})",
            "Bridging to".bold(),
            endpoint.cyan(),
            cfg.agent.stack,
            agent.component_names().join(", ")
        );

        if let Some(secs) = duration.filter(|s| *s > 0.0) {
            let flag = Arc::clone(&shutdown);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs_f64(secs)).await;
                flag.store(true, Ordering::SeqCst);
            });
        }

        let ticks = agent.run(shutdown).await;
        let stats = agent.link_stats();
        println!(
            "  {} {} ticks, connected {} time(s), {} drop(s)",
            "✓".green().bold(),
            ticks,
            stats.connects,
            stats.drops
        );
        Ok(())
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// init / config
// ─────────────────────────────────────────────────────────────────────────────

fn init(config_path: Option<PathBuf>, force: bool) -> Result<(), String> {
    let path = config_path.unwrap_or_else(config::config_path);
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()));
    }
    config::save_to(&config::Config::default(), &path)?;
    println!("  {} Config saved to {}", "✓".green().bold(), path.display().to_string().bold());
    Ok(())
}

fn show_config(config_path: Option<PathBuf>) -> Result<(), String> {
    let cfg = config::load(config_path.as_deref())?;
    let raw = toml::to_string_pretty(&cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    print!("{raw}");
    if let Err(e) = cfg.bridge.endpoint() {
        println!("{}: {}", "warning".yellow().bold(), e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_export_arguments() {
        let args = Args::try_parse_from(["simbridge", "export-hdmap", "-i", "map.json", "-o", "out", "--binary"]).unwrap();
        match args.command {
            Commands::ExportHdmap { input, output, binary } => {
                assert_eq!(input, PathBuf::from("map.json"));
                assert_eq!(output, PathBuf::from("out"));
                assert!(binary);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_run_overrides() {
        let args = Args::try_parse_from(["simbridge", "run", "-p", "cyber", "-s", "LGSVL", "--duration", "2.5"]).unwrap();
        match args.command {
            Commands::Run {
                protocol,
                stack,
                duration,
                address,
            } => {
                assert_eq!(protocol.as_deref(), Some("cyber"));
                assert_eq!(stack, Some(Stack::Lgsvl));
                assert_eq!(duration, Some(2.5));
                assert!(address.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Args::try_parse_from(["simbridge", "run", "--stack", "autoware"]).is_err());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        init(Some(path.clone()), false).expect("first init");
        assert!(init(Some(path.clone()), false).is_err());
        init(Some(path), true).expect("forced init");
    }
}
