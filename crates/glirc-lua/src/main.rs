//! `glirc-lua`: run glirc Lua extension scripts outside the client.
//!
//! The binary stands in for the IRC client: it starts an extension the same
//! way the client would, replays a file of events through it and prints each
//! decision.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use glirc_lua_core::logging::{LogFormat, init_logging};
use glirc_lua_core::{
    BridgeConfig, Event, EventName, Extension, Host, HostToken, Message, MessageCode,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "glirc-lua", version, about = "Run glirc Lua extension scripts")]
struct Cli {
    /// Bridge configuration file (TOML)
    #[arg(long, global = true, env = "GLIRC_LUA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, env = "GLIRC_LUA_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an extension, replay events through it, then stop it
    Run {
        /// Path of the extension library; the default script sits next to it
        library_path: String,

        /// Script path followed by script arguments, as given to the client
        args: Vec<String>,

        /// TOML file of `[[event]]` entries to replay
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Load a script and list the callbacks it defines
    Check {
        script: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Host that writes diagnostics to stderr and outbound messages to stdout.
struct CliHost {
    base_dir: PathBuf,
}

impl Host for CliHost {
    fn report(&self, code: MessageCode, message: &str) {
        match code {
            MessageCode::Normal => eprintln!("{message}"),
            MessageCode::Error => eprintln!("error: {message}"),
        }
    }

    fn resolve_path(&self, raw: &str) -> String {
        let path = Path::new(raw);
        if path.is_absolute() {
            raw.to_string()
        } else {
            self.base_dir.join(path).to_string_lossy().into_owned()
        }
    }

    fn send_message(&self, message: &Message) -> Result<(), String> {
        println!(
            "send\t{}\t{} {}",
            message.network,
            message.command,
            message.params.join(" ")
        );
        Ok(())
    }
}

#[derive(Deserialize, Default)]
struct EventScript {
    #[serde(default, rename = "event")]
    events: Vec<Event>,
}

fn load_events(path: &Path) -> Result<Vec<Event>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read events file {}", path.display()))?;
    let script: EventScript = toml::from_str(&source)
        .with_context(|| format!("parsing events file {}", path.display()))?;
    Ok(script.events)
}

fn load_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
    Ok(config)
}

fn cli_host() -> Result<HostToken> {
    let base_dir = std::env::current_dir().context("reading current directory")?;
    Ok(Arc::new(CliHost { base_dir }))
}

fn run(
    config: BridgeConfig,
    library_path: &str,
    args: &[String],
    events: Option<&Path>,
) -> Result<()> {
    let events = match events {
        Some(path) => load_events(path)?,
        None => Vec::new(),
    };

    let mut extension = Extension::new(cli_host()?, config);
    if extension.start(library_path, args).is_err() {
        bail!("extension did not load");
    }

    for event in &events {
        let name = event.name();
        match extension.handle(event) {
            Some(decision) => println!("{name}\t{decision}"),
            None => println!("{name}"),
        }
    }

    extension.stop();
    tracing::debug!(
        state = extension.state().label(),
        events = events.len(),
        "replay finished"
    );
    Ok(())
}

fn check(config: BridgeConfig, script: &Path, json: bool) -> Result<()> {
    let mut extension = Extension::new(cli_host()?, config);
    let args = vec![script.to_string_lossy().into_owned()];
    if extension.start("", &args).is_err() {
        bail!("extension did not load");
    }

    let instance = extension
        .instance()
        .context("extension stopped during load")?;
    let defined: Vec<(EventName, bool)> = EventName::ALL
        .iter()
        .map(|&name| (name, instance.has_callback(name)))
        .collect();

    if json {
        let callbacks = defined
            .iter()
            .map(|(name, present)| (name.to_string(), serde_json::Value::Bool(*present)))
            .collect::<serde_json::Map<_, _>>();
        let report = serde_json::json!({
            "script": instance.script_path(),
            "callbacks": callbacks,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", instance.script_path());
        for (name, present) in defined {
            println!("  {name}: {}", if present { "defined" } else { "-" });
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config.logging).context("initializing logging")?;

    match cli.command {
        Commands::Run {
            library_path,
            args,
            events,
        } => run(config, &library_path, &args, events.as_deref()),
        Commands::Check { script, json } => check(config, &script, json),
    }
}
