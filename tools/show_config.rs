//! Load a sample configuration from every layer and print the result.
//!
//! Run with: cargo run --example show_config -- [-config=PATH] [-Name=value ...]
//!
//! Set `RUST_LOG=layerconf=debug` to see each layer as it is applied.

use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use layerconf::config::{Loader, default_app_name};
use layerconf::constants::DEFAULT_CONFIG_NAME;
use layerconf::process::exit_on_error;
use layerconf::{AsSlot, Configurable, Schema};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Settings {
    name: String,
    port: u16,
    verbose: bool,
    timeout: f64,
    since: DateTime<Utc>,
}

impl Configurable for Settings {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<Settings>> = LazyLock::new(|| {
            Schema::<Settings>::structure()
                .field("Name", |s| s.name.as_slot())
                .tag("service name")
                .field("Port", |s| s.port.as_slot())
                .tag("port to listen on")
                .field("Verbose", |s| s.verbose.as_slot())
                .tag("print each config file as it is read")
                .field("Timeout", |s| s.timeout.as_slot())
                .field("Since", |s| s.since.as_slot())
        });
        &SCHEMA
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    exit_on_error(run());
}

fn run() -> Result<()> {
    let mut tokens: Vec<String> = std::env::args().skip(1).collect();
    let config_path = take_config_flag(&mut tokens);
    let verbose = tokens.iter().any(|t| t == "-Verbose" || t == "--Verbose");

    let app = default_app_name().context("cannot determine the program name")?;
    let mut settings = Settings {
        port: 8080,
        timeout: 2.5,
        ..Settings::default()
    };

    let mut loader = Loader::new(app)
        .home_config(DEFAULT_CONFIG_NAME)
        .cmd_line(tokens)
        .verbose(verbose);
    if let Some(path) = config_path {
        loader = loader.config_path(path);
    }

    let (flags, result) = loader.load_with_flags(&mut settings);
    if let Err(err) = result {
        if let Some(flags) = flags {
            eprintln!("{}", flags.usage());
        }
        bail!(err);
    }

    println!("{settings:#?}");
    if let Some(flags) = flags.filter(|f| !f.args().is_empty()) {
        println!("arguments: {}", flags.args().join(" "));
    }
    Ok(())
}

/// Remove `-config=PATH` (or `-config PATH`) from `tokens`.
fn take_config_flag(tokens: &mut Vec<String>) -> Option<String> {
    let index = tokens.iter().position(|t| {
        let name = t.trim_start_matches('-');
        name == "config" || name.starts_with("config=")
    })?;
    let token = tokens.remove(index);
    match token.split_once('=') {
        Some((_, path)) => Some(path.to_string()),
        None if index < tokens.len() => Some(tokens.remove(index)),
        None => None,
    }
}
