//! Operator-facing command line.

use std::path::PathBuf;

use clap::Parser;

/// The relay process: onion relay, rendezvous relay, and directory
/// service, selectable by `--mode`.
#[derive(Parser, Debug, Clone)]
#[command(name = "tallow-relay", version, about)]
pub struct Cli {
    /// Path to a YAML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// The role this process plays.
    #[arg(long, value_enum)]
    pub mode: Option<RelayMode>,

    /// Port the primary HTTP/WebSocket surface listens on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Base URL of the directory service this relay registers with.
    #[arg(long)]
    pub directory: Option<String>,

    /// This relay's stable identifier. Derived from the keystore if omitted.
    #[arg(long)]
    pub id: Option<String>,

    /// Ad-hoc `KEY=VALUE` configuration overrides, applied after the config
    /// file and environment but before defaults are otherwise assumed.
    #[arg(long = "option", value_parser = parse_key_val)]
    pub options: Vec<(String, String)>,

    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    #[arg(long)]
    pub log_level: Option<String>,
}

/// A relay process's operating role.
#[derive(clap::ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum RelayMode {
    Entry,
    Middle,
    Exit,
    Directory,
}

impl std::fmt::Display for RelayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RelayMode::Entry => "entry",
            RelayMode::Middle => "middle",
            RelayMode::Exit => "exit",
            RelayMode::Directory => "directory",
        };
        write!(f, "{s}")
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    Ok((key.to_string(), value.to_string()))
}
