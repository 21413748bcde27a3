//! # sg-cli
//!
//! Operator command line for Scopegate.
//!
//! - `sg fingerprint`: template and fingerprint of a declaration
//! - `sg resolve`: how a concrete request URL resolves
//! - `sg rules reduce/check`: local dry-runs over a rule-set file
//! - `sg register`: registration mode for a service manifest

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sg_endpoint::HttpMethod;
use tracing_subscriber::EnvFilter;

/// Scopegate CLI: inspect endpoints and rules, register services.
#[derive(Parser)]
#[command(name = "sg", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the path template and fingerprint of an endpoint declaration.
    Fingerprint {
        /// Application host, e.g. https://api.example.com.
        #[arg(long)]
        host: String,
        /// Feature root, e.g. /v1.
        #[arg(long)]
        feature: String,
        /// HTTP method.
        #[arg(long, default_value = "GET")]
        method: HttpMethod,
        /// Route path relative to the feature, e.g. /users/:id.
        path: String,
    },
    /// Resolve a concrete request URL to feature, template, subset and fingerprint.
    Resolve {
        /// HTTP method.
        #[arg(long, default_value = "GET")]
        method: HttpMethod,
        /// Absolute request URL.
        url: String,
    },
    /// Work with access rule-set files (JSON).
    Rules {
        #[command(subcommand)]
        command: commands::rules::RulesCommands,
    },
    /// Register a service manifest with the authority and synchronize.
    Register {
        /// Service manifest (TOML).
        #[arg(long)]
        manifest: PathBuf,
        /// Authority config (TOML). Falls back to SCOPEGATE_AUTHORITY_URL.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Run against an in-process authority instead of the configured one.
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sg_authority=info".parse()?)
                .add_directive("sg_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Fingerprint {
            host,
            feature,
            method,
            path,
        } => commands::fingerprint::execute(host, feature, *method, path),
        Commands::Resolve { method, url } => commands::resolve::execute(*method, url),
        Commands::Rules { command } => commands::rules::execute(command),
        Commands::Register {
            manifest,
            config,
            dry_run,
        } => commands::register::execute(manifest, config.as_deref(), *dry_run),
    }
}
