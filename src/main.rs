// Copyright 2026 Forage Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use forage::cli;

#[derive(Parser)]
#[command(
    name = "forage",
    about = "Forage — adaptive harvester for dynamically rendered catalogs",
    version,
    after_help = "Run 'forage <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full two-phase harvest: enumerate every region, then resolve details
    Run {
        /// Number of concurrent resolution workers
        #[arg(long, default_value = "2")]
        workers: usize,
        /// Output record log (JSONL)
        #[arg(long, default_value = "unified_restaurant_datamart.jsonl")]
        out: String,
        /// Run metadata artifact (JSON)
        #[arg(long, default_value = "datamart_metadata.json")]
        metadata: String,
        /// Intermediate manifest path (removed after a successful run)
        #[arg(long, default_value = "phase1_links.jsonl")]
        manifest: String,
    },
    /// Phase 1 only: enumerate candidate links into a manifest
    Enumerate {
        /// Manifest output path (JSONL)
        #[arg(long, default_value = "phase1_links.jsonl")]
        out: String,
    },
    /// Phase 2 only: resolve details from an existing manifest
    Resolve {
        /// Manifest to resolve
        #[arg(long, default_value = "phase1_links.jsonl")]
        manifest: String,
        /// Number of concurrent resolution workers
        #[arg(long, default_value = "2")]
        workers: usize,
        /// Output record log (JSONL)
        #[arg(long, default_value = "unified_restaurant_datamart.jsonl")]
        out: String,
        /// Run metadata artifact (JSON)
        #[arg(long, default_value = "datamart_metadata.json")]
        metadata: String,
    },
    /// Resolve a single item and print it as JSON
    Probe {
        /// List page to probe (defaults to the first configured region)
        #[arg(long)]
        url: Option<String>,
        /// Resolve this detail page directly instead
        #[arg(long)]
        detail: Option<String>,
    },
    /// Report the advertised item total per region
    Counts,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("FORAGE_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("FORAGE_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("FORAGE_VERBOSE", "1");
    }

    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run {
            workers,
            out,
            metadata,
            manifest,
        } => cli::run_cmd::run(workers, &out, &metadata, &manifest).await,
        Commands::Enumerate { out } => cli::enumerate_cmd::run(&out).await,
        Commands::Resolve {
            manifest,
            workers,
            out,
            metadata,
        } => cli::resolve_cmd::run(&manifest, workers, &out, &metadata).await,
        Commands::Probe { url, detail } => {
            cli::probe_cmd::run(url.as_deref(), detail.as_deref()).await
        }
        Commands::Counts => cli::counts_cmd::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "forage", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() && !cli::output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}

fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose {
        "forage=debug"
    } else if quiet {
        "forage=warn"
    } else {
        "forage=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
