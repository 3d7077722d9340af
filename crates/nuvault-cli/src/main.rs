//! nuvault CLI - manage a local package repository

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "nuvault")]
#[command(author = "nuvault Contributors")]
#[command(version)]
#[command(about = "Package repository with pluggable push policies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository settings file
    #[arg(long, global = true, env = "NUVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a package file
    Push {
        /// Package file
        file: PathBuf,

        /// Package id
        #[arg(long)]
        id: String,

        /// Package version
        #[arg(long = "version")]
        package_version: String,

        /// API key authorizing the push
        #[arg(long, env = "NUVAULT_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Metadata entries (key=value)
        #[arg(long = "meta")]
        meta: Vec<String>,
    },

    /// List stored packages
    List {
        /// Only the latest version of each id
        #[arg(long)]
        latest: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show every version of a package id
    Show {
        /// Package id
        id: String,

        /// Match the id case-insensitively
        #[arg(short = 'i', long)]
        ignore_case: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the latest version of a package id
    Latest {
        /// Package id
        id: String,

        /// Match the id case-insensitively
        #[arg(short = 'i', long)]
        ignore_case: bool,
    },

    /// Remove one package version
    Remove {
        /// Package id
        id: String,

        /// Package version
        version: String,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Push {
            file,
            id,
            package_version,
            api_key,
            meta,
        } => commands::push::run(config, &file, &id, &package_version, &api_key, &meta),

        Commands::List { latest, json } => commands::list::run(config, latest, json),

        Commands::Show {
            id,
            ignore_case,
            json,
        } => commands::show::run(config, &id, ignore_case, json),

        Commands::Latest { id, ignore_case } => commands::latest::run(config, &id, ignore_case),

        Commands::Remove { id, version } => commands::remove::run(config, &id, &version),
    };

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code)
        }
    }
}
