use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod template;

/// mockenv: inspect and upgrade mock API environment files.
///
/// Files hold a single environment or an array of environments, as saved by
/// any past release.
#[derive(Parser)]
#[command(name = "mockenv", version, about, long_about = None)]
struct Cli {
    /// Log every applied migration step.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the schema version of each environment and its pending migrations.
    Status {
        /// Path to the environment file.
        file: PathBuf,

        /// Print the status as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Upgrade every environment in a file to the current schema.
    Migrate {
        /// Path to the environment file.
        file: PathBuf,

        /// Write the result here instead of overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after this migration id.
        #[arg(long)]
        to: Option<u32>,

        /// Print the migrated document instead of writing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// List every registered migration.
    Steps,

    /// Create a new environment file in the current schema.
    New {
        /// Path of the file to create.
        file: PathBuf,

        /// Environment name.
        #[arg(short, long, default_value = "New environment")]
        name: String,

        /// Port the mock server listens on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Status { file, json } => commands::status(&file, json),
        Commands::Migrate {
            file,
            output,
            to,
            dry_run,
        } => commands::migrate(&file, output.as_deref(), to, dry_run),
        Commands::Steps => commands::steps(),
        Commands::New {
            file,
            name,
            port,
            force,
        } => commands::new_environment(&file, &name, port, force),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
