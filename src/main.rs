mod commands;
mod error;

use crate::error::Result;
use clap::{Parser, Subcommand};
use dataname_catalog::{Order, Strategy};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Naming conventions for dated, versioned data files in object storage.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to a configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "DATANAME_CONFIG")]
    config: Option<PathBuf>,

    /// Use a local directory as storage (overrides the config file)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Folder of schema definitions (overrides the config file)
    #[arg(long, global = true)]
    schemas: Option<PathBuf>,

    /// Print records as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse filenames into records
    Parse {
        #[arg(required = true)]
        filenames: Vec<String>,

        /// Date given to names that don't follow the convention (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },

    /// Render a canonical filename
    Render {
        /// Date (YYYY-MM-DD)
        date: String,
        /// Dataset name
        name: String,
        /// Extension, without the dot
        extension: String,
        #[arg(long, default_value_t = 0)]
        version: u32,
    },

    /// Print the time-bucketed path of a JSON log artifact
    LogName {
        /// Base name of the artifact
        base: String,
    },

    /// Print the temporary table name for a data file
    TableName {
        filename: String,
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// List a folder, ordered by dataset name or by date
    List {
        /// Folder to list (defaults to the storage root)
        folder: Option<String>,

        #[arg(long, default_value_t = Order::Category)]
        order: Order,

        /// Date bucket pattern for date order (defaults to the config file)
        #[arg(long)]
        pattern: Option<String>,

        /// Keep names without a schema
        #[arg(long)]
        all: bool,
    },

    /// Resolve the filename to write without overwriting anything
    Resolve {
        candidate: String,

        /// Folder the file will be written to
        #[arg(long)]
        folder: Option<String>,

        /// Version strategy (defaults to the config file)
        #[arg(long)]
        strategy: Option<Strategy>,
    },

    /// Delete objects whose dataset name has no schema
    Prune {
        /// Only consider keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Report what would be deleted without deleting it
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the effective configuration
    ShowConfig,
}

fn init_tracing(verbose: bool) {
    let filter = match verbose {
        true => EnvFilter::new("debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let context = commands::Context::new(&cli)?;
    match cli.command {
        Command::Parse { filenames, today } => commands::parse(&context, &filenames, today.as_deref()),
        Command::Render {
            date,
            name,
            extension,
            version,
        } => commands::render(&date, &name, &extension, version),
        Command::LogName { base } => commands::log_name(&context, &base),
        Command::TableName { filename, prefix } => commands::table_name(&context, &filename, &prefix),
        Command::List {
            folder,
            order,
            pattern,
            all,
        } => commands::list(&context, folder.as_deref(), order, pattern, all).await,
        Command::Resolve {
            candidate,
            folder,
            strategy,
        } => commands::resolve(&context, &candidate, folder.as_deref(), strategy).await,
        Command::Prune { prefix, dry_run } => commands::prune(&context, prefix.as_deref(), dry_run).await,
        Command::ShowConfig => commands::show_config(&context),
    }
}
