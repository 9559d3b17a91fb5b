//! strata command-line tool
//!
//! Browse and edit a virtual filesystem assembled from directories and
//! archives: list directories, dump files, inspect status records and
//! resolve script modules the way the embedded searcher would.

use clap::{ArgAction, Parser, Subcommand};

mod commands;
mod logging;
mod session;

use session::VfsOptions;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Virtual filesystem browser", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    vfs: VfsOptions,

    /// More logging (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory
    Ls {
        /// Virtual directory
        #[arg(default_value = "/")]
        dir: String,
    },

    /// Write a file to stdout
    Cat {
        /// Virtual path
        path: String,
        /// Decode the file as a run of integers in this format (e.g. ">4u")
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Copy stdin into the write directory
    Put {
        /// Virtual path
        path: String,
        /// Append instead of truncating
        #[arg(short, long)]
        append: bool,
    },

    /// Show the status of a path
    Stat {
        /// Virtual path
        path: String,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the search path
    SearchPath,

    /// List supported archive types
    Archives {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a module name to the file the searcher would load
    Which {
        /// Dotted module name
        module: String,
    },

    /// Print version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::set_up_logging(cli.verbose);

    let session = session::Session::open(&cli.vfs)?;
    match cli.command {
        Commands::Ls { dir } => commands::ls::execute(&session, &dir),
        Commands::Cat { path, format } => commands::cat::execute(&session, &path, format.as_deref()),
        Commands::Put { path, append } => commands::put::execute(&session, &path, append),
        Commands::Stat { path, json } => commands::stat::execute(&session, &path, json),
        Commands::SearchPath => commands::search_path::execute(&session),
        Commands::Archives { json } => commands::archives::execute(&session, json),
        Commands::Which { module } => commands::which::execute(&session, &module),
        Commands::Version => commands::version::execute(&session),
    }
}
