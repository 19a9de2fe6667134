use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use glob::Pattern;
use log::LevelFilter;
use poe_bundle::{
    bundle_fs::FS,
    commands::{
        cat::cat_file, dat64::list_dat64, extract::extract_files, index::dump_index,
        list::list_files, Patch,
    },
    steam::steam_folder_search,
};

#[derive(Debug, Subcommand)]
enum Command {
    /// List files
    List {
        /// Glob patterns to filter the list of files
        #[clap(default_value = "**")]
        #[arg(num_args = 1..)]
        globs: Vec<Pattern>,
    },
    /// Extract matched files to a folder
    Extract {
        /// Path to the folder to output the extracted files
        output_folder: PathBuf,
        /// Glob patterns to filter the list of files
        #[clap(default_value = "**")]
        #[arg(num_args = 1..)]
        globs: Vec<Pattern>,
    },
    /// Extract a single file to stdout
    Cat {
        /// Path to the file to extract
        path: String,
    },
    /// List the top-level .dat64 tables grouped by bundle
    Dat64,
    /// Print a JSON summary of the bundle index
    Index,
}

/// Reads the files packed into the game's bundles.
/// File paths and contents are printed to stdout, diagnostics to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "poe_bundle",
    group(
        ArgGroup::new("source")
        .args(&["game_dir", "patch"])
        .required(false) // Falls back to searching for PoE 2
        .multiple(false) // Only one can be used at a time
    )
)]
#[clap(version)]
struct Cli {
    /// Game folder containing Bundles2/
    #[arg(long)]
    game_dir: Option<PathBuf>,

    /// Search the Steam libraries for this game (1 or 2)
    #[arg(short, long)]
    patch: Option<Patch>,

    /// More logging, repeat for more detail. RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug)]
struct Args {
    game_dir: PathBuf,
    command: Command,
    verbose: u8,
}

/// Validates user input and constructs a valid input state
fn parse_args() -> Result<Args> {
    let cli = Cli::parse();

    let game_dir = match cli.game_dir {
        Some(game_dir) => game_dir,
        None => {
            let patch = cli.patch.unwrap_or(Patch::Two);
            steam_folder_search(&patch)
                .with_context(|| format!("Couldn't find a Steam install for {patch:?}"))?
        }
    };
    ensure!(game_dir.exists(), "Game folder doesn't exist: {game_dir:?}");

    Ok(Args {
        game_dir,
        command: cli.command,
        verbose: cli.verbose,
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let args = parse_args()?;
    init_logging(args.verbose);

    let fs = FS::from_folder(args.game_dir).context("Failed to initialise file system")?;

    match args.command {
        Command::List { globs } => list_files(&fs, &globs).context("List command failed")?,
        Command::Cat { path } => cat_file(&fs, &path).context("Cat command failed")?,
        Command::Extract {
            globs,
            output_folder,
        } => {
            let count =
                extract_files(&fs, &globs, &output_folder).context("Extract command failed")?;
            log::info!("Extracted {count} files");
        }
        Command::Dat64 => list_dat64(&fs).context("Dat64 command failed")?,
        Command::Index => dump_index(&fs).context("Index command failed")?,
    }

    Ok(())
}
