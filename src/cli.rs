use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "setlog",
    about = "Convert a WorkoutLog CSV export into a SQLite backup file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Convert a CSV export into a SQLite backup importable by the app.
    Convert {
        /// Path to the WorkoutLog CSV export.
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output database path. Defaults to INPUT with a .db extension.
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
}
