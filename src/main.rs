#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Result;
use clap::Parser;
use setlog::{cli, convert, utils};

#[macro_use]
extern crate setlog;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    match cli.cmd {
        cli::Cmd::Convert { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension("db"));
            dlog!(
                "mode=convert input={} output={}",
                input.display(),
                output.display()
            );

            let summary = convert::convert(&input, &output)?;

            println!("Conversion complete!");
            println!("  - Exercises: {}", summary.exercises);
            println!("  - Workouts: {}", summary.workouts);
            println!("  - Workout exercises: {}", summary.workout_exercises);
            println!("  - Sets: {}", summary.sets);
            println!("Output saved to: {}", output.display());

            Ok(())
        }
    }
}
