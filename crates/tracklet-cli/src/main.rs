//! Tracklet CLI: the `tracklet` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, store } => commands::serve::run(bind, store),

        Commands::Issue { command } => commands::issue::run(command),
    }
}
