use clap::Parser;

use chainwright::cli::{Cli, Command};
use chainwright::engine::{self, RunMode};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Reconcile { target } => engine::run(&target, RunMode::Apply),
        Command::Plan { target } => engine::run(&target, RunMode::Plan),
        Command::Stages { clean } => {
            engine::print_stages(clean);
            Ok(())
        }
    }
}
