//! querytree CLI binary

use anyhow::Context;
use clap::Parser;
use querytree::logging::init_logging;
use querytree::tooling::cli::{Cli, CliContext};
use std::io::IsTerminal;
use std::process;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    let context = CliContext::new(cli.workspace.clone(), cli.config.clone(), cli.seed.clone())
        .context("Failed to initialize workspace")?
        .with_color(color);

    let logging = cli.logging_config(&context.config().logging);
    if let Err(e) = init_logging(Some(&logging)) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
