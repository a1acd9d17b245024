#![doc = include_str!("../README.md")]

mod cli;

use clap::Parser;
use cli::command::run;
use cli::config::{CliArgs, CliConfig};
use cli::telemetry::init_telemetry;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_telemetry(&config.log)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(config, &mut out)
}
