mod cli;
mod config;
mod constants;
mod coord;
mod error;
mod extract;
mod fetch;
mod manifest;
mod mosaic;
mod pipeline;
mod progress;
mod query;
mod safety;

use anyhow::Result;
use cli::{Command, parse_args};
use pipeline::{run_acquire, run_assemble, run_pipeline};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args)? {
        Command::Acquire(config) => run_acquire(&config),
        Command::Assemble(config) => run_assemble(&config),
        Command::Run(config) => run_pipeline(&config, None),
    }
}
