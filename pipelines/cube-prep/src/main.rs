use clap::Parser;
use cube_prep::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli: Cli = Cli::parse();
    cli.run_program()
}
