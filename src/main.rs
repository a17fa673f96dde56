use clap::Parser;
use histsim::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
