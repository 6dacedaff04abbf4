use clap::Parser;

use wakeguard::cli::Cli;
use wakeguard::{commands, logging};

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match commands::dispatch(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}
