//! kql-lint command-line interface

use clap::Parser;
use kql_lint::cli::{output, Options, Runner};
use std::io::{self, IsTerminal, Read};

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Query text piped to stdin, if any
fn piped_input() -> io::Result<Option<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut text = String::new();
    stdin.lock().read_to_string(&mut text)?;
    Ok((!text.trim().is_empty()).then_some(text))
}

#[tokio::main]
async fn main() {
    human_panic::setup_panic!();

    let options = Options::parse();
    let colors = output::setup_colors(options.color);
    init_logging(options.verbose);

    let result = match piped_input() {
        Ok(input) => {
            let mut runner = Runner::new(io::stdout().lock()).with_colors(colors);
            runner.run(&options, input.as_deref()).await
        }
        Err(e) => Err(anyhow::Error::new(e).context("could not read standard input")),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}", output::format_error(&e));
            std::process::exit(1);
        }
    }
}
