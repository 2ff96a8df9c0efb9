mod classifier;
mod cli;
mod config;
mod error;
mod fmt;
mod identity;
mod importer;
mod ledger;
mod matcher;
mod models;
mod parser;
mod settings;

use clap::Parser;
use log::LevelFilter;

use cli::{Cli, Commands};

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let ledger_path = settings::resolve_ledger_path(cli.ledger.as_deref());

    let result = match cli.command {
        Commands::Init => cli::init::run(&ledger_path, cli.ledger.is_some()),
        Commands::Import { files, configs } => cli::import::run(&ledger_path, &files, &configs),
        Commands::Preview { file, config } => cli::preview::run(&file, &config),
        Commands::Transactions { account } => {
            cli::transactions::list(&ledger_path, account.as_deref())
        }
        Commands::Status => cli::status::run(&ledger_path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
