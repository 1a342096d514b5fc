use clap::{Arg, ArgMatches, Command};
use log::LevelFilter;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use asgen::config::Config;
use asgen::engine::Engine;
use asgen::store::DiskStore;

#[tokio::main]
async fn main() {
    let app = create_app();
    let matches = app.get_matches();

    init_logging(&matches);

    let result = run_generator(matches).await;
    process::exit(result);
}

fn create_app() -> Command {
    Command::new("asgen")
        .version("0.1.0")
        .about("AppStream metadata generator for archive-based repositories")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Path to the workspace configuration file")
                .default_value("asgen-config.json"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Verbose output")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("command")
                .help("Action to perform (process)")
                .required(true),
        )
        .arg(
            Arg::new("suites")
                .help("Suites to operate on; defaults to all configured suites")
                .num_args(0..),
        )
}

fn init_logging(matches: &ArgMatches) {
    let mut builder = env_logger::Builder::from_default_env();
    if matches.get_flag("verbose") {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

async fn run_generator(matches: ArgMatches) -> i32 {
    let command = matches.get_one::<String>("command").map(|s| s.as_str());
    if command != Some("process") {
        eprintln!("Unknown command: {}", command.unwrap_or(""));
        return 1;
    }

    let config_path = PathBuf::from(matches.get_one::<String>("config").unwrap());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let store = match DiskStore::open(&config.database_dir()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let suites: Vec<String> = {
        let selected: Vec<String> = matches
            .get_many::<String>("suites")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        if selected.is_empty() {
            config.suites.keys().cloned().collect()
        } else {
            selected
        }
    };

    let engine = Engine::new(config, store);

    let mut exit_code = 0;
    for suite in &suites {
        if let Err(e) = engine.process_suite(suite).await {
            eprintln!("Failed to process suite {}: {}", suite, e);
            exit_code = 1;
        }
    }

    exit_code
}
