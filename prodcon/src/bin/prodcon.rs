//! prodcon command line driver.
//!
//! Runs producer and consumer threads against one bounded buffer for a fixed
//! time, then prints a summary of the run.
//!
//! # Usage
//!
//! ```sh
//! prodcon <duration-secs> <max-sleep-ms> <producers> <consumers> <yes|no>
//! prodcon 30 3 2 2 yes --capacity 8 --seed 42
//! ```

use std::time::Duration;

use prodcon::runtime::{ConfigError, Simulation, SimulationConfig, SimulationError};

const POSITIONAL_NAMES: [&str; 5] = [
    "duration-secs",
    "max-sleep-ms",
    "producers",
    "consumers",
    "verbose",
];

fn main() {
    if let Err(e) = run() {
        eprintln!("prodcon: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), SimulationError> {
    prodcon::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let config = parse_args(&args)?;

    println!(
        "Starting {} producer(s) and {} consumer(s) on a buffer of {} for {}s",
        config.producers,
        config.consumers,
        config.capacity,
        config.duration.as_secs()
    );

    let report = Simulation::spawn(config)?.run_for();
    println!("{report}");
    Ok(())
}

/// Parses command line arguments into a `SimulationConfig`.
fn parse_args(args: &[String]) -> Result<SimulationConfig, ConfigError> {
    let mut config = SimulationConfig::default();
    let mut positional: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--capacity" | "-c" => {
                i += 1;
                config.capacity = parse_value("--capacity", args.get(i))?;
            }
            "--seed" | "-s" => {
                i += 1;
                config.seed = Some(parse_value("--seed", args.get(i))?);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            arg if arg.starts_with('-') && arg.len() > 1 => {
                return Err(ConfigError::UnknownArgument(arg.to_owned()));
            }
            arg => positional.push(arg.to_owned()),
        }
        i += 1;
    }

    if positional.len() > POSITIONAL_NAMES.len() {
        return Err(ConfigError::UnknownArgument(
            positional[POSITIONAL_NAMES.len()].clone(),
        ));
    }
    if positional.len() < POSITIONAL_NAMES.len() {
        return Err(ConfigError::MissingArgument(
            POSITIONAL_NAMES[positional.len()].to_owned(),
        ));
    }

    config.duration = Duration::from_secs(parse_value(POSITIONAL_NAMES[0], positional.first())?);
    config.max_sleep = Duration::from_millis(parse_value(POSITIONAL_NAMES[1], positional.get(1))?);
    config.producers = parse_value(POSITIONAL_NAMES[2], positional.get(2))?;
    config.consumers = parse_value(POSITIONAL_NAMES[3], positional.get(3))?;
    config.verbose = parse_toggle(POSITIONAL_NAMES[4], &positional[4])?;

    config.validate()?;
    Ok(config)
}

fn parse_value<T: std::str::FromStr>(name: &str, value: Option<&String>) -> Result<T, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::MissingArgument(name.to_owned()))?;
    value.parse().map_err(|_| ConfigError::InvalidArgument {
        name: name.to_owned(),
        value: value.clone(),
    })
}

fn parse_toggle(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidArgument {
            name: name.to_owned(),
            value: value.to_owned(),
        }),
    }
}

fn print_usage() {
    eprintln!(
        r#"prodcon - bounded-buffer producer/consumer simulation

USAGE:
    prodcon <DURATION> <MAX_SLEEP> <PRODUCERS> <CONSUMERS> <VERBOSE> [OPTIONS]

ARGUMENTS:
    <DURATION>     How long to run, in seconds
    <MAX_SLEEP>    Upper bound of each worker's random pause, in milliseconds
    <PRODUCERS>    Number of producer threads (at least 1)
    <CONSUMERS>    Number of consumer threads (at least 1)
    <VERBOSE>      yes/no: print every buffer event and a ring snapshot

OPTIONS:
    -c, --capacity <N>   Buffer capacity (default: 5)
    -s, --seed <N>       Seed the worker RNGs for a reproducible run
    -h, --help           Print this help message

ENVIRONMENT:
    RUST_LOG             Log filter when built with --features tracing

EXAMPLE:
    prodcon 30 3 2 2 yes
    prodcon 10 500 4 1 no --capacity 8 --seed 42
"#
    );
}
