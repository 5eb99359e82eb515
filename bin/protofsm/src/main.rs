use std::path::PathBuf;

use owo_colors::OwoColorize;
use protofsm_learning::{prelude::*, sample, SampleFormat, SampleParseError};

use tracing::{debug, info, trace};
use tracing_subscriber::{prelude::*, EnvFilter};

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

fn cli() -> Command {
    Command::new("protofsm")
        .about("Protocol state machine inference")
        .subcommand_required(true)
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .num_args(0..=1)
                .require_equals(true)
                .value_parser(["info", "debug", "trace"])
                .default_missing_value("info"),
        )
        .subcommand(
            Command::new("learn")
                .about("builds a prefix tree acceptor from the symbol sequences in FILE and optionally compresses it with k-tails")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_parser(["text", "csv"])
                        .default_value("text"),
                )
                .arg(
                    Arg::new("k")
                        .short('k')
                        .help("lookahead of k-tails, no merging happens if absent")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("table")
                        .long("table")
                        .help("also print the transition table")
                        .action(ArgAction::SetTrue),
                ),
        )
}

/// Crates whose events `-v` turns on.
const LOGGING_CRATES: [&str; 3] = ["protofsm", "protofsm_core", "protofsm_learning"];

/// Builds the filter directives: an explicit `-v` level applies to the crates of this
/// workspace only, otherwise `RUST_LOG` is used if set, and `info` if not.
fn log_directives(verbosity: Option<&str>, env: Option<&str>) -> String {
    match (verbosity, env) {
        (Some(level), _) => LOGGING_CRATES
            .iter()
            .map(|krate| format!("{krate}={level}"))
            .collect::<Vec<_>>()
            .join(","),
        (None, Some(env)) if !env.trim().is_empty() => env.to_string(),
        (None, _) => "info".to_string(),
    }
}

fn setup_logging(matches: &ArgMatches) {
    let verbosity = matches
        .try_get_one::<String>("verbosity")
        .ok()
        .flatten()
        .map(String::as_str);
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = log_directives(verbosity, env.as_deref());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr_log).init();

    trace!("logging with directives `{directives}`");
}

fn learn(matches: &ArgMatches) -> Result<(), SampleParseError> {
    let path = matches
        .get_one::<PathBuf>("file")
        .expect("file is a required argument");
    let format = match matches.get_one::<String>("format").map(String::as_str) {
        Some("csv") => SampleFormat::Csv,
        _ => SampleFormat::Text,
    };

    let sequences = sample::load(path, format)?;
    info!("read {} sessions from {}", sequences.len(), path.display());

    let start = std::time::Instant::now();
    let pta = PtaInfer.infer(&sequences);
    info!(
        "building the prefix tree took {}µs, it has {} states",
        start.elapsed().as_micros(),
        pta.size()
    );

    let fsm = match matches.get_one::<usize>("k") {
        Some(&k) => {
            let start = std::time::Instant::now();
            let (fsm, merged) = KTails::new(k).merge_counted(pta);
            info!(
                "k-tails merged {merged} states in {}µs",
                start.elapsed().as_micros()
            );
            fsm
        }
        None => {
            debug!("no lookahead given, keeping the prefix tree");
            pta
        }
    };

    print!("{fsm}");
    if matches.get_flag("table") {
        println!("{}", fsm.transition_table());
    }
    Ok(())
}

pub fn main() {
    let matches = cli().get_matches();

    setup_logging(&matches);

    let result = match matches.subcommand() {
        Some(("learn", sub_matches)) => learn(sub_matches),
        _ => unreachable!(),
    };

    if let Err(error) = result {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
