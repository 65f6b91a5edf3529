//! CLI tool for parsing SEC SGML submissions

use std::path::PathBuf;
use std::process::exit;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TerminalMode, TermLogger};

use secsgml_scan::{
    parse_submission_metadata, scan_documents, standardize, write_outputs, write_tar, Status,
    SubmissionSource, WriteOptions,
};

fn cli() -> Command {
    Command::new("secsgml")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Split an SEC EDGAR full submission into its documents and metadata")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .help("Submission .txt file"),
        )
        .arg(
            Arg::new("output")
                .value_name("OUTPUT_DIR")
                .required(true)
                .help("Directory to write into (or TAR file with --tar)"),
        )
        .arg(
            Arg::new("tar")
                .long("tar")
                .action(ArgAction::SetTrue)
                .help("Write a single TAR archive instead of a directory"),
        )
        .arg(
            Arg::new("filter-type")
                .long("filter-type")
                .value_name("TYPE")
                .action(ArgAction::Append)
                .help("Only write documents of this <TYPE> (repeatable)"),
        )
        .arg(
            Arg::new("keep-filtered-metadata")
                .long("keep-filtered-metadata")
                .action(ArgAction::SetTrue)
                .help("Keep CSV rows for documents skipped by --filter-type"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Sets verbosity level (-v info, -vv debug, -vvv trace)"),
        )
}

fn verbosity(matches: &ArgMatches) -> LevelFilter {
    match matches.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let input = PathBuf::from(matches.get_one::<String>("input").expect("required"));
    let output = PathBuf::from(matches.get_one::<String>("output").expect("required"));
    let options = WriteOptions::new()
        .with_filter(
            matches
                .get_many::<String>("filter-type")
                .unwrap_or_default()
                .cloned(),
        )
        .keep_filtered_metadata(matches.get_flag("keep-filtered-metadata"));

    let start = Instant::now();
    let source = SubmissionSource::open(&input)
        .with_context(|| format!("Failed to load submission at: {}", input.display()))?;
    info!("load: {:?} ({} bytes)", start.elapsed(), source.len());

    let start = Instant::now();
    let metadata = parse_submission_metadata(&source);
    info!(
        "metadata parse: {:?} ({} events, {:?})",
        start.elapsed(),
        metadata.events.len(),
        metadata.format
    );

    let start = Instant::now();
    let standardized = standardize(&metadata);
    info!("standardize: {:?}", start.elapsed());

    let start = Instant::now();
    let documents = scan_documents(&source);
    info!(
        "scan: {:?} ({} documents, {} uuencoded)",
        start.elapsed(),
        documents.stats.doc_count,
        documents.stats.uuencoded_count
    );

    for (stage, status) in [("header", standardized.status), ("documents", documents.status)] {
        if status != Status::Ok {
            warn!("{stage} finished with status {status:?}, output may be incomplete");
        }
    }

    let start = Instant::now();
    let written = if matches.get_flag("tar") {
        write_tar(&output, &documents, &standardized, &options)
    } else {
        write_outputs(&output, &documents, &standardized, &options)
    };
    written.with_context(|| format!("Failed to write output to: {}", output.display()))?;
    info!("write: {:?}", start.elapsed());

    Ok(())
}

fn main() {
    let matches = cli().get_matches();

    if let Err(e) = TermLogger::init(
        verbosity(&matches),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if let Err(e) = run(&matches) {
        eprintln!("{e:?}");
        exit(1);
    }
}
