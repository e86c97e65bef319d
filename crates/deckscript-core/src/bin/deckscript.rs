//! `deckscript` command line
//!
//! Reads a snippet from a file (or `-` for stdin) and validates, extracts or
//! renders it against the in-memory recording backend.

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use deckscript_core::telemetry::{self, LogFormat};
use deckscript_core::{DeckScriptConfig, Pipeline};
use deckscript_dispatch::RecordingBuilder;
use deckscript_safety::ValidatorChoice;
use std::io::Read;
use std::process::ExitCode;

fn cli() -> Command {
    let file = Arg::new("file")
        .required(true)
        .help("Snippet file, or - for stdin");
    let json = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON");

    Command::new("deckscript")
        .version(deckscript_core::VERSION)
        .about("Safe interpreter for slide-building snippets")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("validator")
                .long("validator")
                .global(true)
                .value_parser(["auto", "tree", "pattern"])
                .help("Override the safety validator"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("validate")
                .about("Run the safety validator only")
                .arg(file.clone()),
        )
        .subcommand(
            Command::new("extract")
                .about("Print the call records a snippet produces")
                .arg(file.clone())
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("render")
                .about("Render onto the recording backend and print the deck")
                .arg(file)
                .arg(json),
        )
}

fn read_snippet(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading snippet from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading snippet {path}"))
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<DeckScriptConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => DeckScriptConfig::load(path)?,
        None => DeckScriptConfig::default(),
    };
    if let Some(choice) = matches.get_one::<String>("validator") {
        config.validator = match choice.as_str() {
            "tree" => ValidatorChoice::Tree,
            "pattern" => ValidatorChoice::Pattern,
            _ => ValidatorChoice::Auto,
        };
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let matches = cli().get_matches();
    let (command, args) = matches
        .subcommand()
        .context("a subcommand is required")?;

    let format = if args.get_flag("log-json") {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    telemetry::init(format).context("installing log subscriber")?;

    let pipeline = Pipeline::new(load_config(args)?)?;
    let path = args
        .get_one::<String>("file")
        .context("missing snippet file")?;
    let snippet = read_snippet(path)?;

    match command {
        "validate" => match pipeline.screen(&snippet) {
            Ok((_, verdict)) => {
                println!("{verdict}");
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                println!("{e}");
                Ok(ExitCode::FAILURE)
            }
        },
        "extract" => {
            let extraction = match pipeline.extract(&snippet) {
                Ok((extraction, _)) => extraction,
                Err(e) => {
                    println!("{e}");
                    return Ok(ExitCode::FAILURE);
                }
            };
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&extraction)?);
            } else {
                for record in &extraction.records {
                    println!(
                        "{:>5}  {}.{}({})",
                        record.offset(),
                        record.receiver(),
                        record.operation(),
                        record.args().join(", ")
                    );
                }
                for skipped in &extraction.skipped {
                    println!("{:>5}  skipped: {}", skipped.offset, skipped.reason);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        "render" => {
            let mut builder = RecordingBuilder::new();
            let report = pipeline.render_or_placeholder(&snippet, &mut builder).await;
            if args.get_flag("json") {
                let output = serde_json::json!({
                    "report": report,
                    "deck": builder.deck(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Verdict: {}", report.verdict);
                println!(
                    "Records: {} extracted, {} dispatched, {} skipped",
                    report.records_extracted, report.dispatched, report.skipped_statements
                );
                println!("Slides: {}", builder.deck().slides.len());
                for diagnostic in &report.diagnostics {
                    println!(
                        "  {} at {}: {}",
                        diagnostic.operation, diagnostic.offset, diagnostic.message
                    );
                }
            }
            Ok(if report.placeholder {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        other => anyhow::bail!("unknown subcommand {other}"),
    }
}
