use apigw_enrich::error::format_error;
use apigw_enrich::{resolve_input, write_output, EnrichError};
use clap::Parser;
use env_logger::Env;
use log::Level;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read};
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_INPUT_FAILURE: u8 = 1;
const EXIT_OUTPUT_FAILURE: u8 = 3;

/// Amend an OpenAPI specification with Amazon API Gateway extensions.
///
/// Reads a JSON query object and writes `{"json_specification": "..."}`, following the protocol of
/// Terraform's `external` data source.
#[derive(Debug, Parser)]
#[command(name = "apigw-enrich", version, long_about)]
struct Cli {
  /// File containing the JSON query (default: stdin)
  #[arg(short, long)]
  input: Option<PathBuf>,

  /// File to write the output object to (default: stdout)
  #[arg(short, long)]
  output: Option<PathBuf>,
}

fn main() -> ExitCode {
  // Logs go to stderr; stdout is reserved for the output object.
  env_logger::init_from_env(Env::default().filter_or("RUST_LOG", "warn"));

  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(err) if err.use_stderr() => {
      let _ = err.print();
      return ExitCode::from(EXIT_INPUT_FAILURE);
    }
    // --help and --version
    Err(err) => err.exit(),
  };

  let input: Box<dyn Read> = match &cli.input {
    Some(path) => match File::open(path) {
      Ok(file) => Box::new(BufReader::new(file)),
      Err(err) => {
        eprintln!("Failed to read input - cannot open `{}`: {err}", path.display());
        return ExitCode::from(EXIT_INPUT_FAILURE);
      }
    },
    None => Box::new(io::stdin().lock()),
  };

  let specification = match resolve_input(input)
    .map_err(EnrichError::from)
    .and_then(|enricher| enricher.amend().map_err(EnrichError::from))
  {
    Ok(specification) => specification,
    Err(err) => return report(&err),
  };

  // The output file is only created once amendment succeeds.
  let written = match &cli.output {
    Some(path) => match File::create(path) {
      Ok(file) => write_output(&specification, BufWriter::new(file)),
      Err(err) => {
        eprintln!("Failed to write output - cannot create `{}`: {err}", path.display());
        return ExitCode::from(EXIT_OUTPUT_FAILURE);
      }
    },
    None => write_output(&specification, io::stdout().lock()),
  };
  if let Err(err) = written {
    return report(&err.into());
  }

  ExitCode::SUCCESS
}

fn report(err: &EnrichError) -> ExitCode {
  let backtrace = if log::log_enabled!(Level::Debug) {
    err.backtrace()
  } else {
    None
  };
  let (prefix, detail) = match err {
    EnrichError::Input(inner) => (
      "Failed to read input",
      format_error(inner, Some(inner.name()), backtrace),
    ),
    EnrichError::Amendment(inner) => (
      "Failed to modify OpenAPI specification",
      format_error(inner, Some(inner.name()), backtrace),
    ),
    EnrichError::Output(inner) => (
      "Failed to write output",
      format_error(inner, Some(inner.name()), backtrace),
    ),
    _ => ("Failed", format_error(err, Some(&err.name()), backtrace)),
  };
  eprintln!("{prefix} - {detail}");

  ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(EXIT_INPUT_FAILURE))
}
