use std::io;
use std::path::PathBuf;

use clap::Parser;
use omniconv::{Converter, ConverterConfig, ConverterError, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose)?;

    let config = load_config(&cli)?;
    let converter = Converter::with_config(&config)?;

    if cli.formats {
        print_formats(&converter);
        return Ok(());
    }

    let (Some(input), Some(output)) = (cli.input, cli.output) else {
        return Err(ConverterError::validation(
            "both an input and an output path are required",
        ));
    };
    if !input.exists() {
        return Err(ConverterError::MissingInput(input));
    }

    converter.convert(&input, &output)?;
    println!("converted {} -> {}", input.display(), output.display());
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ConverterConfig> {
    let mut config = match &cli.config {
        Some(path) => ConverterConfig::from_file(path)?,
        None => ConverterConfig::default(),
    };
    if let Some(program) = &cli.ebook_convert {
        config.ebook_convert = program.clone();
    }
    if let Some(program) = &cli.ebook_meta {
        config.ebook_meta = program.clone();
    }
    if let Some(seconds) = cli.tool_timeout {
        config.tool_timeout_secs = seconds;
    }
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn print_formats(converter: &Converter) {
    let registry = converter.registry();
    println!("Supported formats:");
    for format in registry.formats() {
        println!("  {format:<6} ({})", registry.plugin_for(format).unwrap_or("unknown"));
    }

    let direct = registry.declared_conversions();
    if !direct.is_empty() {
        println!("Direct conversions:");
        for (from, to) in direct {
            println!("  {from} -> {to}");
        }
    }
}

fn init_logging(verbosity: u8) -> Result<()> {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| ConverterError::Logging(err.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Convert documents, spreadsheets and e-books between file formats."
)]
struct Cli {
    /// Source file; its extension selects the reader.
    #[arg(required_unless_present = "formats")]
    input: Option<PathBuf>,

    /// Destination file; its extension selects the writer.
    #[arg(required_unless_present = "formats")]
    output: Option<PathBuf>,

    /// List the supported formats and exit.
    #[arg(long)]
    formats: bool,

    /// JSON configuration file for the handlers.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Program used for MOBI and AZW3 conversions.
    #[arg(long, value_name = "PROGRAM")]
    ebook_convert: Option<PathBuf>,

    /// Program used to read MOBI and AZW3 title and author.
    #[arg(long, value_name = "PROGRAM")]
    ebook_meta: Option<PathBuf>,

    /// Seconds an external converter may run before it is stopped.
    #[arg(long, value_name = "SECONDS")]
    tool_timeout: Option<u64>,

    /// Increase log verbosity (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}
