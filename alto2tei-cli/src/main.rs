use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error, info};

use alto2tei::logging::{self, LogLevel};
use alto2tei::stages::save_stages;
use alto2tei::{default_output_path, Alto2TeiProcessor, ConversionConfig, ConversionOutcome};

#[derive(Parser)]
#[command(name = "alto2tei", version)]
#[command(about = "Convert a directory or zip archive of ALTO files into one TEI document")]
struct Args {
    /// Directory or zip archive holding the ALTO files
    input: PathBuf,

    /// Log level
    #[arg(long, value_enum, ignore_case = true, default_value = "INFO")]
    level: LogLevel,

    /// Output file path (default: `<input name>.xml` in the current directory)
    #[arg(short, long = "output-filename")]
    output_filename: Option<PathBuf>,

    /// Leave out the facsimile block and the page-to-zone links
    #[arg(long)]
    no_facsimile: bool,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log timings of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Dump all intermediate pipeline stage outputs to a directory instead
    /// of writing the output file
    #[arg(long, value_name = "DIR")]
    dump_stages: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    logging::init(args.level);

    if let Err(e) = run(&args) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = ConversionConfig::load(args.config.as_deref())?;
    match &args.config {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("Using default config"),
    }
    if args.no_facsimile {
        config.include_facsimile = false;
    }

    let processor = Alto2TeiProcessor::new(config)?.with_profiling(args.profile);

    // Stage dump mode: capture and save all intermediates
    if let Some(stages_dir) = &args.dump_stages {
        info!("Pipeline stage dump mode");
        if let Some(stages) = processor.convert_capture_stages(&args.input)? {
            let written = save_stages(&stages, stages_dir, &args.input)?;
            info!(
                "{} stage files dumped to {}",
                written.len(),
                stages_dir.display()
            );
        }
        return Ok(());
    }

    let output = args
        .output_filename
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    match processor.convert_to_file(&args.input, &output)? {
        ConversionOutcome::Written { path, pages, zones } => {
            debug!("{}: {} pages, {} zones", path.display(), pages, zones);
        }
        ConversionOutcome::NoInput => debug!("nothing written"),
    }
    Ok(())
}
