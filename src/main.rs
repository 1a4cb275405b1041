use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bluefile_sigmf::{convert_file, ConverterOptions, DecoderConfig};

/// Convert MIDAS Blue Files into SigMF data/metadata pairs
#[derive(Parser, Debug)]
#[command(
    name = "bluefile_sigmf",
    version,
    about = "Convert MIDAS Blue Files (.cdif/.tmp/.prm) to SigMF"
)]
struct Cli {
    /// Blue files to convert; artifacts are written next to each input
    #[arg(value_name = "BLUE_FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Annotation label stamped into each .sigmf-meta
    #[arg(long)]
    label: Option<String>,

    /// Normalize scalar int64 (SX) samples to the unit interval like the
    /// other scalar integer formats
    #[arg(long)]
    normalize_int64: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bluefile_sigmf={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = ConverterOptions {
        label: cli.label,
        decoder: DecoderConfig {
            normalize_int64: cli.normalize_int64,
        },
    };

    let mut failed = false;
    for input in &cli.inputs {
        match convert_file(input, &options) {
            Ok(result) => {
                info!(
                    input = %input.display(),
                    samples = result.sample_count,
                    meta = %result.meta_path.display(),
                    "conversion complete"
                );
            }
            Err(e) => {
                error!(input = %input.display(), error = %e, "conversion failed");
                eprintln!("error: {e}");
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
