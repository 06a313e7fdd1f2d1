//! Command-line arguments for the batch converter.

use std::path::PathBuf;

use clap::Parser;

/// Batch conversion from SESANE instrument recordings to standard WAVE
#[derive(Parser, Debug)]
#[command(name = "wsig2wav")]
#[command(version)]
#[command(about = "Convert SESANE WSIG recordings to WAVE files", long_about = None)]
pub struct Cli {
    /// Input directory containing files to be converted
    #[arg(short, long, value_name = "DIR")]
    pub input: PathBuf,

    /// Output directory for files after conversion
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,
}
