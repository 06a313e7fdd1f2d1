//! `wsig2wav`: batch conversion of SESANE instrument recordings to WAVE.
//!
//! Walks the input directory, selects instrument files by extension, and
//! rewrites each one as a standard WAVE file in the output directory. All
//! chunk-level work happens behind the library's read/write API.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use regex::Regex;

use wsig::cli::Cli;
use wsig::writer::{SampleBuffer, SampleData};

fn main() -> Result<()> {
    let cli = Cli::parse();

    fs::create_dir_all(&cli.output)
        .with_context(|| format!("cannot create output directory {}", cli.output.display()))?;

    // Extensions written by the EVA acquisition programs.
    let pattern = Regex::new(r"\.(int|naf|oaf|pr1|pr2)$")?;
    let mut inputs = Vec::new();
    collect_inputs(&cli.input, &pattern, &mut inputs)
        .with_context(|| format!("cannot read input directory {}", cli.input.display()))?;
    inputs.sort();

    let mut converted = 0usize;
    let mut failed = 0usize;
    for input in &inputs {
        let name = match input.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        let output = cli.output.join(format!("{}.wav", name));

        println!("Start conversion for {}...", input.display());
        match convert(input, &output) {
            Ok(frames) => {
                converted += 1;
                println!("Done. ({}, {} frames)", output.display(), frames);
            }
            Err(err) => {
                failed += 1;
                eprintln!("Failed: {}: {:#}", input.display(), err);
            }
        }
    }

    println!("{} converted, {} failed", converted, failed);
    Ok(())
}

/// Recursively gather files whose name matches the extension pattern.
fn collect_inputs(dir: &Path, pattern: &Regex, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_inputs(&path, pattern, out)?;
        } else if pattern.is_match(&entry.file_name().to_string_lossy()) {
            out.push(path);
        }
    }
    Ok(())
}

/// Convert one recording; returns the number of frames written.
fn convert(input: &Path, output: &Path) -> Result<u64> {
    let mut reader = wsig::open(input)?;
    let rate = reader.sample_rate();
    let channels = reader.channel_count();
    let frames = reader.frame_count();
    let width = reader.sample_width();
    let raw = reader.read_frames(-1)?;
    reader.close();

    match width {
        1 => {
            let buffer = SampleBuffer::interleaved(SampleData::Uint8(&raw), channels)?;
            wsig::write_path(output, rate, &buffer)?;
        }
        _ => {
            // read_frames returns native-order bytes.
            let samples: Vec<i16> = raw
                .chunks_exact(2)
                .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]))
                .collect();
            let buffer = SampleBuffer::interleaved(SampleData::Int16(&samples), channels)?;
            wsig::write_path(output, rate, &buffer)?;
        }
    }

    Ok(frames)
}
