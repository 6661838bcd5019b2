use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memlens::{replay, Instrumenter, OutputDemuxer};

#[derive(Parser)]
#[command(name = "memlens", about = "C memory-visualization trace toolkit", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite a C source file with trace instrumentation on stdout
    Instrument {
        /// Path to the C source file
        file: PathBuf,
    },
    /// Split a captured stdout stream into plain output and trace events
    Demux {
        /// Path to a captured stdout file
        file: PathBuf,
    },
    /// Reconstruct program state at a given step from a captured stream
    Replay {
        /// Path to a captured stdout file
        file: PathBuf,
        /// Zero-based event index to reconstruct (clamped to the log)
        #[arg(long, default_value_t = 0)]
        step: usize,
        /// Treat the capture as a finished run (enables leak reporting)
        #[arg(long)]
        complete: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Instrument { file } => {
            let source = read(&file)?;
            print!("{}", Instrumenter::new().instrument(&source));
        }
        Command::Demux { file } => {
            let demuxed = demux_file(&file)?;
            if !demuxed.output.is_empty() {
                println!("{}", demuxed.output.trim_end_matches('\n'));
            }
            for event in &demuxed.events {
                println!("[{}] {} (line {})", event.kind_name(), summary(event), event.line());
            }
            for warning in &demuxed.warnings {
                eprintln!("warning: {warning}");
            }
        }
        Command::Replay {
            file,
            step,
            complete,
        } => {
            let demuxed = demux_file(&file)?;
            let view = replay(&demuxed.events, step, complete);
            print!("{view}");
        }
    }
    Ok(())
}

fn read(path: &PathBuf) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn demux_file(path: &PathBuf) -> Result<memlens::DemuxedOutput> {
    let captured = read(path)?;
    let mut demuxer = OutputDemuxer::new();
    demuxer.push_bytes(captured.as_bytes());
    Ok(demuxer.finish())
}

fn summary(event: &memlens::TraceEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| "<unencodable>".to_string())
}
