//! bgmblaster CLI: convert one BGM segment to a standard MIDI file.
//!
//! Usage:
//!   cargo run --bin bb-cli -- path/to/song.bgm 0 out.mid
//!   cargo run --bin bb-cli -- path/to/song.bgm 2 out.mid --no-drums --dump -v

use anyhow::{Context, Result};
use bb_master::{Controller, ConvertOptions, DecodeOptions, Sequence, DEFAULT_TEMPO};
use clap::{ArgAction, Parser};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bb-cli", version, about = "Convert a BGM sequence segment to MIDI")]
struct Args {
    /// BGM file to read
    input: PathBuf,

    /// Segment to convert (0-3)
    #[arg(value_parser = clap::value_parser!(u8).range(0..=3))]
    segment: u8,

    /// MIDI file to write
    output: PathBuf,

    /// Play drum rows as plain notes
    #[arg(long)]
    no_drums: bool,

    /// Tempo assumed before the first tempo change
    #[arg(long, value_name = "BPM", default_value_t = DEFAULT_TEMPO)]
    default_tempo: i32,

    /// Print the decoded events before writing
    #[arg(long)]
    dump: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let data = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let options = ConvertOptions {
        decode: DecodeOptions {
            segment: args.segment,
            drum_translation: !args.no_drums,
            default_tempo: args.default_tempo,
        },
        ..ConvertOptions::default()
    };
    let mut ctrl = Controller::new(options);
    ctrl.load_bgm(&data)
        .with_context(|| format!("failed to decode {}", args.input.display()))?;

    if let Some(summary) = ctrl.summary() {
        info!("Name:    {}", summary.name);
        info!("Segment: {}", summary.segment);
        info!("Length:  {} ticks", summary.length);
        for track in &summary.tracks {
            info!(
                "  ch {:2}: {:5} events, ends at {:6}{}",
                track.channel,
                track.events,
                track.end_time,
                if track.drum_mode { " (drums)" } else { "" }
            );
        }
    }

    if args.dump {
        if let Some(seq) = ctrl.sequence() {
            dump_events(seq);
        }
    }

    let smf = ctrl.render_smf()?;
    fs::write(&args.output, &smf)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let warnings = ctrl.warnings().len();
    if warnings > 0 {
        warn!("{} warning(s) during conversion", warnings);
    }
    info!("Wrote {} bytes to {}", smf.len(), args.output.display());
    Ok(())
}

fn dump_events(seq: &Sequence) {
    for (channel, track) in seq.tracks.iter().enumerate() {
        if track.is_empty() {
            continue;
        }
        println!("Track {:02} ({} events)", channel, track.events.len());
        for event in &track.events {
            println!(
                "  {:6}  @{:#06X}  {:?}",
                event.time, event.source_offset, event.payload
            );
        }
        println!();
    }
}
