//! Example: Find the loop in a WAV file
//!
//! Usage:
//!   cargo run --release --example analyze_wav -- [--json] <file.wav>
//!
//! Set `RUST_LOG=debug` to see per-stage timing and chosen values.

use loopscope_dsp::analysis::confidence::compute_confidence;
use loopscope_dsp::preprocessing::channel_mixer::downmix_interleaved;
use loopscope_dsp::{analyze, AnalysisConfig};
use std::env;

fn load_wav(path: &str) -> Result<(Vec<f32>, u32), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let mono = downmix_interleaved(&samples, spec.channels as usize)?;
    Ok((mono, spec.sample_rate))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut json = false;
    let mut path = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            _ => path = Some(arg),
        }
    }
    let Some(path) = path else {
        eprintln!("Usage: analyze_wav [--json] <file.wav>");
        std::process::exit(2);
    };

    let (samples, sample_rate) = load_wav(&path)?;
    let result = analyze(&samples, sample_rate, &AnalysisConfig::default())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let confidence = compute_confidence(&result);
    println!("Analysis Results: {}", path);
    println!(
        "  BPM: {:.2} (confidence: {:.2})",
        result.tempo.bpm, result.tempo.confidence
    );
    println!(
        "  Beats: {} (grid stability: {:.2})",
        result.beats.times.len(),
        result.beats.stability
    );
    println!(
        "  Loop: {:.3}s - {:.3}s, samples {}..{} (confidence: {:.2})",
        result.loop_region.start_seconds,
        result.loop_region.end_seconds,
        result.loop_region.start_sample,
        result.loop_region.end_sample,
        result.loop_region.confidence
    );
    for (i, c) in result.candidates.iter().enumerate().skip(1).take(4) {
        println!(
            "  Alternative {}: {:.3}s long at {:.3}s (confidence: {:.2})",
            i,
            c.length_seconds,
            c.start_sample as f32 / sample_rate as f32,
            c.confidence
        );
    }
    if result.used_fallback {
        println!("  Fallbacks: {:?}", result.metadata.flags);
    }
    println!(
        "  Overall confidence: {:.2} ({})",
        confidence.overall_confidence,
        confidence.confidence_level()
    );

    Ok(())
}
