//! CLI command implementations

use std::path::Path;

use anyhow::{bail, Context, Result};
use navconf::{ConfigSources, NavConfig};
use theory_engine::{NoteInput, ScoreRequest, TheoryEngine};

/// Name the chord formed by the given MIDI pitches and print it as JSON
pub fn chord(config: &NavConfig, pitches: &[u8]) -> Result<()> {
    if let Some(bad) = pitches.iter().find(|p| **p > 127) {
        bail!("MIDI pitch must be 0-127, got {}", bad);
    }

    let engine = TheoryEngine::new(crate::key_params(&config.analysis));
    let notes: Vec<NoteInput> = pitches.iter().copied().map(NoteInput::new).collect();
    let result = engine.resolve_chord(&notes);

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Run key analysis on a MIDI file and print the report as JSON
pub fn analyze(config: &NavConfig, path: &Path, request: &ScoreRequest) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let engine = TheoryEngine::new(crate::key_params(&config.analysis));
    let report = engine
        .analyze_key(&bytes, request)
        .with_context(|| format!("Failed to analyze {}", path.display()))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print the effective configuration and where it came from
pub fn show_config(config: &NavConfig, sources: &ConfigSources) {
    if sources.files.is_empty() {
        println!("# No config files found, using defaults");
    }
    for file in &sources.files {
        println!("# Loaded: {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# Env override: {}", var);
    }
    println!();
    print!("{}", config.to_toml());
}
