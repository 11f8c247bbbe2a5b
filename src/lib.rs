//! # Continuo — SoundFont 2 sample-based synthesizer
//!
//! Continuo parses a SoundFont 2 bank of recorded instrument samples and
//! renders polyphonic, note-driven audio at any caller-chosen sample rate.
//! It is built from two subsystems:
//!
//! - **continuo-sf2** — the format layer: RIFF chunk walking, HYDRA record
//!   parsing, and the translation of the preset → instrument → sample
//!   indirection tables into a flat, render-ready bank model with all
//!   generator inheritance resolved. Sample PCM is decoded lazily on first
//!   use and shared between channels.
//! - **continuo-synth** — the synthesis core: per-voice wavetable playback
//!   with looping, volume and modulation envelopes, vibrato and modulation
//!   LFOs, a resonant low-pass filter, constant-power panning, and a
//!   channel layer with sustain-pedal and exclusive-class handling.
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use continuo::{Channel, Riff, SoundFont2};
//!
//! let mut file = std::fs::File::open("bank.sf2")?;
//! let riff = Riff::parse(&mut file)?;
//! let font = Arc::new(SoundFont2::new(&riff, file)?);
//!
//! let mut channel = Channel::new(font);
//! channel.set_preset(0, 0)?;                  // program 0, bank 0
//! channel.note_on(60, 127, 44100.0);          // middle C, full velocity
//!
//! let mut left = vec![0.0f32; 44100];
//! let mut right = vec![0.0f32; 44100];
//! channel.render(&mut left, &mut right, 44100.0);
//! channel.note_off(60);
//! ```
//!
//! Output is two parallel float buffers in [-1, 1]; interleaving and
//! saturation are the caller's concern. See `demos/render_wav.rs` for a
//! complete file-to-WAV driver.

/// Re-export of the format layer for direct access.
pub use continuo_sf2 as sf2;
/// Re-export of the synthesis core for direct access.
pub use continuo_synth as synth;

pub use continuo_sf2::{
    Bank, Error, FourCc, Info, Instrument, Preset, Result, Riff, Sample, SampleLink, SoundFont2,
    Split,
};
pub use continuo_synth::{Channel, Voice, VoiceOptions};
