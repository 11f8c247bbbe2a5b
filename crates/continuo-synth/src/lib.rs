//! SoundFont 2 synthesis core.
//!
//! Real-time rendering over the bank model from `continuo-sf2`:
//!
//! - [`Channel`]: preset selection, note-on/off dispatch, sustain pedal,
//!   exclusive-class cutoff, and the per-buffer render loop
//! - [`Voice`]: one sounding note — wavetable oscillator with looping, two
//!   envelopes, two LFOs, resonant low-pass, constant-power panning
//! - [`Envelope`] / [`VoiceLfo`] / [`BiquadLowpass`]: the per-voice DSP
//!   building blocks
//! - [`math`]: conversions between cents, timecents, centibels and linear
//!   units
//!
//! # Example
//!
//! ```ignore
//! use continuo_synth::Channel;
//!
//! let mut channel = Channel::new(font);
//! channel.set_preset(0, 0)?;
//! channel.note_on(60, 127, 44100.0);
//!
//! let (mut left, mut right) = (vec![0.0; 512], vec![0.0; 512]);
//! channel.render(&mut left, &mut right, 44100.0);
//! ```
//!
//! Rendering is single-threaded per channel and the render path never
//! allocates, blocks or errors; only `set_preset` performs IO.

pub mod channel;
pub mod envelope;
pub mod filter;
pub mod lfo;
pub mod math;
pub mod pool;
pub mod voice;

pub use channel::Channel;
pub use envelope::{Decibels, Envelope, Linear, Mode, Phase};
pub use filter::BiquadLowpass;
pub use lfo::VoiceLfo;
pub use pool::Pool;
pub use voice::{Voice, VoiceOptions};
