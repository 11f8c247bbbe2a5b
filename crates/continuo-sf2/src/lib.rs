//! SoundFont 2 format layer.
//!
//! Parses an `.sf2` byte stream into a render-ready bank model:
//!
//! - [`riff`]: generic RIFF chunk walking over any `Read + Seek` source
//! - [`hydra`]: the nine raw pdta record arrays
//! - [`bank`]: the flattened `Bank → Preset → Layer → Instrument → Split →
//!   Sample` hierarchy with all generator inheritance resolved
//! - [`sample`]: lazily-decoded PCM buffers shared across channels
//!
//! # Example
//!
//! ```ignore
//! use continuo_sf2::{Riff, SoundFont2};
//!
//! let mut file = std::fs::File::open("bank.sf2")?;
//! let riff = Riff::parse(&mut file)?;
//! let font = SoundFont2::new(&riff, file)?;
//! ```
//!
//! The bank model is immutable after construction; modulator records are
//! parsed but not routed, and ROM samples are never played.

pub mod bank;
pub mod error;
mod font;
pub mod hydra;
pub mod info;
pub mod riff;
pub mod sample;
pub mod zone;

pub use bank::{Bank, FontStream, Instrument, Preset, SoundFont2};
pub use error::{Error, Result};
pub use info::{Info, Version};
pub use riff::{Chunk, FourCc, Riff};
pub use sample::{Sample, SampleLink};
pub use zone::{EnvParams, Layer, LfoParams, LoopMode, Split};
