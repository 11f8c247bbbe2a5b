//! PCM sample store.
//!
//! Samples are described at parse time and decoded lazily: the first preset
//! selection that references a sample pulls its frames from the stream and
//! installs them behind a write-once latch, so later callers (and other
//! channels sharing the bank) see either loaded data or none at all.

use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::bank::FontStream;
use crate::error::Result;
use crate::hydra::SampleHeader;

/// Stereo-link category from the sample header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleLink {
    #[default]
    Mono,
    Right,
    Left,
    Linked,
}

/// One mono PCM buffer plus its playback metadata.
#[derive(Debug)]
pub struct Sample {
    pub name: String,
    /// Loop points relative to the start of this sample's buffer.
    pub loop_start: u32,
    pub loop_end: u32,
    /// Native rate the sample was recorded at.
    pub sample_rate: u32,
    /// MIDI key of the recorded pitch.
    pub original_key: u8,
    /// Playback pitch correction in cents.
    pub correction: i8,
    pub link: SampleLink,
    pub is_rom: bool,
    /// shdr index of the stereo partner, if any. A weak by-index reference:
    /// chains may be circular, so consumers must terminate on revisit.
    pub linked: Option<usize>,
    /// First frame within the smpl chunk.
    stream_start: u32,
    /// Length in frames.
    len: u32,
    data: OnceCell<Arc<[f32]>>,
}

impl Sample {
    pub(crate) fn from_header(header: &SampleHeader, shdr_len: usize) -> Sample {
        let (link, is_rom, valid) = decode_sample_type(header.sample_type);
        if !valid {
            tracing::warn!(
                name = %header.name,
                sample_type = header.sample_type,
                "invalid sample link type, coercing to mono"
            );
        }
        let linked = if link != SampleLink::Mono && (header.link as usize) < shdr_len {
            Some(header.link as usize)
        } else {
            None
        };
        Sample {
            name: header.name.clone(),
            loop_start: header.loop_start.saturating_sub(header.start),
            loop_end: header.loop_end.saturating_sub(header.start),
            sample_rate: header.sample_rate,
            original_key: header.original_key,
            correction: header.correction,
            link,
            is_rom,
            linked,
            stream_start: header.start,
            len: header.end.saturating_sub(header.start),
            data: OnceCell::new(),
        }
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Decoded frames, if the sample has been loaded.
    #[inline]
    pub fn data(&self) -> Option<&Arc<[f32]>> {
        self.data.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.data.get().is_some()
    }

    /// Decode this sample from the stream. 16-bit frames come from the smpl
    /// chunk; when an sm24 chunk is present its low bytes extend them to
    /// 24-bit before scaling to [-1, 1].
    pub(crate) fn load(
        &self,
        reader: &mut dyn FontStream,
        smpl_offset: u64,
        sm24_offset: Option<u64>,
    ) -> Result<()> {
        if self.data.get().is_some() {
            return Ok(());
        }
        debug!(name = %self.name, frames = self.len, "decoding sample data");

        let len = self.len as usize;
        reader.seek(SeekFrom::Start(smpl_offset + u64::from(self.stream_start) * 2))?;
        let mut raw16 = vec![0u8; len * 2];
        reader.read_exact(&mut raw16)?;

        let frames: Vec<f32> = match sm24_offset {
            Some(offset) => {
                reader.seek(SeekFrom::Start(offset + u64::from(self.stream_start)))?;
                let mut raw24 = vec![0u8; len];
                reader.read_exact(&mut raw24)?;
                raw16
                    .chunks_exact(2)
                    .zip(raw24.iter())
                    .map(|(hi, &lo)| {
                        let hi = i16::from_le_bytes([hi[0], hi[1]]);
                        let value = (i32::from(hi) << 8) | i32::from(lo);
                        value as f32 / 8_388_607.0
                    })
                    .collect()
            }
            None => raw16
                .chunks_exact(2)
                .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32767.0)
                .collect(),
        };

        let _ = self.data.set(frames.into());
        Ok(())
    }

    /// Build an already-decoded in-memory sample. Useful for synthetic
    /// banks and for tests that bypass the stream.
    pub fn from_frames(name: &str, frames: Vec<f32>, sample_rate: u32, original_key: u8) -> Sample {
        let len = frames.len() as u32;
        Sample {
            name: name.into(),
            loop_start: 0,
            loop_end: len,
            sample_rate,
            original_key,
            correction: 0,
            link: SampleLink::Mono,
            is_rom: false,
            linked: None,
            stream_start: 0,
            len,
            data: OnceCell::with_value(frames.into()),
        }
    }
}

/// Split a raw sfSampleType into (link, is_rom, was_valid).
fn decode_sample_type(raw: u16) -> (SampleLink, bool, bool) {
    let is_rom = raw & 0x8000 != 0;
    let link = match raw & 0x7FFF {
        1 => SampleLink::Mono,
        2 => SampleLink::Right,
        4 => SampleLink::Left,
        8 => SampleLink::Linked,
        _ => return (SampleLink::Mono, false, false),
    };
    (link, is_rom, true)
}
