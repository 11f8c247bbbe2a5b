//! One MIDI channel: preset selection, note dispatch and the render loop.
//!
//! A channel owns its voice pool exclusively; the bank behind it is shared
//! and immutable. `set_preset` is the only operation that touches the byte
//! stream (it decodes any samples the preset needs), so it belongs on a
//! non-audio thread before the first render.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{trace, warn};

use continuo_sf2::{Preset, Result, SampleLink, SoundFont2};

use crate::pool::Pool;
use crate::voice::{Voice, VoiceOptions};

const INITIAL_VOICES: usize = 64;
const VOICE_GROWTH: usize = 64;

/// The percussion bank falls back to its own first preset rather than to
/// bank zero.
const PERCUSSION_BANK: u16 = 128;

pub struct Channel {
    font: Arc<SoundFont2>,
    bank_index: Option<usize>,
    preset_index: Option<usize>,
    voices: Pool<Voice>,
    key_down: [bool; 128],
    sustain: bool,
    options: VoiceOptions,
}

impl Channel {
    pub fn new(font: Arc<SoundFont2>) -> Channel {
        Channel::with_options(font, VoiceOptions::default())
    }

    pub fn with_options(font: Arc<SoundFont2>, options: VoiceOptions) -> Channel {
        Channel {
            font,
            bank_index: None,
            preset_index: None,
            voices: Pool::with_capacity(INITIAL_VOICES, VOICE_GROWTH),
            key_down: [false; 128],
            sustain: false,
            options,
        }
    }

    /// The currently selected preset, if any.
    pub fn preset(&self) -> Option<&Preset> {
        let bank = self.font.banks.get(self.bank_index?)?;
        bank.presets.get(self.preset_index?)
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Select a preset by MIDI program and bank number and decode its
    /// samples. A missed lookup falls back to bank 0 — except on the
    /// percussion bank, which falls back to its own first preset. When no
    /// preset matches at all, the current selection is kept.
    pub fn set_preset(&mut self, program: u16, bank_number: u16) -> Result<()> {
        let selection = self
            .resolve_preset(program, bank_number)
            .or_else(|| self.resolve_preset(program, 0));
        let Some((bank_index, preset_index)) = selection else {
            warn!(program, bank_number, "no matching preset; selection unchanged");
            return Ok(());
        };

        self.bank_index = Some(bank_index);
        self.preset_index = Some(preset_index);
        let preset = &self.font.banks[bank_index].presets[preset_index];
        trace!(preset = %preset.name, program, bank_number, "preset selected");
        self.font.load_preset_samples(preset)
    }

    fn resolve_preset(&self, program: u16, bank_number: u16) -> Option<(usize, usize)> {
        let bank_index = self
            .font
            .banks
            .iter()
            .position(|b| b.number == bank_number)?;
        let bank = &self.font.banks[bank_index];
        match bank.presets.iter().position(|p| p.program == program) {
            Some(preset_index) => Some((bank_index, preset_index)),
            None if bank.number == PERCUSSION_BANK && !bank.presets.is_empty() => {
                Some((bank_index, 0))
            }
            None => None,
        }
    }

    /// Start a note: one voice per matching (layer, split) pair, plus one
    /// per stereo-linked partner sample. New voices then cut off any older
    /// voice sharing a non-zero exclusive class.
    pub fn note_on(&mut self, key: u8, velocity: u8, sample_rate: f32) {
        if key >= 128 {
            return;
        }
        self.key_down[usize::from(key)] = true;
        let sounding_before = self.voices.len();
        self.generate_voices(key, velocity, sample_rate);

        // Exclusive-class cutoff only reaches voices that existed before
        // this note-on appended its own.
        let mut classes: SmallVec<[u16; 8]> = SmallVec::new();
        for i in sounding_before..self.voices.len() {
            let class = self.voices[i].exclusive_class();
            if class != 0 && !classes.contains(&class) {
                classes.push(class);
            }
        }
        for i in 0..sounding_before {
            if classes.contains(&self.voices[i].exclusive_class()) {
                self.voices[i].cut_off();
            }
        }
    }

    fn generate_voices(&mut self, key: u8, velocity: u8, sample_rate: f32) {
        let Some((bank_index, preset_index)) = self.bank_index.zip(self.preset_index) else {
            return;
        };
        let font = Arc::clone(&self.font);
        let Some(preset) = font
            .banks
            .get(bank_index)
            .and_then(|b| b.presets.get(preset_index))
        else {
            return;
        };

        for layer in preset.layers.iter().filter(|l| l.matches(key, velocity)) {
            let Some(instrument) = font.instruments.get(layer.instrument) else {
                continue;
            };
            for split in instrument.splits.iter().filter(|s| s.matches(key, velocity)) {
                let Some(first) = &split.sample else { continue };
                if first.is_rom {
                    continue;
                }
                let eff_velocity = if split.velocity >= 0 {
                    split.velocity as u8
                } else {
                    velocity
                };
                let eff_key = if split.keynum >= 0 {
                    split.keynum as u8
                } else {
                    key
                };

                // Emit a voice for the sample and each stereo-chained
                // partner. Links may be circular; the walk stops on a
                // revisit of the first sample and is bounded by the table.
                let mut sample = Arc::clone(first);
                for _ in 0..=font.samples.len() {
                    if let Some(voice) = Voice::new(
                        layer,
                        split,
                        &sample,
                        key,
                        eff_key,
                        eff_velocity,
                        sample_rate,
                        self.options,
                    ) {
                        self.voices.push(voice);
                    } else {
                        trace!(sample = %sample.name, "skipping voice: sample not decoded");
                    }
                    if sample.link == SampleLink::Mono {
                        break;
                    }
                    let next = sample.linked.and_then(|i| font.samples.get(i));
                    match next {
                        Some(partner) if !Arc::ptr_eq(partner, first) => {
                            sample = Arc::clone(partner);
                        }
                        _ => break,
                    }
                }
            }
        }
    }

    /// Stop a note. With the sustain pedal down the voices stay held and
    /// release when the pedal lifts.
    pub fn note_off(&mut self, key: u8) {
        if key >= 128 {
            return;
        }
        self.key_down[usize::from(key)] = false;
        if self.sustain {
            return;
        }
        for voice in self.voices.iter_mut() {
            if voice.key() == key {
                voice.release();
            }
        }
    }

    /// Pedal up releases every voice whose key is no longer held.
    pub fn set_sustain(&mut self, enable: bool) {
        self.sustain = enable;
        if enable {
            return;
        }
        for voice in self.voices.iter_mut() {
            if !self.key_down[usize::from(voice.key()) & 0x7F] {
                voice.release();
            }
        }
    }

    /// Render and sum every voice into the output buffers, in pool order.
    /// Finished voices are swapped out in place. Never allocates or fails;
    /// the caller provides (and zeroes, if desired) the buffers.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32], sample_rate: f32) {
        let mut i = 0;
        while i < self.voices.len() {
            let voice = &mut self.voices[i];
            voice.render(left, right, sample_rate);
            if voice.is_done() {
                self.voices.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Drop every voice immediately.
    pub fn panic(&mut self) {
        self.voices.clear();
    }

    /// Voices visible for inspection; order is unspecified.
    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }
}
