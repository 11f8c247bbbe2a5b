//! Render-ready bank model.
//!
//! [`SoundFont2::new`] turns the nine HYDRA indirection arrays into a flat
//! hierarchy: `Bank → Preset → Layer → Instrument → Split → Sample`. All
//! generator-inheritance rules are resolved here — global zones seed local
//! ones, later generators of an operator replace earlier ones, and preset
//! zones keep additive values that combine with instrument splits when a
//! voice is built. The model is immutable once constructed and can be shared
//! across channels.

use std::io::{Read, Seek};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::font::FontChunks;
use crate::hydra::{GenOper, Generator, Hydra};
use crate::info::Info;
use crate::riff::Riff;
use crate::sample::Sample;
use crate::zone::{Layer, Split};

/// Byte source a bank pulls lazy sample data from.
pub trait FontStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> FontStream for T {}

/// A named, ordered collection of splits.
#[derive(Debug, Clone)]
pub struct Instrument {
    pub name: String,
    pub splits: Vec<Split>,
}

/// A MIDI-addressable patch: program number plus its layers.
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: String,
    pub program: u16,
    pub layers: Vec<Layer>,
}

/// Presets sharing one MIDI bank number, sorted by program.
#[derive(Debug, Clone)]
pub struct Bank {
    pub number: u16,
    pub presets: Vec<Preset>,
}

impl Bank {
    pub fn preset(&self, program: u16) -> Option<&Preset> {
        self.presets.iter().find(|p| p.program == program)
    }
}

/// A loaded SoundFont 2 bank.
pub struct SoundFont2 {
    pub info: Info,
    /// Banks sorted by number.
    pub banks: Vec<Bank>,
    pub instruments: Vec<Instrument>,
    pub samples: Vec<Arc<Sample>>,
    smpl_offset: u64,
    sm24_offset: Option<u64>,
    stream: Mutex<Box<dyn FontStream>>,
}

impl SoundFont2 {
    /// Build the bank model from a parsed RIFF tree and its backing stream.
    ///
    /// Sample PCM stays on the stream; it is decoded on the first preset
    /// selection that references it.
    pub fn new<S: Read + Seek + Send + 'static>(riff: &Riff, mut stream: S) -> Result<SoundFont2> {
        let chunks = FontChunks::locate(riff)?;
        let info = Info::read(&mut stream, &chunks.info)?;
        let smpl_offset = chunks.smpl.data_offset;
        let sm24_offset = chunks.sm24.map(|c| c.data_offset);

        let hydra = Hydra::read(&mut stream, &chunks.pdta)?;
        let samples = translate_samples(&hydra);
        let instruments = translate_instruments(&hydra, &samples);
        let banks = translate_presets(&hydra, instruments.len());
        debug!(
            banks = banks.len(),
            instruments = instruments.len(),
            samples = samples.len(),
            "bank model translated"
        );

        Ok(SoundFont2 {
            info,
            banks,
            instruments,
            samples,
            smpl_offset,
            sm24_offset,
            stream: Mutex::new(Box::new(stream)),
        })
    }

    pub fn bank(&self, number: u16) -> Option<&Bank> {
        self.banks.iter().find(|b| b.number == number)
    }

    pub fn instrument(&self, index: usize) -> Option<&Instrument> {
        self.instruments.get(index)
    }

    pub fn sample(&self, index: usize) -> Option<&Arc<Sample>> {
        self.samples.get(index)
    }

    /// Decode every sample the preset can reach, including stereo partners.
    ///
    /// Blocks on the bank's stream; call from a non-audio thread before the
    /// first render that uses the preset.
    pub fn load_preset_samples(&self, preset: &Preset) -> Result<()> {
        let mut guard = self.stream.lock();
        let reader: &mut dyn FontStream = &mut **guard;
        for layer in &preset.layers {
            let Some(instrument) = self.instruments.get(layer.instrument) else {
                continue;
            };
            for split in &instrument.splits {
                let Some(sample) = &split.sample else { continue };
                sample.load(reader, self.smpl_offset, self.sm24_offset)?;
                // Follow the stereo chain; links may be circular, so stop on
                // revisit of the origin and bound the walk by the table size.
                let origin = Arc::as_ptr(sample);
                let mut next = sample.linked;
                for _ in 0..self.samples.len() {
                    let Some(index) = next else { break };
                    let Some(partner) = self.samples.get(index) else { break };
                    if Arc::as_ptr(partner) == origin {
                        break;
                    }
                    partner.load(reader, self.smpl_offset, self.sm24_offset)?;
                    next = partner.linked;
                }
            }
        }
        Ok(())
    }
}

fn translate_samples(hydra: &Hydra) -> Vec<Arc<Sample>> {
    let shdr_len = hydra.shdr.len();
    hydra
        .shdr
        .iter()
        .take(shdr_len.saturating_sub(1))
        .map(|header| Arc::new(Sample::from_header(header, shdr_len.saturating_sub(1))))
        .collect()
}

fn translate_instruments(hydra: &Hydra, samples: &[Arc<Sample>]) -> Vec<Instrument> {
    let mut instruments = Vec::new();
    if hydra.inst.len() < 2 {
        return instruments;
    }
    for i in 0..hydra.inst.len() - 1 {
        let zone_start = hydra.inst[i].bag_index as usize;
        let zone_end = (hydra.inst[i + 1].bag_index as usize)
            .min(hydra.ibag.len().saturating_sub(1))
            .max(zone_start);
        let zone_count = zone_end - zone_start;

        let mut splits = Vec::new();
        let mut global: Option<Split> = None;
        for j in zone_start..zone_end {
            // Every split starts from the instrument's global zone, if any.
            let mut split = global.clone().unwrap_or_default();
            let gen_start = (hydra.ibag[j].gen_index as usize).min(hydra.igen.len());
            let gen_end = (hydra.ibag[j + 1].gen_index as usize)
                .min(hydra.igen.len())
                .max(gen_start);
            for gen in &hydra.igen[gen_start..gen_end] {
                split.apply(gen, samples);
            }
            if split.sample.is_some() {
                splits.push(split);
            } else if j == zone_start && zone_count > 1 {
                // First zone without a terminal sampleID is the global zone.
                global = Some(split);
            }
            // Any other sampleless zone is discarded.
        }
        instruments.push(Instrument {
            name: hydra.inst[i].name.clone(),
            splits,
        });
    }
    instruments
}

fn translate_presets(hydra: &Hydra, instrument_count: usize) -> Vec<Bank> {
    let mut banks: Vec<Bank> = Vec::new();
    if hydra.phdr.len() < 2 {
        return banks;
    }
    // Banks come into being as their numbers are first encountered.
    for header in &hydra.phdr[..hydra.phdr.len() - 1] {
        if !banks.iter().any(|b| b.number == header.bank) {
            banks.push(Bank {
                number: header.bank,
                presets: Vec::new(),
            });
        }
    }

    for i in 0..hydra.phdr.len() - 1 {
        let header = &hydra.phdr[i];
        let zone_start = header.bag_index as usize;
        let zone_end = (hydra.phdr[i + 1].bag_index as usize)
            .min(hydra.pbag.len().saturating_sub(1))
            .max(zone_start);

        // The first preset zone is global iff the preset has more than one
        // zone and that zone does not end with an instrument generator.
        let mut global_gens: &[Generator] = &[];
        if zone_end - zone_start > 1 {
            let gen_start = (hydra.pbag[zone_start].gen_index as usize).min(hydra.pgen.len());
            let gen_end = (hydra.pbag[zone_start + 1].gen_index as usize)
                .min(hydra.pgen.len())
                .max(gen_start);
            if gen_start < gen_end
                && hydra.pgen[gen_end - 1].oper != Some(GenOper::Instrument)
            {
                global_gens = &hydra.pgen[gen_start..gen_end];
            }
        }

        let mut layers = Vec::new();
        for j in zone_start..zone_end {
            let gen_start = (hydra.pbag[j].gen_index as usize).min(hydra.pgen.len());
            let gen_end = (hydra.pbag[j + 1].gen_index as usize)
                .min(hydra.pgen.len())
                .max(gen_start);
            if gen_start >= gen_end {
                continue;
            }
            if hydra.pgen[gen_end - 1].oper != Some(GenOper::Instrument) {
                // The global zone itself, or a malformed one.
                continue;
            }

            // Union of global and local generators, locals superseding by
            // operator identity. This is replacement, not addition: the
            // additive step happens against instrument splits later.
            let mut merged: Vec<Generator> = global_gens.to_vec();
            for local in &hydra.pgen[gen_start..gen_end] {
                match merged.iter_mut().find(|g| g.raw_oper == local.raw_oper) {
                    Some(existing) => *existing = *local,
                    None => merged.push(*local),
                }
            }

            let mut layer = Layer::default();
            let mut instrument = None;
            for gen in &merged {
                if let Some(index) = layer.apply(gen) {
                    instrument = Some(index);
                }
            }
            match instrument {
                Some(index) if index < instrument_count => layers.push(layer),
                _ => warn!(
                    preset = %header.name,
                    "discarding preset zone with missing or out-of-range instrument"
                ),
            }
        }

        let preset = Preset {
            name: header.name.clone(),
            program: header.preset,
            layers,
        };
        if let Some(bank) = banks.iter_mut().find(|b| b.number == header.bank) {
            bank.presets.push(preset);
        }
    }

    banks.sort_by_key(|b| b.number);
    for bank in &mut banks {
        bank.presets.sort_by_key(|p| p.program);
    }
    banks
}
