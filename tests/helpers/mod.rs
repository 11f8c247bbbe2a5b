//! Test fixtures for the integration suite.
//!
//! [`BankBuilder`] assembles a complete in-memory `.sf2` byte image — RIFF
//! framing, INFO list, sample data and all nine pdta arrays with their
//! terminal records — so the tests can exercise the full parse → translate →
//! render path without fixture files on disk.

#![allow(dead_code)]

use std::f32::consts::TAU;
use std::io::Cursor;
use std::sync::Arc;

use continuo::{Riff, SoundFont2};

// Generator operator numbers used by the tests.
pub const GEN_PAN: u16 = 17;
pub const GEN_INSTRUMENT: u16 = 41;
pub const GEN_KEY_RANGE: u16 = 43;
pub const GEN_VEL_RANGE: u16 = 44;
pub const GEN_INITIAL_ATTENUATION: u16 = 48;
pub const GEN_RELEASE_VOL_ENV: u16 = 38;
pub const GEN_COARSE_TUNE: u16 = 51;
pub const GEN_SAMPLE_ID: u16 = 53;
pub const GEN_SAMPLE_MODES: u16 = 54;
pub const GEN_SCALE_TUNING: u16 = 56;
pub const GEN_EXCLUSIVE_CLASS: u16 = 57;

pub const MONO: u16 = 1;
pub const RIGHT: u16 = 2;
pub const LEFT: u16 = 4;

pub struct SampleDef {
    pub name: &'static str,
    pub frames: Vec<i16>,
    pub sample_rate: u32,
    pub original_key: u8,
    pub correction: i8,
    pub sample_type: u16,
    pub link: u16,
    /// Loop points relative to the sample start.
    pub loop_start: u32,
    pub loop_end: u32,
}

impl SampleDef {
    pub fn mono(name: &'static str, frames: Vec<i16>, sample_rate: u32, original_key: u8) -> Self {
        let loop_end = frames.len() as u32;
        SampleDef {
            name,
            frames,
            sample_rate,
            original_key,
            correction: 0,
            sample_type: MONO,
            link: 0,
            loop_start: 0,
            loop_end,
        }
    }
}

/// One zone: a raw generator list in file order.
pub type Zone = Vec<(u16, u16)>;

pub struct InstrumentDef {
    pub name: &'static str,
    pub zones: Vec<Zone>,
}

pub struct PresetDef {
    pub name: &'static str,
    pub program: u16,
    pub bank: u16,
    pub zones: Vec<Zone>,
}

#[derive(Default)]
pub struct BankBuilder {
    samples: Vec<SampleDef>,
    instruments: Vec<InstrumentDef>,
    presets: Vec<PresetDef>,
}

impl BankBuilder {
    pub fn new() -> BankBuilder {
        BankBuilder::default()
    }

    /// Register a sample; the returned index is what `sampleID` takes.
    pub fn sample(&mut self, def: SampleDef) -> u16 {
        self.samples.push(def);
        (self.samples.len() - 1) as u16
    }

    /// Register an instrument; the returned index is what `instrument` takes.
    pub fn instrument(&mut self, name: &'static str, zones: Vec<Zone>) -> u16 {
        self.instruments.push(InstrumentDef { name, zones });
        (self.instruments.len() - 1) as u16
    }

    pub fn preset(&mut self, name: &'static str, program: u16, bank: u16, zones: Vec<Zone>) {
        self.presets.push(PresetDef {
            name,
            program,
            bank,
            zones,
        });
    }

    /// Assemble the complete sfbk byte image.
    pub fn build(&self) -> Vec<u8> {
        // sdta: concatenated 16-bit frames; record where each sample starts
        let mut smpl = Vec::new();
        let mut sample_starts = Vec::new();
        for sample in &self.samples {
            sample_starts.push((smpl.len() / 2) as u32);
            for frame in &sample.frames {
                smpl.extend_from_slice(&frame.to_le_bytes());
            }
        }

        // pdta arrays, terminal records included
        let mut phdr = Vec::new();
        let mut pbag = Vec::new();
        let mut pgen = Vec::new();
        let mut pbag_count: u16 = 0;
        let mut pgen_count: u16 = 0;
        for preset in &self.presets {
            push_name(&mut phdr, preset.name);
            push_u16(&mut phdr, preset.program);
            push_u16(&mut phdr, preset.bank);
            push_u16(&mut phdr, pbag_count);
            phdr.extend_from_slice(&[0u8; 12]); // library, genre, morphology
            for zone in &preset.zones {
                push_u16(&mut pbag, pgen_count);
                push_u16(&mut pbag, 0);
                pbag_count += 1;
                for &(oper, amount) in zone {
                    push_u16(&mut pgen, oper);
                    push_u16(&mut pgen, amount);
                    pgen_count += 1;
                }
            }
        }
        push_name(&mut phdr, "EOP");
        push_u16(&mut phdr, 0);
        push_u16(&mut phdr, 0);
        push_u16(&mut phdr, pbag_count);
        phdr.extend_from_slice(&[0u8; 12]);
        push_u16(&mut pbag, pgen_count);
        push_u16(&mut pbag, 0);
        pgen.extend_from_slice(&[0u8; 4]);

        let mut inst = Vec::new();
        let mut ibag = Vec::new();
        let mut igen = Vec::new();
        let mut ibag_count: u16 = 0;
        let mut igen_count: u16 = 0;
        for instrument in &self.instruments {
            push_name(&mut inst, instrument.name);
            push_u16(&mut inst, ibag_count);
            for zone in &instrument.zones {
                push_u16(&mut ibag, igen_count);
                push_u16(&mut ibag, 0);
                ibag_count += 1;
                for &(oper, amount) in zone {
                    push_u16(&mut igen, oper);
                    push_u16(&mut igen, amount);
                    igen_count += 1;
                }
            }
        }
        push_name(&mut inst, "EOI");
        push_u16(&mut inst, ibag_count);
        push_u16(&mut ibag, igen_count);
        push_u16(&mut ibag, 0);
        igen.extend_from_slice(&[0u8; 4]);

        let mut shdr = Vec::new();
        for (sample, &start) in self.samples.iter().zip(&sample_starts) {
            push_name(&mut shdr, sample.name);
            push_u32(&mut shdr, start);
            push_u32(&mut shdr, start + sample.frames.len() as u32);
            push_u32(&mut shdr, start + sample.loop_start);
            push_u32(&mut shdr, start + sample.loop_end);
            push_u32(&mut shdr, sample.sample_rate);
            shdr.push(sample.original_key);
            shdr.push(sample.correction as u8);
            push_u16(&mut shdr, sample.link);
            push_u16(&mut shdr, sample.sample_type);
        }
        push_name(&mut shdr, "EOS");
        shdr.extend_from_slice(&[0u8; 26]);

        let info_list = list(
            b"INFO",
            &[
                chunk(b"ifil", &[2, 0, 1, 0]),
                chunk(b"INAM", b"Fixture Bank\0"),
            ],
        );
        let sdta_list = list(b"sdta", &[chunk(b"smpl", &smpl)]);
        let pdta_list = list(
            b"pdta",
            &[
                chunk(b"phdr", &phdr),
                chunk(b"pbag", &pbag),
                chunk(b"pmod", &[0u8; 10]),
                chunk(b"pgen", &pgen),
                chunk(b"inst", &inst),
                chunk(b"ibag", &ibag),
                chunk(b"imod", &[0u8; 10]),
                chunk(b"igen", &igen),
                chunk(b"shdr", &shdr),
            ],
        );

        let mut body = Vec::new();
        body.extend_from_slice(b"sfbk");
        body.extend_from_slice(&info_list);
        body.extend_from_slice(&sdta_list);
        body.extend_from_slice(&pdta_list);

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        push_u32(&mut out, body.len() as u32);
        out.extend_from_slice(&body);
        out
    }

    /// Parse the assembled image into a shareable bank.
    pub fn load(&self) -> Arc<SoundFont2> {
        let bytes = self.build();
        let mut cursor = Cursor::new(bytes);
        let riff = Riff::parse(&mut cursor).expect("fixture image parses");
        Arc::new(SoundFont2::new(&riff, cursor).expect("fixture bank loads"))
    }
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_name(out: &mut Vec<u8>, name: &str) {
    let mut field = [0u8; 20];
    let len = name.len().min(19);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    out.extend_from_slice(&field);
}

fn chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(id);
    push_u32(&mut out, payload.len() as u32);
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn list(kind: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let size: usize = 4 + children.iter().map(Vec::len).sum::<usize>();
    let mut out = Vec::new();
    out.extend_from_slice(b"LIST");
    push_u32(&mut out, size as u32);
    out.extend_from_slice(kind);
    for child in children {
        out.extend_from_slice(child);
    }
    out
}

/// Full-scale 16-bit sine.
pub fn sine_frames(len: usize, frequency: f32, sample_rate: f32) -> Vec<i16> {
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (32767.0 * (TAU * frequency * t).sin()) as i16
        })
        .collect()
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Sign changes over the buffer; a tone at f Hz crosses 2f times a second.
pub fn zero_crossings(samples: &[f32]) -> usize {
    samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count()
}

/// The standard one-preset 440 Hz sine fixture used across scenarios.
/// `extra_split_gens` land on the instrument zone before its sampleID.
pub fn sine_bank(extra_split_gens: &[(u16, u16)]) -> Arc<SoundFont2> {
    let mut builder = BankBuilder::new();
    let sample = builder.sample(SampleDef::mono(
        "sine440",
        sine_frames(44100, 440.0, 44100.0),
        44100,
        69,
    ));
    let mut zone: Zone = vec![(GEN_SAMPLE_MODES, 1)];
    zone.extend_from_slice(extra_split_gens);
    zone.push((GEN_SAMPLE_ID, sample));
    let instrument = builder.instrument("sine", vec![zone]);
    builder.preset("sine", 0, 0, vec![vec![(GEN_INSTRUMENT, instrument)]]);
    builder.load()
}
