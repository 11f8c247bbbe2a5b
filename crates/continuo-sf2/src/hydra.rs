//! Raw HYDRA records.
//!
//! The pdta LIST holds nine parallel arrays that encode the
//! preset → instrument → sample hierarchy by index. Each array ends with a
//! terminal sentinel record whose indices delimit the previous record's
//! range; the sentinels are kept here and skipped by the bank translation.

use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;
use crate::font::PdtaChunks;

/// Generator operator, SoundFont 2 §8.1.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenOper {
    StartAddrsOffset,
    EndAddrsOffset,
    StartloopAddrsOffset,
    EndloopAddrsOffset,
    StartAddrsCoarseOffset,
    ModLfoToPitch,
    VibLfoToPitch,
    ModEnvToPitch,
    InitialFilterFc,
    InitialFilterQ,
    ModLfoToFilterFc,
    ModEnvToFilterFc,
    EndAddrsCoarseOffset,
    ModLfoToVolume,
    ChorusEffectsSend,
    ReverbEffectsSend,
    Pan,
    DelayModLfo,
    FreqModLfo,
    DelayVibLfo,
    FreqVibLfo,
    DelayModEnv,
    AttackModEnv,
    HoldModEnv,
    DecayModEnv,
    SustainModEnv,
    ReleaseModEnv,
    KeynumToModEnvHold,
    KeynumToModEnvDecay,
    DelayVolEnv,
    AttackVolEnv,
    HoldVolEnv,
    DecayVolEnv,
    SustainVolEnv,
    ReleaseVolEnv,
    KeynumToVolEnvHold,
    KeynumToVolEnvDecay,
    Instrument,
    KeyRange,
    VelRange,
    StartloopAddrsCoarseOffset,
    Keynum,
    Velocity,
    InitialAttenuation,
    EndloopAddrsCoarseOffset,
    CoarseTune,
    FineTune,
    SampleId,
    SampleModes,
    ScaleTuning,
    ExclusiveClass,
    OverridingRootKey,
}

impl GenOper {
    /// Decode a raw operator number. Unused and reserved operators come back
    /// as `None` and are ignored downstream, as the format requires.
    pub fn from_raw(raw: u16) -> Option<GenOper> {
        use GenOper::*;
        Some(match raw {
            0 => StartAddrsOffset,
            1 => EndAddrsOffset,
            2 => StartloopAddrsOffset,
            3 => EndloopAddrsOffset,
            4 => StartAddrsCoarseOffset,
            5 => ModLfoToPitch,
            6 => VibLfoToPitch,
            7 => ModEnvToPitch,
            8 => InitialFilterFc,
            9 => InitialFilterQ,
            10 => ModLfoToFilterFc,
            11 => ModEnvToFilterFc,
            12 => EndAddrsCoarseOffset,
            13 => ModLfoToVolume,
            15 => ChorusEffectsSend,
            16 => ReverbEffectsSend,
            17 => Pan,
            21 => DelayModLfo,
            22 => FreqModLfo,
            23 => DelayVibLfo,
            24 => FreqVibLfo,
            25 => DelayModEnv,
            26 => AttackModEnv,
            27 => HoldModEnv,
            28 => DecayModEnv,
            29 => SustainModEnv,
            30 => ReleaseModEnv,
            31 => KeynumToModEnvHold,
            32 => KeynumToModEnvDecay,
            33 => DelayVolEnv,
            34 => AttackVolEnv,
            35 => HoldVolEnv,
            36 => DecayVolEnv,
            37 => SustainVolEnv,
            38 => ReleaseVolEnv,
            39 => KeynumToVolEnvHold,
            40 => KeynumToVolEnvDecay,
            41 => Instrument,
            43 => KeyRange,
            44 => VelRange,
            45 => StartloopAddrsCoarseOffset,
            46 => Keynum,
            47 => Velocity,
            48 => InitialAttenuation,
            50 => EndloopAddrsCoarseOffset,
            51 => CoarseTune,
            52 => FineTune,
            53 => SampleId,
            54 => SampleModes,
            56 => ScaleTuning,
            57 => ExclusiveClass,
            58 => OverridingRootKey,
            _ => return None,
        })
    }
}

/// Generator amount: a 16-bit value read as signed, unsigned, or a byte pair
/// depending on the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenAmount(pub u16);

impl GenAmount {
    #[inline]
    pub fn as_i16(self) -> i16 {
        self.0 as i16
    }

    #[inline]
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// (low, high) byte pair for `KeyRange`/`VelRange`.
    #[inline]
    pub fn as_range(self) -> (u8, u8) {
        let [lo, hi] = self.0.to_le_bytes();
        (lo, hi)
    }
}

/// One pgen/igen record. `oper` is `None` for operators this implementation
/// does not recognize.
#[derive(Debug, Clone, Copy)]
pub struct Generator {
    pub oper: Option<GenOper>,
    pub raw_oper: u16,
    pub amount: GenAmount,
}

#[derive(Debug, Clone)]
pub struct PresetHeader {
    pub name: String,
    pub preset: u16,
    pub bank: u16,
    pub bag_index: u16,
    pub library: u32,
    pub genre: u32,
    pub morphology: u32,
}

/// One pbag/ibag record: indices of the first generator and modulator of a
/// zone. The next record's indices delimit the zone.
#[derive(Debug, Clone, Copy)]
pub struct Bag {
    pub gen_index: u16,
    pub mod_index: u16,
}

/// One pmod/imod record. Modulator routing is not implemented; the records
/// are decoded so the arrays validate and stay available to callers.
#[derive(Debug, Clone, Copy)]
pub struct Modulator {
    pub src: u16,
    pub dest: u16,
    pub amount: i16,
    pub amount_src: u16,
    pub transform: u16,
}

#[derive(Debug, Clone)]
pub struct InstrumentHeader {
    pub name: String,
    pub bag_index: u16,
}

#[derive(Debug, Clone)]
pub struct SampleHeader {
    pub name: String,
    pub start: u32,
    pub end: u32,
    pub loop_start: u32,
    pub loop_end: u32,
    pub sample_rate: u32,
    pub original_key: u8,
    pub correction: i8,
    pub link: u16,
    pub sample_type: u16,
}

/// The nine parsed arrays.
#[derive(Debug, Default)]
pub struct Hydra {
    pub phdr: Vec<PresetHeader>,
    pub pbag: Vec<Bag>,
    pub pmod: Vec<Modulator>,
    pub pgen: Vec<Generator>,
    pub inst: Vec<InstrumentHeader>,
    pub ibag: Vec<Bag>,
    pub imod: Vec<Modulator>,
    pub igen: Vec<Generator>,
    pub shdr: Vec<SampleHeader>,
}

impl Hydra {
    pub(crate) fn read<R: Read + Seek>(reader: &mut R, pdta: &PdtaChunks<'_>) -> Result<Hydra> {
        let mut hydra = Hydra::default();

        reader.seek(SeekFrom::Start(pdta.phdr.data_offset))?;
        for _ in 0..pdta.phdr.size / 38 {
            hydra.phdr.push(PresetHeader {
                name: read_name(reader)?,
                preset: read_u16(reader)?,
                bank: read_u16(reader)?,
                bag_index: read_u16(reader)?,
                library: read_u32(reader)?,
                genre: read_u32(reader)?,
                morphology: read_u32(reader)?,
            });
        }

        reader.seek(SeekFrom::Start(pdta.pbag.data_offset))?;
        for _ in 0..pdta.pbag.size / 4 {
            hydra.pbag.push(read_bag(reader)?);
        }

        reader.seek(SeekFrom::Start(pdta.pmod.data_offset))?;
        for _ in 0..pdta.pmod.size / 10 {
            hydra.pmod.push(read_modulator(reader)?);
        }

        reader.seek(SeekFrom::Start(pdta.pgen.data_offset))?;
        for _ in 0..pdta.pgen.size / 4 {
            hydra.pgen.push(read_generator(reader)?);
        }

        reader.seek(SeekFrom::Start(pdta.inst.data_offset))?;
        for _ in 0..pdta.inst.size / 22 {
            hydra.inst.push(InstrumentHeader {
                name: read_name(reader)?,
                bag_index: read_u16(reader)?,
            });
        }

        reader.seek(SeekFrom::Start(pdta.ibag.data_offset))?;
        for _ in 0..pdta.ibag.size / 4 {
            hydra.ibag.push(read_bag(reader)?);
        }

        reader.seek(SeekFrom::Start(pdta.imod.data_offset))?;
        for _ in 0..pdta.imod.size / 10 {
            hydra.imod.push(read_modulator(reader)?);
        }

        reader.seek(SeekFrom::Start(pdta.igen.data_offset))?;
        for _ in 0..pdta.igen.size / 4 {
            hydra.igen.push(read_generator(reader)?);
        }

        reader.seek(SeekFrom::Start(pdta.shdr.data_offset))?;
        for _ in 0..pdta.shdr.size / 46 {
            hydra.shdr.push(SampleHeader {
                name: read_name(reader)?,
                start: read_u32(reader)?,
                end: read_u32(reader)?,
                loop_start: read_u32(reader)?,
                loop_end: read_u32(reader)?,
                sample_rate: read_u32(reader)?,
                original_key: read_u8(reader)?,
                correction: read_u8(reader)? as i8,
                link: read_u16(reader)?,
                sample_type: read_u16(reader)?,
            });
        }

        Ok(hydra)
    }
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_i16<R: Read>(reader: &mut R) -> Result<i16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// 20-byte name field. Some editors fail to NUL-terminate these, so byte 19
/// is forced to NUL before decoding.
fn read_name<R: Read>(reader: &mut R) -> Result<String> {
    let mut buf = [0u8; 20];
    reader.read_exact(&mut buf)?;
    buf[19] = 0;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

fn read_bag<R: Read>(reader: &mut R) -> Result<Bag> {
    Ok(Bag {
        gen_index: read_u16(reader)?,
        mod_index: read_u16(reader)?,
    })
}

fn read_modulator<R: Read>(reader: &mut R) -> Result<Modulator> {
    Ok(Modulator {
        src: read_u16(reader)?,
        dest: read_u16(reader)?,
        amount: read_i16(reader)?,
        amount_src: read_u16(reader)?,
        transform: read_u16(reader)?,
    })
}

fn read_generator<R: Read>(reader: &mut R) -> Result<Generator> {
    let raw_oper = read_u16(reader)?;
    let amount = GenAmount(read_u16(reader)?);
    Ok(Generator {
        oper: GenOper::from_raw(raw_oper),
        raw_oper,
        amount,
    })
}
