//! Resolved zone parameters.
//!
//! A [`Split`] is the articulation of one sample inside an instrument; a
//! [`Layer`] is the additive parameter sheet a preset puts over all splits
//! of one instrument. Both are produced by folding generator runs in
//! [`crate::bank`], and combine at voice-construction time: preset values
//! add onto absolute instrument values.

use std::ops::Add;
use std::sync::Arc;

use crate::hydra::{GenOper, Generator};
use crate::sample::Sample;

/// Loop behavior from the two low bits of `sampleModes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    None,
    /// Loop for the whole voice lifetime.
    Continuous,
    /// Loop while the key is held, then play out the tail.
    Sustain,
}

impl LoopMode {
    pub(crate) fn from_sample_modes(raw: u16) -> LoopMode {
        match raw & 3 {
            1 => LoopMode::Continuous,
            3 => LoopMode::Sustain,
            // 2 is reserved and reads as "no loop"
            _ => LoopMode::None,
        }
    }
}

/// LFO delay/frequency pair, both in timecents/absolute cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfoParams {
    pub delay: i16,
    pub frequency: i16,
}

impl LfoParams {
    /// Instrument-level default: conventional "no delay" sentinel, 8.176 Hz.
    pub(crate) const INSTRUMENT: LfoParams = LfoParams {
        delay: -12000,
        frequency: 0,
    };

    /// Preset-level identity for additive combination.
    pub(crate) const PRESET: LfoParams = LfoParams {
        delay: 0,
        frequency: 0,
    };
}

impl Add for LfoParams {
    type Output = LfoParams;

    fn add(self, rhs: LfoParams) -> LfoParams {
        LfoParams {
            delay: self.delay.saturating_add(rhs.delay),
            frequency: self.frequency.saturating_add(rhs.frequency),
        }
    }
}

/// Six-stage envelope parameters in raw SoundFont units: times in timecents,
/// sustain in centibels (volume) or 0.1% (modulation), key scaling in
/// timecents per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvParams {
    pub delay: i16,
    pub attack: i16,
    pub hold: i16,
    pub decay: i16,
    pub sustain: i16,
    pub release: i16,
    pub keynum_to_hold: i16,
    pub keynum_to_decay: i16,
}

impl EnvParams {
    /// Instrument-level default: every stage instantaneous, full sustain.
    /// Preset-level zones use the all-zero [`Default`] (additive identity).
    pub(crate) const INSTRUMENT: EnvParams = EnvParams {
        delay: -12000,
        attack: -12000,
        hold: -12000,
        decay: -12000,
        sustain: 0,
        release: -12000,
        keynum_to_hold: 0,
        keynum_to_decay: 0,
    };
}

impl Add for EnvParams {
    type Output = EnvParams;

    fn add(self, rhs: EnvParams) -> EnvParams {
        EnvParams {
            delay: self.delay.saturating_add(rhs.delay),
            attack: self.attack.saturating_add(rhs.attack),
            hold: self.hold.saturating_add(rhs.hold),
            decay: self.decay.saturating_add(rhs.decay),
            sustain: self.sustain.saturating_add(rhs.sustain),
            release: self.release.saturating_add(rhs.release),
            keynum_to_hold: self.keynum_to_hold.saturating_add(rhs.keynum_to_hold),
            keynum_to_decay: self.keynum_to_decay.saturating_add(rhs.keynum_to_decay),
        }
    }
}

/// Instrument zone: one sample plus its fully-resolved synthesis parameters
/// for a key/velocity rectangle. Field defaults are the SoundFont generator
/// defaults (absolute values).
#[derive(Debug, Clone)]
pub struct Split {
    pub sample: Option<Arc<Sample>>,
    /// Playback window offsets in frames; coarse generators add in units
    /// of 32768.
    pub start_offset: i32,
    pub end_offset: i32,
    pub loop_start_offset: i32,
    pub loop_end_offset: i32,
    /// Filter cutoff in absolute cents (13500 ≈ 20 kHz: filter open).
    pub filter_freq: i16,
    /// Filter resonance in dB above DC gain.
    pub filter_q: f32,
    /// Effect sends in 0.1% units. Captured but unrouted: no effect bus.
    pub chorus_send: i16,
    pub reverb_send: i16,
    /// Key tracking amount, 1.0 = tempered scale.
    pub scale_tuning: f32,
    /// Root key override; -1 means use the sample's original key.
    pub root_key: i16,
    pub key_low: u8,
    pub key_high: u8,
    pub vel_low: u8,
    pub vel_high: u8,
    /// Fixed key/velocity overrides; -1 means unused.
    pub keynum: i16,
    pub velocity: i16,
    /// Coarse + fine tuning, summed in cents.
    pub tune: i32,
    /// 0 means no exclusive class.
    pub exclusive_class: u16,
    /// -0.5 (hard left) ..= 0.5 (hard right).
    pub pan: f32,
    /// Attenuation below full scale, in dB.
    pub attenuation: f32,
    pub loop_mode: LoopMode,

    pub mod_lfo: LfoParams,
    pub mod_lfo_to_pitch: i16,
    pub mod_lfo_to_filter_fc: i16,
    pub mod_lfo_to_volume: i16,
    pub vib_lfo: LfoParams,
    pub vib_lfo_to_pitch: i16,

    pub mod_env: EnvParams,
    pub mod_env_to_pitch: i16,
    pub mod_env_to_filter_fc: i16,
    pub vol_env: EnvParams,
}

impl Default for Split {
    fn default() -> Self {
        Split {
            sample: None,
            start_offset: 0,
            end_offset: 0,
            loop_start_offset: 0,
            loop_end_offset: 0,
            filter_freq: 13500,
            filter_q: 0.0,
            chorus_send: 0,
            reverb_send: 0,
            scale_tuning: 1.0,
            root_key: -1,
            key_low: 0,
            key_high: 127,
            vel_low: 0,
            vel_high: 127,
            keynum: -1,
            velocity: -1,
            tune: 0,
            exclusive_class: 0,
            pan: 0.0,
            attenuation: 0.0,
            loop_mode: LoopMode::None,
            mod_lfo: LfoParams::INSTRUMENT,
            mod_lfo_to_pitch: 0,
            mod_lfo_to_filter_fc: 0,
            mod_lfo_to_volume: 0,
            vib_lfo: LfoParams::INSTRUMENT,
            vib_lfo_to_pitch: 0,
            mod_env: EnvParams::INSTRUMENT,
            mod_env_to_pitch: 0,
            mod_env_to_filter_fc: 0,
            vol_env: EnvParams::INSTRUMENT,
        }
    }
}

impl Split {
    #[inline]
    pub fn matches(&self, key: u8, velocity: u8) -> bool {
        (self.key_low..=self.key_high).contains(&key)
            && (self.vel_low..=self.vel_high).contains(&velocity)
    }

    /// Fold one instrument generator in. Within a zone, later generators of
    /// the same operator replace earlier ones; address offsets accumulate so
    /// that short and coarse forms combine.
    pub(crate) fn apply(&mut self, gen: &Generator, samples: &[Arc<Sample>]) {
        let Some(oper) = gen.oper else { return };
        let amount = gen.amount;
        match oper {
            GenOper::SampleId => {
                self.sample = samples.get(amount.as_u16() as usize).cloned();
            }
            GenOper::StartAddrsOffset => self.start_offset += i32::from(amount.as_i16()),
            GenOper::StartAddrsCoarseOffset => {
                self.start_offset += i32::from(amount.as_i16()) * 32768
            }
            GenOper::EndAddrsOffset => self.end_offset += i32::from(amount.as_i16()),
            GenOper::EndAddrsCoarseOffset => {
                self.end_offset += i32::from(amount.as_i16()) * 32768
            }
            GenOper::StartloopAddrsOffset => {
                self.loop_start_offset += i32::from(amount.as_i16())
            }
            GenOper::StartloopAddrsCoarseOffset => {
                self.loop_start_offset += i32::from(amount.as_i16()) * 32768
            }
            GenOper::EndloopAddrsOffset => self.loop_end_offset += i32::from(amount.as_i16()),
            GenOper::EndloopAddrsCoarseOffset => {
                self.loop_end_offset += i32::from(amount.as_i16()) * 32768
            }
            GenOper::ModLfoToPitch => self.mod_lfo_to_pitch = amount.as_i16(),
            GenOper::VibLfoToPitch => self.vib_lfo_to_pitch = amount.as_i16(),
            GenOper::ModEnvToPitch => self.mod_env_to_pitch = amount.as_i16(),
            GenOper::InitialFilterFc => self.filter_freq = amount.as_i16(),
            GenOper::InitialFilterQ => self.filter_q = f32::from(amount.as_i16()) / 10.0,
            GenOper::ModLfoToFilterFc => self.mod_lfo_to_filter_fc = amount.as_i16(),
            GenOper::ModEnvToFilterFc => self.mod_env_to_filter_fc = amount.as_i16(),
            GenOper::ModLfoToVolume => self.mod_lfo_to_volume = amount.as_i16(),
            GenOper::ChorusEffectsSend => self.chorus_send = amount.as_i16(),
            GenOper::ReverbEffectsSend => self.reverb_send = amount.as_i16(),
            GenOper::Pan => self.pan = f32::from(amount.as_i16()) / 1000.0,
            GenOper::DelayModLfo => self.mod_lfo.delay = amount.as_i16(),
            GenOper::FreqModLfo => self.mod_lfo.frequency = amount.as_i16(),
            GenOper::DelayVibLfo => self.vib_lfo.delay = amount.as_i16(),
            GenOper::FreqVibLfo => self.vib_lfo.frequency = amount.as_i16(),
            GenOper::DelayModEnv => self.mod_env.delay = amount.as_i16(),
            GenOper::AttackModEnv => self.mod_env.attack = amount.as_i16(),
            GenOper::HoldModEnv => self.mod_env.hold = amount.as_i16(),
            GenOper::DecayModEnv => self.mod_env.decay = amount.as_i16(),
            GenOper::SustainModEnv => self.mod_env.sustain = amount.as_i16(),
            GenOper::ReleaseModEnv => self.mod_env.release = amount.as_i16(),
            GenOper::KeynumToModEnvHold => self.mod_env.keynum_to_hold = amount.as_i16(),
            GenOper::KeynumToModEnvDecay => self.mod_env.keynum_to_decay = amount.as_i16(),
            GenOper::DelayVolEnv => self.vol_env.delay = amount.as_i16(),
            GenOper::AttackVolEnv => self.vol_env.attack = amount.as_i16(),
            GenOper::HoldVolEnv => self.vol_env.hold = amount.as_i16(),
            GenOper::DecayVolEnv => self.vol_env.decay = amount.as_i16(),
            GenOper::SustainVolEnv => self.vol_env.sustain = amount.as_i16(),
            GenOper::ReleaseVolEnv => self.vol_env.release = amount.as_i16(),
            GenOper::KeynumToVolEnvHold => self.vol_env.keynum_to_hold = amount.as_i16(),
            GenOper::KeynumToVolEnvDecay => self.vol_env.keynum_to_decay = amount.as_i16(),
            GenOper::KeyRange => (self.key_low, self.key_high) = amount.as_range(),
            GenOper::VelRange => (self.vel_low, self.vel_high) = amount.as_range(),
            GenOper::Keynum => self.keynum = amount.as_i16(),
            GenOper::Velocity => self.velocity = amount.as_i16(),
            GenOper::InitialAttenuation => {
                self.attenuation = f32::from(amount.as_i16()) / 10.0
            }
            GenOper::CoarseTune => self.tune += i32::from(amount.as_i16()) * 100,
            GenOper::FineTune => self.tune += i32::from(amount.as_i16()),
            GenOper::SampleModes => {
                self.loop_mode = LoopMode::from_sample_modes(amount.as_u16())
            }
            GenOper::ScaleTuning => self.scale_tuning = f32::from(amount.as_i16()) / 100.0,
            GenOper::ExclusiveClass => self.exclusive_class = amount.as_u16(),
            GenOper::OverridingRootKey => self.root_key = amount.as_i16(),
            GenOper::Instrument => {}
        }
    }
}

/// Preset zone: an additive parameter sheet over one instrument. Every value
/// defaults to the additive identity, and envelope times default to zero
/// rather than the instantaneous sentinel.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Index into the bank's instrument list.
    pub instrument: usize,
    pub filter_freq: i16,
    pub filter_q: f32,
    pub chorus_send: i16,
    pub reverb_send: i16,
    pub scale_tuning: f32,
    pub key_low: u8,
    pub key_high: u8,
    pub vel_low: u8,
    pub vel_high: u8,
    pub tune: i32,
    pub pan: f32,
    pub attenuation: f32,

    pub mod_lfo: LfoParams,
    pub mod_lfo_to_pitch: i16,
    pub mod_lfo_to_filter_fc: i16,
    pub mod_lfo_to_volume: i16,
    pub vib_lfo: LfoParams,
    pub vib_lfo_to_pitch: i16,

    pub mod_env: EnvParams,
    pub mod_env_to_pitch: i16,
    pub mod_env_to_filter_fc: i16,
    pub vol_env: EnvParams,
}

impl Default for Layer {
    fn default() -> Self {
        Layer {
            instrument: usize::MAX,
            filter_freq: 0,
            filter_q: 0.0,
            chorus_send: 0,
            reverb_send: 0,
            scale_tuning: 0.0,
            key_low: 0,
            key_high: 127,
            vel_low: 0,
            vel_high: 127,
            tune: 0,
            pan: 0.0,
            attenuation: 0.0,
            mod_lfo: LfoParams::PRESET,
            mod_lfo_to_pitch: 0,
            mod_lfo_to_filter_fc: 0,
            mod_lfo_to_volume: 0,
            vib_lfo: LfoParams::PRESET,
            vib_lfo_to_pitch: 0,
            mod_env: EnvParams::default(),
            mod_env_to_pitch: 0,
            mod_env_to_filter_fc: 0,
            vol_env: EnvParams::default(),
        }
    }
}

impl Layer {
    #[inline]
    pub fn matches(&self, key: u8, velocity: u8) -> bool {
        (self.key_low..=self.key_high).contains(&key)
            && (self.vel_low..=self.vel_high).contains(&velocity)
    }

    /// Fold one preset generator in. Returns the instrument index when the
    /// generator is the terminal `instrument` reference.
    pub(crate) fn apply(&mut self, gen: &Generator) -> Option<usize> {
        let Some(oper) = gen.oper else { return None };
        let amount = gen.amount;
        match oper {
            GenOper::Instrument => {
                self.instrument = amount.as_u16() as usize;
                return Some(self.instrument);
            }
            GenOper::ModLfoToPitch => self.mod_lfo_to_pitch = amount.as_i16(),
            GenOper::VibLfoToPitch => self.vib_lfo_to_pitch = amount.as_i16(),
            GenOper::ModEnvToPitch => self.mod_env_to_pitch = amount.as_i16(),
            GenOper::InitialFilterFc => self.filter_freq = amount.as_i16(),
            GenOper::InitialFilterQ => self.filter_q = f32::from(amount.as_i16()) / 10.0,
            GenOper::ModLfoToFilterFc => self.mod_lfo_to_filter_fc = amount.as_i16(),
            GenOper::ModEnvToFilterFc => self.mod_env_to_filter_fc = amount.as_i16(),
            GenOper::ModLfoToVolume => self.mod_lfo_to_volume = amount.as_i16(),
            GenOper::ChorusEffectsSend => self.chorus_send = amount.as_i16(),
            GenOper::ReverbEffectsSend => self.reverb_send = amount.as_i16(),
            GenOper::Pan => self.pan = f32::from(amount.as_i16()) / 1000.0,
            GenOper::DelayModLfo => self.mod_lfo.delay = amount.as_i16(),
            GenOper::FreqModLfo => self.mod_lfo.frequency = amount.as_i16(),
            GenOper::DelayVibLfo => self.vib_lfo.delay = amount.as_i16(),
            GenOper::FreqVibLfo => self.vib_lfo.frequency = amount.as_i16(),
            GenOper::DelayModEnv => self.mod_env.delay = amount.as_i16(),
            GenOper::AttackModEnv => self.mod_env.attack = amount.as_i16(),
            GenOper::HoldModEnv => self.mod_env.hold = amount.as_i16(),
            GenOper::DecayModEnv => self.mod_env.decay = amount.as_i16(),
            GenOper::SustainModEnv => self.mod_env.sustain = amount.as_i16(),
            GenOper::ReleaseModEnv => self.mod_env.release = amount.as_i16(),
            GenOper::KeynumToModEnvHold => self.mod_env.keynum_to_hold = amount.as_i16(),
            GenOper::KeynumToModEnvDecay => self.mod_env.keynum_to_decay = amount.as_i16(),
            GenOper::DelayVolEnv => self.vol_env.delay = amount.as_i16(),
            GenOper::AttackVolEnv => self.vol_env.attack = amount.as_i16(),
            GenOper::HoldVolEnv => self.vol_env.hold = amount.as_i16(),
            GenOper::DecayVolEnv => self.vol_env.decay = amount.as_i16(),
            GenOper::SustainVolEnv => self.vol_env.sustain = amount.as_i16(),
            GenOper::ReleaseVolEnv => self.vol_env.release = amount.as_i16(),
            GenOper::KeynumToVolEnvHold => self.vol_env.keynum_to_hold = amount.as_i16(),
            GenOper::KeynumToVolEnvDecay => self.vol_env.keynum_to_decay = amount.as_i16(),
            GenOper::KeyRange => (self.key_low, self.key_high) = amount.as_range(),
            GenOper::VelRange => (self.vel_low, self.vel_high) = amount.as_range(),
            GenOper::InitialAttenuation => {
                self.attenuation = f32::from(amount.as_i16()) / 10.0
            }
            GenOper::CoarseTune => self.tune += i32::from(amount.as_i16()) * 100,
            GenOper::FineTune => self.tune += i32::from(amount.as_i16()),
            GenOper::ScaleTuning => self.scale_tuning = f32::from(amount.as_i16()) / 100.0,
            // Sample-level operators have no meaning at the preset level.
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydra::GenAmount;

    fn gen(oper: GenOper, amount: u16) -> Generator {
        Generator {
            oper: Some(oper),
            raw_oper: 0,
            amount: GenAmount(amount),
        }
    }

    #[test]
    fn test_loop_mode_decoding() {
        assert_eq!(LoopMode::from_sample_modes(0), LoopMode::None);
        assert_eq!(LoopMode::from_sample_modes(1), LoopMode::Continuous);
        assert_eq!(LoopMode::from_sample_modes(2), LoopMode::None);
        assert_eq!(LoopMode::from_sample_modes(3), LoopMode::Sustain);
        // only the two low bits participate
        assert_eq!(LoopMode::from_sample_modes(0xFFFD), LoopMode::Continuous);
    }

    #[test]
    fn test_split_defaults() {
        let split = Split::default();
        assert_eq!(split.filter_freq, 13500);
        assert_eq!(split.root_key, -1);
        assert_eq!(split.keynum, -1);
        assert_eq!(split.vol_env.attack, -12000);
        assert_eq!(split.vol_env.sustain, 0);
        assert!((split.scale_tuning - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_address_offsets_accumulate() {
        let mut split = Split::default();
        split.apply(&gen(GenOper::StartAddrsOffset, 3), &[]);
        split.apply(&gen(GenOper::StartAddrsCoarseOffset, 2), &[]);
        assert_eq!(split.start_offset, 3 + 2 * 32768);
    }

    #[test]
    fn test_tune_sums_coarse_and_fine() {
        let mut split = Split::default();
        split.apply(&gen(GenOper::CoarseTune, 2), &[]);
        split.apply(&gen(GenOper::FineTune, (-5i16) as u16), &[]);
        assert_eq!(split.tune, 195);
    }

    #[test]
    fn test_same_oper_replaces() {
        let mut split = Split::default();
        split.apply(&gen(GenOper::Pan, 500), &[]);
        split.apply(&gen(GenOper::Pan, (-250i16) as u16), &[]);
        assert!((split.pan + 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_key_range_unpacks_bytes() {
        let mut split = Split::default();
        split.apply(&gen(GenOper::KeyRange, u16::from_le_bytes([40, 80])), &[]);
        assert_eq!((split.key_low, split.key_high), (40, 80));
        assert!(split.matches(60, 64));
        assert!(!split.matches(81, 64));
    }

    #[test]
    fn test_layer_reports_instrument() {
        let mut layer = Layer::default();
        assert_eq!(layer.apply(&gen(GenOper::Pan, 100)), None);
        assert_eq!(layer.apply(&gen(GenOper::Instrument, 7)), Some(7));
        assert_eq!(layer.instrument, 7);
    }

    #[test]
    fn test_env_params_add_componentwise() {
        let a = EnvParams {
            attack: -7973,
            sustain: 100,
            ..EnvParams::default()
        };
        let b = EnvParams {
            attack: 1200,
            sustain: 20,
            ..EnvParams::default()
        };
        let sum = a + b;
        assert_eq!(sum.attack, -6773);
        assert_eq!(sum.sustain, 120);
    }
}
