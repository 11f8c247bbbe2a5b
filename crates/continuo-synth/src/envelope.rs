//! Six-stage envelope generator.
//!
//! Both envelopes of a voice share this state machine; the volume envelope
//! runs in decibels (its linear-amplitude attack is convex) and the
//! modulation envelope runs in a linear 0..1 domain. The domain is selected
//! at compile time through a marker type so the per-sample path has no
//! dispatch.

use std::marker::PhantomData;

use continuo_sf2::EnvParams;

use crate::math::{gain_to_decibels, lerp, timecents_to_seconds};

/// Envelope stages in order. Phases only ever advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Delay,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
    End,
}

mod sealed {
    pub trait Sealed {}
}

/// Envelope output domain.
pub trait Mode: sealed::Sealed + 'static {
    /// Value emitted before attack and after end.
    const FLOOR: f32;

    fn sustain_level(raw: i16) -> f32;
    fn attack(t: f32) -> f32;
    fn peak() -> f32;
    fn decay(sustain: f32, t: f32) -> f32;
    fn sustain(sustain: f32) -> f32;
    fn release(from: f32, t: f32) -> f32;
}

/// Decibel domain: 0 dB peak, -96 dB floor, sustain as attenuation.
#[derive(Debug, Clone, Copy)]
pub enum Decibels {}

impl sealed::Sealed for Decibels {}

impl Mode for Decibels {
    const FLOOR: f32 = -96.0;

    #[inline]
    fn sustain_level(raw: i16) -> f32 {
        // centibels of attenuation below peak
        f32::from(raw) * 0.1
    }

    #[inline]
    fn attack(t: f32) -> f32 {
        // linear in amplitude, convex in dB
        gain_to_decibels(t)
    }

    #[inline]
    fn peak() -> f32 {
        0.0
    }

    #[inline]
    fn decay(sustain: f32, t: f32) -> f32 {
        -sustain * t
    }

    #[inline]
    fn sustain(sustain: f32) -> f32 {
        -sustain
    }

    #[inline]
    fn release(from: f32, t: f32) -> f32 {
        lerp(from, -96.0, t)
    }
}

/// Linear domain: 1.0 peak, 0.0 floor, sustain in 0.1% units of full scale.
#[derive(Debug, Clone, Copy)]
pub enum Linear {}

impl sealed::Sealed for Linear {}

impl Mode for Linear {
    const FLOOR: f32 = 0.0;

    #[inline]
    fn sustain_level(raw: i16) -> f32 {
        1.0 - f32::from(raw) * 0.001
    }

    #[inline]
    fn attack(t: f32) -> f32 {
        t
    }

    #[inline]
    fn peak() -> f32 {
        1.0
    }

    #[inline]
    fn decay(sustain: f32, t: f32) -> f32 {
        lerp(1.0, sustain, t)
    }

    #[inline]
    fn sustain(sustain: f32) -> f32 {
        sustain
    }

    #[inline]
    fn release(from: f32, t: f32) -> f32 {
        lerp(from, 0.0, t)
    }
}

/// One envelope instance, parameterized on its output domain.
#[derive(Debug, Clone)]
pub struct Envelope<M: Mode> {
    delay: f32,
    attack: f32,
    hold: f32,
    decay: f32,
    sustain: f32,
    release: f32,
    phase: Phase,
    time: f64,
    value: f32,
    _mode: PhantomData<M>,
}

impl<M: Mode> Envelope<M> {
    /// Build from summed (preset + instrument) parameters. `hold` and
    /// `decay` are key-scaled: an octave above key 60 halves them when the
    /// keynum generators are 100.
    pub fn new(params: EnvParams, key: u8) -> Envelope<M> {
        let key_delta = 60.0 - f32::from(key);
        let hold = timecents_to_seconds(f32::from(params.hold))
            * timecents_to_seconds(f32::from(params.keynum_to_hold) * key_delta);
        let decay = timecents_to_seconds(f32::from(params.decay))
            * timecents_to_seconds(f32::from(params.keynum_to_decay) * key_delta);
        Envelope {
            delay: timecents_to_seconds(f32::from(params.delay)),
            attack: timecents_to_seconds(f32::from(params.attack)),
            hold,
            decay,
            sustain: M::sustain_level(params.sustain),
            release: timecents_to_seconds(f32::from(params.release)),
            phase: Phase::Delay,
            time: 0.0,
            value: M::FLOOR,
            _mode: PhantomData,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Release stage duration in seconds.
    pub fn release_time(&self) -> f32 {
        self.release
    }

    /// Advance by `dt` seconds and return the current level. Phase-time
    /// overshoot carries into the next phase.
    #[inline]
    pub fn tick(&mut self, dt: f64) -> f32 {
        match self.phase {
            Phase::Delay => {
                self.time += dt;
                if self.time >= f64::from(self.delay) {
                    self.time -= f64::from(self.delay);
                    self.phase = Phase::Attack;
                }
                M::FLOOR
            }
            Phase::Attack => {
                let value = M::attack((self.time / f64::from(self.attack)) as f32);
                self.value = value;
                self.time += dt;
                if self.time >= f64::from(self.attack) {
                    self.time -= f64::from(self.attack);
                    self.phase = Phase::Hold;
                }
                value
            }
            Phase::Hold => {
                self.value = M::peak();
                self.time += dt;
                if self.time >= f64::from(self.hold) {
                    self.time -= f64::from(self.hold);
                    self.phase = Phase::Decay;
                }
                M::peak()
            }
            Phase::Decay => {
                let value = M::decay(self.sustain, (self.time / f64::from(self.decay)) as f32);
                self.value = value;
                self.time += dt;
                if self.time >= f64::from(self.decay) {
                    self.time -= f64::from(self.decay);
                    self.phase = Phase::Sustain;
                }
                value
            }
            Phase::Sustain => M::sustain(self.sustain),
            Phase::Release => {
                let value = M::release(self.value, (self.time / f64::from(self.release)) as f32);
                self.time += dt;
                if self.time >= f64::from(self.release) {
                    self.time -= f64::from(self.release);
                    self.phase = Phase::End;
                }
                value
            }
            Phase::End => M::FLOOR,
        }
    }

    /// Enter the release stage, ramping down from the current level.
    pub fn release(&mut self) {
        if self.phase == Phase::Sustain {
            self.value = M::sustain(self.sustain);
        }
        self.phase = Phase::Release;
        self.time = 0.0;
    }

    /// Release with the ramp shortened to one millisecond; used by
    /// exclusive-class cutoff to extinguish a voice quickly.
    pub fn fast_release(&mut self) {
        self.release();
        self.release = 0.001;
    }

    /// Force the envelope to its terminal stage.
    pub fn finish(&mut self) {
        self.phase = Phase::End;
    }
}
