//! Per-voice low-frequency oscillator.
//!
//! Triangle wave in [-1, 1], silent until its delay has elapsed. The
//! SoundFont LFOs ramp up from zero, so the triangle is phased to start at
//! zero and rise.

use continuo_sf2::LfoParams;

use crate::math::{cents_to_hertz, timecents_to_seconds};

/// Frequency of MIDI key 0, used to anchor absolute-cent frequencies.
pub(crate) const KEY_0_HZ: f32 = 8.176;

#[derive(Debug, Clone)]
pub struct VoiceLfo {
    time: f32,
    freq: f32,
    delay: f32,
}

impl VoiceLfo {
    /// Build from summed (preset + instrument) parameters.
    pub fn new(params: LfoParams) -> VoiceLfo {
        VoiceLfo {
            time: 0.0,
            freq: KEY_0_HZ * cents_to_hertz(f32::from(params.frequency)),
            delay: timecents_to_seconds(f32::from(params.delay)),
        }
    }

    pub fn frequency(&self) -> f32 {
        self.freq
    }

    /// Advance by `dt` seconds and return the current value.
    #[inline]
    pub fn tick(&mut self, dt: f32) -> f32 {
        self.time += dt;
        if self.time < self.delay {
            return 0.0;
        }
        ((4.0 * self.freq * (self.time - self.delay) + 3.0) % 4.0 - 2.0).abs() - 1.0
    }
}
