//! Second-order resonant low-pass filter.
//!
//! Transposed direct-form topology with two state variables per voice.
//! Coefficients depend on the normalized cutoff (cutoff_hz / sample_rate)
//! and inverse Q, and are recomputed only when the cutoff moves.

use std::f32::consts::PI;

#[derive(Debug, Clone, Default)]
pub struct BiquadLowpass {
    inv_q: f32,
    a0: f32,
    a1: f32,
    b1: f32,
    b2: f32,
    z1: f32,
    z2: f32,
}

impl BiquadLowpass {
    pub fn new() -> BiquadLowpass {
        BiquadLowpass::default()
    }

    /// Q is linear (already converted from resonance decibels).
    #[inline]
    pub fn set_q(&mut self, q: f32) {
        self.inv_q = 1.0 / q;
    }

    /// `fc` is the cutoff normalized by the sample rate, in (0, 0.5).
    #[inline]
    pub fn set_frequency(&mut self, fc: f32) {
        let k = (PI * fc).tan();
        let kk = k * k;
        let norm = 1.0 / (1.0 + k * self.inv_q + kk);
        self.a0 = kk * norm;
        self.a1 = 2.0 * self.a0;
        self.b1 = 2.0 * (kk - 1.0) * norm;
        self.b2 = (1.0 - k * self.inv_q + kk) * norm;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = input * self.a0 + self.z1;
        self.z1 = input * self.a1 + self.z2 - self.b1 * output;
        self.z2 = input * self.a0 - self.b2 * output;
        output
    }
}
