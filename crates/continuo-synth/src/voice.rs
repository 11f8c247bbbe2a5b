//! One sounding note.
//!
//! A voice flattens a preset layer and an instrument split into final
//! floating-point parameters at note-on, then renders additively into the
//! caller's buffers: wavetable oscillator with linear interpolation and
//! looping, two envelopes, two LFOs, and a resonant low-pass. The render
//! path never allocates and never fails; anything out of range simply ends
//! the voice.

use std::sync::Arc;

use continuo_sf2::{Layer, LoopMode, Sample, SampleLink, Split};

use crate::envelope::{Decibels, Envelope, Linear, Phase};
use crate::filter::BiquadLowpass;
use crate::lfo::{VoiceLfo, KEY_0_HZ};
use crate::math::{
    cents_to_hertz, clamp_panning, constant_power_pan, decibels_to_gain, lerp,
};

/// Cutoff ceiling as a fraction of the sample rate. The format allows up to
/// 20 kHz, but a biquad goes unstable as the normalized cutoff approaches
/// Nyquist, so the ceiling tracks the rate instead.
const MAX_CUTOFF_FRACTION: f32 = 0.4977;

/// Volume-envelope gain below which a releasing voice is ended early.
const RELEASE_SILENCE_GAIN: f32 = 0.002;

/// Voice-construction tunables.
#[derive(Debug, Clone, Copy)]
pub struct VoiceOptions {
    /// Scale the summed attenuation generators by 0.4 before converting to
    /// gain. Off-spec, but it matches E-MU hardware and the loudness most
    /// real-world banks were authored against.
    pub emu_attenuation: bool,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        VoiceOptions {
            emu_attenuation: true,
        }
    }
}

pub struct Voice {
    key: u8,
    exclusive_class: u16,
    loop_mode: LoopMode,

    data: Arc<[f32]>,
    sample_pos: f64,
    /// One past the last playable frame, bounded by the data length.
    sample_end: usize,
    loop_start: usize,
    loop_end: usize,
    /// True from note-on until note-off (or sustain release).
    hold: bool,

    pan_l: f32,
    pan_r: f32,
    /// Base playback rate in frames per second of source material.
    freq: f32,
    gain: f32,

    filter_active: bool,
    filter_freq: f32,
    last_cutoff: f32,
    lowpass: BiquadLowpass,

    mod_env_to_pitch: f32,
    mod_env_to_filter: f32,
    mod_lfo_to_pitch: f32,
    mod_lfo_to_filter: f32,
    mod_lfo_to_volume: f32,
    vib_lfo_to_pitch: f32,

    vol_env: Envelope<Decibels>,
    mod_env: Envelope<Linear>,
    mod_lfo: VoiceLfo,
    vib_lfo: VoiceLfo,
}

impl Voice {
    /// Resolve a (layer, split, sample) triple into a playable voice.
    ///
    /// `key` is the played key (it drives envelope key-scaling and note-off
    /// matching follows the effective key); `eff_key`/`eff_velocity` have
    /// any fixed-key/fixed-velocity overrides applied. Returns `None` when
    /// the sample has no decoded data.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        layer: &Layer,
        split: &Split,
        sample: &Arc<Sample>,
        key: u8,
        eff_key: u8,
        eff_velocity: u8,
        sample_rate: f32,
        options: VoiceOptions,
    ) -> Option<Voice> {
        let data = sample.data()?.clone();
        if data.is_empty() {
            return None;
        }
        let len = data.len();

        let sample_end = (len as i64 + i64::from(split.end_offset)).clamp(0, len as i64) as usize;
        let loop_start = (i64::from(sample.loop_start) + i64::from(split.loop_start_offset))
            .clamp(0, len as i64 - 1) as usize;
        // An inverted loop window degenerates to zero length rather than
        // wrapping the position backwards.
        let loop_end = ((i64::from(sample.loop_end) + i64::from(split.loop_end_offset))
            .clamp(0, len as i64) as usize)
            .max(loop_start);

        let vol_env = Envelope::new(layer.vol_env + split.vol_env, key);
        let mod_env = Envelope::new(layer.mod_env + split.mod_env, key);

        let filter_q = layer.filter_q + split.filter_q;
        let filter_freq =
            KEY_0_HZ * cents_to_hertz(f32::from(layer.filter_freq) + f32::from(split.filter_freq));
        let mod_env_to_filter =
            f32::from(layer.mod_env_to_filter_fc) + f32::from(split.mod_env_to_filter_fc);
        let filter_active =
            !(filter_freq > 20000.0 && filter_q < 0.0 && mod_env_to_filter == 0.0);
        let mut lowpass = BiquadLowpass::new();
        let initial_cutoff = filter_freq.min(MAX_CUTOFF_FRACTION * sample_rate);
        if filter_active {
            lowpass.set_q(decibels_to_gain(filter_q));
            lowpass.set_frequency(initial_cutoff / sample_rate);
        }

        let attenuation = layer.attenuation + split.attenuation;
        let attenuation_scale = if options.emu_attenuation { 0.4 } else { 1.0 };
        let gain = decibels_to_gain(-attenuation * attenuation_scale)
            * f32::from(eff_velocity) / 127.0;

        let base_pan = match sample.link {
            SampleLink::Left => -0.5,
            SampleLink::Right => 0.5,
            SampleLink::Mono | SampleLink::Linked => 0.0,
        };
        let (pan_l, pan_r) =
            constant_power_pan(clamp_panning(base_pan + layer.pan + split.pan));

        // Pitch: key tracking is scaled around the root key, so a scale
        // tuning of zero plays every key at the root pitch.
        let root_key = if split.root_key >= 0 {
            split.root_key
        } else {
            i16::from(sample.original_key)
        };
        let root_cents = f32::from(root_key) * 100.0;
        let note_cents =
            f32::from(eff_key) * 100.0 + split.tune as f32 + layer.tune as f32;
        let scale = split.scale_tuning + layer.scale_tuning;
        let mut freq = (sample.sample_rate as f32 / cents_to_hertz(root_cents))
            * cents_to_hertz(root_cents + (note_cents - root_cents) * scale);
        if sample.correction != 0 {
            freq *= cents_to_hertz(f32::from(sample.correction));
        }

        Some(Voice {
            key: eff_key,
            exclusive_class: split.exclusive_class,
            loop_mode: split.loop_mode,
            data,
            sample_pos: f64::from(split.start_offset.max(0)),
            sample_end,
            loop_start,
            loop_end,
            hold: true,
            pan_l,
            pan_r,
            freq,
            gain,
            filter_active,
            filter_freq,
            last_cutoff: initial_cutoff,
            lowpass,
            mod_env_to_pitch: f32::from(layer.mod_env_to_pitch)
                + f32::from(split.mod_env_to_pitch),
            mod_env_to_filter,
            mod_lfo_to_pitch: f32::from(layer.mod_lfo_to_pitch)
                + f32::from(split.mod_lfo_to_pitch),
            mod_lfo_to_filter: f32::from(layer.mod_lfo_to_filter_fc)
                + f32::from(split.mod_lfo_to_filter_fc),
            // routing amount is centibels
            mod_lfo_to_volume: (f32::from(layer.mod_lfo_to_volume)
                + f32::from(split.mod_lfo_to_volume))
                / 10.0,
            vib_lfo_to_pitch: f32::from(layer.vib_lfo_to_pitch)
                + f32::from(split.vib_lfo_to_pitch),
            vol_env,
            mod_env,
            mod_lfo: VoiceLfo::new(layer.mod_lfo + split.mod_lfo),
            vib_lfo: VoiceLfo::new(layer.vib_lfo + split.vib_lfo),
        })
    }

    #[inline]
    pub fn key(&self) -> u8 {
        self.key
    }

    #[inline]
    pub fn exclusive_class(&self) -> u16 {
        self.exclusive_class
    }

    pub fn pan_factors(&self) -> (f32, f32) {
        (self.pan_l, self.pan_r)
    }

    /// Base playback rate before per-frame modulation.
    pub fn frequency(&self) -> f32 {
        self.freq
    }

    pub fn is_releasing(&self) -> bool {
        self.vol_env.phase() >= Phase::Release
    }

    pub fn volume_release_time(&self) -> f32 {
        self.vol_env.release_time()
    }

    /// Note-off: drop the hold flag. The render loop moves both envelopes
    /// into their release stage on the next frame.
    pub fn release(&mut self) {
        self.hold = false;
    }

    /// Exclusive-class cutoff: release with a 1 ms volume ramp.
    pub fn cut_off(&mut self) {
        self.hold = false;
        self.vol_env.fast_release();
        self.mod_env.release();
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        (self.sample_pos >= self.sample_end as f64 && !self.hold)
            || self.vol_env.phase() == Phase::End
    }

    /// Add this voice's next `min(left.len(), right.len())` frames into the
    /// output buffers.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32], sample_rate: f32) {
        let frames = left.len().min(right.len());
        let dt = f64::from(1.0 / sample_rate);
        let dt32 = 1.0 / sample_rate;
        let base_step = f64::from(self.freq / sample_rate);
        let mut step = base_step;
        let last_index = self.data.len() - 1;

        let pitch_routed = self.mod_env_to_pitch != 0.0
            || self.vib_lfo_to_pitch != 0.0
            || self.mod_lfo_to_pitch != 0.0;
        let mod_lfo_routed = self.mod_lfo_to_pitch != 0.0
            || self.mod_lfo_to_filter != 0.0
            || self.mod_lfo_to_volume != 0.0;

        for frame in left.iter_mut().zip(right.iter_mut()).take(frames) {
            if self.sample_pos >= self.sample_end as f64 {
                break;
            }
            let pos = self.sample_pos as usize;
            let is_looping = (self.hold && self.loop_mode != LoopMode::None)
                || self.loop_mode == LoopMode::Continuous;
            let pos_next = if pos >= self.loop_end && is_looping {
                self.loop_start
            } else {
                (pos + 1).min(last_index)
            };
            let frac = (self.sample_pos - pos as f64) as f32;
            let mut val = lerp(
                self.data[pos.min(last_index)],
                self.data[pos_next],
                frac,
            );

            self.sample_pos += step;
            if is_looping && self.sample_pos >= self.loop_end as f64 {
                self.sample_pos -= (self.loop_end - self.loop_start) as f64;
            }

            let vol_gain = decibels_to_gain(self.vol_env.tick(dt));
            let mod_level = self.mod_env.tick(dt);
            // a releasing voice below audibility is finished
            if vol_gain < RELEASE_SILENCE_GAIN && self.vol_env.phase() == Phase::Release {
                self.vol_env.finish();
            }
            if !self.hold {
                if self.vol_env.phase() < Phase::Release {
                    self.vol_env.release();
                }
                if self.mod_env.phase() < Phase::Release {
                    self.mod_env.release();
                }
            }

            val *= self.gain * vol_gain;

            let vib_value = if self.vib_lfo_to_pitch != 0.0 {
                self.vib_lfo.tick(dt32)
            } else {
                0.0
            };
            let mod_lfo_value = if mod_lfo_routed {
                self.mod_lfo.tick(dt32)
            } else {
                0.0
            };

            if self.filter_active {
                let mut cutoff = self.filter_freq;
                if self.mod_env_to_filter != 0.0 {
                    cutoff *= cents_to_hertz(mod_level * self.mod_env_to_filter);
                }
                if self.mod_lfo_to_filter != 0.0 {
                    cutoff *= cents_to_hertz(mod_lfo_value * self.mod_lfo_to_filter);
                }
                cutoff = cutoff.min(MAX_CUTOFF_FRACTION * sample_rate);
                if cutoff != self.last_cutoff {
                    self.lowpass.set_frequency(cutoff / sample_rate);
                    self.last_cutoff = cutoff;
                }
                val = self.lowpass.process(val);
            }

            if pitch_routed {
                let mut ratio = 1.0;
                if self.mod_env_to_pitch != 0.0 {
                    ratio *= cents_to_hertz(mod_level * self.mod_env_to_pitch);
                }
                if self.vib_lfo_to_pitch != 0.0 {
                    ratio *= cents_to_hertz(vib_value * self.vib_lfo_to_pitch);
                }
                if self.mod_lfo_to_pitch != 0.0 {
                    ratio *= cents_to_hertz(mod_lfo_value * self.mod_lfo_to_pitch);
                }
                step = base_step * f64::from(ratio);
            }
            if self.mod_lfo_to_volume != 0.0 {
                val *= decibels_to_gain(mod_lfo_value * self.mod_lfo_to_volume);
            }

            *frame.0 += val * self.pan_l;
            *frame.1 += val * self.pan_r;
        }
    }

    #[cfg(test)]
    pub(crate) fn sample_pos(&self) -> f64 {
        self.sample_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn sine_sample(frames: usize, period: usize) -> Arc<Sample> {
        let data: Vec<f32> = (0..frames)
            .map(|i| (TAU * i as f32 / period as f32).sin())
            .collect();
        let mut sample = Sample::from_frames("sine", data, 44100, 69);
        sample.loop_start = 0;
        sample.loop_end = frames as u32;
        Arc::new(sample)
    }

    fn voice(split: &Split, sample: &Arc<Sample>, key: u8) -> Voice {
        Voice::new(
            &Layer::default(),
            split,
            sample,
            key,
            key,
            127,
            44100.0,
            VoiceOptions::default(),
        )
        .expect("sample has data")
    }

    #[test]
    fn test_voice_needs_decoded_data() {
        let header_only = Arc::new(Sample::from_frames("empty", Vec::new(), 44100, 60));
        assert!(Voice::new(
            &Layer::default(),
            &Split::default(),
            &header_only,
            60,
            60,
            100,
            44100.0,
            VoiceOptions::default(),
        )
        .is_none());
    }

    #[test]
    fn test_unison_plays_at_native_rate() {
        let sample = sine_sample(4410, 100);
        let v = voice(&Split::default(), &sample, 69);
        // key == original key: one source frame per output frame
        assert!((v.frequency() - 44100.0).abs() < 1.0);
    }

    #[test]
    fn test_octave_doubles_step() {
        let sample = sine_sample(4410, 100);
        let v = voice(&Split::default(), &sample, 81);
        assert!((v.frequency() - 88200.0).abs() < 2.0);
    }

    #[test]
    fn test_zero_scale_tuning_ignores_key() {
        let sample = sine_sample(4410, 100);
        let mut split = Split::default();
        split.scale_tuning = 0.0;
        let low = voice(&split, &sample, 40);
        let high = voice(&split, &sample, 100);
        assert!((low.frequency() - high.frequency()).abs() < 0.01);
        assert!((low.frequency() - 44100.0).abs() < 1.0);
    }

    #[test]
    fn test_coarse_tune_shifts_pitch() {
        let sample = sine_sample(4410, 100);
        let mut split = Split::default();
        split.tune = 200; // two semitones up
        let tuned = voice(&split, &sample, 69);
        let plain = voice(&Split::default(), &sample, 69);
        let ratio = tuned.frequency() / plain.frequency();
        assert!((ratio - cents_to_hertz(200.0)).abs() < 1e-3);
    }

    #[test]
    fn test_loop_position_stays_in_window() {
        let frames = 1000;
        let sample = sine_sample(frames, 100);
        let mut split = Split::default();
        split.loop_mode = LoopMode::Continuous;
        let mut v = voice(&split, &sample, 81); // step 2: crosses the loop end

        let mut left = vec![0.0f32; 4096];
        let mut right = vec![0.0f32; 4096];
        v.render(&mut left, &mut right, 44100.0);

        let pos = v.sample_pos();
        assert!(
            pos < frames as f64,
            "looping voice escaped its window: {}",
            pos
        );
        assert!(!v.is_done(), "looping held voice must keep sounding");
    }

    #[test]
    fn test_unlooped_voice_ends_after_release() {
        let sample = sine_sample(441, 100);
        let mut v = voice(&Split::default(), &sample, 69);
        v.release();

        let mut left = vec![0.0f32; 2048];
        let mut right = vec![0.0f32; 2048];
        v.render(&mut left, &mut right, 44100.0);
        assert!(v.is_done(), "released voice past its end must finish");
    }

    #[test]
    fn test_render_is_additive() {
        let sample = sine_sample(4410, 100);
        let mut v = voice(&Split::default(), &sample, 69);

        let mut left = vec![1.0f32; 64];
        let mut right = vec![1.0f32; 64];
        v.render(&mut left, &mut right, 44100.0);
        // contributions add onto existing content rather than replacing it
        assert!(left.iter().any(|&s| (s - 1.0).abs() > 1e-6));
        assert!(left.iter().all(|&s| s > -0.1));
    }

    #[test]
    fn test_cut_off_shortens_release() {
        let sample = sine_sample(4410, 100);
        let mut split = Split::default();
        split.vol_env.release = 1200; // 2 s release
        split.exclusive_class = 5;
        let mut v = voice(&split, &sample, 69);
        assert_eq!(v.exclusive_class(), 5);

        v.cut_off();
        assert!(v.is_releasing());
        assert!(v.volume_release_time() <= 0.001);

        // a millisecond of audio later the voice is gone
        let mut left = vec![0.0f32; 128];
        let mut right = vec![0.0f32; 128];
        v.render(&mut left, &mut right, 44100.0);
        assert!(v.is_done());
    }

    #[test]
    fn test_peak_tracks_gain_and_velocity() {
        let sample = sine_sample(44100, 100);
        let mut split = Split::default();
        split.loop_mode = LoopMode::Continuous;
        let make = |vel: u8| {
            Voice::new(
                &Layer::default(),
                &split,
                &sample,
                69,
                69,
                vel,
                44100.0,
                VoiceOptions::default(),
            )
            .unwrap()
        };

        let peak = |v: &mut Voice| {
            let mut left = vec![0.0f32; 8192];
            let mut right = vec![0.0f32; 8192];
            v.render(&mut left, &mut right, 44100.0);
            left.iter().fold(0.0f32, |m, &s| m.max(s.abs()))
        };

        let loud = peak(&mut make(127));
        let soft = peak(&mut make(64));
        assert!(loud > soft * 1.5, "velocity must scale level: {} vs {}", loud, soft);
        // center pan carries √2/2 per side; envelope peak is unity
        assert!(loud <= 0.75, "center-panned full-velocity peak too hot: {}", loud);
    }
}
