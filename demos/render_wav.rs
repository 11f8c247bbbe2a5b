//! Render a C-major chord from a SoundFont bank to `output.wav`.
//!
//! ```bash
//! cargo run --example render_wav -- path/to/bank.sf2 [program] [bank]
//! ```

use std::sync::Arc;

use continuo::{Channel, Riff, SoundFont2};

const SAMPLE_RATE: u32 = 44100;
const SECONDS: f32 = 3.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: render_wav <bank.sf2> [program] [bank]")?;
    let program: u16 = args.next().map(|a| a.parse()).transpose()?.unwrap_or(0);
    let bank: u16 = args.next().map(|a| a.parse()).transpose()?.unwrap_or(0);

    let mut file = std::fs::File::open(&path)?;
    let riff = Riff::parse(&mut file)?;
    let font = Arc::new(SoundFont2::new(&riff, file)?);
    println!(
        "loaded '{}': {} banks, {} instruments, {} samples",
        font.info.name,
        font.banks.len(),
        font.instruments.len(),
        font.samples.len()
    );

    let mut channel = Channel::new(font);
    channel.set_preset(program, bank)?;

    // C major chord, released for the final second so the tails ring out
    let rate = SAMPLE_RATE as f32;
    channel.note_on(60, 127, rate);
    channel.note_on(64, 127, rate);
    channel.note_on(67, 127, rate);

    let frames = (SECONDS * rate) as usize;
    let held = frames * 2 / 3;
    let mut left = vec![0.0f32; frames];
    let mut right = vec![0.0f32; frames];
    channel.render(&mut left[..held], &mut right[..held], rate);
    channel.note_off(60);
    channel.note_off(64);
    channel.note_off(67);
    channel.render(&mut left[held..], &mut right[held..], rate);

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create("output.wav", spec)?;
    for (l, r) in left.iter().zip(&right) {
        writer.write_sample(*l)?;
        writer.write_sample(*r)?;
    }
    writer.finalize()?;
    println!("wrote output.wav ({frames} frames)");
    Ok(())
}
