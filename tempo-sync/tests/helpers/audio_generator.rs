//! Synthetic preview clips

use std::io::Cursor;

/// Mono samples of 10 ms 1 kHz clicks at `bpm`
pub fn click_track(bpm: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
    let total = (seconds * sample_rate as f32) as usize;
    let period = (60.0 / bpm * sample_rate as f32) as usize;
    let click_len = sample_rate as usize / 100;

    (0..total)
        .map(|i| {
            let pos = i % period;
            if pos < click_len {
                let t = pos as f32 / sample_rate as f32;
                0.8 * (2.0 * std::f32::consts::PI * 1000.0 * t).sin()
            } else {
                0.0
            }
        })
        .collect()
}

/// [`click_track`] encoded as a mono 16-bit WAV
pub fn click_track_wav(bpm: f32, seconds: f32, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for sample in click_track(bpm, seconds, sample_rate) {
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
