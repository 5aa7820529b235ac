//! Whisper log-mel feature extraction.
//!
//! Reimplements the preprocessing the checkpoint was trained against: Hann
//! window, 400-point FFT with hop 160, an 80-band slaney-scale filterbank,
//! log10 with an 8dB dynamic-range clamp and `(x + 4) / 4` scaling. The
//! filterbank is generated here rather than shipped as a binary asset; it is
//! a pure function of the constants below.

use crate::audio::TARGET_SAMPLE_RATE;

/// FFT size (25ms at 16kHz).
pub const N_FFT: usize = 400;
/// Hop between successive frames (10ms at 16kHz).
pub const HOP_LENGTH: usize = 160;
/// Mel bands the encoder expects.
pub const N_MELS: usize = 80;
/// Window length in seconds fed to the encoder.
pub const CHUNK_LENGTH: usize = 30;
/// Samples per encoder window.
pub const N_SAMPLES: usize = CHUNK_LENGTH * TARGET_SAMPLE_RATE as usize;
/// Mel frames per encoder window.
pub const N_FRAMES: usize = N_SAMPLES / HOP_LENGTH;

/// Retained FFT bins (DC through Nyquist).
const N_FREQS: usize = N_FFT / 2 + 1;

// Slaney mel scale: linear below 1kHz, logarithmic above.
const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn hz_to_mel(hz: f32) -> f32 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / LOG_STEP
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (LOG_STEP * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * F_SP
    }
}

#[allow(clippy::excessive_precision)]
const LOG_STEP: f32 = 0.068_751_777_42; // ln(6.4) / 27

/// Build the `[N_MELS, N_FREQS]` triangular filterbank, row-major.
///
/// Matches librosa's defaults for this model family: slaney scale, slaney
/// area normalization, fmin 0, fmax Nyquist.
pub fn mel_filterbank() -> Vec<f32> {
    #[allow(clippy::cast_precision_loss)]
    let fmax = TARGET_SAMPLE_RATE as f32 / 2.0;
    let mel_max = hz_to_mel(fmax);

    // N_MELS + 2 break frequencies, evenly spaced on the mel scale.
    #[allow(clippy::cast_precision_loss)]
    let breaks: Vec<f32> = (0..N_MELS + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (N_MELS + 1) as f32))
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let bin_hz = |k: usize| k as f32 * fmax / (N_FREQS - 1) as f32;

    let mut weights = vec![0.0f32; N_MELS * N_FREQS];
    for m in 0..N_MELS {
        let (lo, center, hi) = (breaks[m], breaks[m + 1], breaks[m + 2]);
        let enorm = 2.0 / (hi - lo);
        for k in 0..N_FREQS {
            let f = bin_hz(k);
            let rising = (f - lo) / (center - lo);
            let falling = (hi - f) / (hi - center);
            weights[m * N_FREQS + k] = rising.min(falling).max(0.0) * enorm;
        }
    }
    weights
}

/// Radix-2 FFT of a real signal, returning interleaved (re, im) pairs.
///
/// Odd lengths fall back to a direct DFT, so the 400-point transform recurses
/// down to 25-point DFT leaves.
fn fft(input: &[f32]) -> Vec<f32> {
    let n = input.len();
    if n == 1 {
        return vec![input[0], 0.0];
    }
    if n % 2 == 1 {
        return dft(input);
    }

    let even: Vec<f32> = input.iter().copied().step_by(2).collect();
    let odd: Vec<f32> = input.iter().copied().skip(1).step_by(2).collect();
    let even_fft = fft(&even);
    let odd_fft = fft(&odd);

    #[allow(clippy::cast_precision_loss)]
    let step = std::f32::consts::TAU / n as f32;
    let mut out = vec![0.0f32; 2 * n];
    for k in 0..n / 2 {
        #[allow(clippy::cast_precision_loss)]
        let theta = step * k as f32;
        let (re_w, im_w) = (theta.cos(), -theta.sin());
        let (re_o, im_o) = (odd_fft[2 * k], odd_fft[2 * k + 1]);
        let (re_t, im_t) = (re_w * re_o - im_w * im_o, re_w * im_o + im_w * re_o);

        out[2 * k] = even_fft[2 * k] + re_t;
        out[2 * k + 1] = even_fft[2 * k + 1] + im_t;
        out[2 * (k + n / 2)] = even_fft[2 * k] - re_t;
        out[2 * (k + n / 2) + 1] = even_fft[2 * k + 1] - im_t;
    }
    out
}

/// Direct DFT of a real signal, interleaved (re, im) output.
fn dft(input: &[f32]) -> Vec<f32> {
    let n = input.len();
    #[allow(clippy::cast_precision_loss)]
    let step = std::f32::consts::TAU / n as f32;
    let mut out = Vec::with_capacity(2 * n);
    for k in 0..n {
        let mut re = 0.0f32;
        let mut im = 0.0f32;
        for (j, &x) in input.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let angle = step * k as f32 * j as f32;
            re += x * angle.cos();
            im -= x * angle.sin();
        }
        out.push(re);
        out.push(im);
    }
    out
}

/// Compute log-mel features for one encoder window.
///
/// `samples` is at most [`N_SAMPLES`] long; shorter input is zero-padded so
/// the output is always `[N_MELS, N_FRAMES]` row-major, the exact shape the
/// encoder expects.
pub fn log_mel_spectrogram(samples: &[f32], filters: &[f32]) -> Vec<f32> {
    debug_assert_eq!(filters.len(), N_MELS * N_FREQS);

    // Zero-pad to a full window plus one FFT frame so every hop has N_FFT
    // samples to read.
    let mut padded = vec![0.0f32; N_SAMPLES + N_FFT];
    let take = samples.len().min(N_SAMPLES);
    padded[..take].copy_from_slice(&samples[..take]);

    #[allow(clippy::cast_precision_loss)]
    let hann: Vec<f32> = (0..N_FFT)
        .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / N_FFT as f32).cos()))
        .collect();

    let mut mel = vec![0.0f32; N_MELS * N_FRAMES];
    let mut windowed = vec![0.0f32; N_FFT];
    let mut power = [0.0f32; N_FREQS];

    for frame in 0..N_FRAMES {
        let offset = frame * HOP_LENGTH;
        for (i, w) in hann.iter().enumerate() {
            windowed[i] = w * padded[offset + i];
        }

        let spectrum = fft(&windowed);
        for (k, p) in power.iter_mut().enumerate() {
            let (re, im) = (spectrum[2 * k], spectrum[2 * k + 1]);
            *p = re * re + im * im;
        }

        for m in 0..N_MELS {
            let row = &filters[m * N_FREQS..(m + 1) * N_FREQS];
            let sum: f32 = row.iter().zip(power.iter()).map(|(w, p)| w * p).sum();
            mel[m * N_FRAMES + frame] = sum.max(1e-10).log10();
        }
    }

    // Whisper normalization: clamp to 8dB below the peak, then rescale.
    let peak = mel.iter().copied().fold(f32::MIN, f32::max);
    let floor = peak - 8.0;
    for v in &mut mel {
        *v = (v.max(floor) + 4.0) / 4.0;
    }
    mel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_constants_line_up() {
        assert_eq!(N_SAMPLES, 480_000);
        assert_eq!(N_FRAMES, 3_000);
        assert_eq!(N_FREQS, 201);
    }

    #[test]
    fn fft_of_impulse_is_flat() {
        let out = fft(&[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(out.len(), 8);
        for k in 0..4 {
            assert!((out[2 * k] - 1.0).abs() < 1e-6);
            assert!(out[2 * k + 1].abs() < 1e-6);
        }
    }

    #[test]
    fn fft_of_constant_is_dc_only() {
        let out = fft(&[1.0; 4]);
        assert!((out[0] - 4.0).abs() < 1e-6);
        for v in &out[2..] {
            assert!(v.abs() < 1e-5);
        }
    }

    #[test]
    fn dft_matches_fft_on_even_length() {
        let signal: Vec<f32> = (0..8).map(|i| (i as f32 * 0.7).sin()).collect();
        let a = fft(&signal);
        let b = dft(&signal);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-3, "{x} vs {y}");
        }
    }

    #[test]
    fn mel_scale_roundtrips() {
        for hz in [0.0, 250.0, 999.0, 1000.0, 4000.0, 7999.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((back - hz).abs() < 0.5, "{hz} -> {back}");
        }
    }

    #[test]
    fn filterbank_shape_and_sign() {
        let fb = mel_filterbank();
        assert_eq!(fb.len(), N_MELS * N_FREQS);
        assert!(fb.iter().all(|w| *w >= 0.0));
        // DC bin sits at the left edge of the first triangle, weight zero.
        for m in 0..N_MELS {
            assert_eq!(fb[m * N_FREQS], 0.0, "filter {m} has DC weight");
        }
    }

    #[test]
    fn filterbank_peaks_ascend() {
        let fb = mel_filterbank();
        let peak_bin = |m: usize| {
            let row = &fb[m * N_FREQS..(m + 1) * N_FREQS];
            row.iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(k, _)| k)
                .unwrap()
        };
        let mut prev = 0;
        for m in 0..N_MELS {
            let k = peak_bin(m);
            assert!(k >= prev, "filter {m} peaks at {k}, before {prev}");
            prev = k;
        }
    }

    #[test]
    fn silence_yields_uniform_floor() {
        let fb = mel_filterbank();
        let mel = log_mel_spectrogram(&[0.0; 1600], &fb);
        assert_eq!(mel.len(), N_MELS * N_FRAMES);
        let first = mel[0];
        assert!(first.is_finite());
        assert!(mel.iter().all(|v| (*v - first).abs() < 1e-6));
    }

    #[test]
    fn tone_energy_tracks_frequency() {
        let fb = mel_filterbank();
        let band_of = |freq: f32| {
            let tone: Vec<f32> = (0..16_000)
                .map(|i| (i as f32 / 16_000.0 * freq * std::f32::consts::TAU).sin())
                .collect();
            let mel = log_mel_spectrogram(&tone, &fb);
            // Hottest mel band over the first second of frames.
            (0..N_MELS)
                .max_by(|a, b| {
                    let e = |m: usize| -> f32 { mel[m * N_FRAMES..m * N_FRAMES + 100].iter().sum() };
                    e(*a).total_cmp(&e(*b))
                })
                .unwrap()
        };
        assert!(band_of(400.0) < band_of(4000.0));
    }
}
