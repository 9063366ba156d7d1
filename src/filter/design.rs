//! Windowed-sinc FIR design.
//!
//! The band-pass used by the event detector is built from two Hamming-window
//! lowpass prototypes (`firwin`) whose difference passes `[low, high]`:
//!   • transition bandwidths follow the MNE rules
//!     low:  min(max(0.25 · low, 2), low)
//!     high: min(max(0.25 · high, 2), fs/2 − high)
//!   • the tap count is ceil(3.3 / min(tb) · fs), rounded up to odd
//!   • each prototype is normalised to unit DC gain, so the band-pass has
//!     exactly zero DC gain
use anyhow::{ensure, Result};
use std::f64::consts::PI;

/// Transition bandwidth below the lower band edge `low_hz`.
pub fn auto_trans_bandwidth(low_hz: f64) -> f64 {
    (0.25 * low_hz).max(2.0).min(low_hz)
}

/// Transition bandwidth above the upper band edge `high_hz`.
fn upper_trans_bandwidth(high_hz: f64, fs: f64) -> f64 {
    (0.25 * high_hz).max(2.0).min(fs / 2.0 - high_hz)
}

/// Number of taps for a given transition bandwidth; always odd.
pub fn auto_filter_length(trans_bw: f64, fs: f64) -> usize {
    let n = (3.3 / trans_bw * fs).ceil() as usize;
    n | 1
}

/// Design a zero-phase band-pass FIR passing `[low_hz, high_hz]`.
///
/// Fails when the band is empty or does not fit below Nyquist.
pub fn design_bandpass(low_hz: f64, high_hz: f64, fs: f64) -> Result<Vec<f64>> {
    let nyq = fs / 2.0;
    ensure!(
        low_hz > 0.0 && low_hz < high_hz && high_hz < nyq,
        "band [{low_hz}, {high_hz}] Hz does not fit in (0, {nyq}) Hz"
    );

    let low_tb = auto_trans_bandwidth(low_hz);
    let high_tb = upper_trans_bandwidth(high_hz, fs);
    let n = auto_filter_length(low_tb.min(high_tb), fs).max(3);

    // Cut-offs sit in the middle of each transition band.
    let upper = firwin(n, high_hz + high_tb / 2.0, fs);
    let lower = firwin(n, low_hz - low_tb / 2.0, fs);

    Ok(upper.iter().zip(&lower).map(|(u, l)| u - l).collect())
}

/// Hamming-windowed sinc lowpass of odd length `n` with unit DC gain.
///
/// `cutoff_hz` is the −6 dB point.
pub fn firwin(n: usize, cutoff_hz: f64, fs: f64) -> Vec<f64> {
    debug_assert!(n % 2 == 1, "linear-phase design needs an odd tap count");
    let centre = (n - 1) as f64 / 2.0;
    let fc = cutoff_hz / (fs / 2.0);

    let mut h: Vec<f64> = hamming(n)
        .into_iter()
        .enumerate()
        .map(|(i, w)| {
            let x = i as f64 - centre;
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * w
        })
        .collect();

    let gain: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= gain);
    h
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}
