//! QRS-style transient detector (Pan & Tompkins, 1985).
//!
//! ```text
//! signal
//!   ├─ band-pass [low_hz, high_hz]   zero-phase FIR (crate::filter)
//!   ├─ five-point derivative         slope of the band-passed trace
//!   ├─ squaring                      energy, all positive
//!   ├─ moving-window integration     causal mean over `integration_s`
//!   ├─ candidate maxima              ≥ `refractory_s` apart, tallest wins
//!   └─ dual adaptive thresholds      integrated + band-passed levels,
//!                                    T-wave rejection, search-back
//! ```
//!
//! Each accepted candidate is refined to the band-passed maximum inside the
//! integration window that produced it; that sample and its band-passed value
//! are reported.  The reported `delay` is the lag of the causal integrator,
//! half its window.
use anyhow::{ensure, Result};
use log::trace;

use super::{Detection, EventDetector, PeakSet};
use crate::filter::{design_bandpass, ZeroPhaseFir};
use crate::maxima::local_maxima_with_distance;

/// Weight of the newest peak in the running signal / noise levels.
const LEVEL_WEIGHT: f64 = 0.125;
/// Weight used when a peak is recovered by search-back.
const SEARCH_BACK_WEIGHT: f64 = 0.25;
/// A gap longer than this multiple of the mean interval triggers search-back.
const MISSED_INTERVAL_FACTOR: f64 = 1.66;
/// Number of most recent intervals averaged for the mean interval.
const INTERVAL_HISTORY: usize = 8;
/// Span over which a candidate's rising slope is measured, in seconds.
const SLOPE_SPAN_S: f64 = 0.075;

/// Tunables of [`PanTompkins`].
#[derive(Debug, Clone, PartialEq)]
pub struct PanTompkinsConfig {
    /// Lower edge of the detection band in Hz.  Default: `5.0`.
    pub low_hz: f64,
    /// Upper edge of the detection band in Hz.  Default: `15.0`.
    pub high_hz: f64,
    /// Moving-window integration length in seconds.  Default: `0.150`.
    pub integration_s: f64,
    /// Minimum spacing between candidates in seconds.  Default: `0.200`.
    pub refractory_s: f64,
    /// Candidates closer than this to the previous event are checked for
    /// being a slow secondary wave.  Default: `0.360`.
    pub twave_s: f64,
    /// Length of the initial segment used to seed the thresholds, in
    /// seconds.  Default: `2.0`.
    pub learning_s: f64,
}

impl Default for PanTompkinsConfig {
    fn default() -> Self {
        Self {
            low_hz: 5.0,
            high_hz: 15.0,
            integration_s: 0.150,
            refractory_s: 0.200,
            twave_s: 0.360,
            learning_s: 2.0,
        }
    }
}

/// The default [`EventDetector`].
#[derive(Debug, Clone, Default)]
pub struct PanTompkins {
    pub config: PanTompkinsConfig,
}

impl PanTompkins {
    pub fn new(config: PanTompkinsConfig) -> Self {
        Self { config }
    }
}

/// Running signal / noise estimate for one of the two traces.
#[derive(Debug, Clone, Copy)]
struct Levels {
    signal: f64,
    noise: f64,
    threshold: f64,
}

impl Levels {
    /// Seed from a learning segment: signal = max / 3, noise = mean / 2.
    fn seed(segment: &[f64]) -> Self {
        let max = segment.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = segment.iter().sum::<f64>() / segment.len() as f64;
        Self { signal: max / 3.0, noise: mean / 2.0, threshold: max / 3.0 }
    }

    fn noise_threshold(&self) -> f64 {
        0.5 * self.threshold
    }

    fn add_signal(&mut self, value: f64, weight: f64) {
        self.signal = weight * value + (1.0 - weight) * self.signal;
    }

    fn add_noise(&mut self, value: f64) {
        self.noise = LEVEL_WEIGHT * value + (1.0 - LEVEL_WEIGHT) * self.noise;
    }

    fn update_threshold(&mut self) {
        self.threshold = self.noise + 0.25 * (self.signal - self.noise).abs();
    }
}

impl EventDetector for PanTompkins {
    fn detect(&self, signal: &[f64], fs: f64) -> Result<Detection> {
        let c = &self.config;
        ensure!(fs.is_finite() && fs > 0.0, "sampling rate must be positive, got {fs}");

        let n = signal.len();
        let window = ((c.integration_s * fs).round() as usize).max(1);
        let delay = window / 2;
        if n < 3 {
            return Ok(Detection { peaks: PeakSet::empty(), delay });
        }

        let band = ZeroPhaseFir::new(design_bandpass(c.low_hz, c.high_hz, fs)?)?.apply(signal);
        let energy: Vec<f64> = five_point_derivative(&band, fs).iter().map(|d| d * d).collect();
        let integrated = moving_window_integral(&energy, window);

        let refractory = ((c.refractory_s * fs).round() as usize).max(1);
        let candidates = local_maxima_with_distance(&integrated, refractory);

        let learn = ((c.learning_s * fs).round() as usize).clamp(1, n);
        let mut lvl_i = Levels::seed(&integrated[..learn]);
        let mut lvl_f = Levels::seed(&band[..learn]);

        let twave = (c.twave_s * fs).round() as usize;
        let slope_span = ((SLOPE_SPAN_S * fs).round() as usize).max(1);

        // Accepted events in the integrated trace: (location, rising slope).
        let mut accepted: Vec<(usize, f64)> = Vec::new();
        let mut indices: Vec<usize> = Vec::new();
        let mut amplitudes: Vec<f64> = Vec::new();
        let mut emit = |idx: usize, amp: f64| {
            if indices.last().map_or(true, |&last| idx > last) {
                indices.push(idx);
                amplitudes.push(amp);
            }
        };

        for (k, cand) in candidates.iter().enumerate() {
            let (loc, pk) = (cand.location, cand.value);
            let (raw_idx, raw_amp) = refine(&band, loc, window);

            // Search-back over a suspiciously long gap.
            if let (Some(mean_rr), Some(&(last, _))) = (mean_interval(&accepted), accepted.last()) {
                if (loc - last) as f64 >= MISSED_INTERVAL_FACTOR * mean_rr {
                    let missed = candidates[..k]
                        .iter()
                        .filter(|p| p.location > last + refractory && p.location + refractory < loc)
                        .filter(|p| p.value > lvl_i.noise_threshold())
                        .max_by(|a, b| a.value.total_cmp(&b.value));
                    if let Some(m) = missed {
                        let (idx, amp) = refine(&band, m.location, window);
                        if amp > lvl_f.noise_threshold() {
                            trace!("search-back recovered event at sample {idx}");
                            accepted.push((m.location, rising_slope(&integrated, m.location, slope_span)));
                            emit(idx, amp);
                            lvl_f.add_signal(amp, SEARCH_BACK_WEIGHT);
                            lvl_i.add_signal(m.value, SEARCH_BACK_WEIGHT);
                        }
                    }
                }
            }

            if pk >= lvl_i.threshold {
                let slope = rising_slope(&integrated, loc, slope_span);
                let secondary_wave = match accepted.last() {
                    Some(&(last, last_slope)) if loc - last <= twave => slope.abs() <= 0.5 * last_slope.abs(),
                    _ => false,
                };
                if secondary_wave {
                    lvl_f.add_noise(raw_amp);
                    lvl_i.add_noise(pk);
                } else {
                    accepted.push((loc, slope));
                    if raw_amp >= lvl_f.threshold {
                        emit(raw_idx, raw_amp);
                        lvl_f.add_signal(raw_amp, LEVEL_WEIGHT);
                    }
                    lvl_i.add_signal(pk, LEVEL_WEIGHT);
                }
            } else {
                lvl_f.add_noise(raw_amp);
                lvl_i.add_noise(pk);
            }

            lvl_i.update_threshold();
            lvl_f.update_threshold();
        }

        Ok(Detection { peaks: PeakSet::new(indices, amplitudes)?, delay })
    }
}

/// Centred five-point derivative `fs/8 · (−x[n−2] − 2x[n−1] + 2x[n+1] + x[n+2])`,
/// with indices clamped at the ends.
fn five_point_derivative(x: &[f64], fs: f64) -> Vec<f64> {
    let last = x.len() - 1;
    let at = |i: isize| x[i.clamp(0, last as isize) as usize];
    (0..x.len() as isize)
        .map(|i| fs / 8.0 * (-at(i - 2) - 2.0 * at(i - 1) + 2.0 * at(i + 1) + at(i + 2)))
        .collect()
}

/// Causal moving average over `window` samples; the first `window - 1`
/// outputs average over the zero-extended past.
fn moving_window_integral(x: &[f64], window: usize) -> Vec<f64> {
    let scale = 1.0 / window as f64;
    let mut sum = 0.0;
    x.iter()
        .enumerate()
        .map(|(i, &v)| {
            sum += v;
            if i >= window {
                sum -= x[i - window];
            }
            sum * scale
        })
        .collect()
}

/// Band-passed maximum inside `[loc − window, loc]`.
fn refine(band: &[f64], loc: usize, window: usize) -> (usize, f64) {
    let lo = loc.saturating_sub(window);
    band[lo..=loc]
        .iter()
        .enumerate()
        .fold((lo, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (lo + i, v) } else { best })
}

/// Mean rise of the integrated trace over the `span` samples before `loc`.
fn rising_slope(integrated: &[f64], loc: usize, span: usize) -> f64 {
    let start = loc.saturating_sub(span);
    if start == loc {
        return 0.0;
    }
    (integrated[loc] - integrated[start]) / (loc - start) as f64
}

/// Mean of the last [`INTERVAL_HISTORY`] intervals between accepted events.
fn mean_interval(accepted: &[(usize, f64)]) -> Option<f64> {
    if accepted.len() < 2 {
        return None;
    }
    let tail = &accepted[accepted.len().saturating_sub(INTERVAL_HISTORY + 1)..];
    let total: usize = tail.windows(2).map(|w| w[1].0 - w[0].0).sum();
    Some(total as f64 / (tail.len() - 1) as f64)
}
