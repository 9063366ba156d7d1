//! Sliding Pearson correlation against the pattern template.
//!
//! For every centre `i` in `[pattern_len, N − 1 − pattern_len]` the window
//! `signal[i − pattern_len ..= i + pattern_len]` is correlated with the
//! template.  Centres closer to either end have no full window and stay 0.
//!
//! Post-processing, in order:
//!   1. scores below `corr_threshold` → 0
//!   2. scores where `signal[i] < NOISE_FLOOR` → 0
//!
//! A window (or template) with zero variance has no defined coefficient.  It
//! is scored with the `f64::NEG_INFINITY` sentinel, which is below every legal
//! threshold and therefore always ends up as 0; no NaN reaches the output.
use log::debug;

use crate::config::NOISE_FLOOR;
use crate::template::PatternTemplate;

/// Score given to windows without a defined Pearson coefficient.
pub const DEGENERATE_SCORE: f64 = f64::NEG_INFINITY;

/// Per-sample similarity of a target signal to the template, after
/// thresholding.  Same length as the signal.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationTrace {
    values: Vec<f64>,
    degenerate: usize,
}

impl CorrelationTrace {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of windows whose coefficient was undefined.
    pub fn degenerate(&self) -> usize {
        self.degenerate
    }
}

/// Pearson correlation coefficient of two equal-length slices.
///
/// Returns `None` when either input is constant (zero variance) or the result
/// is not finite.  The coefficient is clamped to `[-1, 1]`.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    debug_assert_eq!(a.len(), b.len());
    Centred::new(b)?.correlate(a)
}

/// One input of the coefficient, centred and with its norm precomputed.
struct Centred {
    deviations: Vec<f64>,
    norm: f64,
}

impl Centred {
    fn new(x: &[f64]) -> Option<Self> {
        if is_constant(x) {
            return None;
        }
        let mean = x.iter().sum::<f64>() / x.len() as f64;
        let deviations: Vec<f64> = x.iter().map(|v| v - mean).collect();
        let norm = deviations.iter().map(|d| d * d).sum::<f64>().sqrt();
        (norm.is_finite() && norm > 0.0).then_some(Self { deviations, norm })
    }

    fn correlate(&self, window: &[f64]) -> Option<f64> {
        if is_constant(window) {
            return None;
        }
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let (cross, ss) = window
            .iter()
            .zip(&self.deviations)
            .fold((0.0, 0.0), |(cross, ss), (&w, &t)| {
                let d = w - mean;
                (cross + d * t, ss + d * d)
            });
        let r = cross / (ss.sqrt() * self.norm);
        r.is_finite().then(|| r.clamp(-1.0, 1.0))
    }
}

fn is_constant(x: &[f64]) -> bool {
    x.iter().all(|&v| v == x[0])
}

/// Raw sliding coefficients: `DEGENERATE_SCORE` for undefined windows and 0
/// for centres without a full window.
pub fn raw_scores(signal: &[f64], template: &PatternTemplate) -> Vec<f64> {
    let half = template.pattern_len();
    let width = template.len();
    let mut scores = vec![0.0_f64; signal.len()];
    if signal.len() < width {
        return scores;
    }

    match Centred::new(template.values()) {
        Some(t) => {
            for (start, window) in signal.windows(width).enumerate() {
                scores[start + half] = t.correlate(window).unwrap_or(DEGENERATE_SCORE);
            }
        }
        None => scores[half..signal.len() - half].fill(DEGENERATE_SCORE),
    }
    scores
}

/// Thresholded correlation trace of `signal` against `template`.
pub fn correlation_trace(signal: &[f64], template: &PatternTemplate, corr_threshold: f64) -> CorrelationTrace {
    let mut values = raw_scores(signal, template);
    let degenerate = values.iter().filter(|&&v| v == DEGENERATE_SCORE).count();

    for (v, &s) in values.iter_mut().zip(signal) {
        if *v < corr_threshold || s < NOISE_FLOOR {
            *v = 0.0;
        }
    }

    if degenerate > 0 {
        debug!("{degenerate} zero-variance windows scored as no correlation");
    }
    CorrelationTrace { values, degenerate }
}
