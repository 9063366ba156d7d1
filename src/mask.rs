//! Retention mask construction and application.
//!
//! `peak_threshold` is the mean amplitude of the target row's own detected
//! events (`+∞` when none were detected, so nothing can exceed it).
//!
//! | policy          | keep = 1 within `peak_window_size` of | keep = 1 within `corr_window_size` of | elsewhere |
//! |-----------------|----------------------------------------|----------------------------------------|-----------|
//! | `KeepBaseline`  | every sample `> peak_threshold`        | every correlation maximum              | `0.001`   |
//! | `Strict`        | —                                      | maxima with value `> peak_threshold`   | `0`       |
//!
//! Amplitude windows are clamped to `[0, N − 1]`.  Correlation windows are
//! clamped to the scored span `[pattern_len, N − 1 − pattern_len]`, so the
//! unscored edges never receive a correlation keep mark.  Overlapping windows
//! simply union.
use crate::config::{FilterConfig, BASELINE_KEEP};
use crate::detect::PeakSet;
use crate::maxima::LocalMaximum;

/// Masking policy of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskPolicy {
    /// Amplitude and correlation keep-windows over a `0.001` floor.
    /// Used for rows with acceptable noise (`consider_peak = true`).
    KeepBaseline,
    /// Correlation keep-windows gated by `peak_threshold` over a zero floor.
    /// Used for very noisy rows (`consider_peak = false`).
    Strict,
}

impl MaskPolicy {
    pub fn from_consider_peak(consider_peak: bool) -> Self {
        if consider_peak {
            Self::KeepBaseline
        } else {
            Self::Strict
        }
    }

    /// Value of samples outside every keep-window.
    pub fn floor(self) -> f64 {
        match self {
            Self::KeepBaseline => BASELINE_KEEP,
            Self::Strict => 0.0,
        }
    }
}

/// Mean detected amplitude, or `+∞` for an empty peak set.
pub fn peak_threshold(peaks: &PeakSet) -> f64 {
    peaks.mean_amplitude().unwrap_or(f64::INFINITY)
}

/// Set `mask[centre − radius ..= centre + radius]`, clipped to `[lo, hi]`, to 1.
fn mark(mask: &mut [f64], centre: usize, radius: usize, (lo, hi): (usize, usize)) {
    let from = centre.saturating_sub(radius).max(lo);
    let to = centre.saturating_add(radius).min(hi);
    if from <= to {
        mask[from..=to].fill(1.0);
    }
}

/// Centres with a full template window, `None` when the signal is shorter
/// than the template.
fn scored_span(len: usize, pattern_len: usize) -> Option<(usize, usize)> {
    (len > 2 * pattern_len).then(|| (pattern_len, len - 1 - pattern_len))
}

/// Build the retention mask of `signal`.
///
/// `maxima` are the local maxima of the row's correlation trace.
pub fn build_mask(
    signal: &[f64],
    maxima: &[LocalMaximum],
    peak_threshold: f64,
    policy: MaskPolicy,
    cfg: &FilterConfig,
) -> Vec<f64> {
    let mut mask = vec![policy.floor(); signal.len()];
    if mask.is_empty() {
        return mask;
    }

    let whole = (0, mask.len() - 1);
    if policy == MaskPolicy::KeepBaseline {
        for (i, _) in signal.iter().enumerate().filter(|&(_, &v)| v > peak_threshold) {
            mark(&mut mask, i, cfg.peak_window_size, whole);
        }
    }
    let Some(scored) = scored_span(mask.len(), cfg.pattern_len) else {
        return mask;
    };
    let counts = |m: &&LocalMaximum| match policy {
        MaskPolicy::KeepBaseline => true,
        MaskPolicy::Strict => m.value > peak_threshold,
    };
    for m in maxima.iter().filter(counts) {
        mark(&mut mask, m.location, cfg.corr_window_size, scored);
    }
    mask
}

/// Elementwise product `mask[i] · signal[i]`.
pub fn apply_mask(mask: &[f64], signal: &[f64]) -> Vec<f64> {
    debug_assert_eq!(mask.len(), signal.len());
    mask.iter().zip(signal).map(|(m, s)| m * s).collect()
}
