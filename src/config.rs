//! Filter configuration.
//!
//! [`FilterConfig`] holds every tunable parameter of the pattern filter.  The
//! defaults are the values the filter was tuned with on 1 kHz calcium traces.
//!
//! Two domain constants are deliberately *not* part of the config:
//! [`NOISE_FLOOR`] and [`SKIPPED_LEADING_PEAKS`].  They are exposed as named
//! constants so that they are visible, but they are assumptions about the
//! recordings rather than knobs.
use crate::error::{FilterError, Result};

/// Absolute amplitude below which a sample can never be a correlation match.
///
/// Assumes the trace baseline sits near zero and that physiologically
/// meaningful activity exceeds `0.1` in the recording's units.
pub const NOISE_FLOOR: f64 = 0.1;

/// Mask value given to discarded samples under
/// [`MaskPolicy::KeepBaseline`](crate::mask::MaskPolicy::KeepBaseline).
///
/// Keeps the filtered output non-zero wherever the input is non-zero, so
/// downstream ratios and logarithms stay defined.
pub const BASELINE_KEEP: f64 = 0.001;

/// Number of leading reference events dropped before the template is built.
///
/// The detector's first report on a trace is an edge artefact of its filters,
/// not a genuine transient.
pub const SKIPPED_LEADING_PEAKS: usize = 1;

/// What to do with a reference event whose template window would leave the
/// signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferencePeakPolicy {
    /// Fail with [`FilterError::PeakOutOfRange`].
    #[default]
    Reject,
    /// Drop the event (logged at `warn` level) and average the rest.
    Skip,
}

/// Configuration of the pattern filter.
///
/// All fields are `pub`, so a config is usually built with struct-update
/// syntax:
///
/// ```
/// use cafilt::FilterConfig;
///
/// let cfg = FilterConfig {
///     corr_threshold: 0.9,   // stricter shape match
///     pattern_len:    30,    // 61-sample template
///     ..FilterConfig::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// Half-width (samples) of the keep window around each correlation peak.
    ///
    /// Default: `40`.
    pub corr_window_size: usize,

    /// Half-width (samples) of the keep window around each supra-threshold
    /// sample.  Only used when `consider_peak` is set for the row.
    ///
    /// Default: `10`.
    pub peak_window_size: usize,

    /// Minimum Pearson coefficient for a position to count as a match.
    /// Must lie in `[-1, 1]`.
    ///
    /// Default: `0.8`.
    pub corr_threshold: f64,

    /// Sampling rate in Hz, forwarded untouched to the event detector.
    ///
    /// Default: `1000.0`.
    pub fs: f64,

    /// Half-length of the pattern template.  The template has
    /// `2 * pattern_len + 1` samples.
    ///
    /// Default: `50`.
    pub pattern_len: usize,

    /// Handling of reference events too close to either end of the signal.
    ///
    /// Default: [`ReferencePeakPolicy::Reject`].
    pub reference_peaks: ReferencePeakPolicy,
}

impl Default for FilterConfig {
    /// 40-sample correlation windows · 10-sample peak windows · r ≥ 0.8 ·
    /// 1 kHz · 101-sample template.
    fn default() -> Self {
        Self {
            corr_window_size: 40,
            peak_window_size: 10,
            corr_threshold: 0.8,
            fs: 1000.0,
            pattern_len: 50,
            reference_peaks: ReferencePeakPolicy::Reject,
        }
    }
}

impl FilterConfig {
    /// Length of the pattern template, `2 * pattern_len + 1`.
    ///
    /// ```
    /// use cafilt::FilterConfig;
    /// assert_eq!(FilterConfig::default().template_len(), 101);
    /// ```
    pub fn template_len(&self) -> usize {
        2 * self.pattern_len + 1
    }

    /// Check every parameter, returning the first violation found.
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, reason: impl Into<String>) -> Result<()> {
            Err(FilterError::InvalidParameter { name, reason: reason.into() })
        }

        if self.pattern_len == 0 {
            return invalid("pattern_len", "must be at least 1");
        }
        if self.corr_window_size == 0 {
            return invalid("corr_window_size", "must be at least 1");
        }
        if self.peak_window_size == 0 {
            return invalid("peak_window_size", "must be at least 1");
        }
        if !(-1.0..=1.0).contains(&self.corr_threshold) {
            return invalid(
                "corr_threshold",
                format!("{} is outside [-1, 1]", self.corr_threshold),
            );
        }
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return invalid("fs", format!("{} is not a positive sampling rate", self.fs));
        }
        Ok(())
    }
}
