//! # cafilt: pattern-matched transient filtering for calcium imaging
//!
//! `cafilt` keeps the parts of a cell's trace that look like a genuine
//! transient and attenuates everything else.  "Genuine" is learned from a
//! trusted reference trace: its detected events are averaged into a pattern
//! template, and every target trace is scored against that template sample by
//! sample.
//!
//! ## Pipeline overview
//!
//! ```text
//! reference signal (once per run)
//!   ├─ detect::PanTompkins     QRS-style event detector → PeakSet
//!   ├─ drop first event        edge artefact of the detector
//!   └─ template                mean of ±pattern_len windows → PatternTemplate
//!
//! each target signal (independent, parallel)
//!   ├─ detect                  own PeakSet → peak_threshold = mean amplitude
//!   ├─ correlate               sliding Pearson r vs template
//!   │                          r < corr_threshold → 0, signal < 0.1 → 0
//!   ├─ maxima                  strict local maxima of the trace
//!   ├─ mask                    KeepBaseline (0.001 floor) | Strict (0 floor)
//!   └─ mask · signal           → filtered signal, same length
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use cafilt::{filter_signal, FilterConfig};
//!
//! let reference: Vec<f64> = vec![0.0; 10_000]; // trusted cell
//! let target:    Vec<f64> = vec![0.0; 10_000];
//!
//! let cfg = FilterConfig::default();
//! let filtered = filter_signal(&target, &reference, true, &cfg).unwrap();
//! assert_eq!(filtered.len(), target.len());
//! ```
//!
//! ## Batch filtering
//!
//! ```no_run
//! use cafilt::{FilterConfig, PanTompkins, PatternFilter};
//! use ndarray::Array2;
//!
//! let data: Array2<f64> = Array2::zeros((32, 10_000)); // [cells, T]
//! let reference = data.row(0).to_vec();
//!
//! let filter = PatternFilter::new(&reference, FilterConfig::default(), PanTompkins::default()).unwrap();
//! let very_noisy = [4, 17];
//! let filtered = filter.filter_matrix(data.view(), &very_noisy).unwrap();
//! ```

pub mod config;
pub mod correlate;
pub mod detect;
pub mod error;
pub mod filter;
pub mod io;
pub mod mask;
pub mod maxima;
pub mod pipeline;
pub mod template;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{FilterConfig, ReferencePeakPolicy, BASELINE_KEEP, NOISE_FLOOR, SKIPPED_LEADING_PEAKS};

// detection
pub use detect::{Detection, EventDetector, PanTompkins, PanTompkinsConfig, PeakSet};

// errors
pub use error::{FilterError, Result};

// pipeline stages
pub use correlate::{correlation_trace, pearson, CorrelationTrace};
pub use mask::{apply_mask, build_mask, peak_threshold, MaskPolicy};
pub use maxima::{local_maxima, LocalMaximum};
pub use pipeline::{filter_matrix, PatternFilter, RowReport};
pub use template::{build_template, PatternTemplate};

// io
pub use io::{write_filtered, SignalMatrix, StWriter};

/// Filter one `signal` against the pattern learned from `reference`.
///
/// Uses the default [`PanTompkins`] detector for both signals.  Rows with
/// acceptable noise should pass `consider_peak = true`
/// ([`MaskPolicy::KeepBaseline`]); very noisy rows `false`
/// ([`MaskPolicy::Strict`]).
///
/// When many rows share one reference, build a [`PatternFilter`] once
/// instead; this function rebuilds the template on every call.
///
/// # Errors
///
/// * [`FilterError::InvalidParameter`] for an invalid `cfg`.
/// * [`FilterError::InsufficientReferenceEvents`] when the reference has no
///   event besides the discarded first one.
/// * [`FilterError::PeakOutOfRange`] when a reference event sits within
///   `pattern_len` samples of either end (under
///   [`ReferencePeakPolicy::Reject`]).
/// * [`FilterError::Detector`] when event detection fails, e.g. because
///   `cfg.fs` is too low for the detection band.
pub fn filter_signal(signal: &[f64], reference: &[f64], consider_peak: bool, cfg: &FilterConfig) -> Result<Vec<f64>> {
    PatternFilter::new(reference, cfg.clone(), PanTompkins::default())?.filter_row(signal, consider_peak)
}
