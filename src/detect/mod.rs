//! Transient event detection.
//!
//! The filter never looks inside a detector: it only consumes the
//! [`PeakSet`] it returns.  Anything implementing [`EventDetector`] can be
//! plugged in, including plain closures:
//!
//! ```
//! use cafilt::detect::{Detection, EventDetector, PeakSet};
//!
//! let fixed = |_: &[f64], _fs: f64| -> anyhow::Result<Detection> {
//!     Ok(Detection::new(PeakSet::new(vec![10, 40], vec![1.0, 0.8])?))
//! };
//! let found = fixed.detect(&[0.0; 64], 1000.0).unwrap();
//! assert_eq!(found.peaks.indices(), &[10, 40]);
//! ```
//!
//! [`PanTompkins`] is the default, QRS-style detector.
pub mod pan_tompkins;

pub use pan_tompkins::{PanTompkins, PanTompkinsConfig};

use anyhow::{ensure, Result};

/// Detected events of one signal: index-aligned sample indices and
/// amplitudes, strictly increasing in index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakSet {
    indices: Vec<usize>,
    amplitudes: Vec<f64>,
}

impl PeakSet {
    /// Build a peak set, checking alignment and ordering.
    pub fn new(indices: Vec<usize>, amplitudes: Vec<f64>) -> Result<Self> {
        ensure!(
            indices.len() == amplitudes.len(),
            "{} peak indices but {} amplitudes",
            indices.len(),
            amplitudes.len()
        );
        ensure!(
            indices.windows(2).all(|w| w[0] < w[1]),
            "peak indices must be strictly increasing"
        );
        Ok(Self { indices, amplitudes })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    /// `(index, amplitude)` pairs in time order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.amplitudes.iter().copied())
    }

    /// Arithmetic mean of the amplitudes, `None` when there are no peaks.
    pub fn mean_amplitude(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.amplitudes.iter().sum::<f64>() / self.len() as f64)
    }
}

/// Output of an [`EventDetector`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub peaks: PeakSet,
    /// Processing delay in samples, as reported by the detector.  Not used by
    /// the filter.
    pub delay: usize,
}

impl Detection {
    pub fn new(peaks: PeakSet) -> Self {
        Self { peaks, delay: 0 }
    }
}

/// Locates transient events in a whole signal sampled at `fs` Hz.
pub trait EventDetector {
    fn detect(&self, signal: &[f64], fs: f64) -> Result<Detection>;
}

impl<F> EventDetector for F
where
    F: Fn(&[f64], f64) -> Result<Detection>,
{
    fn detect(&self, signal: &[f64], fs: f64) -> Result<Detection> {
        self(signal, fs)
    }
}
