//! Pattern template construction.
//!
//! The template is the elementwise mean of the reference signal's event
//! windows `reference[p − pattern_len ..= p + pattern_len]`, taken over every
//! detected event except the first [`SKIPPED_LEADING_PEAKS`].
use log::{info, warn};

use crate::config::{FilterConfig, ReferencePeakPolicy, SKIPPED_LEADING_PEAKS};
use crate::detect::EventDetector;
use crate::error::{FilterError, Result};

/// Averaged event waveform of length `2 * pattern_len + 1`.
///
/// Built once per run and shared read-only by every target row.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternTemplate {
    values: Vec<f64>,
    pattern_len: usize,
    n_events: usize,
}

impl PatternTemplate {
    /// Average the windows centred on `indices` (already stripped of the
    /// leading artefact).
    ///
    /// Out-of-range windows are rejected or skipped according to
    /// `cfg.reference_peaks`.
    pub fn from_peaks(reference: &[f64], indices: &[usize], cfg: &FilterConfig) -> Result<Self> {
        cfg.validate()?;
        let half = cfg.pattern_len;
        let len = reference.len();

        let mut usable = Vec::with_capacity(indices.len());
        for &p in indices {
            if p >= half && p + half < len {
                usable.push(p);
                continue;
            }
            match cfg.reference_peaks {
                ReferencePeakPolicy::Reject => {
                    return Err(FilterError::PeakOutOfRange { index: p, pattern_len: half, len });
                }
                ReferencePeakPolicy::Skip => {
                    warn!("skipping reference event at sample {p}: window ±{half} leaves [0, {len})");
                }
            }
        }
        if usable.is_empty() {
            return Err(FilterError::InsufficientReferenceEvents {
                detected: indices.len() + SKIPPED_LEADING_PEAKS,
            });
        }

        let mut values = vec![0.0_f64; 2 * half + 1];
        for &p in &usable {
            let window = &reference[p - half..=p + half];
            values.iter_mut().zip(window).for_each(|(acc, &v)| *acc += v);
        }
        let inv = 1.0 / usable.len() as f64;
        values.iter_mut().for_each(|v| *v *= inv);

        Ok(Self { values, pattern_len: half, n_events: usable.len() })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn pattern_len(&self) -> usize {
        self.pattern_len
    }

    /// Number of reference events averaged into the template.
    pub fn n_events(&self) -> usize {
        self.n_events
    }
}

/// Detect events on `reference`, drop the leading artefact and average the
/// remaining event windows.
pub fn build_template<D>(reference: &[f64], cfg: &FilterConfig, detector: &D) -> Result<PatternTemplate>
where
    D: EventDetector + ?Sized,
{
    cfg.validate()?;
    let found = detector.detect(reference, cfg.fs).map_err(FilterError::Detector)?;
    let detected = found.peaks.len();
    if detected <= SKIPPED_LEADING_PEAKS {
        return Err(FilterError::InsufficientReferenceEvents { detected });
    }

    let template = PatternTemplate::from_peaks(reference, &found.peaks.indices()[SKIPPED_LEADING_PEAKS..], cfg)?;
    info!(
        "pattern template: {} samples averaged over {} of {detected} reference events",
        template.len(),
        template.n_events()
    );
    Ok(template)
}
