//! Row pipeline: detect → correlate → maxima → mask → apply.
//!
//! [`PatternFilter`] owns the immutable template, so building one is the only
//! sequential step of a run.  Rows never share mutable state and
//! [`PatternFilter::filter_matrix`] fans them out over the rayon pool.
use log::debug;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::config::FilterConfig;
use crate::correlate::{correlation_trace, CorrelationTrace};
use crate::detect::{EventDetector, PeakSet};
use crate::error::{FilterError, Result};
use crate::mask::{apply_mask, build_mask, peak_threshold, MaskPolicy};
use crate::maxima::{local_maxima, LocalMaximum};
use crate::template::{build_template, PatternTemplate};

/// Every intermediate of one filtered row.
#[derive(Debug, Clone)]
pub struct RowReport {
    pub peaks: PeakSet,
    pub peak_threshold: f64,
    pub trace: CorrelationTrace,
    pub maxima: Vec<LocalMaximum>,
    pub policy: MaskPolicy,
    pub mask: Vec<f64>,
    pub filtered: Vec<f64>,
}

impl RowReport {
    /// Number of samples marked keep (mask value 1).
    pub fn kept(&self) -> usize {
        self.mask.iter().filter(|&&m| m == 1.0).count()
    }
}

/// A pattern filter bound to one reference signal.
#[derive(Debug, Clone)]
pub struct PatternFilter<D> {
    template: PatternTemplate,
    cfg: FilterConfig,
    detector: D,
}

impl<D: EventDetector> PatternFilter<D> {
    /// Validate `cfg` and build the template from `reference`.
    pub fn new(reference: &[f64], cfg: FilterConfig, detector: D) -> Result<Self> {
        let template = build_template(reference, &cfg, &detector)?;
        Ok(Self { template, cfg, detector })
    }

    /// Use an existing template.  Its half-length must match `cfg.pattern_len`.
    pub fn with_template(template: PatternTemplate, cfg: FilterConfig, detector: D) -> Result<Self> {
        cfg.validate()?;
        if template.pattern_len() != cfg.pattern_len {
            return Err(FilterError::InvalidParameter {
                name: "pattern_len",
                reason: format!(
                    "template was built with pattern_len = {}, config says {}",
                    template.pattern_len(),
                    cfg.pattern_len
                ),
            });
        }
        Ok(Self { template, cfg, detector })
    }

    pub fn template(&self) -> &PatternTemplate {
        &self.template
    }

    pub fn config(&self) -> &FilterConfig {
        &self.cfg
    }

    /// Filter one signal and return every intermediate.
    pub fn filter_row_detailed(&self, signal: &[f64], consider_peak: bool) -> Result<RowReport> {
        let peaks = self
            .detector
            .detect(signal, self.cfg.fs)
            .map_err(FilterError::Detector)?
            .peaks;
        let threshold = peak_threshold(&peaks);

        let trace = correlation_trace(signal, &self.template, self.cfg.corr_threshold);
        let maxima = local_maxima(trace.values());

        let policy = MaskPolicy::from_consider_peak(consider_peak);
        let mask = build_mask(signal, &maxima, threshold, policy, &self.cfg);
        let filtered = apply_mask(&mask, signal);

        debug!(
            "row: {} events, peak threshold {threshold:.4}, {} correlation maxima, {policy:?}",
            peaks.len(),
            maxima.len()
        );
        Ok(RowReport { peaks, peak_threshold: threshold, trace, maxima, policy, mask, filtered })
    }

    /// Filter one signal.  The output has the signal's length.
    pub fn filter_row(&self, signal: &[f64], consider_peak: bool) -> Result<Vec<f64>> {
        Ok(self.filter_row_detailed(signal, consider_peak)?.filtered)
    }
}

impl<D: EventDetector + Sync> PatternFilter<D> {
    /// Filter every row of `data` (`[cells, T]`) in parallel.
    ///
    /// Rows listed in `very_noisy` use [`MaskPolicy::Strict`], all others
    /// [`MaskPolicy::KeepBaseline`].  Any row error fails the whole batch.
    pub fn filter_matrix(&self, data: ArrayView2<'_, f64>, very_noisy: &[usize]) -> Result<Array2<f64>> {
        Ok(self.filter_matrix_detailed(data, very_noisy)?.0)
    }

    /// Like [`filter_matrix`](Self::filter_matrix), also returning the masks.
    pub fn filter_matrix_detailed(
        &self,
        data: ArrayView2<'_, f64>,
        very_noisy: &[usize],
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        let (n_rows, n_t) = data.dim();
        if let Some(&bad) = very_noisy.iter().find(|&&r| r >= n_rows) {
            return Err(FilterError::ShapeMismatch(format!(
                "very-noisy row {bad} but the matrix has {n_rows} rows"
            )));
        }

        let rows: Vec<RowReport> = (0..n_rows)
            .into_par_iter()
            .map(|r| {
                let row = data.row(r).to_vec();
                self.filter_row_detailed(&row, !very_noisy.contains(&r))
            })
            .collect::<Result<_>>()?;

        let mut filtered = Array2::<f64>::zeros((n_rows, n_t));
        let mut masks = Array2::<f64>::zeros((n_rows, n_t));
        for (r, report) in rows.into_iter().enumerate() {
            filtered.row_mut(r).assign(&ndarray::ArrayView1::from(&report.filtered));
            masks.row_mut(r).assign(&ndarray::ArrayView1::from(&report.mask));
        }
        Ok((filtered, masks))
    }
}

/// Filter `data` using row `reference_row` as the reference.
pub fn filter_matrix<D>(
    data: ArrayView2<'_, f64>,
    reference_row: usize,
    very_noisy: &[usize],
    cfg: FilterConfig,
    detector: D,
) -> Result<Array2<f64>>
where
    D: EventDetector + Sync,
{
    if reference_row >= data.nrows() {
        return Err(FilterError::ShapeMismatch(format!(
            "reference row {reference_row} but the matrix has {} rows",
            data.nrows()
        )));
    }
    let reference = data.row(reference_row).to_vec();
    PatternFilter::new(&reference, cfg, detector)?.filter_matrix(data, very_noisy)
}
