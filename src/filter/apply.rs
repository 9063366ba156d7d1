//! Zero-phase FIR application by FFT overlap-add.
//!
//! The linear-phase delay of an odd-length kernel is removed by reading the
//! convolution output `(N-1)/2` samples early, so no second (reverse) pass is
//! needed.  Both ends are extended by `N-1` samples of odd reflection around
//! the end values to keep the edge transient out of the returned span.
use anyhow::{ensure, Result};
use rustfft::{num_complex::Complex, FftPlanner};

/// A linear-phase FIR kernel ready to be applied with zero phase.
#[derive(Debug, Clone)]
pub struct ZeroPhaseFir {
    taps: Vec<f64>,
}

impl ZeroPhaseFir {
    /// Wrap `taps`; the kernel must be non-empty with an odd length.
    pub fn new(taps: Vec<f64>) -> Result<Self> {
        ensure!(
            taps.len() % 2 == 1,
            "zero-phase FIR needs an odd number of taps, got {}",
            taps.len()
        );
        Ok(Self { taps })
    }

    /// Filter `x`, returning a vector of the same length.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        if x.is_empty() {
            return Vec::new();
        }
        let n_h = self.taps.len();
        let shift = (n_h - 1) / 2;
        let n_edge = n_h - 1;

        let ext = odd_reflect_pad(x, n_edge);
        let n_ext = ext.len();

        let n_fft = fft_block_len(n_h, n_ext);
        let block = n_fft - n_h + 1;

        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(n_fft);
        let inverse = planner.plan_fft_inverse(n_fft);

        let mut kernel = zero_padded(&self.taps, n_fft);
        forward.process(&mut kernel);

        let scale = 1.0 / n_fft as f64;
        let mut acc = vec![0.0_f64; n_ext];

        for start in (0..n_ext).step_by(block) {
            let stop = (start + block).min(n_ext);
            let mut buf = zero_padded(&ext[start..stop], n_fft);

            forward.process(&mut buf);
            buf.iter_mut().zip(&kernel).for_each(|(b, k)| *b *= k);
            inverse.process(&mut buf);

            // Output sample `o` takes convolution lag `o - start + shift`.
            let first_out = start.saturating_sub(shift);
            let first_lag = first_out + shift - start;
            let last_out = (first_out + n_fft).min(n_ext);
            for (o, lag) in (first_out..last_out).zip(first_lag..n_fft) {
                acc[o] += buf[lag].re * scale;
            }
        }

        acc[n_edge..n_edge + x.len()].to_vec()
    }
}

/// Filter a single signal with `taps` (odd length).
pub fn filter_1d(x: &[f64], taps: &[f64]) -> Result<Vec<f64>> {
    Ok(ZeroPhaseFir::new(taps.to_vec())?.apply(x))
}

/// Extend `x` by `n_pad` samples on each side using odd reflection around
/// the end values; any padding beyond `len - 1` samples is zero.
///
/// Left:  `2·x[0] − x[i]`,  right: `2·x[n−1] − x[n−1−i]`, for `i = 1..`.
fn odd_reflect_pad(x: &[f64], n_pad: usize) -> Vec<f64> {
    let n = x.len();
    let reach = n_pad.min(n - 1);
    let (first, last) = (x[0], x[n - 1]);

    let mut out = Vec::with_capacity(n + 2 * n_pad);
    out.extend(std::iter::repeat(0.0).take(n_pad - reach));
    out.extend((1..=reach).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=reach).map(|i| 2.0 * last - x[n - 1 - i]));
    out.extend(std::iter::repeat(0.0).take(n_pad - reach));
    out
}

/// Power-of-two FFT length minimising the overlap-add cost
/// `ceil(n_x / (N − n_h + 1)) · N · (log2 N + 1) + 4e-5 · N · n_x`.
fn fft_block_len(n_h: usize, n_x: usize) -> usize {
    let min_len = 2 * n_h - 1;
    let lo = (min_len as f64).log2().ceil() as u32;
    let hi = ((n_x as f64).log2().ceil() as u32 + 1).max(lo);

    (lo..=hi)
        .map(|p| {
            let n = 1_usize << p;
            let blocks = (n_x as f64 / (n - n_h + 1) as f64).ceil();
            let cost = blocks * n as f64 * (p as f64 + 1.0) + 4e-5 * n as f64 * n_x as f64;
            (n, cost)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(n, _)| n)
        .unwrap_or(1 << hi)
}

fn zero_padded(x: &[f64], len: usize) -> Vec<Complex<f64>> {
    x.iter()
        .map(|&re| Complex { re, im: 0.0 })
        .chain(std::iter::repeat(Complex::default()))
        .take(len)
        .collect()
}
