/// Shared helpers: synthetic traces and stand-in detectors.
use cafilt::detect::{Detection, PeakSet};
use std::f64::consts::PI;

#[allow(unused)]
/// Raised-cosine bump of width `2 * half + 1`: 0 at both ends, 1 in the centre.
pub fn bump(half: usize) -> Vec<f64> {
    (0..=2 * half)
        .map(|k| 0.5 * (1.0 - (PI * k as f64 / half as f64).cos()))
        .collect()
}

#[allow(unused)]
/// `n` zeros with `scale · shape` centred on each of `centres`.
pub fn place(n: usize, centres: &[usize], shape: &[f64], scale: f64) -> Vec<f64> {
    let half = shape.len() / 2;
    let mut x = vec![0.0; n];
    for &c in centres {
        for (k, &v) in shape.iter().enumerate() {
            x[c - half + k] += scale * v;
        }
    }
    x
}

#[allow(unused)]
/// Deterministic pseudo-noise in `[-amp, amp]`.
pub fn noise(n: usize, seed: u64, amp: f64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            amp * (2.0 * unit - 1.0)
        })
        .collect()
}

#[allow(unused)]
/// Detector reporting the same events for every signal.
pub fn fixed_detector(
    indices: Vec<usize>,
    amplitudes: Vec<f64>,
) -> impl Fn(&[f64], f64) -> anyhow::Result<Detection> + Sync + Clone {
    move |_: &[f64], _: f64| Ok(Detection::new(PeakSet::new(indices.clone(), amplitudes.clone())?))
}

#[allow(unused)]
/// Detector reporting every strict local maximum above `level`, with the
/// sample value as amplitude.
pub fn level_detector(level: f64) -> impl Fn(&[f64], f64) -> anyhow::Result<Detection> + Sync + Clone {
    move |x: &[f64], _: f64| {
        let (idx, amp): (Vec<usize>, Vec<f64>) = x
            .windows(3)
            .enumerate()
            .filter(|(_, w)| w[1] > level && w[1] > w[0] && w[1] > w[2])
            .map(|(i, w)| (i + 1, w[1]))
            .unzip();
        Ok(Detection::new(PeakSet::new(idx, amp)?))
    }
}

#[allow(unused)]
/// Indices where `mask` equals 1.
pub fn kept(mask: &[f64]) -> Vec<usize> {
    mask.iter().enumerate().filter(|&(_, &m)| m == 1.0).map(|(i, _)| i).collect()
}

#[allow(unused)]
/// Maximum absolute difference between two slices.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}
