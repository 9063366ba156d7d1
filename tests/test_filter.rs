mod common;
use cafilt::filter::{design_bandpass, filter_1d, ZeroPhaseFir};
use std::f64::consts::PI;

const FS: f64 = 1000.0;
const N: usize = 6000;

fn sine(freq: f64) -> Vec<f64> {
    (0..N).map(|i| (2.0 * PI * freq * i as f64 / FS).sin()).collect()
}

fn rms(x: &[f64]) -> f64 {
    (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
}

/// Samples further than one kernel length from either end.
fn interior(x: &[f64]) -> &[f64] {
    &x[1700..N - 1700]
}

// ── Coefficient tests ─────────────────────────────────────────────────────────

#[test]
fn detection_band_kernel_shape() {
    let h = design_bandpass(5.0, 15.0, FS).unwrap();
    assert_eq!(h.len(), 1651);

    // Band-pass: zero DC gain.
    let s: f64 = h.iter().sum();
    assert!(s.abs() < 1e-9, "sum(h) = {s:.2e}, expected ≈ 0 for band-pass");

    let n = h.len();
    for i in 0..n / 2 {
        assert!((h[i] - h[n - 1 - i]).abs() < 1e-12, "h[{i}] ≠ h[{}]", n - 1 - i);
    }
}

#[test]
fn band_must_fit_below_nyquist() {
    assert!(design_bandpass(5.0, 15.0, 25.0).is_err());
    assert!(design_bandpass(15.0, 5.0, FS).is_err());
    assert!(design_bandpass(0.0, 15.0, FS).is_err());
}

// ── Application tests ─────────────────────────────────────────────────────────

#[test]
fn pass_band_sine_is_preserved() {
    let h = design_bandpass(5.0, 15.0, FS).unwrap();
    let x = sine(10.0);
    let y = filter_1d(&x, &h).unwrap();
    assert_eq!(y.len(), x.len());

    // No phase shift: the interior matches the input sample for sample.
    let err = common::max_abs_diff(interior(&y), interior(&x));
    assert!(err < 0.01, "max pass-band error {err:.2e}");
}

#[test]
fn stop_band_sines_are_removed() {
    let fir = ZeroPhaseFir::new(design_bandpass(5.0, 15.0, FS).unwrap()).unwrap();
    for freq in [0.5, 60.0, 100.0] {
        let y = fir.apply(&sine(freq));
        let r = rms(interior(&y));
        assert!(r < 0.01, "{freq} Hz RMS {r:.2e} after filtering");
    }
}

#[test]
fn mixture_keeps_only_the_band() {
    let fir = ZeroPhaseFir::new(design_bandpass(5.0, 15.0, FS).unwrap()).unwrap();
    let x: Vec<f64> = sine(10.0)
        .iter()
        .zip(sine(0.5))
        .zip(sine(60.0))
        .map(|((a, b), c)| a + b + c)
        .collect();
    let r = rms(interior(&fir.apply(&x)));
    // Pure 10 Hz sine has RMS 1/√2.
    assert!((r - 0.5_f64.sqrt()).abs() < 0.01, "RMS {r:.4}");
}
