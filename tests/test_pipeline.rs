mod common;
use common::{bump, fixed_detector, kept, level_detector, noise, place};
use cafilt::{
    build_mask, correlation_trace, local_maxima, FilterConfig, MaskPolicy, PatternFilter, BASELINE_KEEP,
};
use ndarray::Array2;

const HALF: usize = 50;

/// Three unit bumps; the level detector finds exactly their centres.
fn reference() -> Vec<f64> {
    place(1000, &[150, 450, 750], &bump(HALF), 1.0)
}

fn filter() -> PatternFilter<impl Fn(&[f64], f64) -> anyhow::Result<cafilt::Detection> + Sync + Clone> {
    PatternFilter::new(&reference(), FilterConfig::default(), level_detector(0.5)).unwrap()
}

/// Matching bump at 300, narrow bump at 700, square pulse at 1100, wide bump
/// at 1500 (all 0.6 high) and a lone 2.0 spike at 1800.
fn mixed_target() -> Vec<f64> {
    let n = 2000;
    let mut x = place(n, &[300], &bump(HALF), 0.6);
    for (c, h) in [(700, 20), (1500, 90)] {
        for (v, b) in x.iter_mut().zip(place(n, &[c], &bump(h), 0.6)) {
            *v += b;
        }
    }
    x[1070..=1130].iter_mut().for_each(|v| *v += 0.6);
    x[1800] = 2.0;
    x
}

fn within(i: usize, centres: &[usize], radius: usize) -> bool {
    centres.iter().any(|&c| i.abs_diff(c) <= radius)
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn identical_target_keeps_its_events() {
    let f = filter();
    let x = reference();
    let report = f.filter_row_detailed(&x, true).unwrap();

    let maxima: Vec<usize> = report.maxima.iter().map(|m| m.location).collect();
    assert_eq!(maxima, vec![150, 450, 750]);

    for (i, (&m, (&y, &s))) in report.mask.iter().zip(report.filtered.iter().zip(&x)).enumerate() {
        if within(i, &[150, 450, 750], 40) {
            assert_eq!(m, 1.0, "sample {i} not kept");
            assert_eq!(y, s, "sample {i} altered");
        } else {
            assert_eq!(m, BASELINE_KEEP, "sample {i} not at baseline");
        }
    }
}

#[test]
fn pure_noise_is_suppressed() {
    let f = filter();
    let x = noise(1000, 7, 0.05);

    let strict = f.filter_row(&x, false).unwrap();
    assert!(strict.iter().all(|&v| v == 0.0));

    let baseline = f.filter_row(&x, true).unwrap();
    for (y, s) in baseline.iter().zip(&x) {
        assert_eq!(*y, BASELINE_KEEP * s);
    }
}

#[test]
fn baseline_policy_keeps_matches_and_tall_samples() {
    let f = PatternFilter::new(&reference(), FilterConfig::default(), level_detector(0.5)).unwrap();
    let f = PatternFilter::with_template(
        f.template().clone(),
        FilterConfig::default(),
        fixed_detector(vec![300, 1800], vec![0.9, 0.9]),
    )
    .unwrap();
    let x = mixed_target();
    let report = f.filter_row_detailed(&x, true).unwrap();

    let maxima: Vec<usize> = report.maxima.iter().map(|m| m.location).collect();
    assert_eq!(maxima, vec![300, 1100, 1500]);
    approx::assert_abs_diff_eq!(report.peak_threshold, 0.9, epsilon = 1e-12);

    let expected: Vec<usize> = (0..x.len())
        .filter(|&i| within(i, &[300, 1100, 1500], 40) || within(i, &[1800], 10))
        .collect();
    assert_eq!(kept(&report.mask), expected);
}

#[test]
fn strict_policy_gates_matches_by_peak_threshold() {
    let f = PatternFilter::new(&reference(), FilterConfig::default(), level_detector(0.5)).unwrap();
    let f = PatternFilter::with_template(
        f.template().clone(),
        FilterConfig::default(),
        fixed_detector(vec![300, 1800], vec![0.9, 0.9]),
    )
    .unwrap();
    let x = mixed_target();
    let report = f.filter_row_detailed(&x, false).unwrap();

    // Square pulse (r ≈ 0.87) and the spike are dropped; r > 0.9 matches stay.
    let expected: Vec<usize> = (0..x.len()).filter(|&i| within(i, &[300, 1500], 40)).collect();
    assert_eq!(kept(&report.mask), expected);
    for (i, &y) in report.filtered.iter().enumerate() {
        if !within(i, &[300, 1500], 40) {
            assert_eq!(y, 0.0, "sample {i} not suppressed");
        }
    }
}

#[test]
fn target_without_events_uses_unreachable_threshold() {
    let f = PatternFilter::new(&reference(), FilterConfig::default(), level_detector(0.5)).unwrap();
    let f = PatternFilter::with_template(f.template().clone(), FilterConfig::default(), fixed_detector(vec![], vec![]))
        .unwrap();
    let x = mixed_target();

    let strict = f.filter_row_detailed(&x, false).unwrap();
    assert_eq!(strict.peak_threshold, f64::INFINITY);
    assert!(strict.filtered.iter().all(|&v| v == 0.0));

    // Correlation maxima still count under the baseline policy.
    let baseline = f.filter_row_detailed(&x, true).unwrap();
    let expected: Vec<usize> = (0..x.len()).filter(|&i| within(i, &[300, 1100, 1500], 40)).collect();
    assert_eq!(kept(&baseline.mask), expected);
}

// ── Properties ────────────────────────────────────────────────────────────────

#[test]
fn output_length_matches_input() {
    let f = filter();
    for n in [0, 1, 2, 100, 101, 102, 1000, 2500] {
        let x = noise(n, n as u64, 1.0);
        assert_eq!(f.filter_row(&x, true).unwrap().len(), n);
        assert_eq!(f.filter_row(&x, false).unwrap().len(), n);
    }
}

#[test]
fn baseline_policy_never_zeroes_nonzero_samples() {
    let f = filter();
    let x: Vec<f64> = mixed_target().iter().zip(noise(2000, 5, 0.2)).map(|(a, b)| a + b).collect();
    let y = f.filter_row(&x, true).unwrap();
    for (i, (&yi, &xi)) in y.iter().zip(&x).enumerate() {
        if xi != 0.0 {
            assert!(yi != 0.0, "sample {i} zeroed");
        }
    }
}

#[test]
fn trace_is_bounded_and_finite() {
    let f = filter();
    let mut x = mixed_target();
    x[400..600].fill(0.5); // flat stretch: zero-variance windows
    let report = f.filter_row_detailed(&x, true).unwrap();
    assert!(report.trace.degenerate() > 0);
    for &v in report.trace.values() {
        assert!(v.is_finite() && (-1.0..=1.0).contains(&v), "trace value {v}");
    }
}

#[test]
fn edges_never_hold_correlation_maxima() {
    let f = filter();
    // Events hugging both ends of the signal.
    let n = 600;
    let mut x = place(n, &[HALF, 300, n - 1 - HALF], &bump(HALF), 1.0);
    x.iter_mut().zip(noise(n, 9, 0.05)).for_each(|(v, e)| *v += e);

    let report = f.filter_row_detailed(&x, true).unwrap();
    let trace = report.trace.values();
    assert!(trace[..HALF].iter().all(|&v| v == 0.0));
    assert!(trace[n - HALF..].iter().all(|&v| v == 0.0));
    for m in &report.maxima {
        assert!((HALF..n - HALF).contains(&m.location), "maximum at {}", m.location);
    }
}

#[test]
fn edges_never_receive_correlation_keep_marks() {
    let f = filter();
    let n = 600;
    let edges = [HALF, n - 1 - HALF];
    let x = place(n, &edges, &bump(HALF), 1.0);

    // Matching events sit exactly on the first and last scored centres.
    let strict = PatternFilter::with_template(
        f.template().clone(),
        FilterConfig::default(),
        fixed_detector(vec![HALF], vec![0.5]),
    )
    .unwrap()
    .filter_row_detailed(&x, false)
    .unwrap();
    let maxima: Vec<usize> = strict.maxima.iter().map(|m| m.location).collect();
    assert_eq!(maxima, edges.to_vec());
    assert!(strict.mask[..HALF].iter().all(|&m| m == 0.0));
    assert!(strict.mask[n - HALF..].iter().all(|&m| m == 0.0));
    let expected: Vec<usize> = (HALF..=HALF + 40).chain(n - 1 - HALF - 40..=n - 1 - HALF).collect();
    assert_eq!(kept(&strict.mask), expected);

    // Without amplitude marks the baseline policy leaves the edges at the floor too.
    let baseline = PatternFilter::with_template(f.template().clone(), FilterConfig::default(), fixed_detector(vec![], vec![]))
        .unwrap()
        .filter_row_detailed(&x, true)
        .unwrap();
    assert!(baseline.mask[..HALF].iter().all(|&m| m == BASELINE_KEEP));
    assert!(baseline.mask[n - HALF..].iter().all(|&m| m == BASELINE_KEEP));
    assert_eq!(kept(&baseline.mask), expected);
}

#[test]
fn nan_sample_does_not_spread() {
    let f = filter();
    let mut x = mixed_target();
    x[500] = f64::NAN;
    for consider_peak in [true, false] {
        let report = f.filter_row_detailed(&x, consider_peak).unwrap();
        assert!(report.trace.values().iter().all(|v| v.is_finite()));
        assert!(report.mask.iter().all(|m| m.is_finite()));
        let nan_at: Vec<usize> = (0..x.len()).filter(|&i| report.filtered[i].is_nan()).collect();
        assert_eq!(nan_at, vec![500]);
    }
}

#[test]
fn raising_corr_threshold_never_adds_correlation_keeps() {
    let f = filter();
    let x = mixed_target();
    let cfg = FilterConfig::default();

    let counts: Vec<usize> = [0.3, 0.5, 0.7, 0.8, 0.9, 0.95, 0.999]
        .iter()
        .map(|&thr| {
            let trace = correlation_trace(&x, f.template(), thr);
            let maxima = local_maxima(trace.values());
            // Gate at −∞: every correlation maximum contributes.
            let mask = build_mask(&x, &maxima, f64::NEG_INFINITY, MaskPolicy::Strict, &cfg);
            kept(&mask).len()
        })
        .collect();

    assert!(counts.windows(2).all(|w| w[1] <= w[0]), "counts {counts:?}");
    assert_eq!(counts[0], 4 * 81);
    assert_eq!(counts[3], 3 * 81);
    assert_eq!(counts[4], 2 * 81);
}

#[test]
fn refiltering_does_not_grow_retained_region() {
    let f = filter();
    let x = reference();
    let first = f.filter_row_detailed(&x, true).unwrap();
    let second = f.filter_row_detailed(&first.filtered, true).unwrap();
    let kept_first = kept(&first.mask);
    for i in kept(&second.mask) {
        assert!(kept_first.binary_search(&i).is_ok(), "sample {i} newly retained");
    }
}

// ── Batch ─────────────────────────────────────────────────────────────────────

#[test]
fn matrix_rows_match_single_row_calls() {
    let f = filter();
    let rows = [reference(), noise(1000, 1, 0.3), place(1000, &[500], &bump(HALF), 0.7)];
    let mut data = Array2::<f64>::zeros((3, 1000));
    for (r, row) in rows.iter().enumerate() {
        data.row_mut(r).assign(&ndarray::ArrayView1::from(row));
    }

    let (out, masks) = f.filter_matrix_detailed(data.view(), &[1]).unwrap();
    assert_eq!(out.dim(), (3, 1000));
    assert_eq!(masks.dim(), (3, 1000));
    for (r, row) in rows.iter().enumerate() {
        let single = f.filter_row(row, r != 1).unwrap();
        assert_eq!(out.row(r).to_vec(), single, "row {r}");
    }
}

#[test]
fn matrix_uses_reference_row() {
    let mut data = Array2::<f64>::zeros((2, 1000));
    data.row_mut(0).assign(&ndarray::ArrayView1::from(&reference()));
    data.row_mut(1).assign(&ndarray::ArrayView1::from(&noise(1000, 2, 0.05)));

    let out = cafilt::filter_matrix(data.view(), 0, &[], FilterConfig::default(), level_detector(0.5)).unwrap();
    let expected = filter().filter_row(&reference(), true).unwrap();
    assert_eq!(out.row(0).to_vec(), expected);
}
