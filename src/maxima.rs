//! Local-maximum extraction.
//!
//! A local maximum is a sample strictly greater than both of its neighbours.
//! The first and last samples have only one neighbour and are never reported.
//! No height, prominence or spacing filter is applied here; callers threshold
//! the input beforehand (see [`crate::correlate`]).

/// One local maximum of a 1-D sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalMaximum {
    pub location: usize,
    pub value: f64,
}

/// All strict local maxima of `values`, in increasing location order.
pub fn local_maxima(values: &[f64]) -> Vec<LocalMaximum> {
    values
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0] && w[1] > w[2])
        .map(|(i, w)| LocalMaximum { location: i + 1, value: w[1] })
        .collect()
}

/// Local maxima separated by at least `distance` samples.
///
/// Candidates are visited from tallest to shortest; each kept maximum
/// suppresses every other candidate closer than `distance`.  Ties keep the
/// earlier location.  The result is in increasing location order.
pub fn local_maxima_with_distance(values: &[f64], distance: usize) -> Vec<LocalMaximum> {
    let peaks = local_maxima(values);
    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| peaks[b].value.total_cmp(&peaks[a].value).then(a.cmp(&b)));

    let mut keep = vec![true; peaks.len()];
    for &i in &order {
        if !keep[i] {
            continue;
        }
        let loc = peaks[i].location;
        for j in (0..i).rev().take_while(|&j| loc - peaks[j].location < distance) {
            keep[j] = false;
        }
        for j in (i + 1..peaks.len()).take_while(|&j| peaks[j].location - loc < distance) {
            keep[j] = false;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}
