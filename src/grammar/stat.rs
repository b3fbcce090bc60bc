//! Statistical transforms behind the geoms: binning, box statistics, smoothing

use crate::error::{PlotError, Result};

/// Number of points a smooth curve is evaluated at
pub const SMOOTH_EVAL_POINTS: usize = 80;

/// Tolerance used when snapping values onto bin boundaries
const EDGE_EPS: f64 = 1e-9;

/// Upper bound on the number of fixed-width bins
pub const MAX_BINS: usize = 100_000;

/// How histogram bins are chosen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binning {
    /// Fixed-width bins with boundaries on integer multiples of the width
    Width(f64),
    /// This many equal-width bins spanning [min, max]
    Count(usize),
}

/// One histogram bin, closed on the left except for the last bin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub xmin: f64,
    pub xmax: f64,
    pub count: usize,
}

/// Compute bin edges for `values`
///
/// Returns an empty vector when there are no finite values.
pub fn bin_edges(values: &[f64], binning: Binning) -> Result<Vec<f64>> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if let Binning::Width(w) = binning {
        if !(w.is_finite() && w > 0.0) {
            return Err(PlotError::InvalidBinWidth(w));
        }
    }
    if finite.is_empty() {
        return Ok(Vec::new());
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    match binning {
        Binning::Width(w) => {
            let k_min = (min / w + EDGE_EPS).floor();
            let k_max = (max / w - EDGE_EPS).ceil();
            let span = k_max - k_min;
            if !span.is_finite() || span > MAX_BINS as f64 {
                return Err(PlotError::Scale(format!(
                    "bin width {} over [{}, {}] needs more than {} bins",
                    w, min, max, MAX_BINS
                )));
            }
            let k_min = k_min as i64;
            let mut k_max = k_max as i64;
            if k_max <= k_min {
                k_max = k_min + 1;
            }
            Ok((k_min..=k_max).map(|k| k as f64 * w).collect())
        }
        Binning::Count(n) => {
            let n = n.max(1);
            if max - min <= 0.0 {
                // Degenerate range: one unit-wide bin centered on the value
                return Ok(vec![min - 0.5, max + 0.5]);
            }
            let width = (max - min) / n as f64;
            let mut edges: Vec<f64> = (0..n).map(|i| min + i as f64 * width).collect();
            edges.push(max);
            Ok(edges)
        }
    }
}

/// Count `values` into the bins defined by `edges`
///
/// Values outside the edges are ignored; the maximum edge is inclusive.
pub fn histogram(values: &[f64], edges: &[f64]) -> Vec<HistogramBin> {
    if edges.len() < 2 {
        return Vec::new();
    }
    let mut counts = vec![0usize; edges.len() - 1];
    let lo = edges[0];
    let hi = edges[edges.len() - 1];

    for &v in values.iter().filter(|v| v.is_finite()) {
        if v < lo - EDGE_EPS || v > hi + EDGE_EPS {
            continue;
        }
        // partition_point gives the first edge strictly above v
        let upper = edges.partition_point(|e| *e <= v + EDGE_EPS * e.abs().max(1.0));
        let idx = upper.saturating_sub(1).min(counts.len() - 1);
        counts[idx] += 1;
    }

    edges
        .windows(2)
        .zip(counts)
        .map(|(w, count)| HistogramBin {
            xmin: w[0],
            xmax: w[1],
            count,
        })
        .collect()
}

/// Five-number summary plus outliers for a boxplot
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Quantile with linear interpolation between order statistics (R type 7)
///
/// `sorted` must be sorted ascending and non-empty.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Box statistics; whiskers reach the most extreme values within 1.5 IQR
pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let inside: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v >= lower_fence && *v <= upper_fence)
        .collect();
    let lower_whisker = inside.first().copied().unwrap_or(q1);
    let upper_whisker = inside.last().copied().unwrap_or(q3);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < lower_fence || *v > upper_fence)
        .collect();

    Some(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

/// Least-squares line `y = intercept + slope * x`
///
/// Returns None with fewer than two points or no spread in x.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        sxx += dx * dx;
        sxy += dx * (ys[i] - mean_y);
    }
    if sxx <= f64::EPSILON * n as f64 {
        return None;
    }
    let slope = sxy / sxx;
    Some((mean_y - slope * mean_x, slope))
}

/// Evenly spaced evaluation grid over the range of `xs`
fn eval_grid(xs: &[f64], n_points: usize) -> Option<Vec<f64>> {
    let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(min.is_finite() && max.is_finite()) || max <= min {
        return None;
    }
    let n = n_points.max(2);
    let step = (max - min) / (n - 1) as f64;
    Some((0..n).map(|i| min + i as f64 * step).collect())
}

/// Linear fit evaluated across the x range
pub fn linear_curve(xs: &[f64], ys: &[f64], n_points: usize) -> Vec<(f64, f64)> {
    let Some((intercept, slope)) = linear_fit(xs, ys) else {
        return Vec::new();
    };
    eval_grid(xs, n_points)
        .unwrap_or_default()
        .into_iter()
        .map(|x| (x, intercept + slope * x))
        .collect()
}

/// Local linear regression (loess, degree 1) with tricube weights
///
/// Each evaluation point is fitted from the `ceil(span * n)` nearest
/// observations (at least two).
pub fn loess_curve(xs: &[f64], ys: &[f64], span: f64, n_points: usize) -> Vec<(f64, f64)> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return Vec::new();
    }
    let Some(grid) = eval_grid(&xs[..n], n_points) else {
        return Vec::new();
    };
    let q = ((span * n as f64).ceil() as usize).clamp(2, n);

    let mut distances = vec![0.0; n];
    grid.into_iter()
        .filter_map(|x0| {
            for i in 0..n {
                distances[i] = (xs[i] - x0).abs();
            }
            let mut sorted = distances.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let mut h = sorted[q - 1];
            if span > 1.0 {
                h *= span;
            }

            let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for i in 0..n {
                let w = if h > 0.0 {
                    let u = distances[i] / h;
                    if u < 1.0 {
                        (1.0 - u.powi(3)).powi(3)
                    } else {
                        0.0
                    }
                } else if distances[i] == 0.0 {
                    1.0
                } else {
                    0.0
                };
                sw += w;
                swx += w * xs[i];
                swy += w * ys[i];
                swxx += w * xs[i] * xs[i];
                swxy += w * xs[i] * ys[i];
            }
            if sw <= 0.0 {
                return None;
            }

            let mean_x = swx / sw;
            let mean_y = swy / sw;
            let var_x = swxx / sw - mean_x * mean_x;
            let y = if var_x.abs() <= 1e-12 * (1.0 + mean_x * mean_x) {
                mean_y
            } else {
                let slope = (swxy / sw - mean_x * mean_y) / var_x;
                mean_y + slope * (x0 - mean_x)
            };
            Some((x0, y))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_binwidth_edges_are_multiples() {
        let values: Vec<f64> = (0..40).map(|i| 0.503 + i as f64 * 0.0137).collect();
        let w = 0.01;
        let edges = bin_edges(&values, Binning::Width(w)).unwrap();

        for e in &edges {
            let k = (e / w).round();
            assert_close(*e, k * w);
        }
        for pair in edges.windows(2) {
            assert_close(pair[1] - pair[0], w);
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(edges[0] <= min);
        assert!(*edges.last().unwrap() >= max);
        assert!(edges[0] > min - w);
        assert!(*edges.last().unwrap() < max + w);

        let bins = histogram(&values, &edges);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
    }

    #[test]
    fn test_binwidth_on_exact_boundaries() {
        let values = [0.1, 0.2, 0.3];
        let edges = bin_edges(&values, Binning::Width(0.1)).unwrap();
        assert_eq!(edges.len(), 3);
        assert_close(edges[0], 0.1);
        assert_close(edges[2], 0.3);

        let bins = histogram(&values, &edges);
        assert_eq!(bins.iter().map(|b| b.count).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_invalid_binwidth() {
        assert!(matches!(
            bin_edges(&[1.0], Binning::Width(0.0)),
            Err(PlotError::InvalidBinWidth(_))
        ));
        assert!(bin_edges(&[1.0], Binning::Width(f64::NAN)).is_err());
        assert!(bin_edges(&[1.0], Binning::Width(-0.5)).is_err());
    }

    #[test]
    fn test_binwidth_too_fine_for_range() {
        assert!(matches!(
            bin_edges(&[0.0, 1e17], Binning::Width(0.01)),
            Err(PlotError::Scale(_))
        ));
        assert!(matches!(
            bin_edges(&[0.0, 1e4], Binning::Width(0.01)),
            Err(PlotError::Scale(_))
        ));
        assert!(bin_edges(&[-1.0, 1.0], Binning::Width(1e-310)).is_err());
        let edges = bin_edges(&[0.0, 1000.0], Binning::Width(0.01)).unwrap();
        assert_eq!(edges.len(), MAX_BINS + 1);
    }

    #[test]
    fn test_default_bin_count() {
        let values: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let edges = bin_edges(&values, Binning::Count(30)).unwrap();
        assert_eq!(edges.len(), 31);
        assert_close(edges[0], 0.0);
        assert_close(edges[30], 100.0);

        let bins = histogram(&values, &edges);
        assert_eq!(bins.len(), 30);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 101);
    }

    #[test]
    fn test_degenerate_and_empty_bins() {
        let edges = bin_edges(&[2.0, 2.0], Binning::Count(30)).unwrap();
        assert_eq!(edges, vec![1.5, 2.5]);
        assert_eq!(histogram(&[2.0, 2.0], &edges)[0].count, 2);

        assert!(bin_edges(&[], Binning::Count(30)).unwrap().is_empty());
        assert!(bin_edges(&[f64::NAN], Binning::Width(0.1)).unwrap().is_empty());
    }

    #[test]
    fn test_quantile_type7() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_close(quantile(&sorted, 0.25), 1.75);
        assert_close(quantile(&sorted, 0.5), 2.5);
        assert_close(quantile(&sorted, 0.75), 3.25);
    }

    #[test]
    fn test_box_stats_with_outlier() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 100.0];
        let stats = box_stats(&values).unwrap();
        assert_close(stats.q1, 3.0);
        assert_close(stats.median, 5.0);
        assert_close(stats.q3, 7.0);
        assert_close(stats.lower_whisker, 1.0);
        assert_close(stats.upper_whisker, 8.0);
        assert_eq!(stats.outliers, vec![100.0]);

        assert!(box_stats(&[]).is_none());
    }

    #[test]
    fn test_linear_fit_recovers_line() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 + 0.5 * x).collect();
        let (intercept, slope) = linear_fit(&xs, &ys).unwrap();
        assert_close(intercept, 2.0);
        assert_close(slope, 0.5);

        let curve = linear_curve(&xs, &ys, SMOOTH_EVAL_POINTS);
        assert_eq!(curve.len(), SMOOTH_EVAL_POINTS);
        assert_close(curve[0].0, 0.0);
        assert_close(curve[SMOOTH_EVAL_POINTS - 1].1, 6.5);

        assert!(linear_fit(&[1.0, 1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_loess_follows_linear_data() {
        let xs: Vec<f64> = (0..50).map(|i| i as f64 * 0.2).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 1.0 - 3.0 * x).collect();
        let curve = loess_curve(&xs, &ys, 0.75, SMOOTH_EVAL_POINTS);
        assert_eq!(curve.len(), SMOOTH_EVAL_POINTS);
        for (x, y) in curve {
            assert!((y - (1.0 - 3.0 * x)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_loess_degenerate_inputs() {
        assert!(loess_curve(&[1.0], &[1.0], 0.75, 80).is_empty());
        assert!(loess_curve(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0], 0.75, 80).is_empty());
    }
}
