//! Probability–probability curves and their binomial confidence band

use super::beta::beta_interval;

/// Empirical CDF of `values` against rank fraction.
///
/// Non-finite values are dropped. For `n` remaining values sorted ascending
/// `v1..vn` the result is `x = [0, v1, .., vn, 1]` and
/// `y = [0, 1/n, .., n/n, 1]`. Empty input gives empty output.
pub fn empirical_cdf(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return (Vec::new(), Vec::new());
    }
    sorted.sort_unstable_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mut xs = Vec::with_capacity(sorted.len() + 2);
    let mut ys = Vec::with_capacity(sorted.len() + 2);
    xs.push(0.0);
    ys.push(0.0);
    for (i, v) in sorted.into_iter().enumerate() {
        xs.push(v);
        ys.push((i + 1) as f64 / n);
    }
    xs.push(1.0);
    ys.push(1.0);
    (xs, ys)
}

/// Vertices of a "steps-post" path through `(xs[i], ys[i])`: each `y` holds
/// until the next `x`.
pub fn step_post(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    let mut path = Vec::with_capacity(2 * xs.len());
    for (i, (&x, &y)) in xs.iter().zip(ys).enumerate() {
        if i > 0 {
            path.push((x, ys[i - 1]));
        }
        path.push((x, y));
    }
    path
}

/// The P–P step curve for one dataset's searched probabilities.
pub fn pp_curve(values: &[f64]) -> Vec<(f64, f64)> {
    let (xs, ys) = empirical_cdf(values);
    step_post(&xs, &ys)
}

/// Binomial confidence band around the diagonal of a P–P plot.
///
/// Row `k` of the band spans `lo[k]..hi[k]` horizontally at height
/// `p[k] = k / n`, the central `confidence` interval of `Beta(k+1, n-k+1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceBand {
    pub p: Vec<f64>,
    pub lo: Vec<f64>,
    pub hi: Vec<f64>,
}

impl ConfidenceBand {
    /// Band for `n` samples at the given coverage (a fraction, e.g. 0.95).
    ///
    /// Returns `None` for `n == 0`.
    pub fn new(n: usize, confidence: f64) -> Option<Self> {
        if n == 0 {
            return None;
        }
        let nf = n as f64;
        let mut band = ConfidenceBand {
            p: Vec::with_capacity(n + 1),
            lo: Vec::with_capacity(n + 1),
            hi: Vec::with_capacity(n + 1),
        };
        for k in 0..=n {
            let kf = k as f64;
            let (lo, hi) = beta_interval(confidence, kf + 1.0, nf - kf + 1.0);
            band.p.push(kf / nf);
            band.lo.push(lo);
            band.hi.push(hi);
        }
        Some(band)
    }

    /// Number of samples the band was computed for.
    pub fn samples(&self) -> usize {
        self.p.len().saturating_sub(1)
    }

    /// Closed outline of the band: up the lower edge, back down the upper.
    pub fn polygon(&self) -> Vec<(f64, f64)> {
        self.lo
            .iter()
            .zip(&self.p)
            .map(|(&x, &y)| (x, y))
            .chain(self.hi.iter().zip(&self.p).rev().map(|(&x, &y)| (x, y)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empirical_cdf() {
        let (xs, ys) = empirical_cdf(&[0.8, 0.2, f64::NAN, 0.5]);
        assert_eq!(xs, vec![0.0, 0.2, 0.5, 0.8, 1.0]);
        assert_eq!(ys, vec![0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0, 1.0]);
    }

    #[test]
    fn test_empirical_cdf_empty() {
        assert_eq!(empirical_cdf(&[]), (vec![], vec![]));
        assert_eq!(empirical_cdf(&[f64::NAN]), (vec![], vec![]));
        assert!(pp_curve(&[]).is_empty());
    }

    #[test]
    fn test_step_post_path() {
        let path = step_post(&[0.0, 0.5, 1.0], &[0.0, 0.5, 1.0]);
        assert_eq!(
            path,
            vec![(0.0, 0.0), (0.5, 0.0), (0.5, 0.5), (1.0, 0.5), (1.0, 1.0)]
        );
    }

    #[test]
    fn test_band_shape() {
        let band = ConfidenceBand::new(10, 0.95).unwrap();
        assert_eq!(band.samples(), 10);
        assert_eq!(band.p.len(), 11);
        assert_eq!(band.p[0], 0.0);
        assert_eq!(band.p[10], 1.0);
        for k in 0..=10 {
            assert!(band.lo[k] < band.hi[k]);
        }
        // Beta(1, 11): lower quantile in closed form
        let expected = 1.0 - 0.975_f64.powf(1.0 / 11.0);
        assert!((band.lo[0] - expected).abs() < 1e-12);
        // symmetric about the diagonal
        assert!((band.lo[3] - (1.0 - band.hi[7])).abs() < 1e-12);
        assert_eq!(band.polygon().len(), 22);
    }

    #[test]
    fn test_band_narrows_with_more_samples() {
        let small = ConfidenceBand::new(10, 0.9).unwrap();
        let large = ConfidenceBand::new(1000, 0.9).unwrap();
        assert!(large.hi[500] - large.lo[500] < small.hi[5] - small.lo[5]);
    }

    #[test]
    fn test_no_band_without_samples() {
        assert!(ConfidenceBand::new(0, 0.95).is_none());
    }
}
