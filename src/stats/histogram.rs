//! Log-spaced histograms drawn as step outlines

/// Number of bins for cumulative histograms.
pub const CUMULATIVE_BIN_COUNT: usize = 1000;
/// Number of bins otherwise.
pub const BIN_COUNT: usize = 20;

/// Bin count for the requested display mode.
pub fn bin_count(cumulative: bool) -> usize {
    if cumulative {
        CUMULATIVE_BIN_COUNT
    } else {
        BIN_COUNT
    }
}

/// Values that can be placed on a log axis: finite and strictly positive.
pub fn loggable(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite() && *v > 0.0)
}

/// Smallest and largest loggable value across several columns.
pub fn pooled_range<'a, I>(columns: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    columns
        .into_iter()
        .flat_map(|column| loggable(column))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}

/// `bins + 1` edges spaced uniformly in `log10` from `min` to `max`.
///
/// The end points are exactly `min` and `max`. A degenerate range widens to
/// `[min, 10 * min]`.
pub fn log_edges(min: f64, max: f64, bins: usize) -> Vec<f64> {
    let bins = bins.max(1);
    let max = if min >= max { min * 10.0 } else { max };
    let (log_min, log_max) = (min.log10(), max.log10());
    let step = (log_max - log_min) / bins as f64;

    let mut edges: Vec<f64> = (0..=bins)
        .map(|i| 10f64.powf(log_min + step * i as f64))
        .collect();
    edges[0] = min;
    edges[bins] = max;
    edges
}

/// Bin heights over fixed edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub heights: Vec<f64>,
}

impl Histogram {
    /// Histogram of the loggable `values` over `edges`.
    ///
    /// Bins are half open except the last, which also holds the top edge;
    /// values outside the edges are ignored.
    /// * `density` divides each count by `total * bin_width`
    /// * `cumulative` accumulates heights left to right; combined with
    ///   `density` the accumulated quantity is the fraction of values, so
    ///   the last bin reaches 1
    pub fn new(values: &[f64], edges: &[f64], cumulative: bool, density: bool) -> Self {
        let bins = edges.len().saturating_sub(1);
        let mut counts = vec![0.0; bins];

        if bins > 0 {
            let (first, last) = (edges[0], edges[bins]);
            for v in loggable(values).filter(|v| *v >= first && *v <= last) {
                let idx = edges.partition_point(|&e| e <= v).saturating_sub(1);
                counts[idx.min(bins - 1)] += 1.0;
            }
        }

        let total: f64 = counts.iter().sum();
        let mut heights = counts;
        if density && total > 0.0 {
            for (i, h) in heights.iter_mut().enumerate() {
                *h /= total;
                if !cumulative {
                    *h /= edges[i + 1] - edges[i];
                }
            }
        }
        if cumulative {
            let mut running = 0.0;
            for h in heights.iter_mut() {
                running += *h;
                *h = running;
            }
        }

        Histogram {
            edges: edges.to_vec(),
            heights,
        }
    }

    /// Vertices of the step outline, starting and ending on the baseline.
    pub fn outline(&self) -> Vec<(f64, f64)> {
        let Some(&first) = self.edges.first() else {
            return Vec::new();
        };
        let mut path = Vec::with_capacity(2 * self.heights.len() + 2);
        path.push((first, 0.0));
        for (i, &h) in self.heights.iter().enumerate() {
            path.push((self.edges[i], h));
            path.push((self.edges[i + 1], h));
        }
        if let Some(&last) = self.edges.last() {
            path.push((last, 0.0));
        }
        path
    }

    pub fn max_height(&self) -> f64 {
        self.heights.iter().copied().fold(0.0, f64::max)
    }
}
