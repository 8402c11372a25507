/// Numerical layer: turns filtered columns into plottable series.
///
/// ```text
///   filtered column values
///        │
///        ├──► pp         empirical CDF step curve + binomial confidence band
///        │      └──► beta    regularized incomplete beta and its inverse
///        │
///        └──► histogram  log-spaced edges, counts, cumulative / density
/// ```

pub mod beta;
pub mod histogram;
pub mod pp;
