use std::fmt;
use std::path::PathBuf;

use crate::error::ValidationError;

use super::model::Dataset;

// ---------------------------------------------------------------------------
// Grouping: which statistic defines the cumulative bins
// ---------------------------------------------------------------------------

/// Statistic used to partition events into cumulative bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GroupBy {
    /// False alarm rate; bin `k` holds events with FAR ≤ 10^-k Hz.
    Far,
    /// Signal to noise ratio; bin `k` holds events with SNR ≥ k.
    Snr,
}

impl GroupBy {
    /// Name of the column the bin key is derived from.
    pub fn column(self) -> &'static str {
        match self {
            GroupBy::Far => "far",
            GroupBy::Snr => "snr",
        }
    }

    /// Bin key for one row's value of [`GroupBy::column`].
    pub fn key(self, value: f64) -> f64 {
        match self {
            GroupBy::Far => -value.log10(),
            GroupBy::Snr => value,
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Bin – one cumulative threshold
// ---------------------------------------------------------------------------

/// One cumulative bin: every row whose key is at least the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    /// Integer threshold; `None` is the single "all events" bin.
    pub threshold: Option<(GroupBy, i64)>,
    /// Output subdirectory relative to the output root.
    pub subdir: PathBuf,
    /// Base chart title, before any event count is appended.
    pub title: String,
    /// `10^-k` for FAR bins.
    far_limit: Option<f64>,
}

impl Bin {
    /// The bin used when no grouping is requested.
    pub fn all_events() -> Self {
        Bin {
            threshold: None,
            subdir: PathBuf::from("."),
            title: "All events".to_string(),
            far_limit: None,
        }
    }

    pub fn new(group_by: GroupBy, k: i64) -> Self {
        let (subdir, title, far_limit) = match group_by {
            GroupBy::Far => (
                format!("far_1e{}", -k),
                format!("FAR ≤ 10^{} Hz", -k),
                Some(power_of_ten(-k)),
            ),
            GroupBy::Snr => (format!("snr_{k}"), format!("SNR ≥ {k}"), None),
        };
        Bin {
            threshold: Some((group_by, k)),
            subdir: PathBuf::from(subdir),
            title,
            far_limit,
        }
    }

    /// Whether row `row` of `dataset` belongs to this bin.
    ///
    /// FAR bins compare the raw rate against `10^-k` so that membership is
    /// exactly `far <= 10^-k`, free of rounding in the log transform.
    pub fn contains(&self, dataset: &Dataset, row: usize) -> bool {
        match (self.threshold, self.far_limit, dataset.numeric(GroupBy::Far.column())) {
            (None, _, _) => true,
            (Some(_), Some(limit), Some(far)) => far[row] <= limit,
            (Some((_, k)), _, _) => dataset.keys()[row] >= k as f64,
        }
    }

    /// Indices of the rows of `dataset` that fall in this bin.
    pub fn filtered_indices(&self, dataset: &Dataset) -> Vec<usize> {
        (0..dataset.len())
            .filter(|&row| self.contains(dataset, row))
            .collect()
    }

    /// The subset of every dataset that falls in this bin.
    pub fn filter(&self, datasets: &[Dataset]) -> Vec<Dataset> {
        datasets
            .iter()
            .map(|ds| match self.threshold {
                None => ds.clone(),
                Some(_) => ds.select(&self.filtered_indices(ds)),
            })
            .collect()
    }

    /// Title with the shared event count appended when every filtered
    /// dataset has the same number of rows.
    pub fn title_for(&self, filtered: &[Dataset]) -> String {
        match shared_len(filtered) {
            Some(n) => format!("{} ({n} events)", self.title),
            None => self.title.clone(),
        }
    }
}

/// `10^exp` as the double nearest the exact decimal value.
fn power_of_ten(exp: i64) -> f64 {
    format!("1e{exp}").parse().unwrap_or(f64::NAN)
}

/// Common row count of all datasets, `None` if they differ (or there are none).
pub fn shared_len(datasets: &[Dataset]) -> Option<usize> {
    let first = datasets.first()?.len();
    datasets.iter().all(|d| d.len() == first).then_some(first)
}

// ---------------------------------------------------------------------------
// Key assignment and bin range
// ---------------------------------------------------------------------------

/// Derive the bin key of every row of every dataset.
///
/// Fails with every offending file named when the grouping column is missing
/// from any dataset, or when any key is non-finite. Datasets are left
/// untouched on failure.
pub fn assign_keys(datasets: &mut [Dataset], group_by: GroupBy) -> Result<(), ValidationError> {
    let column = group_by.column();

    let missing: Vec<String> = datasets
        .iter()
        .filter(|ds| !ds.has_column(column))
        .map(|ds| ds.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingColumn {
            column: column.to_string(),
            files: missing,
        });
    }

    let mut keys = Vec::with_capacity(datasets.len());
    let mut invalid = Vec::new();
    for ds in datasets.iter() {
        let ds_keys: Option<Vec<f64>> = ds
            .numeric(column)
            .map(|values| values.iter().map(|&v| group_by.key(v)).collect());
        match ds_keys {
            Some(k) if k.iter().all(|v| v.is_finite()) => keys.push(k),
            _ => invalid.push(ds.to_string()),
        }
    }
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidValue {
            column: column.to_string(),
            files: invalid,
        });
    }

    for (ds, k) in datasets.iter_mut().zip(keys) {
        ds.set_keys(k);
    }
    Ok(())
}

/// Integer thresholds from `floor(min key)` through `floor(max key)`.
///
/// Empty when there are no rows at all.
pub fn bin_range(datasets: &[Dataset]) -> std::ops::RangeInclusive<i64> {
    let (min, max) = datasets
        .iter()
        .flat_map(|ds| ds.keys().iter().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), k| {
            (lo.min(k), hi.max(k))
        });
    if min > max {
        // empty
        return 1..=0;
    }
    (min.floor() as i64)..=((max + 1.0).floor() as i64 - 1)
}

/// The bins for a run, in ascending threshold order.
pub fn compute_bins(datasets: &[Dataset], group_by: Option<GroupBy>) -> Vec<Bin> {
    match group_by {
        None => vec![Bin::all_events()],
        Some(g) => bin_range(datasets).map(|k| Bin::new(g, k)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;
    use std::path::Path;

    fn dataset(name: &str, columns: &[(&str, &[f64])]) -> Dataset {
        Dataset::from_columns(
            Path::new(name),
            columns
                .iter()
                .map(|(n, v)| (n.to_string(), Column::Numeric(v.to_vec())))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_no_grouping_is_single_bin() {
        let ds = vec![dataset("a.tsv", &[("snr", &[1.0, 2.0])])];
        let bins = compute_bins(&ds, None);
        assert_eq!(bins, vec![Bin::all_events()]);
        assert_eq!(bins[0].subdir, PathBuf::from("."));
        assert_eq!(bins[0].title, "All events");
        assert_eq!(bins[0].filter(&ds)[0].len(), 2);
    }

    #[test]
    fn test_far_bins_and_names() {
        let far = [3e-2, 1e-3, 5e-5, 2e-7];
        let mut ds = vec![dataset("a.tsv", &[("far", &far)])];
        assign_keys(&mut ds, GroupBy::Far).unwrap();

        // keys: 1.52, 3.0, 4.30, 6.70
        assert_eq!(bin_range(&ds), 1..=6);
        let bins = compute_bins(&ds, Some(GroupBy::Far));
        assert_eq!(bins.len(), 6);
        assert_eq!(bins[0].subdir, PathBuf::from("far_1e-1"));
        assert_eq!(bins[0].title, "FAR ≤ 10^-1 Hz");
        assert_eq!(bins[5].subdir, PathBuf::from("far_1e-6"));
    }

    #[test]
    fn test_far_bin_selects_far_at_most_power_of_ten() {
        let far = [0.5, 1e-1, 9.99e-2, 1e-3, 1.0001e-3, 3e-9, 1e-10];
        let mut ds = vec![dataset("a.tsv", &[("far", &far)])];
        assign_keys(&mut ds, GroupBy::Far).unwrap();

        for bin in compute_bins(&ds, Some(GroupBy::Far)) {
            let (_, k) = bin.threshold.unwrap();
            let expected: Vec<usize> = (0..far.len())
                .filter(|&i| far[i] <= format!("1e{}", -k).parse::<f64>().unwrap())
                .collect();
            assert_eq!(bin.filtered_indices(&ds[0]), expected, "bin {k}");
        }
    }

    #[test]
    fn test_far_limit_is_fixed_at_construction() {
        assert_eq!(Bin::new(GroupBy::Far, 3).far_limit, Some(1e-3));
        assert_eq!(Bin::new(GroupBy::Far, -2).far_limit, Some(100.0));
        assert_eq!(Bin::new(GroupBy::Snr, 3).far_limit, None);
        assert_eq!(Bin::all_events().far_limit, None);

        let ds = dataset("a.tsv", &[("far", &[1e-3, 1.0001e-3])]);
        let bin = Bin::new(GroupBy::Far, 3);
        assert!(bin.contains(&ds, 0));
        assert!(!bin.contains(&ds, 1));
        assert_eq!(bin.filtered_indices(&ds), vec![0]);
    }

    #[test]
    fn test_far_above_one_gives_negative_exponent_bins() {
        let mut ds = vec![dataset("a.tsv", &[("far", &[250.0, 0.5])])];
        assign_keys(&mut ds, GroupBy::Far).unwrap();

        let bins = compute_bins(&ds, Some(GroupBy::Far));
        assert_eq!(bins.first().unwrap().subdir, PathBuf::from("far_1e3"));
        assert_eq!(bins.first().unwrap().title, "FAR ≤ 10^3 Hz");
        assert_eq!(bins.last().unwrap().subdir, PathBuf::from("far_1e0"));
    }

    #[test]
    fn test_snr_bins_select_snr_at_least_k() {
        let snr = [4.2, 8.0, 8.9, 12.5, 30.0];
        let mut ds = vec![
            dataset("a.tsv", &[("snr", &snr)]),
            dataset("b.tsv", &[("snr", &[5.5])]),
        ];
        assign_keys(&mut ds, GroupBy::Snr).unwrap();

        let bins = compute_bins(&ds, Some(GroupBy::Snr));
        assert_eq!(bins.len(), 27);
        assert_eq!(bins[0].subdir, PathBuf::from("snr_4"));
        assert_eq!(bins[0].title, "SNR ≥ 4");
        for bin in &bins {
            let (_, k) = bin.threshold.unwrap();
            let expected: Vec<usize> = (0..snr.len()).filter(|&i| snr[i] >= k as f64).collect();
            assert_eq!(bin.filtered_indices(&ds[0]), expected);
        }
    }

    #[test]
    fn test_bin_range_spans_every_integer() {
        let cases: &[(&[f64], i64, i64)] = &[
            (&[0.1], 0, 0),
            (&[-2.5, 3.0], -3, 3),
            (&[7.0, 7.99], 7, 7),
            (&[1.999, 2.0, 5.001], 1, 5),
        ];
        for &(values, lo, hi) in cases {
            let mut ds = vec![dataset("a.tsv", &[("snr", values)])];
            assign_keys(&mut ds, GroupBy::Snr).unwrap();
            let range = bin_range(&ds);
            assert_eq!((*range.start(), *range.end()), (lo, hi), "{values:?}");
            let bins = compute_bins(&ds, Some(GroupBy::Snr));
            assert_eq!(bins.len() as i64, hi - lo + 1);
        }
    }

    #[test]
    fn test_bin_range_empty_without_rows() {
        let mut ds = vec![dataset("a.tsv", &[("snr", &[])])];
        assign_keys(&mut ds, GroupBy::Snr).unwrap();
        assert!(compute_bins(&ds, Some(GroupBy::Snr)).is_empty());
    }

    #[test]
    fn test_higher_bins_are_subsets() {
        let mut ds = vec![dataset("a.tsv", &[("snr", &[5.0, 6.5, 9.0, 11.0])])];
        assign_keys(&mut ds, GroupBy::Snr).unwrap();

        let bins = compute_bins(&ds, Some(GroupBy::Snr));
        for pair in bins.windows(2) {
            let lower = pair[0].filtered_indices(&ds[0]);
            let upper = pair[1].filtered_indices(&ds[0]);
            assert!(upper.iter().all(|i| lower.contains(i)));
        }
    }

    #[test]
    fn test_missing_column_names_every_file() {
        let mut ds = vec![
            dataset("has.tsv", &[("far", &[1e-3])]),
            dataset("lacks1.tsv", &[("snr", &[10.0])]),
            dataset("lacks2.tsv", &[("snr", &[11.0])]),
        ];
        let err = assign_keys(&mut ds, GroupBy::Far).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumn {
                column: "far".to_string(),
                files: vec!["lacks1.tsv".to_string(), "lacks2.tsv".to_string()],
            }
        );
    }

    #[test]
    fn test_non_finite_keys_are_rejected() {
        let mut ds = vec![
            dataset("zero_far.tsv", &[("far", &[0.0, 1e-3])]),
            dataset("ok.tsv", &[("far", &[1e-3])]),
            dataset("nan_far.tsv", &[("far", &[f64::NAN])]),
        ];
        let err = assign_keys(&mut ds, GroupBy::Far).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidValue {
                column: "far".to_string(),
                files: vec!["zero_far.tsv".to_string(), "nan_far.tsv".to_string()],
            }
        );
        // nothing assigned on failure
        assert_eq!(ds[1].keys(), &[0.0]);
    }

    #[test]
    fn test_text_group_column_is_invalid() {
        let mut ds = vec![Dataset::from_columns(
            Path::new("text.tsv"),
            vec![("snr".to_string(), Column::Text(vec!["high".to_string()]))],
        )
        .unwrap()];
        let err = assign_keys(&mut ds, GroupBy::Snr).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn test_title_count_only_when_shared() {
        let bin = Bin::new(GroupBy::Snr, 8);
        let same = vec![
            dataset("a.tsv", &[("snr", &[9.0, 10.0])]),
            dataset("b.tsv", &[("snr", &[8.0, 12.0])]),
        ];
        assert_eq!(bin.title_for(&same), "SNR ≥ 8 (2 events)");

        let differ = vec![
            dataset("a.tsv", &[("snr", &[9.0])]),
            dataset("b.tsv", &[("snr", &[8.0, 12.0])]),
        ];
        assert_eq!(bin.title_for(&differ), "SNR ≥ 8");
        assert_eq!(shared_len(&[]), None);
    }
}
