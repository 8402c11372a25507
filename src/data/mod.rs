/// Data layer: result tables, loading, and binning.
///
/// Architecture:
/// ```text
///  .tsv / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (p_value renamed to searched_prob)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  named columns, derived bin key per row
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FAR / SNR keys → cumulative bins → filtered copies
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
