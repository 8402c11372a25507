use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

/// Legacy name of the searched probability column.
pub const LEGACY_SEARCHED_PROB: &str = "p_value";
pub const SEARCHED_PROB: &str = "searched_prob";

// ---------------------------------------------------------------------------
// Column – one named column of a result table
// ---------------------------------------------------------------------------

/// A column of a loaded result table.
///
/// Numeric columns keep missing cells as NaN so row indices stay aligned
/// across every column of the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    /// Columns that are not entirely numeric (event ids, labels, ...).
    Text(Vec<String>),
}

impl Column {
    /// Build a column from raw text cells.
    ///
    /// The column is numeric when every cell is either missing or parses as a
    /// float; otherwise the raw text is kept.
    pub fn from_cells(cells: Vec<String>) -> Self {
        let parsed: Option<Vec<f64>> = cells.iter().map(|c| parse_numeric_cell(c)).collect();
        match parsed {
            Some(values) => Column::Numeric(values),
            None => Column::Text(cells),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    /// Numeric view of the column, `None` for text columns.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            Column::Numeric(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    fn select(&self, indices: &[usize]) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// Parse a single cell as a float.
///
/// Empty cells and the masked-value marker `--` are missing and map to NaN.
/// Returns `None` when the cell holds non-numeric text.
pub fn parse_numeric_cell(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "--" {
        return Some(f64::NAN);
    }
    s.parse::<f64>().ok()
}

// ---------------------------------------------------------------------------
// Dataset – one loaded input file
// ---------------------------------------------------------------------------

/// A result table read from one input file, one row per injection.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Where the table was read from; used in error messages.
    pub path: PathBuf,
    /// Series label: the file name without its extension.
    pub name: String,
    column_names: Vec<String>,
    columns: BTreeMap<String, Column>,
    /// Derived bin key per row. All zero until grouping assigns keys.
    keys: Vec<f64>,
    rows: usize,
}

impl Dataset {
    /// Assemble a dataset from named columns, preserving their order.
    pub fn from_columns(path: &Path, columns: Vec<(String, Column)>) -> Result<Self> {
        let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);

        let mut column_names = Vec::with_capacity(columns.len());
        let mut by_name = BTreeMap::new();
        for (name, column) in columns {
            if column.len() != rows {
                bail!(
                    "{}: column '{name}' has {} rows but expected {rows}",
                    path.display(),
                    column.len()
                );
            }
            if by_name.insert(name.clone(), column).is_some() {
                bail!("{}: duplicate column '{name}'", path.display());
            }
            column_names.push(name);
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Dataset {
            path: path.to_path_buf(),
            name,
            column_names,
            columns: by_name,
            keys: vec![0.0; rows],
            rows,
        })
    }

    /// Number of rows (injections).
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Column names in file order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Numeric values of a column, `None` if absent or not numeric.
    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        self.column(name).and_then(Column::as_f64)
    }

    /// Rename the legacy `p_value` column to `searched_prob`.
    ///
    /// Only applies when `searched_prob` is absent. Returns whether a rename
    /// happened.
    pub fn normalize_columns(&mut self) -> bool {
        if self.has_column(SEARCHED_PROB) {
            return false;
        }
        let Some(column) = self.columns.remove(LEGACY_SEARCHED_PROB) else {
            return false;
        };
        self.columns.insert(SEARCHED_PROB.to_string(), column);
        for name in &mut self.column_names {
            if name == LEGACY_SEARCHED_PROB {
                *name = SEARCHED_PROB.to_string();
            }
        }
        true
    }

    /// Bin key of every row.
    pub fn keys(&self) -> &[f64] {
        &self.keys
    }

    /// Replace the derived key column. Must have one entry per row.
    pub fn set_keys(&mut self, keys: Vec<f64>) {
        assert_eq!(keys.len(), self.rows, "one key per row");
        self.keys = keys;
    }

    /// A new dataset holding only the given rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            path: self.path.clone(),
            name: self.name.clone(),
            column_names: self.column_names.clone(),
            columns: self
                .columns
                .iter()
                .map(|(name, col)| (name.clone(), col.select(indices)))
                .collect(),
            keys: indices.iter().map(|&i| self.keys[i]).collect(),
            rows: indices.len(),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
