use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, Dataset};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a result table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – one column per statistic
/// * `.json`    – `[{ "far": 1e-8, "snr": 12.1, ... }, ...]`
/// * `.csv`     – comma-separated with a header row
/// * anything else – text with a header row, split on tabs if the header
///   has one, else on commas if it has one, else on runs of whitespace
///
/// The legacy `p_value` column is renamed to `searched_prob` on load.
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let mut dataset = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_delimited(path, b','),
        _ => match sniff_delimiter(path)? {
            Delimiter::Byte(delimiter) => load_delimited(path, delimiter),
            Delimiter::Whitespace => load_whitespace(path),
        },
    }
    .with_context(|| format!("loading {}", path.display()))?;

    if dataset.normalize_columns() {
        info!("{}: renamed legacy column 'p_value' to 'searched_prob'", path.display());
    }
    info!(
        "Loaded {} ({} rows, columns: {})",
        path.display(),
        dataset.len(),
        dataset.column_names().join(", ")
    );
    Ok(dataset)
}

/// Load every input in order. The first failure aborts.
pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Dataset>> {
    paths.iter().map(|p| load_file(p.as_ref())).collect()
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Byte(u8),
    /// Runs of spaces or tabs.
    Whitespace,
}

fn sniff_delimiter(path: &Path) -> Result<Delimiter> {
    let file = std::fs::File::open(path).context("opening table")?;
    let mut header = String::new();
    BufReader::new(file)
        .read_line(&mut header)
        .context("reading header line")?;
    Ok(if header.contains('\t') {
        Delimiter::Byte(b'\t')
    } else if header.contains(',') {
        Delimiter::Byte(b',')
    } else {
        Delimiter::Whitespace
    })
}

/// Whitespace-separated table. Blank lines and `#` comment lines are
/// skipped; a `#` in front of the header names is dropped.
fn load_whitespace(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading table")?;
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let headers: Vec<String> = match lines.next() {
        Some((_, header)) => header
            .trim_start_matches('#')
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };
    if headers.is_empty() {
        bail!("missing header row");
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (line_no, line) in lines.filter(|(_, line)| !line.starts_with('#')) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != headers.len() {
            bail!(
                "line {line_no}: expected {} fields but found {}",
                headers.len(),
                fields.len()
            );
        }
        for (col_idx, value) in fields.into_iter().enumerate() {
            cells[col_idx].push(value.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| (name, Column::from_cells(cells)))
        .collect();
    Dataset::from_columns(path, columns)
}

/// Layout: header row with column names, one row per injection.
/// Column types are guessed per column, see [`Column::from_cells`].
fn load_delimited(path: &Path, delimiter: u8) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening delimited table")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        bail!("missing header row");
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "row {row_no}: expected {} fields but found {}",
                headers.len(),
                record.len()
            );
        }
        for (col_idx, value) in record.iter().enumerate() {
            cells[col_idx].push(value.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| (name, Column::from_cells(cells)))
        .collect();
    Dataset::from_columns(path, columns)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "far": 1.2e-9, "snr": 14.2, "searched_area": 31.5, "searched_prob": 0.41 },
///   ...
/// ]
/// ```
///
/// The column set is taken from the first record; later records must carry
/// the same keys (missing keys are treated as missing values).
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let headers: Vec<String> = match records.first() {
        Some(first) => first
            .as_object()
            .context("Row 0 is not a JSON object")?
            .keys()
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let mut cells: Vec<Vec<String>> = vec![Vec::with_capacity(records.len()); headers.len()];

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        for (col_idx, key) in headers.iter().enumerate() {
            cells[col_idx].push(json_to_cell(obj.get(key)));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| (name, Column::from_cells(cells)))
        .collect();
    Dataset::from_columns(path, columns)
}

fn json_to_cell(val: Option<&JsonValue>) -> String {
    match val {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per statistic.
///
/// Integer and float columns become numeric columns (nulls → NaN); string
/// and boolean columns are kept as text.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Column> = Vec::with_capacity(names.len());
    let mut first_batch = true;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        debug!("{}: record batch of {} rows", path.display(), batch.num_rows());

        for (col_idx, name) in names.iter().enumerate() {
            let chunk = extract_column(batch.column(col_idx))
                .with_context(|| format!("column '{name}'"))?;
            if first_batch {
                columns.push(chunk);
                continue;
            }
            match (&mut columns[col_idx], chunk) {
                (Column::Numeric(acc), Column::Numeric(more)) => acc.extend(more),
                (Column::Text(acc), Column::Text(more)) => acc.extend(more),
                _ => bail!("column '{name}' changes type between record batches"),
            }
        }
        first_batch = false;
    }

    if first_batch {
        columns = names.iter().map(|_| Column::Numeric(Vec::new())).collect();
    }

    Dataset::from_columns(path, names.into_iter().zip(columns).collect())
}

// -- Parquet / Arrow helpers --

/// Convert one Arrow column chunk to a [`Column`].
fn extract_column(col: &Arc<dyn Array>) -> Result<Column> {
    fn numeric<T: Array + 'static>(
        col: &Arc<dyn Array>,
        value: impl Fn(&T, usize) -> f64,
    ) -> Result<Column> {
        let arr = col
            .as_any()
            .downcast_ref::<T>()
            .with_context(|| format!("unexpected array for {:?}", col.data_type()))?;
        Ok(Column::Numeric(
            (0..arr.len())
                .map(|i| if arr.is_null(i) { f64::NAN } else { value(arr, i) })
                .collect(),
        ))
    }

    match col.data_type() {
        DataType::Float64 => numeric::<Float64Array>(col, |a, i| a.value(i)),
        DataType::Float32 => numeric::<Float32Array>(col, |a, i| a.value(i) as f64),
        DataType::Int64 => numeric::<Int64Array>(col, |a, i| a.value(i) as f64),
        DataType::Int32 => numeric::<Int32Array>(col, |a, i| a.value(i) as f64),
        DataType::UInt64 => numeric::<UInt64Array>(col, |a, i| a.value(i) as f64),
        DataType::UInt32 => numeric::<UInt32Array>(col, |a, i| a.value(i) as f64),
        DataType::Utf8 => {
            let s = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(Column::Text(
                (0..s.len())
                    .map(|i| if s.is_null(i) { String::new() } else { s.value(i).to_string() })
                    .collect(),
            ))
        }
        DataType::LargeUtf8 => {
            let s = col.as_string::<i64>();
            Ok(Column::Text(
                (0..s.len())
                    .map(|i| if s.is_null(i) { String::new() } else { s.value(i).to_string() })
                    .collect(),
            ))
        }
        DataType::Boolean => {
            let b = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            Ok(Column::Text(
                (0..b.len())
                    .map(|i| if b.is_null(i) { String::new() } else { b.value(i).to_string() })
                    .collect(),
            ))
        }
        other => bail!("unsupported column type {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_tab_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "bayestar.tsv",
            "coinc_event_id\tfar\tsnr\tsearched_area\n\
             coinc_event:1\t1e-8\t12.5\t30.2\n\
             coinc_event:2\t2e-6\t9.1\t\n",
        );

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.name, "bayestar");
        assert_eq!(ds.numeric("far"), Some(&[1e-8, 2e-6][..]));
        assert!(ds.numeric("searched_area").unwrap()[1].is_nan());
        assert!(ds.numeric("coinc_event_id").is_none());
        assert!(ds.has_column("coinc_event_id"));
    }

    #[test]
    fn test_load_csv_and_legacy_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "old.csv", "far,p_value\n1e-3,0.25\n1e-4,0.75\n");

        let ds = load_file(&path).unwrap();
        assert!(!ds.has_column("p_value"));
        assert_eq!(ds.numeric("searched_prob"), Some(&[0.25, 0.75][..]));
    }

    #[test]
    fn test_sniff_comma_in_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "results.dat", "snr, searched_prob\n10, 0.5\n");

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.numeric("snr"), Some(&[10.0][..]));
        assert_eq!(ds.numeric("searched_prob"), Some(&[0.5][..]));
    }

    #[test]
    fn test_load_space_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "run.txt",
            "far snr  searched_prob\n1e-3 10 0.5\n\n2e-5   14.5 --\n",
        );

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.column_names(), &["far", "snr", "searched_prob"]);
        assert!(ds.has_column("far"));
        assert_eq!(ds.numeric("far"), Some(&[1e-3, 2e-5][..]));
        assert_eq!(ds.numeric("snr"), Some(&[10.0, 14.5][..]));
        assert!(ds.numeric("searched_prob").unwrap()[1].is_nan());
    }

    #[test]
    fn test_space_separated_comment_header_and_ragged_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "run.dat", "# far snr\n# note\n1e-3 10\n");
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.column_names(), &["far", "snr"]);
        assert_eq!(ds.len(), 1);

        let path = write_file(dir.path(), "bad.dat", "far snr\n1e-3\n");
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.tsv", "far\tsnr\n1e-3\n");

        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.tsv"));
    }

    #[test]
    fn test_load_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "run.json",
            r#"[{"far": 1e-9, "snr": 20, "label": "a"},
                {"far": null, "snr": 8.5, "label": "b"}]"#,
        );

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.numeric("snr"), Some(&[20.0, 8.5][..]));
        assert!(ds.numeric("far").unwrap()[1].is_nan());
        assert!(ds.numeric("label").is_none());
    }

    #[test]
    fn test_load_parquet_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("far", DataType::Float64, true),
            Field::new("runtime", DataType::Int64, false),
            Field::new("id", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Float64Array::from(vec![Some(1e-7), None])),
                Arc::new(Int64Array::from(vec![3, 4])),
                Arc::new(StringArray::from(vec!["x", "y"])),
            ],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.numeric("far").unwrap()[0], 1e-7);
        assert!(ds.numeric("far").unwrap()[1].is_nan());
        assert_eq!(ds.numeric("runtime"), Some(&[3.0, 4.0][..]));
        assert_eq!(
            ds.column("id"),
            Some(&Column::Text(vec!["x".into(), "y".into()]))
        );
    }

    #[test]
    fn test_load_all_stops_at_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(dir.path(), "good.tsv", "far\n1e-3\n");
        let missing = dir.path().join("missing.tsv");

        assert!(load_all(&[good.clone()]).is_ok());
        assert!(load_all(&[good, missing]).is_err());
    }
}
