use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

const COLUMNS: [&str; 9] = [
    "far",
    "snr",
    "searched_area",
    "searched_prob",
    "searched_prob_dist",
    "searched_prob_vol",
    "searched_vol",
    "offset",
    "runtime",
];

/// Write a synthetic table of found injections for trying out the plotter.
#[derive(Parser, Debug)]
struct Args {
    /// Output file; `.parquet` writes Parquet, `.csv` comma-separated text,
    /// anything else tab-separated text
    #[arg(default_value = "sample_injections.tsv")]
    output: PathBuf,

    /// Number of injections
    #[arg(short, long, default_value_t = 500)]
    count: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn exponential(&mut self, scale: f64) -> f64 {
        -scale * (1.0 - self.next_f64()).ln()
    }
}

/// One injection's statistics, in `COLUMNS` order.
///
/// Louder events get lower false alarm rates and smaller error regions;
/// searched probabilities are uniform, as for a well calibrated pipeline.
fn injection(rng: &mut SimpleRng) -> [f64; 9] {
    let snr = 8.0 + rng.exponential(3.0);
    let far = 10f64.powf(-1.0 - 1.2 * (snr - 8.0) + rng.gauss(0.0, 0.5)).min(1.0);
    let searched_area = 10f64.powf(rng.gauss(2.0, 0.6)) * (12.0 / snr).powi(2);
    let searched_vol = searched_area * 10f64.powf(rng.gauss(3.0, 0.5));
    let offset = searched_area.sqrt() * rng.gauss(0.0, 0.5).abs();
    let runtime = 10f64.powf(rng.gauss(1.0, 0.3));
    [
        far,
        snr,
        searched_area,
        rng.next_f64(),
        rng.next_f64(),
        rng.next_f64(),
        searched_vol,
        offset,
        runtime,
    ]
}

fn write_delimited(path: &Path, delimiter: u8, rows: &[[f64; 9]]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[[f64; 9]]) -> Result<()> {
    let schema = Arc::new(Schema::new(
        COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, false))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = (0..COLUMNS.len())
        .map(|c| Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r[c]))) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    let rows: Vec<[f64; 9]> = (0..args.count).map(|_| injection(&mut rng)).collect();

    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" | "pq" => write_parquet(&args.output, &rows)?,
        "csv" => write_delimited(&args.output, b',', &rows)?,
        _ => write_delimited(&args.output, b'\t', &rows)?,
    }

    println!("Wrote {} injections to {}", rows.len(), args.output.display());
    Ok(())
}
