use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use plotters::style::RGBColor;

use crate::color::generate_palette;
use crate::config::ReportConfig;
use crate::data::filter::{assign_keys, compute_bins, shared_len, Bin};
use crate::data::loader::load_all;
use crate::data::model::Dataset;
use crate::error::ValidationError;
use crate::plot::{Chart, HistChart, PlotKind, PpChart, Renderer, Series};
use crate::stats::histogram::{bin_count, log_edges, loggable, pooled_range, Histogram};
use crate::stats::pp::{pp_curve, ConfidenceBand};

const PP_Y_LABEL: &str = "cumulative fraction of injections";

/// One bin's filtered datasets and what all of its charts share.
#[derive(Debug, Clone)]
pub struct BinView {
    pub filtered: Vec<Dataset>,
    pub title: String,
    /// Band for the shared row count, used by every P–P chart of the bin.
    pub band: Option<ConfidenceBand>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Load `inputs`, validate them against `config`, and write every chart.
///
/// Validation failures abort before the output tree is touched. Returns the
/// paths of the written images.
pub fn generate<R: Renderer>(
    config: &ReportConfig,
    inputs: &[PathBuf],
    renderer: &mut R,
    progress: &ProgressBar,
) -> Result<Vec<PathBuf>> {
    progress.set_message("reading data");
    let datasets = load_all(inputs)?;
    let generator = ReportGenerator::new(config.clone(), datasets)?;
    info!("Loaded {} table(s)", generator.datasets().len());
    generator.run(renderer, progress)
}

// ---------------------------------------------------------------------------
// Report generator
// ---------------------------------------------------------------------------

/// Validated inputs of a run plus its options.
///
/// The source datasets are read-only for the lifetime of the generator;
/// every bin works on its own filtered copies.
pub struct ReportGenerator {
    config: ReportConfig,
    datasets: Vec<Dataset>,
    /// One colour per dataset, stable across all charts.
    colors: Vec<RGBColor>,
}

impl ReportGenerator {
    /// Check the grouping column and derive bin keys. Writes nothing.
    pub fn new(config: ReportConfig, mut datasets: Vec<Dataset>) -> Result<Self, ValidationError> {
        if let Some(group_by) = config.group_by {
            assign_keys(&mut datasets, group_by)?;
        }
        let colors = generate_palette(datasets.len());
        Ok(Self {
            config,
            datasets,
            colors,
        })
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn bins(&self) -> Vec<Bin> {
        compute_bins(&self.datasets, self.config.group_by)
    }

    /// Directory the charts of `bin` are written to.
    pub fn output_dir(&self, bin: &Bin) -> PathBuf {
        if bin.subdir == Path::new(".") {
            self.config.output.clone()
        } else {
            self.config.output.join(&bin.subdir)
        }
    }

    /// Render every bin. Progress advances once per (bin, plot kind).
    pub fn run<R: Renderer>(&self, renderer: &mut R, progress: &ProgressBar) -> Result<Vec<PathBuf>> {
        let bins = self.bins();
        match (bins.first(), bins.last()) {
            (Some(first), Some(last)) => info!(
                "Plotting {} bin(s): {} .. {}",
                bins.len(),
                first.subdir.display(),
                last.subdir.display()
            ),
            _ => warn!("No events in any input; nothing to plot"),
        }

        progress.set_length((bins.len() * PlotKind::ALL.len()) as u64);
        progress.set_position(0);

        let mut written = Vec::new();
        for bin in &bins {
            progress.set_message(bin.subdir.display().to_string());

            let view = self.view(bin);
            if view.filtered.iter().all(Dataset::is_empty) {
                warn!("{}: no events pass the threshold", bin.subdir.display());
            }
            let outdir = self.output_dir(bin);
            fs::create_dir_all(&outdir)
                .with_context(|| format!("creating output directory {}", outdir.display()))?;
            info!("{}: {}", outdir.display(), view.title);

            for kind in PlotKind::ALL {
                match self.chart(kind, &view) {
                    Some(chart) => {
                        debug!("{}: {} series", chart.title(), chart.series().len());
                        let path = outdir.join(format!(
                            "{}.{}",
                            kind.file_stem(),
                            self.config.format.extension()
                        ));
                        renderer
                            .render(&chart, &path)
                            .with_context(|| format!("rendering {}", path.display()))?;
                        written.push(path);
                    }
                    None => debug!("{}: no {} values, skipping", outdir.display(), kind.column()),
                }
                progress.inc(1);
            }
        }

        progress.finish_with_message("done");
        Ok(written)
    }

    /// Filter the datasets into `bin` and derive the title and band.
    ///
    /// The band is only built when every filtered dataset has the same
    /// number of rows.
    pub fn view(&self, bin: &Bin) -> BinView {
        let filtered = bin.filter(&self.datasets);
        let title = bin.title_for(&filtered);
        let band = shared_len(&filtered).and_then(|n| ConfidenceBand::new(n, self.config.confidence()));
        if let Some(band) = &band {
            debug!("{}: confidence band over {} samples", bin.subdir.display(), band.samples());
        }
        BinView {
            filtered,
            title,
            band,
        }
    }

    /// Chart of `kind` for one bin. `None` when a histogram has nothing to
    /// show.
    pub fn chart(&self, kind: PlotKind, view: &BinView) -> Option<Chart> {
        if kind.is_pp() {
            Some(Chart::Pp(self.pp_chart(kind, view)))
        } else {
            self.hist_chart(kind, view).map(Chart::Hist)
        }
    }

    /// One step curve per dataset (empty when the column is absent), the
    /// diagonal, and the bin's confidence band if it has one.
    pub fn pp_chart(&self, kind: PlotKind, view: &BinView) -> PpChart {
        let series = view
            .filtered
            .iter()
            .zip(&self.colors)
            .map(|(ds, &color)| Series {
                label: ds.name.clone(),
                color,
                points: ds.numeric(kind.column()).map(pp_curve).unwrap_or_default(),
            })
            .collect();

        PpChart {
            title: view.title.clone(),
            x_label: kind.x_label().to_string(),
            y_label: PP_Y_LABEL.to_string(),
            series,
            band: view.band.clone(),
        }
    }

    /// Log-binned histograms over the pooled range of all filtered datasets.
    ///
    /// Datasets lacking the column or any loggable value contribute no
    /// series; `None` when none contribute.
    pub fn hist_chart(&self, kind: PlotKind, view: &BinView) -> Option<HistChart> {
        let filtered = &view.filtered;
        let column = kind.column();
        let (min, max) = pooled_range(filtered.iter().filter_map(|ds| ds.numeric(column)))?;
        let edges = log_edges(min, max, bin_count(self.config.cumulative));

        let mut y_max: f64 = 0.0;
        let series = filtered
            .iter()
            .zip(&self.colors)
            .filter_map(|(ds, &color)| {
                let values = ds.numeric(column)?;
                loggable(values).next()?;
                let hist = Histogram::new(values, &edges, self.config.cumulative, self.config.normed);
                y_max = y_max.max(hist.max_height());
                Some(Series {
                    label: ds.name.clone(),
                    color,
                    points: hist.outline(),
                })
            })
            .collect();

        Some(HistChart {
            title: view.title.clone(),
            x_label: kind.x_label().to_string(),
            y_label: self.config.histogram_label(),
            x_range: (edges[0], edges[edges.len() - 1]),
            y_max,
            series,
        })
    }
}
