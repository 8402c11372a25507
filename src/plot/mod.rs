/// Chart layer: backend-independent chart descriptions and their rendering.
///
/// ```text
///   report (per bin)
///        │  builds
///        ▼
///   ┌──────────────────┐
///   │ Chart::Pp / Hist  │  titles, labels, series, band
///   └──────────────────┘
///        │  Renderer::render(chart, path)
///        ▼
///   ┌──────────────────┐
///   │ PlottersRenderer  │  bitmap or SVG file
///   └──────────────────┘
/// ```

pub mod render;
pub mod theme;

use std::path::Path;

use plotters::style::RGBColor;

use crate::error::PlotError;
use crate::stats::pp::ConfidenceBand;

pub use render::PlottersRenderer;

// ---------------------------------------------------------------------------
// Plot kinds
// ---------------------------------------------------------------------------

/// The fixed set of charts written for every bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    SearchedProb,
    SearchedProbDist,
    SearchedProbVol,
    SearchedArea,
    SearchedVol,
    Offset,
    Runtime,
}

impl PlotKind {
    /// Every kind, P–P plots first, in output order.
    pub const ALL: [PlotKind; 7] = [
        PlotKind::SearchedProb,
        PlotKind::SearchedProbDist,
        PlotKind::SearchedProbVol,
        PlotKind::SearchedArea,
        PlotKind::SearchedVol,
        PlotKind::Offset,
        PlotKind::Runtime,
    ];

    /// Column the chart is drawn from.
    pub fn column(self) -> &'static str {
        match self {
            PlotKind::SearchedProb => "searched_prob",
            PlotKind::SearchedProbDist => "searched_prob_dist",
            PlotKind::SearchedProbVol => "searched_prob_vol",
            PlotKind::SearchedArea => "searched_area",
            PlotKind::SearchedVol => "searched_vol",
            PlotKind::Offset => "offset",
            PlotKind::Runtime => "runtime",
        }
    }

    pub fn is_pp(self) -> bool {
        matches!(
            self,
            PlotKind::SearchedProb | PlotKind::SearchedProbDist | PlotKind::SearchedProbVol
        )
    }

    /// Output file name without extension.
    pub fn file_stem(self) -> String {
        if self.is_pp() {
            self.column().to_string()
        } else {
            format!("{}_hist", self.column())
        }
    }

    pub fn x_label(self) -> &'static str {
        match self {
            PlotKind::SearchedProb => "searched posterior mass",
            PlotKind::SearchedProbDist => "distance CDF at true distance",
            PlotKind::SearchedProbVol => "searched volumetric probability",
            PlotKind::SearchedArea => "searched area (deg²)",
            PlotKind::SearchedVol => "searched volume (Mpc³)",
            PlotKind::Offset => "angle between true location and mode of posterior (deg)",
            PlotKind::Runtime => "run time (s)",
        }
    }
}

// ---------------------------------------------------------------------------
// Chart descriptions
// ---------------------------------------------------------------------------

/// One dataset's curve on a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub color: RGBColor,
    /// Polyline vertices in data coordinates.
    pub points: Vec<(f64, f64)>,
}

/// A probability–probability plot on the unit square.
#[derive(Debug, Clone, PartialEq)]
pub struct PpChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub band: Option<ConfidenceBand>,
}

/// Step-outline histograms sharing one log-scaled x axis.
#[derive(Debug, Clone, PartialEq)]
pub struct HistChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Outer bin edges, the x axis extent.
    pub x_range: (f64, f64),
    pub y_max: f64,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Pp(PpChart),
    Hist(HistChart),
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::Pp(c) => &c.title,
            Chart::Hist(c) => &c.title,
        }
    }

    pub fn series(&self) -> &[Series] {
        match self {
            Chart::Pp(c) => &c.series,
            Chart::Hist(c) => &c.series,
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer seam
// ---------------------------------------------------------------------------

/// Writes a chart to an image file.
pub trait Renderer {
    /// Render `chart` to `path`. The parent directory already exists.
    fn render(&mut self, chart: &Chart, path: &Path) -> Result<(), PlotError>;
}
