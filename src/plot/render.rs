//! Chart rendering with the [`plotters`] crate
//!
//! Raster formats go through the bitmap backend (encoder picked from the file
//! extension); SVG goes through the SVG backend. PDF is drawn to an in-memory
//! SVG document and converted with [`svg2pdf`]. Figure sizes and styling come
//! from the process-wide [`Theme`].

use std::fs;
use std::path::Path;

use log::debug;
use plotters::coord::ranged1d::Ranged;
use plotters::coord::Shift;
use plotters::prelude::*;
use svg2pdf::usvg;

use super::theme::Theme;
use super::{Chart, HistChart, PpChart, Renderer, Series};
use crate::config::ImageFormat;
use crate::error::PlotError;

type Result<T> = core::result::Result<T, PlotError>;

/// Renders charts to image files of one format.
#[derive(Debug, Clone, Copy)]
pub struct PlottersRenderer {
    format: ImageFormat,
}

impl PlottersRenderer {
    pub fn new(format: ImageFormat) -> Self {
        Self { format }
    }
}

impl Renderer for PlottersRenderer {
    fn render(&mut self, chart: &Chart, path: &Path) -> Result<()> {
        let theme = Theme::global();
        let size = match chart {
            Chart::Pp(_) => theme.pp_size,
            Chart::Hist(_) => theme.hist_size,
        };

        match self.format {
            ImageFormat::Pdf => {
                let mut svg = String::new();
                draw(SVGBackend::with_string(&mut svg, size).into_drawing_area(), chart, theme)?;
                fs::write(path, svg_to_pdf(&svg)?)?;
            }
            ImageFormat::Svg => draw(SVGBackend::new(path, size).into_drawing_area(), chart, theme)?,
            ImageFormat::Png | ImageFormat::Jpg | ImageFormat::Bmp => {
                draw(BitMapBackend::new(path, size).into_drawing_area(), chart, theme)?
            }
        }
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Convert a rendered SVG document to a single-page PDF.
///
/// System fonts are loaded so chart text survives the conversion.
fn svg_to_pdf(svg: &str) -> Result<Vec<u8>> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| PlotError::Pdf(e.to_string()))?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|e| PlotError::Pdf(e.to_string()))
}

fn draw<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, chart: &Chart, theme: &Theme) -> Result<()> {
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    match chart {
        Chart::Pp(pp) => draw_pp(&root, pp, theme)?,
        Chart::Hist(hist) => draw_hist(&root, hist, theme)?,
    }

    // Ensure everything is properly rendered and saved
    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}

/// P–P plot: confidence band underneath, thin diagonal reference, then
/// one step curve per dataset.
fn draw_pp<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &PpChart,
    theme: &Theme,
) -> Result<()> {
    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, (theme.font, theme.caption_size))
        .margin(theme.margin)
        .x_label_area_size(theme.x_label_area)
        .y_label_area_size(theme.y_label_area)
        .build_cartesian_2d(0f64..1f64, 0f64..1f64)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .label_style((theme.font, theme.label_size))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    if let Some(band) = &chart.band {
        let style = theme.band_color.mix(theme.band_opacity).filled();
        ctx.draw_series(std::iter::once(Polygon::new(band.polygon(), style)))
            .map_err(|e| PlotError::Drawing(e.to_string()))?;
    }

    ctx.draw_series(LineSeries::new(vec![(0.0, 0.0), (1.0, 1.0)], BLACK.stroke_width(1)))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    draw_labelled_series(&mut ctx, &chart.series, theme)
}

/// Histograms: log-scaled x axis, one step outline per dataset.
fn draw_hist<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &HistChart,
    theme: &Theme,
) -> Result<()> {
    let (x_min, x_max) = chart.x_range;
    let y_max = if chart.y_max > 0.0 { chart.y_max * 1.05 } else { 1.0 };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, (theme.font, theme.caption_size))
        .margin(theme.margin)
        .x_label_area_size(theme.x_label_area)
        .y_label_area_size(theme.y_label_area)
        .build_cartesian_2d((x_min..x_max).log_scale(), 0f64..y_max)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .label_style((theme.font, theme.label_size))
        .x_label_formatter(&|x| format_log_tick(*x))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    draw_labelled_series(&mut ctx, &chart.series, theme)
}

fn draw_labelled_series<'a, DB, X, Y>(
    ctx: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
    series: &[Series],
    theme: &Theme,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    for s in series {
        let color = s.color;
        ctx.draw_series(LineSeries::new(
            s.points.iter().copied(),
            color.stroke_width(theme.line_width),
        ))
        .map_err(|e| PlotError::Drawing(e.to_string()))?
        .label(s.label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    if shows_legend(series) {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .label_font((theme.font, theme.label_size))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(|e| PlotError::Drawing(e.to_string()))?;
    }
    Ok(())
}

/// A single input needs no legend.
fn shows_legend(series: &[Series]) -> bool {
    series.len() > 1
}

/// Tick label on a log axis: plain decimals in a readable band, otherwise
/// scientific notation.
fn format_log_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e4).contains(&magnitude) {
        let text = format!("{value:.3}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        format!("{value:.0e}")
    }
}
