use std::fmt;
use std::path::PathBuf;

use crate::data::filter::GroupBy;

/// Image encodings the plotting backend can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ImageFormat {
    #[default]
    Pdf,
    Png,
    #[value(alias = "jpeg")]
    Jpg,
    Bmp,
    Svg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Pdf => "pdf",
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Options for one report run, fixed before any data is read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// Draw cumulative histograms (and use the finer binning).
    pub cumulative: bool,
    /// Normalize histograms to a density / fraction.
    pub normed: bool,
    pub group_by: Option<GroupBy>,
    /// Coverage of the P–P confidence band, in percent.
    pub pp_confidence_interval: f64,
    pub format: ImageFormat,
    /// Root of the output tree.
    pub output: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            cumulative: false,
            normed: false,
            group_by: None,
            pp_confidence_interval: 95.0,
            format: ImageFormat::default(),
            output: PathBuf::from("."),
        }
    }
}

impl ReportConfig {
    /// Band coverage as a fraction in (0, 1].
    pub fn confidence(&self) -> f64 {
        0.01 * self.pp_confidence_interval
    }

    /// Y axis label shared by every histogram of the run.
    pub fn histogram_label(&self) -> String {
        format!(
            "{}{} of injections",
            if self.cumulative { "cumulative " } else { "" },
            if self.normed { "fraction" } else { "number" },
        )
    }
}

/// Parse a percentage in (0, 100].
pub fn parse_percentage(s: &str) -> Result<f64, String> {
    let pct: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if pct > 0.0 && pct <= 100.0 {
        Ok(pct)
    } else {
        Err(format!("{pct} is outside (0, 100]"))
    }
}
