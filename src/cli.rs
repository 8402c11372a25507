use std::path::PathBuf;

use clap::Parser;

use crate::config::{parse_percentage, ImageFormat, ReportConfig};
use crate::data::filter::GroupBy;

/// Create summary plots for sky maps of found injections, optionally binned
/// cumulatively by false alarm rate or SNR.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Draw cumulative histograms
    #[arg(long)]
    pub cumulative: bool,

    /// Normalize histograms to a fraction of injections
    #[arg(long)]
    pub normed: bool,

    /// Group plots by false alarm rate (FAR) or signal to noise ratio (SNR)
    #[arg(long, value_enum, value_name = "far|snr")]
    pub group_by: Option<GroupBy>,

    /// If all input files have the same number of samples, overlay binomial
    /// confidence bands for this percentage on the P-P plots
    #[arg(long, value_name = "PCT", default_value = "95", value_parser = parse_percentage)]
    pub pp_confidence_interval: f64,

    /// Image format of the written plots
    #[arg(long, value_enum, default_value_t = ImageFormat::Pdf)]
    pub format: ImageFormat,

    /// Root directory of the output tree
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Result tables produced by the sky-map statistics step
    #[arg(value_name = "INPUT", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,
}

impl Args {
    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            cumulative: self.cumulative,
            normed: self.normed,
            group_by: self.group_by,
            pp_confidence_interval: self.pp_confidence_interval,
            format: self.format,
            output: self.output.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_report_config() {
        let args = Args::try_parse_from(["skymap-plot-stats", "a.tsv"]).unwrap();
        assert_eq!(args.inputs, vec![PathBuf::from("a.tsv")]);
        assert_eq!(args.report_config(), ReportConfig::default());
    }

    #[test]
    fn test_pdf_is_default_and_accepted() {
        let args = Args::try_parse_from(["skymap-plot-stats", "a.tsv"]).unwrap();
        assert_eq!(args.format, ImageFormat::Pdf);
        let args = Args::try_parse_from(["skymap-plot-stats", "--format", "pdf", "a.tsv"]).unwrap();
        assert_eq!(args.report_config().format.extension(), "pdf");
    }

    #[test]
    fn test_all_flags() {
        let args = Args::try_parse_from([
            "skymap-plot-stats",
            "--cumulative",
            "--normed",
            "--group-by",
            "snr",
            "--pp-confidence-interval",
            "90",
            "--format",
            "jpeg",
            "--output",
            "plots",
            "a.tsv",
            "b.tsv",
        ])
        .unwrap();
        let config = args.report_config();
        assert!(config.cumulative && config.normed);
        assert_eq!(config.group_by, Some(GroupBy::Snr));
        assert_eq!(config.pp_confidence_interval, 90.0);
        assert_eq!(config.format, ImageFormat::Jpg);
        assert_eq!(config.output, PathBuf::from("plots"));
        assert_eq!(args.inputs.len(), 2);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Args::try_parse_from(["skymap-plot-stats"]).is_err());
        assert!(Args::try_parse_from(["skymap-plot-stats", "--group-by", "dist", "a.tsv"]).is_err());
        assert!(Args::try_parse_from(["skymap-plot-stats", "--format", "tiff", "a.tsv"]).is_err());
        assert!(
            Args::try_parse_from(["skymap-plot-stats", "--pp-confidence-interval", "150", "a.tsv"])
                .is_err()
        );
    }
}
