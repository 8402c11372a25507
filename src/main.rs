mod cli;
mod color;
mod config;
mod data;
mod error;
mod plot;
mod report;
mod stats;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use cli::Args;
use plot::theme::Theme;
use plot::PlottersRenderer;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.report_config();
    Theme::global();

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar().template("{msg:>16} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?,
    );

    let mut renderer = PlottersRenderer::new(config.format);
    let written = report::generate(&config, &args.inputs, &mut renderer, &progress)?;

    info!(
        "Wrote {} plot(s) under {}",
        written.len(),
        config.output.display()
    );
    Ok(())
}
