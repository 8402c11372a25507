use std::sync::OnceLock;

use log::debug;
use plotters::style::RGBColor;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Figure geometry and styling shared by every chart of the process.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Pixel size of P–P figures (square).
    pub pp_size: (u32, u32),
    /// Pixel size of histogram figures.
    pub hist_size: (u32, u32),
    pub font: &'static str,
    pub caption_size: f64,
    pub label_size: f64,
    pub margin: u32,
    pub x_label_area: u32,
    pub y_label_area: u32,
    pub line_width: u32,
    pub band_color: RGBColor,
    pub band_opacity: f64,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            pp_size: (800, 800),
            hist_size: (800, 600),
            font: "sans-serif",
            caption_size: 28.0,
            label_size: 18.0,
            margin: 20,
            x_label_area: 60,
            y_label_area: 80,
            line_width: 2,
            band_color: RGBColor(128, 128, 128),
            band_opacity: 0.3,
        }
    }
}

impl Theme {
    /// The process-wide theme, built on first use.
    pub fn global() -> &'static Theme {
        THEME.get_or_init(|| {
            debug!("Initialising plot theme");
            Theme::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_is_initialised_once() {
        let a = Theme::global() as *const Theme;
        let b = Theme::global() as *const Theme;
        assert_eq!(a, b);
        assert_eq!(Theme::global().pp_size.0, Theme::global().pp_size.1);
    }
}
