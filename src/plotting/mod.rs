//! # Plotting Utilities (`plotting`)
//!
//! Axis formatting helpers and a Plotly-compatible figure model. Figures are
//! plain data: serialize them with [`Figure::to_json`] or write a standalone
//! HTML page with [`Figure::write_html`].

use crate::utils::format::format_grouped;

// --- Submodules ---
pub mod figure;

// --- Re-exports ---
pub use figure::{
    Annotation, AxisLayout, AxisValues, BarTrace, ColorBar, Figure, Layout, Line, Marker,
    MarkerSize, Scatter3dTrace, ScatterTrace, Scene, Trace,
};

/// Scales checked from largest to smallest, with their suffixes.
const AXIS_THRESHOLDS: [(f64, &str); 5] = [
    (1e12, "b"),
    (1e9, "mm"),
    (1e6, "m"),
    (1e3, "k"),
    (1.0, "na"),
];

/// Formats a currency tick value, e.g. `1500.0` → `"$1.50 k"`.
///
/// Values of at least one are scaled by the largest threshold they reach and
/// suffixed (`b` = 10^12, `mm` = 10^9, `m` = 10^6, `k` = 10^3, `na` = units).
/// Smaller values are printed as-is with two decimals.
///
/// ```
/// use dsutils::plotting::format_axis;
///
/// assert_eq!(format_axis(2_500_000.0), "$2.50 m");
/// assert_eq!(format_axis(0.5), "$0.50");
/// ```
pub fn format_axis(x: f64) -> String {
    for (scale, suffix) in AXIS_THRESHOLDS {
        if x >= scale {
            return format!("${} {suffix}", format_grouped(x / scale, 2));
        }
    }
    format!("${}", format_grouped(x, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_largest_threshold() {
        assert_eq!(format_axis(1_500.0), "$1.50 k");
        assert_eq!(format_axis(1_234_567_890_123.0), "$1.23 b");
        assert_eq!(format_axis(7_000_000_000.0), "$7.00 mm");
        assert_eq!(format_axis(12.0), "$12.00 na");
    }

    #[test]
    fn groups_thousands_above_top_threshold() {
        assert_eq!(format_axis(2_500e12), "$2,500.00 b");
    }

    #[test]
    fn small_and_negative_values_are_unscaled() {
        assert_eq!(format_axis(0.25), "$0.25");
        assert_eq!(format_axis(-1_234.5), "$-1,234.50");
        assert_eq!(format_axis(0.0), "$0.00");
    }
}
