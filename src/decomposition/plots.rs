//! # PCA Figures
//!
//! Explained-variance, loadings and 3-D score plots for a fitted [`PcaTransformer`].

use super::pca::{loading_column, score_column, PcaTransformer, FEATURE_COLUMN};
use super::PcaError;
use crate::frame::DataFrame;
use crate::plotting::{
    Annotation, AxisLayout, AxisValues, BarTrace, ColorBar, Figure, Layout, Line, Marker,
    MarkerSize, Scatter3dTrace, ScatterTrace, Scene, Trace,
};

/// Options for [`PcaTransformer::plot_pca_3d`].
#[derive(Debug, Clone, PartialEq)]
pub struct Plot3dOptions {
    pub x: String,
    pub y: String,
    /// `None` draws a flat scatter of `x` against `y`.
    pub z: Option<String>,
    /// One value per row, mapped through `cmap`.
    pub color: Option<Vec<f64>>,
    pub cmap: String,
    pub biplot: bool,
    pub biplot_scale: f64,
    pub alpha: f64,
    pub width: u32,
    pub height: u32,
    /// One marker symbol per row.
    pub symbol: Option<Vec<String>>,
    /// One marker size per row.
    pub size: Option<Vec<f64>>,
    pub color_bar_title: String,
}

impl Default for Plot3dOptions {
    fn default() -> Self {
        Plot3dOptions {
            x: "PC1".into(),
            y: "PC2".into(),
            z: Some("PC3".into()),
            color: None,
            cmap: "viridis".into(),
            biplot: true,
            biplot_scale: 20.0,
            alpha: 1.0,
            width: 1000,
            height: 600,
            symbol: None,
            size: None,
            color_bar_title: "Color".into(),
        }
    }
}

/// Marker size used when no per-point sizes are given.
const DEFAULT_MARKER_SIZE: f64 = 3.0;

impl PcaTransformer {
    /// Line plot of the variance ratio explained by each component.
    pub fn plot_pca_variance(&self) -> Result<Figure, PcaError> {
        let ratio = self.explained_variance_ratio()?;
        let labels: Vec<String> = (0..self.n_components()).map(loading_column).collect();

        let mut figure = Figure::new();
        figure.add_trace(Trace::Scatter(ScatterTrace {
            x: labels.into(),
            y: ratio.to_vec(),
            mode: "lines+markers".into(),
            name: Some("var".into()),
            marker: None,
            text: None,
        }));
        figure.layout = Layout {
            title: Some("Explained variance ratio".into()),
            xaxis: Some(AxisLayout::titled("PC")),
            yaxis: Some(AxisLayout::titled("var")),
            ..Default::default()
        };
        Ok(figure)
    }

    /// Grouped bars of the loadings kept by
    /// [`filter_components`](Self::filter_components), one trace per feature.
    pub fn plot_pca_components(
        &self,
        limit_components: usize,
        threshold: f64,
    ) -> Result<Figure, PcaError> {
        let components = self.filter_components(limit_components, threshold)?;
        let labels: Vec<String> = (0..limit_components).map(loading_column).collect();
        let feature_idx = components.column_index(FEATURE_COLUMN)?;

        let mut figure = Figure::new();
        for row in components.rows() {
            figure.add_trace(Trace::Bar(BarTrace {
                x: labels.clone().into(),
                y: row[..limit_components]
                    .iter()
                    .map(|v| v.as_f64().unwrap_or(0.0))
                    .collect(),
                name: Some(row[feature_idx].to_string()),
            }));
        }
        figure.layout = Layout {
            title: Some("PCA loadings".into()),
            xaxis: Some(AxisLayout::titled("PC")),
            barmode: Some("group".into()),
            ..Default::default()
        };
        Ok(figure)
    }

    /// 3-D scatter of `dataset` in component space, optionally with a biplot
    /// of the feature loadings drawn from the origin.
    pub fn plot_pca_3d(
        &self,
        dataset: &DataFrame,
        options: &Plot3dOptions,
    ) -> Result<Figure, PcaError> {
        let scores = self.transform(dataset)?;
        let rows = scores.height();
        for (name, len) in [
            ("color", options.color.as_ref().map(Vec::len)),
            ("symbol", options.symbol.as_ref().map(Vec::len)),
            ("size", options.size.as_ref().map(Vec::len)),
        ] {
            if let Some(len) = len {
                if len != rows {
                    return Err(PcaError::InvalidArgument(format!(
                        "{name} has {len} values, dataset has {rows} rows"
                    )));
                }
            }
        }

        let axis_values = |name: &str| -> Result<Vec<f64>, PcaError> {
            Ok(scores
                .column(name)?
                .iter()
                .map(|v| v.as_f64().unwrap_or(f64::NAN))
                .collect())
        };
        let x = axis_values(&options.x)?;
        let y = axis_values(&options.y)?;
        let hover: Vec<String> = scores
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .take(3)
                    .zip(scores.columns())
                    .map(|(v, c)| format!("{c}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect();

        let marker = Marker {
            size: Some(match &options.size {
                Some(sizes) => MarkerSize::PerPoint(sizes.clone()),
                None => MarkerSize::Fixed(DEFAULT_MARKER_SIZE),
            }),
            color: options.color.clone().map(AxisValues::Numbers),
            colorscale: options.color.as_ref().map(|_| options.cmap.clone()),
            colorbar: options.color.as_ref().map(|_| ColorBar {
                title: options.color_bar_title.clone(),
            }),
            symbol: options.symbol.clone(),
            opacity: Some(options.alpha),
        };

        let mut figure = Figure::new();
        figure.layout.width = Some(options.width);
        figure.layout.height = Some(options.height);

        let Some(z_name) = &options.z else {
            figure.add_trace(Trace::Scatter(ScatterTrace {
                x: x.into(),
                y,
                mode: "markers".into(),
                name: None,
                marker: Some(marker),
                text: Some(hover),
            }));
            figure.layout.xaxis = Some(AxisLayout::titled(options.x.clone()));
            figure.layout.yaxis = Some(AxisLayout::titled(options.y.clone()));
            return Ok(figure);
        };

        let z = axis_values(z_name)?;
        figure.add_trace(Trace::Scatter3d(Scatter3dTrace {
            x,
            y,
            z,
            mode: "markers".into(),
            name: None,
            marker: Some(marker),
            line: None,
            text: Some(hover),
            showlegend: None,
        }));

        let mut scene = Scene {
            xaxis: Some(AxisLayout::titled(options.x.clone())),
            yaxis: Some(AxisLayout::titled(options.y.clone())),
            zaxis: Some(AxisLayout::titled(z_name.clone())),
            annotations: Vec::new(),
        };

        if options.biplot {
            let axes = [
                component_index(&options.x)?,
                component_index(&options.y)?,
                component_index(z_name)?,
            ];
            let components = self.components()?;
            for (f, feature) in self.columns()?.iter().enumerate() {
                let [lx, ly, lz] = axes.map(|c| components[[c, f]] * options.biplot_scale);
                figure.add_trace(Trace::Scatter3d(Scatter3dTrace {
                    x: vec![0.0, lx],
                    y: vec![0.0, ly],
                    z: vec![0.0, lz],
                    mode: "lines".into(),
                    name: Some(feature.clone()),
                    marker: None,
                    line: Some(Line { width: 20.0 }),
                    text: None,
                    showlegend: Some(false),
                }));
                scene.annotations.push(Annotation {
                    x: lx,
                    y: ly,
                    z: lz,
                    text: feature.clone(),
                    showarrow: false,
                    xanchor: "left".into(),
                    xshift: 1.0,
                    opacity: 0.7,
                });
            }
        }
        figure.layout.scene = Some(scene);
        Ok(figure)
    }
}

/// Maps a score column name (`PC2`) back to its 0-based component index.
fn component_index(name: &str) -> Result<usize, PcaError> {
    name.strip_prefix("PC")
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .map(|n| n - 1)
        .filter(|i| score_column(*i) == name)
        .ok_or_else(|| PcaError::InvalidArgument(format!("'{name}' is not a component column")))
}
