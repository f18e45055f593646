//! # PCA Transformer
//!
//! Fits principal components on a numeric frame and projects new data onto them.
//! The fitted state is serde-serializable so it can be persisted with
//! [`utils::serialization`](crate::utils::serialization).

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::eigen::symmetric_eigen;
use super::PcaError;
use crate::frame::{DataFrame, Value};

/// Name of the feature column in [`PcaTransformer::components_frame`].
pub const FEATURE_COLUMN: &str = "feature";

/// Column name of the i-th (0-based) component in the loadings frame: `PC_1`, `PC_2`, ...
pub fn loading_column(i: usize) -> String {
    format!("PC_{}", i + 1)
}

/// Column name of the i-th (0-based) component in transformed data: `PC1`, `PC2`, ...
pub fn score_column(i: usize) -> String {
    format!("PC{}", i + 1)
}

/// NaN and infinite cells have no meaningful projection.
fn check_finite(data: &Array2<f64>) -> Result<(), PcaError> {
    match data.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), v)) => Err(PcaError::InvalidArgument(format!(
            "input contains {v} at row {row}, column {col}"
        ))),
        None => Ok(()),
    }
}

/// Everything learned by `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FittedState {
    pub(crate) columns: Vec<String>,
    pub(crate) n_samples: usize,
    pub(crate) mean: Array1<f64>,
    /// `n_components x n_features`, one component per row.
    pub(crate) components: Array2<f64>,
    pub(crate) explained_variance: Array1<f64>,
    pub(crate) explained_variance_ratio: Array1<f64>,
}

/// # PcaTransformer
///
/// Principal component analysis with a fixed number of components.
/// Components are ordered by explained variance; each component's largest
/// absolute loading is positive, which makes the signs deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaTransformer {
    n_components: usize,
    state: Option<FittedState>,
}

impl Default for PcaTransformer {
    fn default() -> Self {
        PcaTransformer::new(3)
    }
}

impl fmt::Display for PcaTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pca(n_components={})", self.n_components)
    }
}

impl PcaTransformer {
    pub fn new(n_components: usize) -> Self {
        PcaTransformer {
            n_components,
            state: None,
        }
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub(crate) fn state(&self) -> Result<&FittedState, PcaError> {
        self.state.as_ref().ok_or(PcaError::NotFitted)
    }

    /// Feature names seen during `fit`.
    pub fn columns(&self) -> Result<&[String], PcaError> {
        Ok(&self.state()?.columns)
    }

    /// Per-feature means subtracted before projection.
    pub fn mean(&self) -> Result<&Array1<f64>, PcaError> {
        Ok(&self.state()?.mean)
    }

    /// Loadings, one component per row.
    pub fn components(&self) -> Result<&Array2<f64>, PcaError> {
        Ok(&self.state()?.components)
    }

    /// Variance of the data along each kept component.
    pub fn explained_variance(&self) -> Result<&Array1<f64>, PcaError> {
        Ok(&self.state()?.explained_variance)
    }

    /// Share of the total variance explained by each kept component.
    pub fn explained_variance_ratio(&self) -> Result<&Array1<f64>, PcaError> {
        Ok(&self.state()?.explained_variance_ratio)
    }

    /// Fits the model on every column of `x_train`, which must be numeric.
    pub fn fit(&mut self, x_train: &DataFrame) -> Result<&mut Self, PcaError> {
        let data = x_train.to_matrix()?;
        check_finite(&data)?;
        let (n_samples, n_features) = data.dim();
        if n_samples < 2 {
            return Err(PcaError::InvalidArgument(format!(
                "PCA needs at least 2 samples, got {n_samples}"
            )));
        }
        let max_components = n_samples.min(n_features);
        if self.n_components == 0 || self.n_components > max_components {
            return Err(PcaError::InvalidArgument(format!(
                "n_components={} must be between 1 and min(n_samples, n_features)={}",
                self.n_components, max_components
            )));
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| PcaError::InvalidArgument("empty input".into()))?;
        let centered = &data - &mean;
        let covariance = centered.t().dot(&centered) / (n_samples as f64 - 1.0);

        let (eigenvalues, eigenvectors) = symmetric_eigen(&covariance)?;
        // Round-off can leave tiny negative eigenvalues on rank-deficient data.
        let eigenvalues = eigenvalues.mapv(|v| v.max(0.0));
        let total_variance: f64 = eigenvalues.sum();

        let k = self.n_components;
        let mut components = Array2::<f64>::zeros((k, n_features));
        for i in 0..k {
            let mut row = eigenvectors.column(i).to_owned();
            let pivot = row
                .iter()
                .copied()
                .max_by(|a, b| a.abs().total_cmp(&b.abs()))
                .unwrap_or(0.0);
            if pivot < 0.0 {
                row.mapv_inplace(|v| -v);
            }
            components.row_mut(i).assign(&row);
        }

        let explained_variance = eigenvalues.slice(ndarray::s![..k]).to_owned();
        let explained_variance_ratio = if total_variance > 0.0 {
            &explained_variance / total_variance
        } else {
            Array1::zeros(k)
        };

        tracing::debug!(
            n_samples,
            n_features,
            n_components = k,
            "Fitted PCA, explained variance ratio {:?}",
            explained_variance_ratio.to_vec()
        );

        self.state = Some(FittedState {
            columns: x_train.columns().to_vec(),
            n_samples,
            mean,
            components,
            explained_variance,
            explained_variance_ratio,
        });
        Ok(self)
    }

    /// Projects `x` onto the fitted components, returning columns `PC1..PCk`.
    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame, PcaError> {
        let scores = self.transform_matrix(&x.to_matrix()?)?;
        let columns: Vec<String> = (0..self.n_components).map(score_column).collect();
        Ok(DataFrame::from_matrix(columns, &scores)?)
    }

    /// Matrix form of [`transform`](Self::transform).
    pub fn transform_matrix(&self, data: &Array2<f64>) -> Result<Array2<f64>, PcaError> {
        let state = self.state()?;
        if data.ncols() != state.mean.len() {
            return Err(PcaError::FeatureMismatch {
                expected: state.mean.len(),
                got: data.ncols(),
            });
        }
        check_finite(data)?;
        let centered = data - &state.mean;
        Ok(centered.dot(&state.components.t()))
    }

    pub fn fit_transform(&mut self, x: &DataFrame) -> Result<DataFrame, PcaError> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Loadings as a frame: columns `PC_1..PC_k` then `feature`, one row per input feature.
    pub fn components_frame(&self) -> Result<DataFrame, PcaError> {
        let state = self.state()?;
        let mut columns: Vec<String> = (0..self.n_components).map(loading_column).collect();
        columns.push(FEATURE_COLUMN.to_string());

        let mut frame = DataFrame::new(columns)?;
        for (f, feature) in state.columns.iter().enumerate() {
            let mut row: Vec<Value> = state
                .components
                .column(f)
                .iter()
                .map(|v| Value::Float(*v))
                .collect();
            row.push(Value::Text(feature.clone()));
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    /// Loadings of the first `limit_components` components, keeping only the
    /// features with at least one loading whose magnitude exceeds `threshold`.
    pub fn filter_components(
        &self,
        limit_components: usize,
        threshold: f64,
    ) -> Result<DataFrame, PcaError> {
        if limit_components == 0 || limit_components > self.n_components {
            return Err(PcaError::InvalidArgument(format!(
                "limit_components={} must be between 1 and n_components={}",
                limit_components, self.n_components
            )));
        }
        let loadings = self.components_frame()?;
        let mut kept: Vec<String> = (0..limit_components).map(loading_column).collect();
        kept.push(FEATURE_COLUMN.to_string());
        let names: Vec<&str> = kept.iter().map(String::as_str).collect();
        let selected = loadings.select(&names)?;

        let mut filtered = DataFrame::new(kept.clone())?;
        for row in selected.rows() {
            let significant = row[..limit_components]
                .iter()
                .filter_map(Value::as_f64)
                .any(|v| v.abs() > threshold);
            if significant {
                filtered.push_row(row.clone())?;
            }
        }
        Ok(filtered)
    }
}
