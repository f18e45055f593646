//! # Python Bindings for dsutils
//!
//! This module uses PyO3 to expose the Rust library to Python as the `dsutils`
//! module. Frames cross the boundary as `(columns, rows)` pairs of plain lists.

use pyo3::exceptions::{PyIOError, PyKeyError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyList};
use pyo3::wrap_pyfunction;
use std::path::PathBuf;

use crate::{
    config::{ConfigError, YamlConfigManager},
    decomposition::{PcaError, PcaTransformer},
    frame::{self, DataFrame, FrameError, Value},
    plotting,
    utils::{self, HashAlgorithm, HashError, SerializationError},
};

// --- Helper to Convert Rust Errors to Python Exceptions ---

impl From<FrameError> for PyErr {
    fn from(err: FrameError) -> PyErr {
        match err {
            FrameError::ColumnNotFound(_) => PyKeyError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

impl From<ConfigError> for PyErr {
    fn from(err: ConfigError) -> PyErr {
        match err {
            ConfigError::KeyNotFound(_) => PyKeyError::new_err(err.to_string()),
            ConfigError::Io { .. } => PyIOError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

impl From<PcaError> for PyErr {
    fn from(err: PcaError) -> PyErr {
        match err {
            PcaError::Frame(inner) => inner.into(),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

impl From<HashError> for PyErr {
    fn from(err: HashError) -> PyErr {
        match err {
            HashError::Io(_) => PyIOError::new_err(err.to_string()),
            HashError::UnsupportedAlgorithm(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

impl From<SerializationError> for PyErr {
    fn from(err: SerializationError) -> PyErr {
        match err {
            SerializationError::Io(_) => PyIOError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

// --- Cell conversion ---

impl<'py> FromPyObject<'py> for Value {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        if ob.is_none() {
            return Ok(Value::Null);
        }
        // bool is a subclass of int in Python, so test it first.
        if ob.is_instance_of::<PyBool>() {
            return Ok(Value::Bool(ob.extract()?));
        }
        if let Ok(v) = ob.extract::<i64>() {
            return Ok(Value::Int(v));
        }
        if let Ok(v) = ob.extract::<f64>() {
            return Ok(Value::Float(v));
        }
        if let Ok(v) = ob.extract::<String>() {
            return Ok(Value::Text(v));
        }
        Err(PyTypeError::new_err(format!(
            "Unsupported cell type: {}",
            ob.get_type().name()?
        )))
    }
}

impl IntoPy<PyObject> for Value {
    fn into_py(self, py: Python<'_>) -> PyObject {
        match self {
            Value::Null => py.None(),
            Value::Bool(v) => v.into_py(py),
            Value::Int(v) => v.into_py(py),
            Value::Float(v) => v.into_py(py),
            Value::Text(v) => v.into_py(py),
        }
    }
}

type PyFrame = (Vec<String>, Vec<Vec<Value>>);

fn to_py_frame(frame: DataFrame) -> PyFrame {
    (frame.columns().to_vec(), frame.rows().to_vec())
}

fn yaml_to_py(py: Python<'_>, value: &serde_yaml::Value) -> PyResult<PyObject> {
    use serde_yaml::Value as Yaml;
    Ok(match value {
        Yaml::Null => py.None(),
        Yaml::Bool(b) => b.into_py(py),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into_py(py)
            } else if let Some(u) = n.as_u64() {
                u.into_py(py)
            } else {
                n.as_f64().unwrap_or(f64::NAN).into_py(py)
            }
        }
        Yaml::String(s) => s.into_py(py),
        Yaml::Sequence(seq) => {
            let list = PyList::empty_bound(py);
            for item in seq {
                list.append(yaml_to_py(py, item)?)?;
            }
            list.into_py(py)
        }
        Yaml::Mapping(map) => {
            let dict = PyDict::new_bound(py);
            for (k, v) in map {
                dict.set_item(yaml_to_py(py, k)?, yaml_to_py(py, v)?)?;
            }
            dict.into_py(py)
        }
        Yaml::Tagged(tagged) => yaml_to_py(py, &tagged.value)?,
    })
}

// --- Functions ---

#[pyfunction]
#[pyo3(name = "format_axis")]
fn py_format_axis(x: f64) -> String {
    plotting::format_axis(x)
}

#[pyfunction]
#[pyo3(name = "compute_file_hash", signature = (path, algorithm = "sha256"))]
fn py_compute_file_hash(py: Python<'_>, path: PathBuf, algorithm: &str) -> PyResult<String> {
    let algorithm: HashAlgorithm = algorithm.parse()?;
    // Hashing large files should not hold the GIL.
    Ok(py.allow_threads(|| utils::hash_file(&path, algorithm))?)
}

#[pyfunction]
#[pyo3(name = "encode_by_frequency", signature = (columns, rows, input_cols, normalized = true))]
fn py_encode_by_frequency(
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    input_cols: Vec<String>,
    normalized: bool,
) -> PyResult<PyFrame> {
    let frame = DataFrame::from_rows(columns, rows)?;
    let cols: Vec<&str> = input_cols.iter().map(String::as_str).collect();
    let encoded = frame::encode_categorical_features_by_frequency(&frame, &cols, normalized)?;
    Ok(to_py_frame(encoded))
}

#[pyfunction]
#[pyo3(name = "init_logging", signature = (directive = "dsutils=info"))]
fn py_init_logging(directive: &str) -> bool {
    crate::logging::init_tracing(directive)
}

// --- Classes ---

#[pyclass(name = "YamlConfigManager")]
struct PyYamlConfigManager {
    inner: YamlConfigManager,
}

#[pymethods]
impl PyYamlConfigManager {
    #[new]
    fn py_new(config_file: PathBuf) -> PyResult<Self> {
        Ok(PyYamlConfigManager {
            inner: YamlConfigManager::new(config_file)?,
        })
    }

    #[pyo3(signature = (*keys))]
    fn get_property(&self, py: Python<'_>, keys: Vec<String>) -> PyResult<PyObject> {
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        yaml_to_py(py, self.inner.get_property(&keys)?)
    }

    fn __repr__(&self) -> String {
        format!("YamlConfigManager(config_file={})", self.inner.path().display())
    }
}

#[pyclass(name = "PcaTransformer")]
struct PyPcaTransformer {
    inner: PcaTransformer,
}

#[pymethods]
impl PyPcaTransformer {
    #[new]
    #[pyo3(signature = (n_components = 3))]
    fn py_new(n_components: usize) -> Self {
        PyPcaTransformer {
            inner: PcaTransformer::new(n_components),
        }
    }

    fn fit(&mut self, columns: Vec<String>, rows: Vec<Vec<Value>>) -> PyResult<()> {
        self.inner.fit(&DataFrame::from_rows(columns, rows)?)?;
        Ok(())
    }

    fn transform(&self, columns: Vec<String>, rows: Vec<Vec<Value>>) -> PyResult<PyFrame> {
        let scores = self.inner.transform(&DataFrame::from_rows(columns, rows)?)?;
        Ok(to_py_frame(scores))
    }

    fn fit_transform(&mut self, columns: Vec<String>, rows: Vec<Vec<Value>>) -> PyResult<PyFrame> {
        let scores = self.inner.fit_transform(&DataFrame::from_rows(columns, rows)?)?;
        Ok(to_py_frame(scores))
    }

    #[getter]
    fn explained_variance_ratio(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.explained_variance_ratio()?.to_vec())
    }

    #[getter]
    fn components(&self) -> PyResult<PyFrame> {
        Ok(to_py_frame(self.inner.components_frame()?))
    }

    #[pyo3(signature = (limit_components = 2, threshold = 0.1))]
    fn filter_components(&self, limit_components: usize, threshold: f64) -> PyResult<PyFrame> {
        Ok(to_py_frame(
            self.inner.filter_components(limit_components, threshold)?,
        ))
    }

    /// Explained-variance figure as Plotly JSON.
    fn plot_pca_variance(&self) -> PyResult<String> {
        let figure = self.inner.plot_pca_variance()?;
        figure
            .to_json()
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn save(&self, path: PathBuf) -> PyResult<()> {
        Ok(utils::save_pca(&self.inner, path)?)
    }

    #[staticmethod]
    fn load(path: PathBuf) -> PyResult<Self> {
        Ok(PyPcaTransformer {
            inner: utils::load_pca(path)?,
        })
    }

    fn __repr__(&self) -> String {
        self.inner.to_string()
    }
}

// --- Module Definition ---

#[pymodule]
fn dsutils(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_format_axis, m)?)?;
    m.add_function(wrap_pyfunction!(py_compute_file_hash, m)?)?;
    m.add_function(wrap_pyfunction!(py_encode_by_frequency, m)?)?;
    m.add_function(wrap_pyfunction!(py_init_logging, m)?)?;

    m.add_class::<PyYamlConfigManager>()?;
    m.add_class::<PyPcaTransformer>()?;

    Ok(())
}
