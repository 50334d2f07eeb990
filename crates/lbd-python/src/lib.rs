//! Python bindings for the luabound output reader
//!
//! This crate provides PyO3 bindings to expose lbd-core to Python. The core
//! views borrow the table, which Python cannot express, so every Python object
//! here shares the table through an `Arc` and records the rows, column or tag
//! it projects.

use lbd_core::{Axis, Cell, LbdError, ParticleTable, Table, TableItem, TagView, Vector3};
use numpy::ndarray::Array1;
use numpy::IntoPyArray;
use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyIndexError, PyKeyError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyFloat, PyList, PySlice, PyString};
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

create_exception!(
    lbdreader,
    LbdFileLoadError,
    PyException,
    "Raised when an output file cannot be loaded."
);

// ============================================================================
// Error and Key Conversion
// ============================================================================

fn to_py_err(e: LbdError) -> PyErr {
    let message = e.to_string();
    match e {
        LbdError::UnknownTag(_) => PyKeyError::new_err(message),
        LbdError::IndexOutOfRange { .. } => PyIndexError::new_err(message),
        LbdError::TypeMismatch { .. } | LbdError::InvalidKeyType => PyTypeError::new_err(message),
        _ => LbdFileLoadError::new_err(message),
    }
}

/// A Python subscript, resolved against the length of the indexed object
enum PyKey {
    Index(usize),
    Range(Range<usize>),
    Tag(String),
}

/// Accepts `int` (negative counts from the end), `slice` with step 1, and `str`
fn extract_key(key: &Bound<'_, PyAny>, len: usize) -> PyResult<PyKey> {
    if let Ok(slice) = key.downcast::<PySlice>() {
        let indices = slice.indices(len as isize)?;
        if indices.step != 1 {
            return Err(PyValueError::new_err("slice step must be 1"));
        }
        let start = indices.start.max(0) as usize;
        let stop = indices.stop.max(indices.start).max(0) as usize;
        return Ok(PyKey::Range(start..stop));
    }
    if let Ok(index) = key.extract::<isize>() {
        let resolved = if index < 0 { index + len as isize } else { index };
        return usize::try_from(resolved).map(PyKey::Index).map_err(|_| {
            PyIndexError::new_err(format!("index {} out of range for length {}", index, len))
        });
    }
    if let Ok(tag) = key.extract::<String>() {
        return Ok(PyKey::Tag(tag));
    }
    Err(PyTypeError::new_err(format!(
        "unsupported key type: {}",
        key.get_type().name()?
    )))
}

// ============================================================================
// Cell Conversion
// ============================================================================

/// Convert a float, string or vector cell
fn value_to_py(py: Python<'_>, cell: &Cell) -> PyResult<Py<PyAny>> {
    match cell {
        Cell::Float(v) => Ok(PyFloat::new(py, *v).into_any().unbind()),
        Cell::Str(s) => Ok(PyString::new(py, s).into_any().unbind()),
        Cell::Vector(v) => Ok(Py::new(py, PyVector::from(*v))?.into_any()),
        Cell::Particles(_) => Err(PyTypeError::new_err("particle lists cannot be nested")),
    }
}

/// Convert the table cell at (`column`, `row`); particle lists become a
/// `ParticleList` sharing the table.
fn cell_to_py(py: Python<'_>, table: &Arc<Table>, column: usize, row: usize) -> PyResult<Py<PyAny>> {
    let cell = table.cell(column, row).ok_or_else(|| {
        to_py_err(LbdError::IndexOutOfRange {
            index: row,
            len: table.len(),
        })
    })?;
    match cell {
        Cell::Particles(_) => Ok(Py::new(
            py,
            PyParticleList {
                table: Arc::clone(table),
                column,
                row,
            },
        )?
        .into_any()),
        other => value_to_py(py, other),
    }
}

fn values_to_list<'a>(
    py: Python<'_>,
    cells: impl IntoIterator<Item = &'a Cell>,
) -> PyResult<Py<PyAny>> {
    let items = cells
        .into_iter()
        .map(|cell| value_to_py(py, cell))
        .collect::<PyResult<Vec<_>>>()?;
    Ok(PyList::new(py, items)?.into_any().unbind())
}

fn floats_to_numpy(py: Python<'_>, values: Vec<f64>) -> Py<PyAny> {
    Array1::from_vec(values).into_pyarray(py).into_any().unbind()
}

// ============================================================================
// Python Classes
// ============================================================================

/// Python wrapper for a three-component vector value
#[pyclass(name = "Vector", frozen)]
#[derive(Clone, Copy)]
pub struct PyVector {
    #[pyo3(get)]
    pub x: f64,
    #[pyo3(get)]
    pub y: f64,
    #[pyo3(get)]
    pub z: f64,
}

#[pymethods]
impl PyVector {
    fn to_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    fn __repr__(&self) -> String {
        format!("Vector(x={}, y={}, z={})", self.x, self.y, self.z)
    }
}

impl From<Vector3> for PyVector {
    fn from(v: Vector3) -> Self {
        PyVector {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// The particles of one list tag on one data line
#[pyclass(name = "ParticleList", frozen)]
pub struct PyParticleList {
    table: Arc<Table>,
    column: usize,
    row: usize,
}

impl PyParticleList {
    fn particles(&self) -> PyResult<&ParticleTable> {
        self.table
            .cell(self.column, self.row)
            .and_then(Cell::as_particles)
            .ok_or_else(|| PyTypeError::new_err("cell is not a particle list"))
    }
}

#[pymethods]
impl PyParticleList {
    /// Number of particles
    fn __len__(&self) -> PyResult<usize> {
        Ok(self.particles()?.len())
    }

    /// Subtag names in column order
    fn tags(&self) -> PyResult<Vec<String>> {
        Ok(self.particles()?.tags().names().map(str::to_string).collect())
    }

    /// `int` selects one particle's values, `str` one subtag for every particle
    fn __getitem__(&self, py: Python<'_>, key: &Bound<'_, PyAny>) -> PyResult<Py<PyAny>> {
        let particles = self.particles()?;
        match extract_key(key, particles.len())? {
            PyKey::Index(i) => {
                let values = particles.particle(i).map_err(to_py_err)?;
                values_to_list(py, values)
            }
            PyKey::Tag(tag) => {
                let values = particles.subtag(&tag).map_err(to_py_err)?;
                values_to_list(py, values)
            }
            PyKey::Range(_) => Err(to_py_err(LbdError::InvalidKeyType)),
        }
    }

    fn __repr__(&self) -> PyResult<String> {
        let particles = self.particles()?;
        Ok(format!(
            "ParticleList(particles={}, subtags={})",
            particles.len(),
            particles.tags().len()
        ))
    }
}

/// One tag across a range of data lines
#[pyclass(name = "TagView", frozen)]
pub struct PyTagView {
    table: Arc<Table>,
    tag: String,
    rows: Range<usize>,
}

impl PyTagView {
    fn view(&self) -> PyResult<TagView<'_>> {
        self.table
            .rows(self.rows.clone())
            .tag(&self.tag)
            .map_err(to_py_err)
    }

    fn components(&self, py: Python<'_>, axis: Axis) -> PyResult<Py<PyAny>> {
        let values = self.view()?.components(axis).map_err(to_py_err)?;
        Ok(floats_to_numpy(py, values))
    }
}

#[pymethods]
impl PyTagView {
    #[getter]
    fn tag(&self) -> &str {
        &self.tag
    }

    #[getter]
    fn is_list(&self) -> PyResult<bool> {
        Ok(self.view()?.is_list())
    }

    #[getter]
    fn is_vector(&self) -> PyResult<bool> {
        Ok(self.view()?.is_vector())
    }

    /// Subtag names, or None for non-list tags
    fn subtags(&self) -> PyResult<Option<Vec<String>>> {
        Ok(self
            .view()?
            .subtags()
            .map(|tags| tags.names().map(str::to_string).collect()))
    }

    fn __len__(&self) -> usize {
        self.rows.len()
    }

    /// `int` selects a data line; `str` selects a subtag of a list tag and
    /// returns one list of particle values per data line.
    fn __getitem__(&self, py: Python<'_>, key: &Bound<'_, PyAny>) -> PyResult<Py<PyAny>> {
        let view = self.view()?;
        match extract_key(key, view.len())? {
            PyKey::Index(i) => {
                view.at(i).map_err(to_py_err)?;
                let column = self.table.tags().index_of(&self.tag).map_err(to_py_err)?;
                cell_to_py(py, &self.table, column, self.rows.start + i)
            }
            PyKey::Tag(subtag) => {
                let per_line = view
                    .subtag(&subtag)
                    .map_err(to_py_err)?
                    .into_iter()
                    .map(|cells| values_to_list(py, cells))
                    .collect::<PyResult<Vec<_>>>()?;
                Ok(PyList::new(py, per_line)?.into_any().unbind())
            }
            PyKey::Range(_) => Err(to_py_err(LbdError::InvalidKeyType)),
        }
    }

    #[getter]
    fn x(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        self.components(py, Axis::X)
    }

    #[getter]
    fn y(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        self.components(py, Axis::Y)
    }

    #[getter]
    fn z(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        self.components(py, Axis::Z)
    }

    /// Float values as a numpy array
    fn to_numpy(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let values = self.view()?.floats().map_err(to_py_err)?;
        Ok(floats_to_numpy(py, values))
    }

    /// Every cell of the view as a Python list
    fn to_list(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let column = self.table.tags().index_of(&self.tag).map_err(to_py_err)?;
        let items = self
            .rows
            .clone()
            .map(|row| cell_to_py(py, &self.table, column, row))
            .collect::<PyResult<Vec<_>>>()?;
        Ok(PyList::new(py, items)?.into_any().unbind())
    }

    fn __repr__(&self) -> String {
        format!("TagView(tag='{}', lines={})", self.tag, self.rows.len())
    }
}

/// A range of data lines across every tag
#[pyclass(name = "TimestampView", frozen)]
pub struct PyTimestampView {
    table: Arc<Table>,
    rows: Range<usize>,
}

#[pymethods]
impl PyTimestampView {
    /// (start, stop) of the covered data lines
    #[getter]
    fn rows(&self) -> (usize, usize) {
        (self.rows.start, self.rows.end)
    }

    fn __len__(&self) -> usize {
        self.rows.len()
    }

    fn tags(&self) -> Vec<String> {
        self.table.tags().names().map(str::to_string).collect()
    }

    /// `int` selects a column: the cell itself for a single line, otherwise a
    /// list with one cell per line. `str` selects a tag over the same lines.
    fn __getitem__(&self, py: Python<'_>, key: &Bound<'_, PyAny>) -> PyResult<Py<PyAny>> {
        let view = self.table.rows(self.rows.clone());
        match extract_key(key, self.table.num_columns())? {
            PyKey::Index(column) => {
                view.column(column).map_err(to_py_err)?;
                if self.rows.len() == 1 {
                    return cell_to_py(py, &self.table, column, self.rows.start);
                }
                let items = self
                    .rows
                    .clone()
                    .map(|row| cell_to_py(py, &self.table, column, row))
                    .collect::<PyResult<Vec<_>>>()?;
                Ok(PyList::new(py, items)?.into_any().unbind())
            }
            PyKey::Tag(tag) => {
                view.tag(&tag).map_err(to_py_err)?;
                let tag_view = PyTagView {
                    table: Arc::clone(&self.table),
                    tag,
                    rows: self.rows.clone(),
                };
                Ok(Py::new(py, tag_view)?.into_any())
            }
            PyKey::Range(_) => Err(to_py_err(LbdError::InvalidKeyType)),
        }
    }

    /// Every column of the `index`-th line in the view
    fn record(&self, py: Python<'_>, index: usize) -> PyResult<Py<PyAny>> {
        self.table
            .rows(self.rows.clone())
            .record(index)
            .map_err(to_py_err)?;
        let row = self.rows.start + index;
        let items = (0..self.table.num_columns())
            .map(|column| cell_to_py(py, &self.table, column, row))
            .collect::<PyResult<Vec<_>>>()?;
        Ok(PyList::new(py, items)?.into_any().unbind())
    }

    fn __repr__(&self) -> String {
        format!("TimestampView(rows={}..{})", self.rows.start, self.rows.end)
    }
}

/// A loaded output file
#[pyclass(name = "LbdFile", frozen)]
pub struct PyLbdFile {
    table: Arc<Table>,
}

#[pymethods]
impl PyLbdFile {
    #[getter]
    fn filename(&self) -> &str {
        self.table.filename()
    }

    #[getter]
    fn timestamp(&self) -> &str {
        self.table.timestamp()
    }

    #[getter]
    fn output_rate(&self) -> f64 {
        self.table.output_rate()
    }

    #[getter]
    fn format(&self) -> &str {
        self.table.format()
    }

    /// Number of data lines
    #[getter]
    fn datalen(&self) -> usize {
        self.table.len()
    }

    fn tags(&self) -> Vec<String> {
        self.table.tags().names().map(str::to_string).collect()
    }

    fn __len__(&self) -> usize {
        self.table.len()
    }

    fn __contains__(&self, tag: &str) -> bool {
        self.table.tags().contains(tag)
    }

    /// `int` or `slice` selects data lines, `str` selects a tag
    fn __getitem__(&self, py: Python<'_>, key: &Bound<'_, PyAny>) -> PyResult<Py<PyAny>> {
        let key = extract_key(key, self.table.len())?;
        let lookup = match &key {
            PyKey::Index(i) => self.table.get(*i),
            PyKey::Range(r) => self.table.get(r.clone()),
            PyKey::Tag(t) => self.table.get(t),
        };
        match lookup.map_err(to_py_err)? {
            TableItem::Timestamps(view) => {
                let view = PyTimestampView {
                    table: Arc::clone(&self.table),
                    rows: view.rows(),
                };
                Ok(Py::new(py, view)?.into_any())
            }
            TableItem::Tag(view) => {
                let view = PyTagView {
                    table: Arc::clone(&self.table),
                    tag: view.tag().to_string(),
                    rows: 0..self.table.len(),
                };
                Ok(Py::new(py, view)?.into_any())
            }
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "LbdFile(filename='{}', lines={}, tags={})",
            self.table.filename(),
            self.table.len(),
            self.table.tags().len()
        )
    }
}

// ============================================================================
// Python Functions
// ============================================================================

/// Load a luabound output file
///
/// Args:
///     path: Path to the output file
///
/// Returns:
///     LbdFile object
///
/// Raises:
///     LbdFileLoadError: if the file is missing or cannot be decoded
#[pyfunction]
pub fn load(py: Python<'_>, path: PathBuf) -> PyResult<PyLbdFile> {
    let table = py
        .allow_threads(|| lbd_core::load(&path))
        .map_err(|e| {
            debug!(path = %path.display(), error = %e, "Load failed");
            to_py_err(e)
        })?;
    Ok(PyLbdFile {
        table: Arc::new(table),
    })
}

/// Install a tracing subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `level`. Returns False if a subscriber
/// was already installed.
#[pyfunction]
#[pyo3(signature = (level="info"))]
pub fn init_logging(level: &str) -> PyResult<bool> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok())
}

// ============================================================================
// Module Definition
// ============================================================================

#[pymodule]
pub fn lbdreader(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Functions
    m.add_function(wrap_pyfunction!(load, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    // Exceptions
    m.add("LbdFileLoadError", m.py().get_type::<LbdFileLoadError>())?;

    // Classes
    m.add_class::<PyLbdFile>()?;
    m.add_class::<PyTagView>()?;
    m.add_class::<PyTimestampView>()?;
    m.add_class::<PyParticleList>()?;
    m.add_class::<PyVector>()?;

    Ok(())
}
