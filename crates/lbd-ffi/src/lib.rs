//! C Foreign Function Interface (FFI) for the luabound output reader
//!
//! This module provides a C-compatible API for loading output files from C,
//! C++, and other languages that support C FFI.
//!
//! Columns and rows are addressed by 0-based `int` indices. Functions that
//! return `int` report failure with `-1`; functions that return pointers
//! report failure with `NULL`. After a failed `lbd_load`, `lbd_last_error`
//! describes the problem.

use lbd_core::{load, Cell, ColumnType, Table};
use std::cell::RefCell;
use std::ffi::{c_char, c_double, c_int, CStr, CString};
use std::ptr;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Opaque Types for C
// ============================================================================

/// Opaque handle to a loaded table
#[repr(C)]
pub struct CLbdTable {
    inner: Box<Table>,
    cached_filename: CString,
    cached_timestamp: CString,
    cached_format: CString,
    cached_tag_names: Vec<CString>,
    /// `[column][row]`, empty for columns that are not strings
    cached_strings: Vec<Vec<CString>>,
}

impl CLbdTable {
    fn new(table: Table) -> Self {
        let cached_tag_names = table
            .tags()
            .names()
            .map(|name| CString::new(name).unwrap_or_default())
            .collect();
        let cached_strings = (0..table.num_columns())
            .map(|column| {
                table
                    .column(column)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(Cell::as_str)
                    .map(|s| CString::new(s).unwrap_or_default())
                    .collect()
            })
            .collect();

        CLbdTable {
            cached_filename: CString::new(table.filename()).unwrap_or_default(),
            cached_timestamp: CString::new(table.timestamp()).unwrap_or_default(),
            cached_format: CString::new(table.format()).unwrap_or_default(),
            cached_tag_names,
            cached_strings,
            inner: Box::new(table),
        }
    }
}

// ============================================================================
// Error Reporting
// ============================================================================

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(message: String) {
    let message = CString::new(message).unwrap_or_default();
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(message));
}

/// Message of the last failed `lbd_load` on this thread, or NULL.
///
/// The pointer stays valid until the next failing call on the same thread.
#[no_mangle]
pub extern "C" fn lbd_last_error() -> *const c_char {
    LAST_ERROR.with(|e| e.borrow().as_ref().map_or(ptr::null(), |s| s.as_ptr()))
}

/// Install a tracing subscriber writing to stderr. `RUST_LOG` takes
/// precedence over `level`; a NULL `level` means "info".
///
/// Returns 0 on success, 1 if a subscriber was already installed and -1 if
/// the filter could not be parsed.
#[no_mangle]
pub unsafe extern "C" fn lbd_init_logging(level: *const c_char) -> c_int {
    let level = str_arg(level).unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level)) {
        Ok(f) => f,
        Err(_) => return -1,
    };
    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

// ============================================================================
// Helpers
// ============================================================================

unsafe fn str_arg<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

fn index(i: c_int) -> Option<usize> {
    usize::try_from(i).ok()
}

unsafe fn table_ref<'a>(table: *const CLbdTable) -> Option<&'a CLbdTable> {
    if table.is_null() {
        None
    } else {
        Some(&*table)
    }
}

unsafe fn cell_at<'a>(table: *const CLbdTable, column: c_int, row: c_int) -> Option<&'a Cell> {
    table_ref(table)?.inner.cell(index(column)?, index(row)?)
}

// ============================================================================
// Table Creation and Destruction
// ============================================================================

/// Load an output file and return a table handle, or NULL on failure.
#[no_mangle]
pub unsafe extern "C" fn lbd_load(path: *const c_char) -> *mut CLbdTable {
    let path = match str_arg(path) {
        Some(p) => p,
        None => {
            set_last_error("path is NULL or not valid UTF-8".to_string());
            return ptr::null_mut();
        }
    };

    match load(path) {
        Ok(table) => Box::into_raw(Box::new(CLbdTable::new(table))),
        Err(e) => {
            debug!(path, error = %e, "lbd_load failed");
            set_last_error(e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a table handle.
#[no_mangle]
pub unsafe extern "C" fn lbd_free(table: *mut CLbdTable) {
    if !table.is_null() {
        drop(Box::from_raw(table));
    }
}

// ============================================================================
// Metadata Accessors
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn lbd_get_filename(table: *const CLbdTable) -> *const c_char {
    table_ref(table).map_or(ptr::null(), |t| t.cached_filename.as_ptr())
}

#[no_mangle]
pub unsafe extern "C" fn lbd_get_timestamp(table: *const CLbdTable) -> *const c_char {
    table_ref(table).map_or(ptr::null(), |t| t.cached_timestamp.as_ptr())
}

#[no_mangle]
pub unsafe extern "C" fn lbd_get_format(table: *const CLbdTable) -> *const c_char {
    table_ref(table).map_or(ptr::null(), |t| t.cached_format.as_ptr())
}

#[no_mangle]
pub unsafe extern "C" fn lbd_get_output_rate(table: *const CLbdTable) -> c_double {
    table_ref(table).map_or(0.0, |t| t.inner.output_rate())
}

/// Number of data lines
#[no_mangle]
pub unsafe extern "C" fn lbd_row_count(table: *const CLbdTable) -> c_int {
    table_ref(table).map_or(0, |t| t.inner.len() as c_int)
}

#[no_mangle]
pub unsafe extern "C" fn lbd_column_count(table: *const CLbdTable) -> c_int {
    table_ref(table).map_or(0, |t| t.inner.num_columns() as c_int)
}

// ============================================================================
// Tag Accessors
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn lbd_tag_name(table: *const CLbdTable, column: c_int) -> *const c_char {
    table_ref(table)
        .zip(index(column))
        .and_then(|(t, c)| t.cached_tag_names.get(c))
        .map_or(ptr::null(), |name| name.as_ptr())
}

/// Column index of `tag`, or -1 if the tag is unknown.
#[no_mangle]
pub unsafe extern "C" fn lbd_tag_index(table: *const CLbdTable, tag: *const c_char) -> c_int {
    table_ref(table)
        .zip(str_arg(tag))
        .and_then(|(t, tag)| t.inner.tags().get(tag))
        .map_or(-1, |c| c as c_int)
}

/// Column type: 0 = float, 1 = string, 2 = vector, 3 = particle list.
#[no_mangle]
pub unsafe extern "C" fn lbd_cell_type(table: *const CLbdTable, column: c_int) -> c_int {
    let column_type = table_ref(table)
        .zip(index(column))
        .and_then(|(t, c)| t.inner.column_type(c));
    match column_type {
        Some(ColumnType::Float) => 0,
        Some(ColumnType::String) => 1,
        Some(ColumnType::Vector) => 2,
        Some(ColumnType::List) => 3,
        None => -1,
    }
}

// ============================================================================
// Cell Accessors
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn lbd_get_float(
    table: *const CLbdTable,
    column: c_int,
    row: c_int,
    out_value: *mut c_double,
) -> c_int {
    if out_value.is_null() {
        return -1;
    }
    match cell_at(table, column, row).and_then(Cell::as_f64) {
        Some(v) => {
            *out_value = v;
            0
        }
        None => -1,
    }
}

/// Write the three components of a vector cell to `out_xyz[0..3]`.
#[no_mangle]
pub unsafe extern "C" fn lbd_get_vector(
    table: *const CLbdTable,
    column: c_int,
    row: c_int,
    out_xyz: *mut c_double,
) -> c_int {
    if out_xyz.is_null() {
        return -1;
    }
    match cell_at(table, column, row).and_then(Cell::as_vector) {
        Some(v) => {
            *out_xyz = v.x;
            *out_xyz.add(1) = v.y;
            *out_xyz.add(2) = v.z;
            0
        }
        None => -1,
    }
}

/// String cell, owned by the table handle.
#[no_mangle]
pub unsafe extern "C" fn lbd_get_string(
    table: *const CLbdTable,
    column: c_int,
    row: c_int,
) -> *const c_char {
    table_ref(table)
        .zip(index(column).zip(index(row)))
        .and_then(|(t, (c, r))| t.cached_strings.get(c)?.get(r))
        .map_or(ptr::null(), |s| s.as_ptr())
}

/// Copy a whole float column into `out_buffer`, returning the number of
/// values written.
#[no_mangle]
pub unsafe extern "C" fn lbd_get_column(
    table: *const CLbdTable,
    column: c_int,
    out_buffer: *mut c_double,
    max_count: c_int,
) -> c_int {
    if out_buffer.is_null() || max_count <= 0 {
        return -1;
    }
    let t = match table_ref(table) {
        Some(t) => t,
        None => return -1,
    };
    let column = match index(column) {
        Some(c) if t.inner.column_type(c) == Some(ColumnType::Float) => c,
        _ => return -1,
    };
    let cells = t.inner.column(column).unwrap_or_default();

    let count = std::cmp::min(cells.len(), max_count as usize);
    for (i, cell) in cells.iter().take(count).enumerate() {
        *out_buffer.add(i) = cell.as_f64().unwrap_or(f64::NAN);
    }
    count as c_int
}

// ============================================================================
// Particle List Accessors
// ============================================================================

/// Number of particles in a list cell, or -1 if the cell is not a list.
#[no_mangle]
pub unsafe extern "C" fn lbd_particle_count(
    table: *const CLbdTable,
    column: c_int,
    row: c_int,
) -> c_int {
    cell_at(table, column, row)
        .and_then(Cell::as_particles)
        .map_or(-1, |p| p.len() as c_int)
}

/// Subtag index of `subtag` within a list column, or -1.
#[no_mangle]
pub unsafe extern "C" fn lbd_particle_tag_index(
    table: *const CLbdTable,
    column: c_int,
    subtag: *const c_char,
) -> c_int {
    let t = match table_ref(table) {
        Some(t) => t,
        None => return -1,
    };
    let name = index(column).and_then(|c| t.inner.tags().name(c));
    let (name, subtag) = match name.zip(str_arg(subtag)) {
        Some(pair) => pair,
        None => return -1,
    };
    t.inner
        .tag(name)
        .ok()
        .and_then(|view| view.subtags())
        .and_then(|tags| tags.get(subtag))
        .map_or(-1, |i| i as c_int)
}

#[no_mangle]
pub unsafe extern "C" fn lbd_get_particle_float(
    table: *const CLbdTable,
    column: c_int,
    row: c_int,
    subtag: c_int,
    particle: c_int,
    out_value: *mut c_double,
) -> c_int {
    if out_value.is_null() {
        return -1;
    }
    let value = cell_at(table, column, row)
        .and_then(Cell::as_particles)
        .zip(index(subtag).zip(index(particle)))
        .and_then(|(p, (s, i))| p.cell(s, i))
        .and_then(Cell::as_f64);
    match value {
        Some(v) => {
            *out_value = v;
            0
        }
        None => -1,
    }
}
