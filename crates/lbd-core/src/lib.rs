//! # Luabound Output Reader - Core Library
//!
//! Decodes the text output files written by the luabound simulation tool into
//! an immutable, randomly indexable table.
//!
//! Each output file describes its own layout: the fourth header line holds a
//! format string (for example `#st {#pm #px #py}`) that says which values
//! appear on every data line and in which order. Braces mark a list of values
//! repeated once per particle; the particle count of each line is inferred
//! from its length.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lbd_core::load;
//!
//! let table = load("orbits.txt").unwrap();
//! println!("File: {} ({} lines)", table.filename(), table.len());
//!
//! // Simulation time of every line
//! let times = table.tag("st").unwrap().floats().unwrap();
//!
//! // Masses of every particle, per line
//! for masses in table.tag("l0").unwrap().subtag("pm").unwrap() {
//!     println!("{} particles", masses.len());
//! }
//! ```
//!
//! ## Enabling Logging
//!
//! This library uses `tracing` for structured logging. To see log output,
//! initialize a tracing subscriber in your application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! let table = lbd_core::load("orbits.txt").unwrap();
//! ```

mod decoder;
mod format;
mod header;
mod table;
mod tagmap;
mod types;
mod view;

use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::{info, instrument};

// Re-export public types
pub use types::{
    // Cells
    Axis,
    Cell,
    // Errors
    LbdError,
    ParticleValue,
    Result,
    SimValue,
    ValueCode,
    ValueDataType,
    // Vocabulary
    ValueKind,
    Vector3,
    // Constants
    DATA_DELIMITERS,
    FORMAT_PUNCTUATION,
    HEADER_PREFIXES,
};

pub use decoder::{decode_value, split_fields, LineDecoder};
pub use format::{parse_format, FormatToken, ValueToken};
pub use header::{split_header, Header};
pub use table::{ColumnType, Key, ParticleItem, ParticleTable, Table, TableItem};
pub use tagmap::TagMap;
pub use view::{TagItem, TagView, TimestampItem, TimestampView};

// ============================================================================
// Public API Functions
// ============================================================================

/// Load a luabound output file.
///
/// # Arguments
/// * `path` - Path to the output file
///
/// # Returns
/// * `Ok(Table)` - The decoded file
/// * `Err(LbdError)` - The first problem found; no partial table is returned
///
/// # Example
/// ```rust,no_run
/// let table = lbd_core::load("orbits.txt").unwrap();
/// let line = table.row(0).unwrap();
/// println!("{} columns", line.record(0).unwrap().len());
/// ```
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LbdError::FileNotFound(path.to_path_buf()));
    }

    let name = path.display().to_string();
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return load_str(&name, "");
    }
    let mmap = unsafe { Mmap::map(&file)? };
    let text = std::str::from_utf8(&mmap).map_err(|_| LbdError::InvalidEncoding)?;

    load_str(&name, text)
}

/// Decode the full text of an output file that has already been read.
///
/// `name` only identifies the source in log output.
#[instrument(skip(content), fields(bytes = content.len()))]
pub fn load_str(name: &str, content: &str) -> Result<Table> {
    let (header, lines) = split_header(content)?;
    let tokens = parse_format(&header.format)?;
    let table = decoder::decode_table(header, tokens, &lines)?;

    info!(
        rows = table.len(),
        columns = table.num_columns(),
        "Output file loaded"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORBITS: &str = "# filename: orbits.txt\n\
                          # timestamp: 03/07/17 14:22:10\n\
                          # output timing: 0.25\n\
                          # format: #sn #st, {#pm #px #aev}\n\
                          \n\
                          sim 0.0, 1.0 0.5 {{1|2|3}} 2.0 1.5 {{4|5|6}}\n\
                          sim 0.25, 1.0 0.6 {{7|8|9}}\n";

    #[test]
    fn test_load_str_builds_table() {
        let table = load_str("orbits", ORBITS).unwrap();
        assert_eq!(table.filename(), "orbits.txt");
        assert_eq!(table.output_rate(), 0.25);
        assert_eq!(table.len(), 2);
        assert_eq!(table.num_columns(), 3);
        assert_eq!(table.tags().names().collect::<Vec<_>>(), vec!["sn", "st", "l0"]);
    }

    #[test]
    fn test_tag_view_on_list() {
        let table = load_str("orbits", ORBITS).unwrap();
        let list = table.tag("l0").unwrap();
        assert!(list.is_list());
        let masses = list.subtag("pm").unwrap();
        assert_eq!(masses.len(), 2);
        assert_eq!(masses[0], &[Cell::Float(1.0), Cell::Float(2.0)]);
        assert_eq!(masses[1], &[Cell::Float(1.0)]);
        assert!(matches!(list.subtag("pvx"), Err(LbdError::UnknownTag(_))));
        assert!(matches!(list.x(), Err(LbdError::TypeMismatch { .. })));
    }

    #[test]
    fn test_scalar_tag_view_rejects_string_keys() {
        let table = load_str("orbits", ORBITS).unwrap();
        let time = table.tag("st").unwrap();
        assert_eq!(time.get(1usize).unwrap(), TagItem::Cell(&Cell::Float(0.25)));
        assert!(matches!(
            time.get("pm"),
            Err(LbdError::TypeMismatch { expected: "list", found: "float" })
        ));
        assert!(matches!(time.get(0usize..1), Err(LbdError::InvalidKeyType)));
        assert_eq!(time.floats().unwrap(), vec![0.0, 0.25]);
    }

    #[test]
    fn test_timestamp_view() {
        let table = load_str("orbits", ORBITS).unwrap();
        let TableItem::Timestamps(line) = table.get(1usize).unwrap() else {
            panic!("expected a timestamp view");
        };
        assert_eq!(line.len(), 1);
        let list = line.cell(2).unwrap().as_particles().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(
            list.subtag("aev").unwrap(),
            &[Cell::Vector(Vector3::new(7.0, 8.0, 9.0))]
        );
        let scoped = line.tag("st").unwrap();
        assert_eq!(scoped.cells(), &[Cell::Float(0.25)]);
        assert!(matches!(line.column(3), Err(LbdError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_unknown_tag_and_row() {
        let table = load_str("orbits", ORBITS).unwrap();
        assert!(matches!(table.get("sdt"), Err(LbdError::UnknownTag(t)) if t == "sdt"));
        assert!(matches!(
            table.row(2),
            Err(LbdError::IndexOutOfRange { index: 2, len: 2 })
        ));
        let TableItem::Timestamps(all) = table.get(..).unwrap() else {
            panic!("expected a timestamp view");
        };
        assert_eq!(all.rows(), 0..2);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load("/nonexistent/path/orbits.txt"),
            Err(LbdError::FileNotFound(_))
        ));
    }
}
