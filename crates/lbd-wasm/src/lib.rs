//! WebAssembly bindings for the luabound output reader
//!
//! This crate provides WASM bindings for decoding output files in browser and
//! Node.js environments. The file content is passed in as text (or bytes);
//! there is no file system access.
//!
//! # Usage
//!
//! ```javascript
//! import init, { parseLbd, getColumn } from 'lbd-wasm';
//!
//! await init();
//! const result = parseLbd(file.name, await file.text());
//! console.log(result.filename, result.rows);
//! const times = getColumn(result, 'st');
//! ```

use js_sys::Reflect;
use lbd_core::{load_str, Cell, ColumnType, LbdError, ParticleTable, Table, TagView};
use serde::Serialize;
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

/// Decode the text of an output file
///
/// # Arguments
/// * `name` - Name used to identify the source in errors
/// * `text` - Full content of the output file
///
/// # Returns
/// A JavaScript object with the header fields, the tag names and one entry
/// per tag in `columns`
#[wasm_bindgen(js_name = parseLbd)]
pub fn parse_lbd(name: &str, text: &str) -> Result<JsValue, JsValue> {
    let table = load_str(name, text).map_err(to_js_err)?;
    let summary = summarize(&table).map_err(to_js_err)?;
    summary
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

/// Decode an output file from a Uint8Array
#[wasm_bindgen(js_name = parseLbdBytes)]
pub fn parse_lbd_bytes(name: &str, data: &[u8]) -> Result<JsValue, JsValue> {
    let text = std::str::from_utf8(data).map_err(|_| to_js_err(LbdError::InvalidEncoding))?;
    parse_lbd(name, text)
}

/// Get the values of one tag from a parsed result
#[wasm_bindgen(js_name = getColumn)]
pub fn get_column(result: &JsValue, tag: &str) -> Result<JsValue, JsValue> {
    let columns = Reflect::get(result, &"columns".into())?;
    let column = Reflect::get(&columns, &tag.into())?;

    if column.is_undefined() {
        return Err(to_js_err(LbdError::UnknownTag(tag.to_string())));
    }

    Ok(column)
}

fn to_js_err(e: LbdError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ============================================================================
// Serializable Summary
// ============================================================================

/// Plain data mirror of a [`Table`], shaped for JavaScript
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LbdSummary<'a> {
    filename: &'a str,
    timestamp: &'a str,
    output_rate: f64,
    format: &'a str,
    rows: usize,
    tags: Vec<&'a str>,
    columns: BTreeMap<&'a str, ColumnData<'a>>,
}

/// One scalar value inside a particle list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum CellValue<'a> {
    Float(f64),
    Str(&'a str),
    Vector([f64; 3]),
}

impl<'a> CellValue<'a> {
    fn from_cell(cell: &'a Cell) -> Option<Self> {
        match cell {
            Cell::Float(v) => Some(CellValue::Float(*v)),
            Cell::Str(s) => Some(CellValue::Str(s)),
            Cell::Vector(v) => Some(CellValue::Vector([v.x, v.y, v.z])),
            Cell::Particles(_) => None,
        }
    }
}

/// Values of one tag, one entry per data line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum ColumnData<'a> {
    Floats(Vec<f64>),
    Strings(Vec<&'a str>),
    Vectors(Vec<[f64; 3]>),
    /// Per data line: subtag name to per-particle values
    Lists(Vec<BTreeMap<&'a str, Vec<CellValue<'a>>>>),
}

fn summarize(table: &Table) -> lbd_core::Result<LbdSummary<'_>> {
    let mut columns = BTreeMap::new();
    for (tag, _) in table.tags().iter() {
        columns.insert(tag, column_data(&table.tag(tag)?));
    }

    Ok(LbdSummary {
        filename: table.filename(),
        timestamp: table.timestamp(),
        output_rate: table.output_rate(),
        format: table.format(),
        rows: table.len(),
        tags: table.tags().names().collect(),
        columns,
    })
}

fn column_data<'a>(view: &TagView<'a>) -> ColumnData<'a> {
    let cells = view.cells();
    match view.column_type() {
        ColumnType::Float => ColumnData::Floats(cells.iter().filter_map(Cell::as_f64).collect()),
        ColumnType::String => ColumnData::Strings(cells.iter().filter_map(Cell::as_str).collect()),
        ColumnType::Vector => ColumnData::Vectors(
            cells
                .iter()
                .filter_map(Cell::as_vector)
                .map(|v| [v.x, v.y, v.z])
                .collect(),
        ),
        ColumnType::List => ColumnData::Lists(
            cells
                .iter()
                .filter_map(Cell::as_particles)
                .map(particle_line)
                .collect(),
        ),
    }
}

fn particle_line(particles: &ParticleTable) -> BTreeMap<&str, Vec<CellValue<'_>>> {
    particles
        .tags()
        .iter()
        .map(|(subtag, index)| {
            let values = (0..particles.len())
                .filter_map(|p| particles.cell(index, p))
                .filter_map(CellValue::from_cell)
                .collect();
            (subtag, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PARTICLES: &str = "# filename: two.txt\n\
                                 # timestamp: 01/01/18 12:00:00\n\
                                 # output timing: 1\n\
                                 # format: #sn #st, {#pm #px} #aev\n\
                                 5 12.0, 1.0 2.0 3.0 4.0 {{1|0|0}}\n";

    #[test]
    fn test_summary_header() {
        let table = load_str("two", TWO_PARTICLES).unwrap();
        let summary = summarize(&table).unwrap();
        assert_eq!(summary.filename, "two.txt");
        assert_eq!(summary.output_rate, 1.0);
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.tags, vec!["sn", "st", "l0", "aev"]);
    }

    #[test]
    fn test_summary_columns() {
        let table = load_str("two", TWO_PARTICLES).unwrap();
        let summary = summarize(&table).unwrap();
        assert_eq!(summary.columns["sn"], ColumnData::Strings(vec!["5"]));
        assert_eq!(summary.columns["st"], ColumnData::Floats(vec![12.0]));
        assert_eq!(
            summary.columns["aev"],
            ColumnData::Vectors(vec![[1.0, 0.0, 0.0]])
        );

        let ColumnData::Lists(lines) = &summary.columns["l0"] else {
            panic!("expected a list column");
        };
        assert_eq!(
            lines[0]["pm"],
            vec![CellValue::Float(1.0), CellValue::Float(3.0)]
        );
        assert_eq!(
            lines[0]["px"],
            vec![CellValue::Float(2.0), CellValue::Float(4.0)]
        );
    }
}
