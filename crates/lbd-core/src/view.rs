//! Borrowed projections over a [`Table`]
//!
//! Views hold a slice or a row range plus a reference to the table, so they
//! cannot outlive it and never copy cells.

use crate::table::{check_index, ColumnType, Key, Table};
use crate::tagmap::TagMap;
use crate::types::{Axis, Cell, LbdError, Result};
use std::ops::Range;

// ============================================================================
// Tag View
// ============================================================================

/// One tag (column) across all or some of the data lines
#[derive(Debug, Clone)]
pub struct TagView<'a> {
    tag: &'a str,
    cells: &'a [Cell],
    column_type: ColumnType,
    subtags: Option<&'a TagMap>,
}

/// Result of [`TagView::get`]
#[derive(Debug, Clone, PartialEq)]
pub enum TagItem<'a> {
    /// The cell of one data line
    Cell(&'a Cell),
    /// One subtag of a list, per data line
    Subtag(Vec<&'a [Cell]>),
}

impl<'a> TagView<'a> {
    pub(crate) fn new(
        tag: &'a str,
        cells: &'a [Cell],
        column_type: ColumnType,
        subtags: Option<&'a TagMap>,
    ) -> Self {
        Self {
            tag,
            cells,
            column_type,
            subtags,
        }
    }

    /// Tag name this view was created from
    pub fn tag(&self) -> &'a str {
        self.tag
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Whether the wrapped cells are particle lists
    pub fn is_list(&self) -> bool {
        self.column_type == ColumnType::List
    }

    /// Whether the `x`/`y`/`z` accessors are available
    pub fn is_vector(&self) -> bool {
        self.column_type == ColumnType::Vector
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The wrapped cells, one per data line
    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    pub fn iter(&self) -> std::slice::Iter<'a, Cell> {
        self.cells.iter()
    }

    /// Subtag map, for list views
    pub fn subtags(&self) -> Option<&'a TagMap> {
        self.subtags
    }

    /// Cell of the `index`-th data line in the view
    pub fn at(&self, index: usize) -> Result<&'a Cell> {
        check_index(index, self.cells.len()).map(|i| &self.cells[i])
    }

    /// Values of one list subtag for every data line in the view, ordered by
    /// line and then by particle.
    pub fn subtag(&self, tag: &str) -> Result<Vec<&'a [Cell]>> {
        let subtags = self.subtags.filter(|_| self.is_list()).ok_or(
            LbdError::TypeMismatch {
                expected: ColumnType::List.name(),
                found: self.column_type.name(),
            },
        )?;
        subtags.index_of(tag)?;
        self.cells
            .iter()
            .map(|cell| match cell {
                Cell::Particles(p) => p.subtag(tag),
                other => Err(LbdError::TypeMismatch {
                    expected: ColumnType::List.name(),
                    found: other.type_name(),
                }),
            })
            .collect()
    }

    /// One vector component per data line
    pub fn components(&self, axis: Axis) -> Result<Vec<f64>> {
        if !self.is_vector() {
            return Err(LbdError::TypeMismatch {
                expected: ColumnType::Vector.name(),
                found: self.column_type.name(),
            });
        }
        self.cells
            .iter()
            .map(|cell| {
                cell.as_vector()
                    .map(|v| v.component(axis))
                    .ok_or(LbdError::TypeMismatch {
                        expected: ColumnType::Vector.name(),
                        found: cell.type_name(),
                    })
            })
            .collect()
    }

    pub fn x(&self) -> Result<Vec<f64>> {
        self.components(Axis::X)
    }

    pub fn y(&self) -> Result<Vec<f64>> {
        self.components(Axis::Y)
    }

    pub fn z(&self) -> Result<Vec<f64>> {
        self.components(Axis::Z)
    }

    /// Float values of a float view
    pub fn floats(&self) -> Result<Vec<f64>> {
        self.cells
            .iter()
            .map(|cell| {
                cell.as_f64().ok_or(LbdError::TypeMismatch {
                    expected: ColumnType::Float.name(),
                    found: cell.type_name(),
                })
            })
            .collect()
    }

    /// Text values of a string view
    pub fn strings(&self) -> Result<Vec<&'a str>> {
        self.cells
            .iter()
            .map(|cell| {
                cell.as_str().ok_or(LbdError::TypeMismatch {
                    expected: ColumnType::String.name(),
                    found: cell.type_name(),
                })
            })
            .collect()
    }

    /// Integer keys select a data line. String keys select a list subtag and
    /// are only valid on list views.
    pub fn get<'k>(&self, key: impl Into<Key<'k>>) -> Result<TagItem<'a>> {
        match key.into() {
            Key::Index(i) => self.at(i).map(TagItem::Cell),
            Key::Tag(tag) => self.subtag(tag).map(TagItem::Subtag),
            Key::Range(_) => Err(LbdError::InvalidKeyType),
        }
    }
}

// ============================================================================
// Timestamp View
// ============================================================================

/// A range of data lines across every column
#[derive(Debug, Clone)]
pub struct TimestampView<'a> {
    table: &'a Table,
    rows: Range<usize>,
}

/// Result of [`TimestampView::get`]
#[derive(Debug, Clone)]
pub enum TimestampItem<'a> {
    /// One column restricted to the view's rows
    Column(&'a [Cell]),
    Tag(TagView<'a>),
}

impl<'a> TimestampView<'a> {
    pub(crate) fn new(table: &'a Table, rows: Range<usize>) -> Self {
        Self { table, rows }
    }

    /// Table rows covered by this view
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Cells of `column` for every row in the view
    pub fn column(&self, column: usize) -> Result<&'a [Cell]> {
        let table = self.table;
        let cells = table
            .column(column)
            .ok_or(LbdError::IndexOutOfRange {
                index: column,
                len: table.num_columns(),
            })?;
        Ok(&cells[self.rows.clone()])
    }

    /// Cell of `column` in the first row of the view. For a single-line view
    /// this is the line's value (its particle table, for list columns).
    pub fn cell(&self, column: usize) -> Result<&'a Cell> {
        self.column(column)?
            .first()
            .ok_or(LbdError::IndexOutOfRange { index: 0, len: 0 })
    }

    /// Every column of the `index`-th row in the view
    pub fn record(&self, index: usize) -> Result<Vec<&'a Cell>> {
        let row = self.rows.start + check_index(index, self.len())?;
        let table = self.table;
        Ok((0..table.num_columns())
            .filter_map(|c| table.cell(c, row))
            .collect())
    }

    /// A tag view restricted to this view's rows
    pub fn tag(&self, tag: &str) -> Result<TagView<'a>> {
        let table = self.table;
        let column = table.tags().index_of(tag)?;
        Ok(table.tag_view(column, self.rows.clone()))
    }

    /// Integer keys select a column, string keys a tag
    pub fn get<'k>(&self, key: impl Into<Key<'k>>) -> Result<TimestampItem<'a>> {
        match key.into() {
            Key::Index(c) => self.column(c).map(TimestampItem::Column),
            Key::Tag(tag) => self.tag(tag).map(TimestampItem::Tag),
            Key::Range(_) => Err(LbdError::InvalidKeyType),
        }
    }
}
