//! Decoded table and particle sub-tables

use crate::format::FormatToken;
use crate::header::Header;
use crate::tagmap::TagMap;
use crate::types::{Cell, LbdError, Result, ValueDataType};
use crate::view::{TagView, TimestampView};
use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo};
use std::sync::Arc;

// ============================================================================
// Keys
// ============================================================================

/// Index key accepted by [`Table::get`] and the views.
///
/// Ranges behave like slices: they are clamped to the available rows, so an
/// open-ended range never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key<'k> {
    Index(usize),
    Range(Range<usize>),
    Tag(&'k str),
}

impl From<usize> for Key<'_> {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl<'k> From<&'k str> for Key<'k> {
    fn from(tag: &'k str) -> Self {
        Key::Tag(tag)
    }
}

impl<'k> From<&'k String> for Key<'k> {
    fn from(tag: &'k String) -> Self {
        Key::Tag(tag)
    }
}

impl From<Range<usize>> for Key<'_> {
    fn from(r: Range<usize>) -> Self {
        Key::Range(r)
    }
}

impl From<RangeInclusive<usize>> for Key<'_> {
    fn from(r: RangeInclusive<usize>) -> Self {
        Key::Range(*r.start()..r.end().saturating_add(1))
    }
}

impl From<RangeFrom<usize>> for Key<'_> {
    fn from(r: RangeFrom<usize>) -> Self {
        Key::Range(r.start..usize::MAX)
    }
}

impl From<RangeTo<usize>> for Key<'_> {
    fn from(r: RangeTo<usize>) -> Self {
        Key::Range(0..r.end)
    }
}

impl From<RangeFull> for Key<'_> {
    fn from(_: RangeFull) -> Self {
        Key::Range(0..usize::MAX)
    }
}

/// Clamp `range` to `0..len`; an inverted range becomes empty
pub(crate) fn clamp_range(range: Range<usize>, len: usize) -> Range<usize> {
    let end = range.end.min(len);
    let start = range.start.min(end);
    start..end
}

#[inline]
pub(crate) fn check_index(index: usize, len: usize) -> Result<usize> {
    if index < len {
        Ok(index)
    } else {
        Err(LbdError::IndexOutOfRange { index, len })
    }
}

// ============================================================================
// Column metadata
// ============================================================================

/// What a column holds, fixed by the format string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Float,
    String,
    Vector,
    List,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Vector => "vector",
            ColumnType::List => "list",
        }
    }
}

impl From<ValueDataType> for ColumnType {
    fn from(t: ValueDataType) -> Self {
        match t {
            ValueDataType::Float => ColumnType::Float,
            ValueDataType::String => ColumnType::String,
            ValueDataType::Vector => ColumnType::Vector,
        }
    }
}

/// Per-column layout shared by the table and its views
#[derive(Debug, Clone)]
pub(crate) struct Column {
    pub column_type: ColumnType,
    /// Subtag map of list columns
    pub subtags: Option<Arc<TagMap>>,
    pub cells: Vec<Cell>,
}

// ============================================================================
// Table
// ============================================================================

/// A fully decoded output file.
///
/// Cells are stored column-major (`[column][row]`), one row per data line.
/// The table is immutable; all access goes through borrowed views.
#[derive(Debug, Clone)]
pub struct Table {
    header: Header,
    tokens: Vec<FormatToken>,
    tags: TagMap,
    columns: Vec<Column>,
    rows: usize,
}

/// Result of [`Table::get`]
#[derive(Debug, Clone)]
pub enum TableItem<'a> {
    Timestamps(TimestampView<'a>),
    Tag(TagView<'a>),
}

impl Table {
    pub(crate) fn new(
        header: Header,
        tokens: Vec<FormatToken>,
        tags: TagMap,
        columns: Vec<Column>,
        rows: usize,
    ) -> Self {
        Self {
            header,
            tokens,
            tags,
            columns,
            rows,
        }
    }

    /// File name recorded in the header
    pub fn filename(&self) -> &str {
        &self.header.filename
    }

    /// Creation timestamp, formatted as `DD/MM/YY HH:MM:SS`
    pub fn timestamp(&self) -> &str {
        &self.header.timestamp
    }

    /// Output rate in simulation time
    pub fn output_rate(&self) -> f64 {
        self.header.output_rate
    }

    /// Raw format string
    pub fn format(&self) -> &str {
        &self.header.format
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Parsed format tokens
    pub fn tokens(&self) -> &[FormatToken] {
        &self.tokens
    }

    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    /// Number of data lines (timesteps)
    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_type(&self, column: usize) -> Option<ColumnType> {
        self.columns.get(column).map(|c| c.column_type)
    }

    /// All cells of one column
    pub fn column(&self, column: usize) -> Option<&[Cell]> {
        self.columns.get(column).map(|c| c.cells.as_slice())
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<&Cell> {
        self.columns.get(column)?.cells.get(row)
    }

    /// View of a single data line
    pub fn row(&self, row: usize) -> Result<TimestampView<'_>> {
        let row = check_index(row, self.rows)?;
        Ok(TimestampView::new(self, row..row + 1))
    }

    /// View of a range of data lines, clamped to the table
    pub fn rows(&self, rows: Range<usize>) -> TimestampView<'_> {
        TimestampView::new(self, clamp_range(rows, self.rows))
    }

    /// View of one tag across every data line
    pub fn tag(&self, tag: &str) -> Result<TagView<'_>> {
        let column = self.tags.index_of(tag)?;
        Ok(self.tag_view(column, 0..self.rows))
    }

    /// Index by data line (integer or range) or by tag name
    pub fn get<'k>(&self, key: impl Into<Key<'k>>) -> Result<TableItem<'_>> {
        match key.into() {
            Key::Index(row) => self.row(row).map(TableItem::Timestamps),
            Key::Range(rows) => Ok(TableItem::Timestamps(self.rows(rows))),
            Key::Tag(tag) => self.tag(tag).map(TableItem::Tag),
        }
    }

    /// View of `column` restricted to `rows`; both must already be in range
    pub(crate) fn tag_view(&self, column: usize, rows: Range<usize>) -> TagView<'_> {
        let col = &self.columns[column];
        let name = self.tags.name(column).unwrap_or_default();
        TagView::new(
            name,
            &col.cells[rows],
            col.column_type,
            col.subtags.as_deref(),
        )
    }
}

// ============================================================================
// Particle Table
// ============================================================================

/// Values of one list specifier on one data line.
///
/// Stored as `[subtag][particle]`; the particle count is specific to the
/// line it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleTable {
    tags: Arc<TagMap>,
    data: Vec<Vec<Cell>>,
    particles: usize,
}

/// Result of [`ParticleTable::get`]
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleItem<'a> {
    /// Every subtag value of one particle
    Particle(Vec<&'a Cell>),
    /// Every particle value of one subtag
    Subtag(&'a [Cell]),
}

impl ParticleTable {
    pub(crate) fn new(tags: Arc<TagMap>, data: Vec<Vec<Cell>>, particles: usize) -> Self {
        Self {
            tags,
            data,
            particles,
        }
    }

    /// Number of particles
    #[inline]
    pub fn len(&self) -> usize {
        self.particles
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles == 0
    }

    /// Subtag map of this list
    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    pub fn cell(&self, subtag: usize, particle: usize) -> Option<&Cell> {
        self.data.get(subtag)?.get(particle)
    }

    /// All particle values of one subtag
    pub fn subtag(&self, tag: &str) -> Result<&[Cell]> {
        let index = self.tags.index_of(tag)?;
        Ok(&self.data[index])
    }

    /// All subtag values of one particle, in subtag order
    pub fn particle(&self, particle: usize) -> Result<Vec<&Cell>> {
        let particle = check_index(particle, self.particles)?;
        Ok(self.data.iter().map(|row| &row[particle]).collect())
    }

    pub fn get<'k>(&self, key: impl Into<Key<'k>>) -> Result<ParticleItem<'_>> {
        match key.into() {
            Key::Index(i) => self.particle(i).map(ParticleItem::Particle),
            Key::Tag(tag) => self.subtag(tag).map(ParticleItem::Subtag),
            Key::Range(_) => Err(LbdError::InvalidKeyType),
        }
    }
}
