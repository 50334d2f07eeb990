//! Data line decoder
//!
//! Walks the format tokens against the fields of each data line. Every value
//! token consumes one field; list tokens consume `particles * children`
//! fields laid out particle-major, where the particle count is derived from
//! the field count of the line.

use crate::format::{FormatToken, ValueToken};
use crate::header::Header;
use crate::table::{Column, ColumnType, ParticleTable, Table};
use crate::tagmap::TagMap;
use crate::types::{
    Cell, LbdError, Result, ValueDataType, Vector3, DATA_DELIMITERS, VECTOR_PREFIX,
    VECTOR_SEPARATOR,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Split a data line into fields on runs of delimiters.
/// Leading and trailing delimiters produce no empty fields.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(DATA_DELIMITERS)
        .filter(|field| !field.is_empty())
        .collect()
}

/// Decode one field according to the data type of its token.
/// `line` is the data line index reported in errors.
pub fn decode_value(token: &ValueToken, field: &str, line: usize) -> Result<Cell> {
    match token.data_type() {
        ValueDataType::String => Ok(Cell::Str(field.to_string())),
        ValueDataType::Vector => parse_vector(field, line).map(Cell::Vector),
        ValueDataType::Float => field
            .parse()
            .map(Cell::Float)
            .map_err(|_| LbdError::InvalidNumber(line)),
    }
}

/// Parse `{{x|y|z}}`
fn parse_vector(field: &str, line: usize) -> Result<Vector3> {
    if !field.starts_with(VECTOR_PREFIX) {
        return Err(LbdError::MalformedVector(line));
    }
    let inner = field.trim_matches(|c| c == '{' || c == '}');
    let parts = inner
        .split(VECTOR_SEPARATOR)
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| LbdError::MalformedVector(line))?;
    match parts[..] {
        [x, y, z] => Ok(Vector3::new(x, y, z)),
        _ => Err(LbdError::MalformedVector(line)),
    }
}

/// Decoder for the data lines of one format
#[derive(Debug, Clone)]
pub struct LineDecoder<'t> {
    tokens: &'t [FormatToken],
    /// Number of top-level value tokens
    scalar_count: usize,
    /// Sum of child values across all lists
    list_value_count: usize,
    /// Subtag map per column, `Some` for list columns
    subtags: Vec<Option<Arc<TagMap>>>,
}

impl<'t> LineDecoder<'t> {
    pub fn new(tokens: &'t [FormatToken]) -> Self {
        let mut scalar_count = 0;
        let mut list_value_count = 0;
        let mut subtags = Vec::new();
        for token in tokens {
            match token {
                FormatToken::Skip { .. } => {}
                FormatToken::Value(_) => {
                    scalar_count += 1;
                    subtags.push(None);
                }
                FormatToken::List { children } => {
                    list_value_count += children.len();
                    subtags.push(Some(Arc::new(TagMap::from_values(children))));
                }
            }
        }
        Self {
            tokens,
            scalar_count,
            list_value_count,
            subtags,
        }
    }

    /// Number of table columns this format produces
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.subtags.len()
    }

    /// Column types in column order
    pub fn column_types(&self) -> Vec<ColumnType> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                FormatToken::Skip { .. } => None,
                FormatToken::Value(v) => Some(ColumnType::from(v.data_type())),
                FormatToken::List { .. } => Some(ColumnType::List),
            })
            .collect()
    }

    /// Particle count shared by every list on a line with `fields` fields.
    ///
    /// All lists on a line use the same count, computed from the sum of the
    /// child counts of every list in the format.
    pub fn particle_count(&self, fields: usize, line: usize) -> Result<usize> {
        let mismatch = || LbdError::FieldCountMismatch {
            line,
            expected: self.scalar_count,
            found: fields,
        };
        let list_fields = fields.checked_sub(self.scalar_count).ok_or_else(mismatch)?;

        if self.list_value_count == 0 {
            return if list_fields == 0 {
                Ok(0)
            } else {
                Err(mismatch())
            };
        }
        if list_fields % self.list_value_count != 0 {
            return Err(LbdError::NonIntegerParticleCount(line));
        }
        Ok(list_fields / self.list_value_count)
    }

    /// Decode one data line into one cell per column
    pub fn decode_line(&self, text: &str, line: usize) -> Result<Vec<Cell>> {
        let fields = split_fields(text);
        let particles = self.particle_count(fields.len(), line)?;
        trace!(line, fields = fields.len(), particles, "Decoding line");

        let mut cells = Vec::with_capacity(self.num_columns());
        let mut cursor = 0;
        for token in self.tokens {
            match token {
                FormatToken::Skip { .. } => continue,
                FormatToken::Value(value) => {
                    cells.push(decode_value(value, fields[cursor], line)?);
                    cursor += 1;
                }
                FormatToken::List { children } => {
                    let width = children.len();
                    let mut data = Vec::with_capacity(width);
                    for (sub, child) in children.iter().enumerate() {
                        let row = (0..particles)
                            .map(|p| decode_value(child, fields[cursor + p * width + sub], line))
                            .collect::<Result<Vec<_>>>()?;
                        data.push(row);
                    }
                    let tags = self.subtags[cells.len()].clone().unwrap_or_default();
                    cells.push(Cell::Particles(ParticleTable::new(tags, data, particles)));
                    cursor += particles * width;
                }
            }
        }

        Ok(cells)
    }
}

/// Decode every data line and assemble the table
pub fn decode_table(header: Header, tokens: Vec<FormatToken>, lines: &[&str]) -> Result<Table> {
    let tags = TagMap::from_tokens(&tokens);
    let decoder = LineDecoder::new(&tokens);
    debug!(
        tokens = tokens.len(),
        columns = decoder.num_columns(),
        values_per_particle = decoder.list_value_count,
        "Format parsed"
    );

    let mut columns: Vec<Column> = decoder
        .column_types()
        .into_iter()
        .zip(decoder.subtags.iter().cloned())
        .map(|(column_type, subtags)| Column {
            column_type,
            subtags,
            cells: Vec::with_capacity(lines.len()),
        })
        .collect();

    for (line, text) in lines.iter().enumerate() {
        let cells = decoder.decode_line(text, line)?;
        for (column, cell) in columns.iter_mut().zip(cells) {
            column.cells.push(cell);
        }
    }

    Ok(Table::new(header, tokens, tags, columns, lines.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parse_format;

    fn decoder_for(format: &str) -> (Vec<FormatToken>, usize) {
        let tokens = parse_format(format).unwrap();
        let columns = LineDecoder::new(&tokens).num_columns();
        (tokens, columns)
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(
            split_fields(" 5, 1.5;2e3\t{{1|2|3}} a/b\\c "),
            vec!["5", "1.5", "2e3", "{{1|2|3}}", "a", "b", "c"]
        );
        assert!(split_fields("").is_empty());
    }

    #[test]
    fn test_particle_major_layout() {
        let (tokens, columns) = decoder_for("#sn #st, {#pm #px}");
        assert_eq!(columns, 3);
        let decoder = LineDecoder::new(&tokens);
        let cells = decoder.decode_line("earth 12.5, 1.0 2.0 3.0 4.0", 0).unwrap();

        assert_eq!(cells[0], Cell::Str("earth".into()));
        assert_eq!(cells[1], Cell::Float(12.5));
        let list = cells[2].as_particles().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.tags().len(), 2);
        assert_eq!(list.subtag("pm").unwrap(), &[Cell::Float(1.0), Cell::Float(3.0)]);
        assert_eq!(list.subtag("px").unwrap(), &[Cell::Float(2.0), Cell::Float(4.0)]);
    }

    #[test]
    fn test_particle_count_varies_per_line() {
        let (tokens, _) = decoder_for("#st {#pm}");
        let decoder = LineDecoder::new(&tokens);
        let one = decoder.decode_line("0.0 1.0", 0).unwrap();
        let three = decoder.decode_line("1.0 1.0 2.0 3.0", 1).unwrap();
        assert_eq!(one[1].as_particles().unwrap().len(), 1);
        assert_eq!(three[1].as_particles().unwrap().len(), 3);
        let none = decoder.decode_line("2.0", 2).unwrap();
        assert!(none[1].as_particles().unwrap().is_empty());
    }

    #[test]
    fn test_non_integer_particle_count() {
        let (tokens, _) = decoder_for("#st {#pm #px}");
        let decoder = LineDecoder::new(&tokens);
        assert!(matches!(
            decoder.decode_line("0.0 1.0 2.0 3.0", 7),
            Err(LbdError::NonIntegerParticleCount(7))
        ));
    }

    #[test]
    fn test_shared_particle_count_across_lists() {
        // 6 list fields over 3 children in total: both lists get 2 particles
        let (tokens, _) = decoder_for("{#pm} {#px #py}");
        let decoder = LineDecoder::new(&tokens);
        let cells = decoder.decode_line("1 2 3 4 5 6", 0).unwrap();
        let first = cells[0].as_particles().unwrap();
        let second = cells[1].as_particles().unwrap();
        assert_eq!(first.subtag("pm").unwrap(), &[Cell::Float(1.0), Cell::Float(2.0)]);
        assert_eq!(second.subtag("px").unwrap(), &[Cell::Float(3.0), Cell::Float(5.0)]);
        assert_eq!(second.subtag("py").unwrap(), &[Cell::Float(4.0), Cell::Float(6.0)]);
    }

    #[test]
    fn test_field_count_mismatch_without_lists() {
        let (tokens, _) = decoder_for("#st #sdt");
        let decoder = LineDecoder::new(&tokens);
        assert!(matches!(
            decoder.decode_line("1.0", 4),
            Err(LbdError::FieldCountMismatch { line: 4, expected: 2, found: 1 })
        ));
        assert!(matches!(
            decoder.decode_line("1.0 2.0 3.0", 4),
            Err(LbdError::FieldCountMismatch { line: 4, expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_vector_values() {
        let (tokens, _) = decoder_for("#aev");
        let FormatToken::Value(token) = &tokens[0] else {
            panic!("expected a value token");
        };
        assert_eq!(
            decode_value(token, "{{1.0|2.0|3.0}}", 0).unwrap(),
            Cell::Vector(Vector3::new(1.0, 2.0, 3.0))
        );
        assert!(matches!(
            decode_value(token, "1.0|2.0|3.0}}", 2),
            Err(LbdError::MalformedVector(2))
        ));
        assert!(matches!(
            decode_value(token, "{{1.0|2.0}}", 2),
            Err(LbdError::MalformedVector(2))
        ));
        assert!(matches!(
            decode_value(token, "{{1.0|x|3.0}}", 2),
            Err(LbdError::MalformedVector(2))
        ));
    }

    #[test]
    fn test_type_follows_code_not_data() {
        let (tokens, _) = decoder_for("#sn #si #st");
        let decoder = LineDecoder::new(&tokens);
        let cells = decoder.decode_line("42 ias15 3", 0).unwrap();
        assert_eq!(cells[0], Cell::Str("42".into()));
        assert_eq!(cells[1], Cell::Str("ias15".into()));
        assert_eq!(cells[2], Cell::Float(3.0));
        assert!(matches!(
            decoder.decode_line("42 ias15 three", 5),
            Err(LbdError::InvalidNumber(5))
        ));
    }
}
