//! Format string grammar
//!
//! The fourth header line of every output file describes the layout of the
//! data lines:
//!
//! - `#<kind><code>` is a value (`#st`, `#pvx`, ...)
//! - `{...}` is a list of values repeated once per particle
//! - runs of punctuation are separators
//!
//! Parsing produces a flat token sequence; list bodies hold their values only,
//! so a list can never contain another list.

use crate::types::{LbdError, Result, ValueCode, ValueDataType, ValueKind, FORMAT_PUNCTUATION};
use std::fmt;

/// A single value specifier, e.g. `#pm`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueToken {
    pub kind: ValueKind,
    pub code: ValueCode,
}

impl ValueToken {
    /// Tag name used as the lookup key (`kind` + `code`, e.g. `pvx`)
    pub fn tag_name(&self) -> String {
        format!("{}{}", self.kind.as_char(), self.code.code())
    }

    #[inline]
    pub fn data_type(&self) -> ValueDataType {
        self.code.data_type()
    }
}

impl fmt::Display for ValueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}{}", self.kind.as_char(), self.code.code())
    }
}

/// Token parsed from a format string
#[derive(Debug, Clone, PartialEq)]
pub enum FormatToken {
    /// A run of `count` punctuation characters
    Skip { count: usize },
    Value(ValueToken),
    /// A particle record, repeated a per-line number of times
    List { children: Vec<ValueToken> },
}

impl FormatToken {
    /// Whether this token occupies a column of the table
    #[inline]
    pub fn is_column(&self) -> bool {
        !matches!(self, FormatToken::Skip { .. })
    }
}

/// Parse a top-level format string into its tokens.
pub fn parse_format(format: &str) -> Result<Vec<FormatToken>> {
    let chars: Vec<char> = format.chars().collect();
    parse_tokens(&chars, 0, false)
}

/// Scan `chars` left to right. `offset` is the position of `chars[0]` in the
/// full format string, so errors inside list bodies report absolute positions.
fn parse_tokens(chars: &[char], offset: usize, in_list: bool) -> Result<Vec<FormatToken>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        if c == '#' {
            let (token, width) = parse_value(&chars[pos..], offset + pos)?;
            tokens.push(FormatToken::Value(token));
            pos += width;
        } else if c == '{' {
            if in_list {
                return Err(LbdError::NestedListNotAllowed);
            }
            let close = chars[pos + 1..]
                .iter()
                .position(|&c| c == '}')
                .map(|i| pos + 1 + i)
                .ok_or(LbdError::UnterminatedList)?;
            let body = parse_tokens(&chars[pos + 1..close], offset + pos + 1, true)?;
            let children = body
                .into_iter()
                .filter_map(|t| match t {
                    FormatToken::Value(v) => Some(v),
                    _ => None,
                })
                .collect();
            tokens.push(FormatToken::List { children });
            pos = close + 1;
        } else if FORMAT_PUNCTUATION.contains(&c) {
            let count = chars[pos..]
                .iter()
                .take_while(|c| FORMAT_PUNCTUATION.contains(c))
                .count();
            tokens.push(FormatToken::Skip { count });
            pos += count;
        } else {
            return Err(LbdError::InvalidFormatCharacter(offset + pos));
        }
    }

    Ok(tokens)
}

/// Parse a value token starting at `chars[0] == '#'`, returning the token and
/// the number of characters it spans. The two-character code wins only when
/// it is in the vocabulary of the kind.
fn parse_value(chars: &[char], at: usize) -> Result<(ValueToken, usize)> {
    let kind = chars
        .get(1)
        .copied()
        .and_then(ValueKind::from_char)
        .ok_or(LbdError::InvalidToken(at))?;

    if chars.len() >= 4 {
        let code: String = chars[2..4].iter().collect();
        if let Some(code) = kind.lookup(&code) {
            return Ok((ValueToken { kind, code }, 4));
        }
    }

    let code = chars
        .get(2)
        .and_then(|c| kind.lookup(c.encode_utf8(&mut [0; 4])))
        .ok_or(LbdError::InvalidToken(at))?;
    Ok((ValueToken { kind, code }, 3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParticleValue, SimValue};

    fn sim(v: SimValue) -> FormatToken {
        FormatToken::Value(ValueToken {
            kind: ValueKind::Simulation,
            code: ValueCode::Sim(v),
        })
    }

    fn particle(v: ParticleValue) -> ValueToken {
        ValueToken {
            kind: ValueKind::Particle,
            code: ValueCode::Particle(v),
        }
    }

    #[test]
    fn test_scalars_and_punctuation() {
        let tokens = parse_format("#sn #st, #sdt").unwrap();
        assert_eq!(
            tokens,
            vec![
                sim(SimValue::Name),
                FormatToken::Skip { count: 1 },
                sim(SimValue::Time),
                FormatToken::Skip { count: 2 },
                sim(SimValue::LastDt),
            ]
        );
    }

    #[test]
    fn test_list_children() {
        let tokens = parse_format("#st {#pm #pvx}").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(
            tokens[2],
            FormatToken::List {
                children: vec![particle(ParticleValue::Mass), particle(ParticleValue::VelX)]
            }
        );
    }

    #[test]
    fn test_empty_list() {
        let tokens = parse_format("{}").unwrap();
        assert_eq!(tokens, vec![FormatToken::List { children: vec![] }]);
    }

    #[test]
    fn test_longest_code_only_when_known() {
        // "mx" is not a particle code, so "#pm" is taken and "x" is left over
        assert!(matches!(parse_format("#pmx"), Err(LbdError::InvalidFormatCharacter(3))));
        let tokens = parse_format("#pRc").unwrap();
        assert_eq!(
            tokens,
            vec![FormatToken::Value(particle(ParticleValue::PrimaryDistance))]
        );
    }

    #[test]
    fn test_kind_and_code_validation() {
        assert!(matches!(parse_format("#qm"), Err(LbdError::InvalidToken(0))));
        assert!(matches!(parse_format("#st #sm"), Err(LbdError::InvalidToken(4))));
        assert!(matches!(parse_format("#s"), Err(LbdError::InvalidToken(0))));
        assert!(matches!(parse_format("#"), Err(LbdError::InvalidToken(0))));
    }

    #[test]
    fn test_list_errors() {
        assert!(matches!(parse_format("#st {#pm"), Err(LbdError::UnterminatedList)));
        assert!(matches!(parse_format("{#pm {#px}}"), Err(LbdError::NestedListNotAllowed)));
        assert!(matches!(parse_format("{#pm #pq}"), Err(LbdError::InvalidToken(5))));
    }

    #[test]
    fn test_invalid_character() {
        assert!(matches!(parse_format("#st - #sn"), Err(LbdError::InvalidFormatCharacter(4))));
        assert!(matches!(parse_format("}"), Err(LbdError::InvalidFormatCharacter(0))));
    }

    #[test]
    fn test_tag_name_and_display() {
        let token = particle(ParticleValue::AngMomVector);
        assert_eq!(token.tag_name(), "pjv");
        assert_eq!(token.to_string(), "#pjv");
    }
}
