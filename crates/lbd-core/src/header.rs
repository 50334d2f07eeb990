//! Output file header reader
//!
//! Every output file starts with four header lines:
//!
//! ```text
//! # filename: <name>
//! # timestamp: <DD/MM/YY HH:MM:SS>
//! # output timing: <float>
//! # format: <format string>
//! ```

use crate::types::{LbdError, Result, HEADER_PREFIXES};
use tracing::debug;

/// Parsed header fields
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub filename: String,
    pub timestamp: String,
    /// Output rate in simulation time
    pub output_rate: f64,
    /// Raw format string
    pub format: String,
}

/// Validate the header and split the content into the header and the data
/// lines. Data lines keep their order; blank lines are dropped and trailing
/// whitespace is stripped.
pub fn split_header(content: &str) -> Result<(Header, Vec<&str>)> {
    let non_blank = content.lines().filter(|l| !l.trim_end().is_empty()).count();
    if non_blank < HEADER_PREFIXES.len() {
        return Err(LbdError::TooFewLines);
    }

    let mut lines = content.lines().map(str::trim_end);
    let mut values = [""; 4];
    for (index, prefix) in HEADER_PREFIXES.iter().enumerate() {
        let line = lines.next().ok_or(LbdError::TooFewLines)?;
        if line.is_empty() {
            return Err(LbdError::MalformedHeader);
        }
        values[index] = line
            .strip_prefix(prefix)
            .ok_or(LbdError::MalformedHeaderLine(index))?
            .trim();
    }

    let output_rate: f64 = values[2]
        .parse()
        .map_err(|_| LbdError::InvalidTimingValue)?;

    let header = Header {
        filename: values[0].to_string(),
        timestamp: values[1].to_string(),
        output_rate,
        format: values[3].to_string(),
    };
    debug!(
        filename = %header.filename,
        timestamp = %header.timestamp,
        output_rate = header.output_rate,
        format = %header.format,
        "Header parsed"
    );

    let data = lines.filter(|l| !l.is_empty()).collect();
    Ok((header, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "# filename: orbit.txt\n\
                          # timestamp: 03/07/17 14:22:10\n\
                          # output timing: 0.5\n\
                          # format: #st {#pm}\n";

    #[test]
    fn test_header_fields() {
        let content = format!("{}1.0 2.0\n\n2.0 3.0  \n", HEADER);
        let (header, data) = split_header(&content).unwrap();
        assert_eq!(header.filename, "orbit.txt");
        assert_eq!(header.timestamp, "03/07/17 14:22:10");
        assert_eq!(header.output_rate, 0.5);
        assert_eq!(header.format, "#st {#pm}");
        assert_eq!(data, vec!["1.0 2.0", "2.0 3.0"]);
    }

    #[test]
    fn test_header_without_data() {
        let (_, data) = split_header(HEADER).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_too_few_lines() {
        let content = "# filename: a\n# timestamp: b\n\n\n";
        assert!(matches!(split_header(content), Err(LbdError::TooFewLines)));
        assert!(matches!(split_header(""), Err(LbdError::TooFewLines)));
    }

    #[test]
    fn test_blank_line_inside_header() {
        let content = "# filename: a\n\n# timestamp: b\n# output timing: 1\n# format: #st\n";
        assert!(matches!(split_header(content), Err(LbdError::MalformedHeader)));
    }

    #[test]
    fn test_malformed_header_lines() {
        let bad_first = HEADER.replacen("# filename:", "# file:", 1);
        assert!(matches!(
            split_header(&bad_first),
            Err(LbdError::MalformedHeaderLine(0))
        ));
        let bad_format = HEADER.replacen("# format:", "format:", 1);
        assert!(matches!(
            split_header(&bad_format),
            Err(LbdError::MalformedHeaderLine(3))
        ));
    }

    #[test]
    fn test_invalid_timing() {
        let content = HEADER.replacen("0.5", "soon", 1);
        assert!(matches!(
            split_header(&content),
            Err(LbdError::InvalidTimingValue)
        ));
    }
}
