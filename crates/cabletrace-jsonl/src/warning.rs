//! Non-fatal problems found while reading a JSONL file.

use std::fmt;

/// A line that was not turned into a record.
///
/// Line numbers are 1-based and count every physical line, including blank
/// ones, so they can be matched against an editor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Warning {
    /// The line is not valid JSON, or does not match the record type.
    MalformedJson {
        /// The 1-based line number.
        line_number: usize,
        /// The deserializer's message.
        error: String,
    },
}

impl Warning {
    /// Returns the line number associated with this warning.
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::MalformedJson { line_number, .. } => *line_number,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedJson { line_number, error } => {
                write!(f, "line {line_number}: malformed JSON: {error}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_line_number() {
        let warning = Warning::MalformedJson {
            line_number: 7,
            error: "expected value".to_string(),
        };

        assert_eq!(warning.line_number(), 7);
        assert_eq!(warning.to_string(), "line 7: malformed JSON: expected value");
    }
}
