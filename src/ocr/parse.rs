//! Turning raw OCR text into typed values.

use serde::Deserialize;

use crate::error::ReadError;

/// Expected shape of an OCR field's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    /// Whole number, e.g. a spin counter.
    Integer,
    /// Monetary amount, e.g. "$1,234.56".
    Currency,
}

/// A typed value read off the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Decimal(f64),
}

impl FieldValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Integer(v) => *v as f64,
            FieldValue::Decimal(v) => *v,
        }
    }
}

/// Parse OCR output according to the field's expected format.
///
/// Currency symbols, thousands separators and stray spaces are OCR noise and
/// are stripped before parsing. Anything that still fails to parse is a
/// typed [`ReadError::Parse`] — never a panic — because a garbled read is an
/// expected per-cycle outcome.
pub fn parse_value(raw: &str, format: FieldFormat) -> Result<FieldValue, ReadError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ReadError::Empty);
    }

    let numeric: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if numeric.is_empty() {
        return Err(ReadError::Parse {
            raw: trimmed.to_string(),
            format,
        });
    }

    match format {
        FieldFormat::Integer => numeric
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| ReadError::Parse {
                raw: trimmed.to_string(),
                format,
            }),
        FieldFormat::Currency => numeric
            .parse::<f64>()
            .map(FieldValue::Decimal)
            .map_err(|_| ReadError::Parse {
                raw: trimmed.to_string(),
                format,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_currency_with_symbol_and_separators() {
        let value = parse_value("$1,234.56", FieldFormat::Currency).unwrap();
        assert_eq!(value, FieldValue::Decimal(1234.56));
    }

    #[test]
    fn parses_plain_currency() {
        let value = parse_value("$12.50", FieldFormat::Currency).unwrap();
        assert_eq!(value.as_f64(), 12.50);
    }

    #[test]
    fn parses_integer_with_spaces() {
        let value = parse_value(" 1 250 ", FieldFormat::Integer).unwrap();
        assert_eq!(value, FieldValue::Integer(1250));
    }

    #[test]
    fn malformed_text_is_a_typed_failure() {
        let err = parse_value("N/A", FieldFormat::Currency).unwrap_err();
        assert!(matches!(err, ReadError::Parse { .. }));
    }

    #[test]
    fn fractional_text_fails_integer_format() {
        let err = parse_value("12.50", FieldFormat::Integer).unwrap_err();
        assert!(matches!(
            err,
            ReadError::Parse {
                format: FieldFormat::Integer,
                ..
            }
        ));
    }

    #[test]
    fn empty_text_is_reported_as_empty() {
        assert!(matches!(
            parse_value("   ", FieldFormat::Currency),
            Err(ReadError::Empty)
        ));
    }

    #[test]
    fn multiple_decimal_points_fail() {
        assert!(matches!(
            parse_value("1.2.3", FieldFormat::Currency),
            Err(ReadError::Parse { .. })
        ));
    }
}
