//! Record parsing and range validation
//!
//! A framed line becomes a [`Record`] only when it has exactly the detected
//! number of fields and every field converts to a number. Rejection is atomic:
//! a rejected line leaves [`LastKnownValues`] untouched.
//!
//! Readings outside the configured [`RangeLimits`] are not errors. The field is
//! replaced by the column's last in-range reading and the replacement is
//! reported as a [`Substitution`] so callers can log it.

use super::framer::Line;
use crate::types::{ColumnCount, RangeLimits, Record};
use std::time::Instant;
use thiserror::Error;

/// Why a line did not produce a record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseRejected {
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("field {column} is not a number: {field:?}")]
    InvalidNumber { column: usize, field: String },
}

/// Most recent in-range reading per column
#[derive(Debug, Clone, PartialEq)]
pub struct LastKnownValues(Vec<f64>);

impl LastKnownValues {
    /// All columns start at zero
    pub fn new(columns: ColumnCount) -> Self {
        Self(vec![0.0; columns.get()])
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// One out-of-range reading that was replaced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Substitution {
    /// Zero-based data column
    pub column: usize,
    /// The rejected reading
    pub reading: f64,
    /// Value recorded instead
    pub replacement: f64,
}

/// A record together with the substitutions applied to it
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub record: Record,
    pub substitutions: Vec<Substitution>,
}

/// Parse one line into a record, applying range substitution.
///
/// `line` may still carry its terminator; surrounding whitespace of every
/// field is ignored.
pub fn parse_record(
    line: &str,
    delimiter: &str,
    columns: ColumnCount,
    range: RangeLimits,
    last_known: &mut LastKnownValues,
    elapsed_ms: f64,
) -> Result<ParsedRecord, ParseRejected> {
    let body = line.trim_end_matches(['\n', '\r']);

    let found = body.split(delimiter).count();
    if found != columns.get() {
        return Err(ParseRejected::FieldCount {
            expected: columns.get(),
            found,
        });
    }

    // Convert everything first so a bad field leaves last_known untouched
    let mut readings = Vec::with_capacity(found);
    for (column, field) in body.split(delimiter).enumerate() {
        let trimmed = field.trim();
        let value = trimmed
            .parse::<f64>()
            .map_err(|_| ParseRejected::InvalidNumber {
                column,
                field: trimmed.to_string(),
            })?;
        readings.push(value);
    }

    let mut substitutions = Vec::new();
    let values: Vec<f64> = readings
        .into_iter()
        .enumerate()
        .map(|(column, reading)| {
            if range.contains(reading) {
                last_known.0[column] = reading;
                reading
            } else {
                let replacement = last_known.0[column];
                substitutions.push(Substitution {
                    column,
                    reading,
                    replacement,
                });
                replacement
            }
        })
        .collect();

    Ok(ParsedRecord {
        record: Record::new(elapsed_ms, values),
        substitutions,
    })
}

/// Stateful parser owning the per-column last-known values and the time origin
#[derive(Debug)]
pub struct RecordParser {
    delimiter: String,
    columns: ColumnCount,
    range: RangeLimits,
    last_known: LastKnownValues,
    origin: Instant,
}

impl RecordParser {
    /// Elapsed time is measured from the moment the parser is created
    pub fn new(delimiter: impl Into<String>, columns: ColumnCount, range: RangeLimits) -> Self {
        Self {
            delimiter: delimiter.into(),
            columns,
            range,
            last_known: LastKnownValues::new(columns),
            origin: Instant::now(),
        }
    }

    pub fn columns(&self) -> ColumnCount {
        self.columns
    }

    pub fn last_known(&self) -> &LastKnownValues {
        &self.last_known
    }

    /// Parse a framed line stamped with the current elapsed time
    pub fn parse_line(&mut self, line: &Line) -> Result<ParsedRecord, ParseRejected> {
        let elapsed_ms = self.origin.elapsed().as_secs_f64() * 1000.0;
        self.parse_line_at(line, elapsed_ms)
    }

    /// Parse a framed line with an explicit timestamp
    pub fn parse_line_at(
        &mut self,
        line: &Line,
        elapsed_ms: f64,
    ) -> Result<ParsedRecord, ParseRejected> {
        let text = line.to_str().ok_or(ParseRejected::InvalidUtf8)?;
        parse_record(
            text,
            &self.delimiter,
            self.columns,
            self.range,
            &mut self.last_known,
            elapsed_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(n: usize) -> ColumnCount {
        ColumnCount::new(n).unwrap()
    }

    #[test]
    fn test_parse_plain_line() {
        let mut last = LastKnownValues::new(cols(3));
        let parsed =
            parse_record("1,2,3\n", ",", cols(3), RangeLimits::default(), &mut last, 7.0).unwrap();
        assert_eq!(parsed.record.values(), &[7.0, 1.0, 2.0, 3.0]);
        assert!(parsed.substitutions.is_empty());
        assert_eq!(last.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_out_of_range_keeps_last_known() {
        let mut last = LastKnownValues::from_values(vec![5.0]);
        let range = RangeLimits::new(0.0, 100.0);
        let parsed = parse_record("500\n", ",", cols(1), range, &mut last, 0.0).unwrap();
        assert_eq!(parsed.record.fields(), &[5.0]);
        assert_eq!(
            parsed.substitutions,
            vec![Substitution {
                column: 0,
                reading: 500.0,
                replacement: 5.0
            }]
        );
        assert_eq!(last.as_slice(), &[5.0]);
    }

    #[test]
    fn test_substitution_before_any_reading_uses_zero() {
        let mut last = LastKnownValues::new(cols(2));
        let range = RangeLimits::new(0.0, 100.0);
        let parsed = parse_record("-1\t50\r\n", "\t", cols(2), range, &mut last, 0.0).unwrap();
        assert_eq!(parsed.record.fields(), &[0.0, 50.0]);
    }

    #[test]
    fn test_short_line_rejected() {
        let mut last = LastKnownValues::new(cols(3));
        let err = parse_record("1,2\n", ",", cols(3), RangeLimits::default(), &mut last, 0.0)
            .unwrap_err();
        assert_eq!(
            err,
            ParseRejected::FieldCount {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_bad_field_rejects_atomically() {
        let mut last = LastKnownValues::from_values(vec![1.0, 1.0]);
        let err = parse_record("42,abc\n", ",", cols(2), RangeLimits::default(), &mut last, 0.0)
            .unwrap_err();
        assert_eq!(
            err,
            ParseRejected::InvalidNumber {
                column: 1,
                field: "abc".to_string()
            }
        );
        // column 0 parsed fine but must not have been recorded
        assert_eq!(last.as_slice(), &[1.0, 1.0]);
    }

    #[test]
    fn test_nan_is_substituted() {
        let mut last = LastKnownValues::from_values(vec![3.0]);
        let parsed =
            parse_record("NaN\n", ",", cols(1), RangeLimits::default(), &mut last, 0.0).unwrap();
        assert_eq!(parsed.record.fields(), &[3.0]);
        assert_eq!(parsed.substitutions.len(), 1);
    }

    #[test]
    fn test_fields_are_trimmed() {
        let mut last = LastKnownValues::new(cols(2));
        let parsed =
            parse_record(" 1.5 ;  -2e3 \r\n", ";", cols(2), RangeLimits::default(), &mut last, 0.0)
                .unwrap();
        assert_eq!(parsed.record.fields(), &[1.5, -2000.0]);
    }

    #[test]
    fn test_empty_field_rejected() {
        let mut last = LastKnownValues::new(cols(2));
        assert!(matches!(
            parse_record("1,\n", ",", cols(2), RangeLimits::default(), &mut last, 0.0),
            Err(ParseRejected::InvalidNumber { column: 1, .. })
        ));
    }

    #[test]
    fn test_record_parser_rejects_invalid_utf8() {
        let mut parser = RecordParser::new(",", cols(1), RangeLimits::default());
        let line = crate::backend::framer::frame(Vec::new(), &[0xff, b'\n']).0.remove(0);
        assert_eq!(parser.parse_line(&line), Err(ParseRejected::InvalidUtf8));
    }

    #[test]
    fn test_record_parser_tracks_state_across_lines() {
        let mut parser = RecordParser::new(",", cols(2), RangeLimits::new(0.0, 100.0));
        parser.parse_line_at(&Line::from("1,2\n"), 0.0).unwrap();
        parser.parse_line_at(&Line::from("3,4\n"), 1.0).unwrap();
        let parsed = parser.parse_line_at(&Line::from("9999,4\n"), 2.0).unwrap();
        assert_eq!(parsed.record.values(), &[2.0, 3.0, 4.0]);
        assert_eq!(parser.last_known().as_slice(), &[3.0, 4.0]);
    }

    #[test]
    fn test_parse_line_timestamps_are_monotonic() {
        let mut parser = RecordParser::new(",", cols(1), RangeLimits::default());
        let a = parser.parse_line(&Line::from("1\n")).unwrap();
        let b = parser.parse_line(&Line::from("2\n")).unwrap();
        assert!(b.record.elapsed_ms() >= a.record.elapsed_ms());
    }
}
