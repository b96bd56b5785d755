use crate::error::{EngineError, EngineResult, RowFault};
use csv::StringRecord;
use serde::{Deserialize, Serialize};

/// One year of readings.
///
/// `values` holds one entry per configured channel, in configuration order.
/// A `None` entry is a missing reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub year: i32,
    pub values: Vec<Option<f64>>,
}

/// Outcome of parsing one input line that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Row(Row),
    /// A line led by text, holding that leading field. Only a header while
    /// it precedes every data row.
    Header(String),
    Blank,
}

/// Turns delimited records into validated [`Row`]s.
///
/// Column 0 is the year. Each channel reads the column at the matching
/// position of `columns`. A field equal to one of the missing markers becomes
/// a missing reading; any other unparseable field rejects the whole row.
#[derive(Debug, Clone)]
pub struct RowParser {
    columns: Vec<usize>,
    missing_markers: Vec<String>,
}

impl RowParser {
    pub fn new(columns: Vec<usize>, missing_markers: Vec<String>) -> Self {
        Self {
            columns,
            missing_markers,
        }
    }

    /// Parse one record. `line` is only used to label errors.
    pub fn parse_record(&self, record: &StringRecord, line: usize) -> EngineResult<Parsed> {
        let malformed = |fault| EngineError::MalformedRow { line, fault };

        let first = record.get(0).map(str::trim).unwrap_or_default();
        if first.is_empty() && record.iter().all(|field| field.trim().is_empty()) {
            return Ok(Parsed::Blank);
        }
        if first.starts_with(|c: char| c.is_alphabetic()) {
            return Ok(Parsed::Header(first.to_string()));
        }

        let year = first
            .parse::<i32>()
            .map_err(|_| malformed(RowFault::BadYear(first.to_string())))?;

        let mut values = Vec::with_capacity(self.columns.len());
        for &column in &self.columns {
            let field = record
                .get(column)
                .ok_or_else(|| malformed(RowFault::MissingColumn { column }))?
                .trim();
            values.push(self.parse_value(field).map_err(|_| {
                malformed(RowFault::BadValue {
                    column,
                    field: field.to_string(),
                })
            })?);
        }

        Ok(Parsed::Row(Row { year, values }))
    }

    /// Parse one raw text line split on `delimiter`.
    pub fn parse_line(&self, text: &str, delimiter: char, line: usize) -> EngineResult<Parsed> {
        let record = StringRecord::from(text.split(delimiter).collect::<Vec<_>>());
        self.parse_record(&record, line)
    }

    fn parse_value(&self, field: &str) -> Result<Option<f64>, ()> {
        if self.missing_markers.iter().any(|marker| marker == field) {
            return Ok(None);
        }
        match field.parse::<f64>() {
            Ok(val) if val.is_finite() => Ok(Some(val)),
            _ => Err(()),
        }
    }
}
