use crate::error::{EngineError, EngineResult, RowFault};
use crate::row::{Parsed, Row, RowParser};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Chronologically ordered rows of one dataset.
///
/// Years strictly increase. Once built the series is only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    channels: Vec<String>,
    rows: Vec<Row>,
}

impl Series {
    /// Build a series from already parsed rows, numbering them from line 1.
    pub fn from_rows(channels: Vec<String>, rows: Vec<Row>) -> (Self, Vec<EngineError>) {
        let mut builder = SeriesBuilder::new(channels);
        for (i_row, row) in rows.into_iter().enumerate() {
            builder.push_row(i_row + 1, row);
        }
        builder.finish()
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|channel| channel == name)
    }

    pub fn years(&self) -> Vec<i32> {
        self.rows.iter().map(|row| row.year).collect()
    }

    /// Readings of one channel, one per row, missing ones included.
    pub fn column(&self, i_channel: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.values.get(i_channel).copied().flatten())
            .collect()
    }

    /// `(years, values)` of one channel with missing readings dropped.
    pub fn points(&self, i_channel: usize) -> (Vec<f64>, Vec<f64>) {
        points_of(&self.rows, i_channel)
    }
}

pub(crate) fn points_of(rows: &[Row], i_channel: usize) -> (Vec<f64>, Vec<f64>) {
    rows.iter()
        .filter_map(|row| {
            let val = row.values.get(i_channel).copied().flatten()?;
            Some((row.year as f64, val))
        })
        .unzip()
}

/// Accumulates parse results into a [`Series`].
///
/// Rows are kept in arrival order. A row whose year does not exceed the
/// previous accepted year is rejected, never reordered. Text-led lines are
/// skipped as headers until the first row is accepted and rejected after.
#[derive(Debug)]
pub struct SeriesBuilder {
    channels: Vec<String>,
    rows: Vec<Row>,
    rejected: Vec<EngineError>,
}

impl SeriesBuilder {
    pub fn new(channels: Vec<String>) -> Self {
        Self {
            channels,
            rows: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn push(&mut self, line: usize, parsed: EngineResult<Parsed>) {
        match parsed {
            Ok(Parsed::Row(row)) => self.push_row(line, row),
            Ok(Parsed::Header(first)) if !self.rows.is_empty() => {
                let fault = RowFault::BadYear(first);
                self.reject(EngineError::MalformedRow { line, fault });
            }
            Ok(Parsed::Header(_) | Parsed::Blank) => {}
            Err(err) => self.reject(err),
        }
    }

    pub fn push_row(&mut self, line: usize, row: Row) {
        if let Some(prev) = self.rows.last() {
            if row.year <= prev.year {
                let fault = RowFault::NonIncreasingYear {
                    year: row.year,
                    previous: prev.year,
                };
                self.reject(EngineError::MalformedRow { line, fault });
                return;
            }
        }
        if row.values.len() != self.channels.len() {
            let column = row.values.len().min(self.channels.len()) + 1;
            let fault = RowFault::MissingColumn { column };
            self.reject(EngineError::MalformedRow { line, fault });
            return;
        }
        self.rows.push(row);
    }

    fn reject(&mut self, err: EngineError) {
        log::warn!("skipped row: {err}");
        self.rejected.push(err);
    }

    pub fn n_rejected(&self) -> usize {
        self.rejected.len()
    }

    pub fn finish(self) -> (Series, Vec<EngineError>) {
        let series = Series {
            channels: self.channels,
            rows: self.rows,
        };
        (series, self.rejected)
    }
}

/// Read a delimited table into a [`Series`].
///
/// Only I/O failures abort; every other problem rejects a single row.
pub fn read_series<R: Read>(
    reader: R,
    delimiter: u8,
    parser: &RowParser,
    channels: Vec<String>,
) -> Result<(Series, Vec<EngineError>)> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut builder = SeriesBuilder::new(channels);
    for (i_record, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map_or(i_record + 1, |pos| pos.line() as usize);
                builder.push(line, parser.parse_record(&record, line));
            }
            Err(err) if err.is_io_error() => {
                return Err(err).context("failed to read record");
            }
            Err(err) => {
                let line = err
                    .position()
                    .map_or(i_record + 1, |pos| pos.line() as usize);
                builder.reject(EngineError::MalformedRow {
                    line,
                    fault: RowFault::Unreadable(err.to_string()),
                });
            }
        }
    }

    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> Vec<String> {
        vec!["Jan".to_string(), "Feb".to_string()]
    }

    fn parser() -> RowParser {
        RowParser::new(vec![1, 2], vec!["***".to_string()])
    }

    #[test]
    fn reads_table_and_counts_rejections() {
        let text = "Land-Ocean: Global Means\n\
                    Year,Jan,Feb\n\
                    1880,-0.19,-0.25\n\
                    1881,bad,-0.14\n\
                    1882,0.16,***\n\
                    1882,0.10,0.10\n\
                    \n\
                    1883,-0.29,-0.36\n";
        let (series, rejected) = read_series(text.as_bytes(), b',', &parser(), channels()).unwrap();

        assert_eq!(series.years(), vec![1880, 1882, 1883]);
        assert_eq!(series.column(1), vec![Some(-0.25), None, Some(-0.36)]);
        assert_eq!(rejected.len(), 2);
        assert!(matches!(
            rejected[0],
            EngineError::MalformedRow {
                line: 4,
                fault: RowFault::BadValue { column: 1, .. }
            }
        ));
        assert!(matches!(
            rejected[1],
            EngineError::MalformedRow {
                fault: RowFault::NonIncreasingYear {
                    year: 1882,
                    previous: 1882
                },
                ..
            }
        ));
    }

    #[test]
    fn points_skip_missing_readings() {
        let text = "1990,0.1,0.2\n1991,***,0.3\n1992,0.4,***\n";
        let (series, _) = read_series(text.as_bytes(), b',', &parser(), channels()).unwrap();
        assert_eq!(series.points(0), (vec![1990.0, 1992.0], vec![0.1, 0.4]));
        assert_eq!(series.channel_index("Feb"), Some(1));
        assert_eq!(series.channel_index("Mar"), None);
    }

    #[test]
    fn out_of_order_rows_are_not_reordered() {
        let mut builder = SeriesBuilder::new(channels());
        for (line, year) in [2001, 2000, 2002].into_iter().enumerate() {
            let row = Row {
                year,
                values: vec![Some(0.0), Some(0.0)],
            };
            builder.push(line + 1, Ok(Parsed::Row(row)));
        }
        assert_eq!(builder.n_rejected(), 1);
        let (series, _) = builder.finish();
        assert_eq!(series.years(), vec![2001, 2002]);
    }

    #[test]
    fn text_led_line_after_data_is_rejected() {
        let text = "Year,Jan,Feb\n\
                    1990,0.1,0.2\n\
                    NA,0.3,0.4\n\
                    1991,0.5,0.6\n";
        let (series, rejected) = read_series(text.as_bytes(), b',', &parser(), channels()).unwrap();
        assert_eq!(series.years(), vec![1990, 1991]);
        assert_eq!(
            rejected,
            vec![EngineError::MalformedRow {
                line: 3,
                fault: RowFault::BadYear("NA".to_string()),
            }]
        );
    }
}
