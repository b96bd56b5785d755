//! Running records ("warmest so far") and the gaps between them.

use crate::error::EngineResult;
use crate::regression::{RegressionResult, fit};
use crate::series::Series;
use serde::{Deserialize, Serialize};

/// Direction in which a record is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extreme {
    Warmest,
    Coldest,
}

impl Extreme {
    /// Map a reading so that "better record" always means "larger key".
    fn key(self, val: f64) -> f64 {
        match self {
            Self::Warmest => val,
            Self::Coldest => -val,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Warmest => "warmest",
            Self::Coldest => "coldest",
        }
    }
}

/// Best-to-date reading of one channel.
///
/// `running_max` is stored in key space, so for [`Extreme::Coldest`] it is
/// the negated running minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordState {
    pub running_max: f64,
    pub running_max_year: Option<i32>,
}

impl RecordState {
    pub fn new() -> Self {
        Self {
            running_max: f64::NEG_INFINITY,
            running_max_year: None,
        }
    }

    /// Compare a reading against the running record and return the year that
    /// owns the record after it.
    ///
    /// Ties go to the current year. A missing reading never sets a record.
    pub fn observe(&mut self, year: i32, key: Option<f64>) -> Option<i32> {
        if let Some(key) = key {
            if key >= self.running_max {
                self.running_max = key;
                self.running_max_year = Some(year);
            }
        }
        self.running_max_year
    }
}

impl Default for RecordState {
    fn default() -> Self {
        Self::new()
    }
}

/// Year distance between two consecutive record-setting years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start_year: i32,
    pub size: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTrack {
    pub extreme: Extreme,
    /// Per row, the year holding the record as of that row.
    pub owners: Vec<Option<i32>>,
    pub gaps: Vec<Gap>,
}

impl RecordTrack {
    /// Years in which a new record was set, in order.
    pub fn record_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.owners.iter().flatten().copied().collect();
        years.dedup();
        years
    }

    /// Regress gap size against gap start year.
    ///
    /// A positive slope means records are getting harder to break.
    pub fn gap_trend(&self) -> EngineResult<RegressionResult> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = self
            .gaps
            .iter()
            .map(|gap| (gap.start_year as f64, gap.size as f64))
            .unzip();
        fit(&xs, &ys)
    }
}

/// Track records of one channel of a series.
pub fn track(series: &Series, i_channel: usize, extreme: Extreme) -> RecordTrack {
    track_values(&series.years(), &series.column(i_channel), extreme)
}

/// Track records over parallel `years` and `values`.
///
/// Years must be strictly increasing.
pub fn track_values(years: &[i32], values: &[Option<f64>], extreme: Extreme) -> RecordTrack {
    let mut state = RecordState::new();
    let owners: Vec<Option<i32>> = years
        .iter()
        .zip(values)
        .map(|(&year, &val)| state.observe(year, val.map(|val| extreme.key(val))))
        .collect();

    let mut gaps = Vec::new();
    let mut last_record_year = None;
    for (&year, &owner) in years.iter().zip(&owners) {
        if owner != Some(year) {
            continue;
        }
        if let Some(start_year) = last_record_year {
            gaps.push(Gap {
                start_year,
                size: year - start_year,
            });
        }
        last_record_year = Some(year);
    }

    RecordTrack {
        extreme,
        owners,
        gaps,
    }
}

/// Reading of the trend of a channel against the trend of its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpretation {
    Stationary,
    Warming,
    Cooling,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeTrend {
    /// Trend of the readings themselves.
    pub raw: RegressionResult,
    /// Trend of the warmest-so-far envelope.
    pub envelope: RegressionResult,
    pub interpretation: Interpretation,
}

/// Compare the trend of a channel with the trend of its running maximum.
///
/// Rows with a missing reading are left out of both regressions.
pub fn envelope_trend(
    series: &Series,
    i_channel: usize,
    tolerance: f64,
) -> EngineResult<EnvelopeTrend> {
    let (xs, ys) = series.points(i_channel);
    let raw = fit(&xs, &ys)?;

    let maxima: Vec<f64> = ys
        .iter()
        .scan(f64::NEG_INFINITY, |max, &val| {
            *max = max.max(val);
            Some(*max)
        })
        .collect();
    let envelope = fit(&xs, &maxima)?;

    Ok(EnvelopeTrend {
        raw,
        envelope,
        interpretation: interpret(raw.slope, envelope.slope, tolerance),
    })
}

fn interpret(raw_slope: f64, envelope_slope: f64, tolerance: f64) -> Interpretation {
    if raw_slope > envelope_slope {
        if raw_slope - envelope_slope < tolerance {
            Interpretation::Stationary
        } else {
            Interpretation::Warming
        }
    } else {
        Interpretation::Cooling
    }
}
