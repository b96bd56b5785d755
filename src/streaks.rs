//! Runs of consecutive anomalous periods (heatwaves and cold snaps).

use crate::series::Series;
use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroUsize};

pub const DEFAULT_THRESHOLD: NonZeroUsize = NonZeroUsize::new(3).unwrap();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakKind {
    /// Anomaly above zero.
    Hot,
    /// Anomaly below zero.
    Cold,
}

impl StreakKind {
    pub const ALL: [StreakKind; 2] = [StreakKind::Hot, StreakKind::Cold];

    /// Missing readings never qualify.
    fn qualifies(self, val: Option<f64>) -> bool {
        match (self, val) {
            (Self::Hot, Some(val)) => val > 0.0,
            (Self::Cold, Some(val)) => val < 0.0,
            (_, None) => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Cold => "cold",
        }
    }
}

/// A point in a sequence: a year, optionally narrowed to one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub channel: Option<String>,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.channel {
            Some(channel) => write!(f, "{} {channel}", self.year),
            None => write!(f, "{}", self.year),
        }
    }
}

/// Chronological readings scanned for streaks.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub name: String,
    pub periods: Vec<Period>,
    pub values: Vec<Option<f64>>,
}

impl Sequence {
    /// One channel, one period per year.
    pub fn channel(series: &Series, i_channel: usize) -> Self {
        let periods = series
            .years()
            .into_iter()
            .map(|year| Period {
                year,
                channel: None,
            })
            .collect();
        Self {
            name: series.channels()[i_channel].clone(),
            periods,
            values: series.column(i_channel),
        }
    }

    /// Several channels laid out one after another within each year,
    /// e.g. Jan..Dec into a single monthly sequence.
    pub fn interleaved(name: &str, series: &Series, i_channels: &[usize]) -> Self {
        let mut periods = Vec::with_capacity(series.len() * i_channels.len());
        let mut values = Vec::with_capacity(periods.capacity());
        for row in series.rows() {
            for &i_channel in i_channels {
                periods.push(Period {
                    year: row.year,
                    channel: Some(series.channels()[i_channel].clone()),
                });
                values.push(row.values[i_channel]);
            }
        }
        Self {
            name: name.to_string(),
            periods,
            values,
        }
    }

    /// One period per year, classified from the months of that year alone.
    ///
    /// A year is extreme when it holds a run of at least `threshold`
    /// consecutive qualifying months; runs never cross into the next year.
    /// An extreme year carries the length of its longest run, signed so it
    /// qualifies for `kind`, and any other year carries zero. Years with no
    /// month reading at all are missing. Scan the result with a threshold
    /// of one year to get runs of extreme years.
    pub fn extreme_years(
        name: &str,
        series: &Series,
        i_months: &[usize],
        kind: StreakKind,
        threshold: NonZeroUsize,
    ) -> Self {
        let sign = match kind {
            StreakKind::Hot => 1.0,
            StreakKind::Cold => -1.0,
        };
        let mut periods = Vec::with_capacity(series.len());
        let mut values = Vec::with_capacity(series.len());
        for row in series.rows() {
            periods.push(Period {
                year: row.year,
                channel: None,
            });

            let months: Vec<_> = i_months.iter().map(|&i| row.values[i]).collect();
            if months.iter().all(Option::is_none) {
                values.push(None);
                continue;
            }
            let longest = longest_run(kind, &months);
            let val = if longest >= threshold.get() {
                sign * longest as f64
            } else {
                0.0
            };
            values.push(Some(val));
        }
        Self {
            name: name.to_string(),
            periods,
            values,
        }
    }
}

fn longest_run(kind: StreakKind, values: &[Option<f64>]) -> usize {
    let mut longest = 0;
    let mut count = 0;
    for &val in values {
        if kind.qualifies(val) {
            count += 1;
            longest = longest.max(count);
        } else {
            count = 0;
        }
    }
    longest
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub sequence: String,
    pub kind: StreakKind,
    pub start: Period,
    /// Last qualifying period, or `None` while the streak is ongoing.
    pub end: Option<Period>,
    pub duration: usize,
}

impl Streak {
    pub fn is_ongoing(&self) -> bool {
        self.end.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    Inside,
}

/// Reports every maximal run of qualifying periods that reaches `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct StreakDetector {
    kind: StreakKind,
    threshold: NonZeroUsize,
}

impl StreakDetector {
    pub fn new(kind: StreakKind, threshold: NonZeroUsize) -> Self {
        Self { kind, threshold }
    }

    pub fn detect(&self, seq: &Sequence) -> Vec<Streak> {
        let mut streaks = Vec::new();
        let mut state = State::Outside;
        let mut count = 0;
        let mut i_start = 0;

        let emit = |i_start: usize, end: Option<Period>, count: usize| Streak {
            sequence: seq.name.clone(),
            kind: self.kind,
            start: seq.periods[i_start].clone(),
            end,
            duration: count,
        };

        for (i_period, &val) in seq.values.iter().enumerate() {
            if self.kind.qualifies(val) {
                if count == 0 {
                    i_start = i_period;
                }
                count += 1;
                if state == State::Outside && count >= self.threshold.get() {
                    state = State::Inside;
                }
                continue;
            }
            if state == State::Inside {
                let end = seq.periods[i_period - 1].clone();
                streaks.push(emit(i_start, Some(end), count));
                state = State::Outside;
            }
            count = 0;
        }

        if state == State::Inside {
            streaks.push(emit(i_start, None, count));
        }

        streaks
    }
}

/// Totals of the streaks of one sequence and kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub sequence: String,
    pub kind: StreakKind,
    pub n_streaks: usize,
    pub longest: usize,
    pub total_duration: usize,
    pub ongoing: bool,
}

impl StreakSummary {
    pub fn new(sequence: &str, kind: StreakKind, streaks: &[Streak]) -> Self {
        Self {
            sequence: sequence.to_string(),
            kind,
            n_streaks: streaks.len(),
            longest: streaks.iter().map(|s| s.duration).max().unwrap_or(0),
            total_duration: streaks.iter().map(|s| s.duration).sum(),
            ongoing: streaks.last().is_some_and(Streak::is_ongoing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(values: &[Option<f64>]) -> Sequence {
        Sequence {
            name: "test".to_string(),
            periods: (0..values.len() as i32)
                .map(|i| Period {
                    year: 2000 + i,
                    channel: None,
                })
                .collect(),
            values: values.to_vec(),
        }
    }

    fn detector(kind: StreakKind, threshold: usize) -> StreakDetector {
        StreakDetector::new(kind, NonZeroUsize::new(threshold).unwrap())
    }

    #[test]
    fn short_trailing_run_is_not_reported() {
        let seq = seq(&[1.0, 1.0, 1.0, -1.0, 1.0, 1.0].map(Some));
        let streaks = detector(StreakKind::Hot, 3).detect(&seq);
        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].duration, 3);
        assert_eq!(streaks[0].start.year, 2000);
        assert_eq!(streaks[0].end.as_ref().map(|p| p.year), Some(2002));
        assert!(!streaks[0].is_ongoing());
    }

    #[test]
    fn run_reaching_end_is_ongoing() {
        let seq = seq(&[1.0, 1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0].map(Some));
        let streaks = detector(StreakKind::Hot, 3).detect(&seq);
        assert_eq!(streaks.len(), 2);
        assert_eq!(streaks[1].start.year, 2004);
        assert_eq!(streaks[1].duration, 4);
        assert!(streaks[1].is_ongoing());

        let summary = StreakSummary::new("test", StreakKind::Hot, &streaks);
        assert_eq!(summary.n_streaks, 2);
        assert_eq!(summary.longest, 4);
        assert_eq!(summary.total_duration, 7);
        assert!(summary.ongoing);
    }

    #[test]
    fn missing_reading_breaks_run() {
        let seq = seq(&[Some(-0.2), Some(-0.1), None, Some(-0.3), Some(-0.4)]);
        assert!(detector(StreakKind::Cold, 3).detect(&seq).is_empty());
        assert_eq!(detector(StreakKind::Cold, 2).detect(&seq).len(), 2);
    }

    #[test]
    fn hot_and_cold_are_independent() {
        let seq = seq(&[0.5, 0.0, -0.5, -0.5, 0.5, 0.5].map(Some));
        let hot = detector(StreakKind::Hot, 1).detect(&seq);
        let cold = detector(StreakKind::Cold, 1).detect(&seq);
        let durations =
            |streaks: &[Streak]| streaks.iter().map(|s| s.duration).collect::<Vec<_>>();
        assert_eq!(durations(&hot), vec![1, 2]);
        assert_eq!(durations(&cold), vec![2]);
        assert!(hot[1].is_ongoing());
        assert!(!cold[0].is_ongoing());
    }

    #[test]
    fn interleaved_sequence_labels_channels() {
        use crate::row::Row;
        let rows = vec![
            Row {
                year: 1998,
                values: vec![Some(0.6), Some(0.8)],
            },
            Row {
                year: 1999,
                values: vec![Some(0.4), Some(-0.1)],
            },
        ];
        let series = Series::from_rows(vec!["Jan".to_string(), "Feb".to_string()], rows).0;
        let seq = Sequence::interleaved("monthly", &series, &[0, 1]);
        let streaks = detector(StreakKind::Hot, 3).detect(&seq);
        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].start.to_string(), "1998 Jan");
        assert_eq!(streaks[0].end.as_ref().unwrap().to_string(), "1999 Jan");
    }

    fn monthly_series(years: &[(i32, [f64; 12])]) -> Series {
        use crate::row::Row;
        let channels = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ]
        .map(String::from)
        .to_vec();
        let rows = years
            .iter()
            .map(|(year, months)| Row {
                year: *year,
                values: months.map(Some).to_vec(),
            })
            .collect();
        Series::from_rows(channels, rows).0
    }

    #[test]
    fn run_across_new_year_is_not_an_extreme_year() {
        let mut warm_end = [-0.2; 12];
        warm_end[11] = 0.3;
        let mut warm_start = [-0.2; 12];
        warm_start[0] = 0.4;
        warm_start[1] = 0.5;
        let series = monthly_series(&[(2000, warm_end), (2001, warm_start)]);
        let i_months: Vec<_> = (0..12).collect();
        let threshold = NonZeroUsize::new(3).unwrap();

        let monthly = Sequence::interleaved("monthly", &series, &i_months);
        let streaks = StreakDetector::new(StreakKind::Hot, threshold).detect(&monthly);
        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].start.to_string(), "2000 Dec");
        assert_eq!(streaks[0].duration, 3);

        let years =
            Sequence::extreme_years("years", &series, &i_months, StreakKind::Hot, threshold);
        assert_eq!(years.values, vec![Some(0.0), Some(0.0)]);
        assert!(detector(StreakKind::Hot, 1).detect(&years).is_empty());
    }

    #[test]
    fn extreme_years_form_events() {
        let mut summer = [-0.1; 12];
        summer[5..9].copy_from_slice(&[0.2, 0.3, 0.4, 0.2]);
        let mut cold = [-0.3; 12];
        cold[0] = 0.1;
        let series = monthly_series(&[
            (1990, summer),
            (1991, summer),
            (1992, cold),
            (1993, summer),
        ]);
        let i_months: Vec<_> = (0..12).collect();
        let threshold = NonZeroUsize::new(3).unwrap();

        let hot =
            Sequence::extreme_years("years", &series, &i_months, StreakKind::Hot, threshold);
        assert_eq!(hot.values, vec![Some(4.0), Some(4.0), Some(0.0), Some(4.0)]);
        let events = detector(StreakKind::Hot, 1).detect(&hot);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start.year, 1990);
        assert_eq!(events[0].end.as_ref().map(|p| p.year), Some(1991));
        assert_eq!(events[0].duration, 2);
        assert!(events[1].is_ongoing());

        let cold =
            Sequence::extreme_years("years", &series, &i_months, StreakKind::Cold, threshold);
        assert_eq!(cold.values, vec![Some(-5.0), Some(-5.0), Some(-11.0), Some(-5.0)]);
        let events = detector(StreakKind::Cold, 1).detect(&cold);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration, 4);
        assert!(events[0].is_ongoing());
    }
}
