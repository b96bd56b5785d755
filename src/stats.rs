use crate::series::Series;
use serde::{Deserialize, Serialize};

/// Welford accumulator that also remembers where the extremes occurred.
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
    min: Option<(i32, f64)>,
    max: Option<(i32, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: Option<(i32, f64)>,
    pub max: Option<(i32, f64)>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
            min: None,
            max: None,
        }
    }

    pub fn add(&mut self, year: i32, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;

        if self.min.is_none_or(|(_, min)| val < min) {
            self.min = Some((year, val));
        }
        if self.max.is_none_or(|(_, max)| val > max) {
            self.max = Some((year, val));
        }
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            n_vals: self.n_vals,
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
            min: self.min,
            max: self.max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel: String,
    pub report: AccumulatorReport,
}

/// Summarise every channel of a series over its non-missing readings.
pub fn summarize_channels(series: &Series) -> Vec<ChannelSummary> {
    series
        .channels()
        .iter()
        .enumerate()
        .map(|(i_channel, channel)| {
            let mut acc = Accumulator::new();
            for row in series.rows() {
                if let Some(val) = row.values[i_channel] {
                    acc.add(row.year, val);
                }
            }
            ChannelSummary {
                channel: channel.clone(),
                report: acc.report(),
            }
        })
        .collect()
}

/// Summarise how far each month strays from the season it belongs to.
///
/// `i_seasons[k]` is the season channel of month `i_months[k]`; both are
/// read from the same row. Years where either reading is missing are left
/// out of that month's summary.
pub fn seasonal_deviations(
    series: &Series,
    i_months: &[usize],
    i_seasons: &[usize],
) -> Vec<ChannelSummary> {
    i_months
        .iter()
        .zip(i_seasons)
        .map(|(&i_month, &i_season)| {
            let mut acc = Accumulator::new();
            for row in series.rows() {
                if let (Some(month), Some(season)) = (row.values[i_month], row.values[i_season]) {
                    acc.add(row.year, month - season);
                }
            }
            ChannelSummary {
                channel: series.channels()[i_month].clone(),
                report: acc.report(),
            }
        })
        .collect()
}

/// Warmest and coldest of the selected channels within one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearExtremes {
    pub year: i32,
    pub warmest: (String, f64),
    pub coldest: (String, f64),
}

/// For each year, find the selected channels holding the largest and
/// smallest reading. Years where every selected reading is missing are left
/// out. The first channel wins a tie.
pub fn year_extremes(series: &Series, i_channels: &[usize]) -> Vec<YearExtremes> {
    series
        .rows()
        .iter()
        .filter_map(|row| {
            let mut warmest: Option<(usize, f64)> = None;
            let mut coldest: Option<(usize, f64)> = None;
            for &i_channel in i_channels {
                let Some(val) = row.values[i_channel] else {
                    continue;
                };
                if warmest.is_none_or(|(_, max)| val > max) {
                    warmest = Some((i_channel, val));
                }
                if coldest.is_none_or(|(_, min)| val < min) {
                    coldest = Some((i_channel, val));
                }
            }
            let name = |(i_channel, val): (usize, f64)| (series.channels()[i_channel].clone(), val);
            Some(YearExtremes {
                year: row.year,
                warmest: name(warmest?),
                coldest: name(coldest?),
            })
        })
        .collect()
}
