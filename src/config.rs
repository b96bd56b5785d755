use crate::records::Extreme;
use crate::row::RowParser;
use crate::segment::DEFAULT_BUCKET_SIZE;
use crate::streaks::DEFAULT_THRESHOLD;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt::Debug, fs, num::NonZeroUsize, ops::RangeBounds, path::Path};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const SEASONS: [&str; 12] = [
    "DJF", "DJF", "MAM", "MAM", "MAM", "JJA", "JJA", "JJA", "SON", "SON", "SON", "DJF",
];

/// Analysis configuration.
///
/// Loaded from a TOML file and validated before use. Every section is
/// optional; the defaults describe a GISTEMP global means table.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input: InputConfig,
    pub trend: TrendConfig,
    pub records: RecordsConfig,
    pub streaks: StreaksConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Field separator, a single ASCII character.
    pub delimiter: char,
    /// Fields that denote a missing reading.
    pub missing_markers: Vec<String>,
    /// Channels read from each row, in order.
    pub channels: Vec<ChannelConfig>,
    /// Channels holding the twelve months, in calendar order; empty if none.
    pub months: Vec<String>,
    /// Season channel of each month, matching `months` position by position.
    pub seasons: Vec<String>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub name: String,
    /// Zero-based column index; column 0 holds the year.
    pub column: usize,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrendConfig {
    /// Channel regressed against year.
    pub channel: String,
    /// Number of rows per bucket.
    pub bucket_size: NonZeroUsize,
    /// Largest slope difference still read as a stationary climate.
    pub stationary_tolerance: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordsConfig {
    /// Channels to track; empty means all of them.
    pub channels: Vec<String>,
    pub extremes: Vec<Extreme>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreaksConfig {
    /// Minimum number of consecutive periods of a streak.
    pub threshold: NonZeroUsize,
    /// Channels scanned year by year.
    pub channels: Vec<String>,
    /// Also scan the months laid out one after another as a single sequence.
    pub monthly: bool,
    /// Also scan for runs of years holding a streak of months within the year.
    pub extreme_years: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        let monthly = MONTHS.iter().enumerate().map(|(i, name)| (*name, i + 1));
        let annual = [("J-D", 13)];
        let seasonal = [("DJF", 15), ("MAM", 16), ("JJA", 17), ("SON", 18)];
        let channels = monthly
            .chain(annual)
            .chain(seasonal)
            .map(|(name, column)| ChannelConfig {
                name: name.to_string(),
                column,
            })
            .collect();
        Self {
            delimiter: ',',
            missing_markers: vec!["***".to_string()],
            channels,
            months: MONTHS.map(String::from).to_vec(),
            seasons: SEASONS.map(String::from).to_vec(),
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            channel: "J-D".to_string(),
            bucket_size: DEFAULT_BUCKET_SIZE,
            stationary_tolerance: 0.001,
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            extremes: vec![Extreme::Warmest],
        }
    }
}

impl Default for StreaksConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            channels: Vec::new(),
            monthly: true,
            extreme_years: true,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.input.delimiter.is_ascii() {
            bail!("delimiter must be an ASCII character");
        }
        check_num(self.input.channels.len(), 1..1000).context("invalid number of channels")?;

        let mut names = HashSet::new();
        let mut columns = HashSet::new();
        for channel in &self.input.channels {
            if !names.insert(channel.name.as_str()) {
                bail!("channel {:?} is defined twice", channel.name);
            }
            check_num(channel.column, 1..10_000)
                .with_context(|| format!("invalid column of channel {:?}", channel.name))?;
            if !columns.insert(channel.column) {
                bail!("column {} is read by two channels", channel.column);
            }
        }

        self.channel_index(&self.trend.channel)
            .context("invalid trend channel")?;
        check_num(self.trend.stationary_tolerance, 0.0..1.0)
            .context("invalid stationary tolerance")?;

        let months: HashSet<_> = self.input.months.iter().collect();
        if months.len() != self.input.months.len() {
            bail!("month channels must be distinct");
        }
        if !matches!(months.len(), 0 | 12) {
            bail!("expected 0 or 12 month channels, got {}", months.len());
        }
        self.channel_indices(&self.input.months)
            .context("invalid month channels")?;
        if !self.input.seasons.is_empty() && self.input.seasons.len() != months.len() {
            bail!("expected one season channel per month");
        }
        self.channel_indices(&self.input.seasons)
            .context("invalid season channels")?;
        self.channel_indices(&self.records.channels)
            .context("invalid record channels")?;
        self.channel_indices(&self.streaks.channels)
            .context("invalid streak channels")?;

        Ok(())
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.input.channels.iter().map(|c| c.name.clone()).collect()
    }

    pub fn channel_index(&self, name: &str) -> Result<usize> {
        self.input
            .channels
            .iter()
            .position(|c| c.name == name)
            .with_context(|| format!("channel {name:?} is not defined"))
    }

    pub fn channel_indices(&self, names: &[String]) -> Result<Vec<usize>> {
        names.iter().map(|name| self.channel_index(name)).collect()
    }

    /// Channels whose records are tracked.
    pub fn record_channels(&self) -> Result<Vec<usize>> {
        if self.records.channels.is_empty() {
            return Ok((0..self.input.channels.len()).collect());
        }
        self.channel_indices(&self.records.channels)
    }

    pub fn row_parser(&self) -> RowParser {
        let columns = self.input.channels.iter().map(|c| c.column).collect();
        RowParser::new(columns, self.input.missing_markers.clone())
    }

    pub fn delimiter(&self) -> u8 {
        // Checked to be ASCII by `validate`.
        self.input.delimiter as u8
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
