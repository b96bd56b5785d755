use crate::config::Config;
use crate::records::{self, EnvelopeTrend, Extreme, Gap, Interpretation};
use crate::regression::RegressionResult;
use crate::segment::segment;
use crate::series::Series;
use crate::stats::{
    ChannelSummary, YearExtremes, seasonal_deviations, summarize_channels, year_extremes,
};
use crate::streaks::{Sequence, Streak, StreakDetector, StreakKind, StreakSummary};
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    num::NonZeroUsize,
    path::Path,
};

/// Name of the sequence built from the month channels.
pub const MONTHLY_SEQUENCE: &str = "monthly";

/// Name of the sequences of years classified from their months.
pub const EXTREME_YEARS_SEQUENCE: &str = "years";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRow {
    pub label: String,
    pub slope: f64,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub channel: String,
    /// `Overall` first, then one row per bucket that could be regressed.
    pub rows: Vec<TrendRow>,
    /// Labels of the buckets that could not be regressed.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEnvelope {
    pub channel: String,
    pub trend: EnvelopeTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecords {
    pub channel: String,
    pub extreme: Extreme,
    pub record_years: Vec<i32>,
    pub gaps: Vec<Gap>,
    pub gap_trend: Option<RegressionResult>,
}

/// Everything derived from one input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub n_rows: usize,
    pub n_rejected: usize,
    pub trend: TrendReport,
    pub records: Vec<ChannelRecords>,
    /// Raw against record-envelope trend of every tracked channel.
    pub envelopes: Vec<ChannelEnvelope>,
    pub streaks: Vec<Streak>,
    pub streak_summaries: Vec<StreakSummary>,
    pub channels: Vec<ChannelSummary>,
    /// Deviation of each month from its season.
    pub seasonal_deviations: Vec<ChannelSummary>,
    pub year_extremes: Vec<YearExtremes>,
}

#[derive(Serialize)]
struct GapRow<'a> {
    channel: &'a str,
    extreme: Extreme,
    start_year: i32,
    size: i32,
}

#[derive(Serialize)]
struct GapTrendRow<'a> {
    channel: &'a str,
    extreme: Extreme,
    slope: f64,
    intercept: f64,
}

#[derive(Serialize)]
struct EnvelopeRow<'a> {
    channel: &'a str,
    raw_slope: f64,
    envelope_slope: f64,
    interpretation: Interpretation,
}

#[derive(Serialize)]
struct StreakRow<'a> {
    sequence: &'a str,
    kind: StreakKind,
    start: String,
    end: Option<String>,
    duration: usize,
    ongoing: bool,
}

/// Runs every configured analysis over a series.
pub struct Analyzer<'a> {
    cfg: &'a Config,
}

impl<'a> Analyzer<'a> {
    pub fn new(cfg: &'a Config) -> Self {
        Self { cfg }
    }

    /// The series must have been built with the channels of the configuration.
    ///
    /// # Errors
    /// Fails only when the configuration names an undefined channel.
    /// Degenerate regressions are logged and left out of the report.
    pub fn analyze(&self, series: &Series, n_rejected: usize) -> Result<Report> {
        let trend = self.trend(series).context("failed to analyze trend")?;
        let records = self.records(series).context("failed to track records")?;
        let envelopes = self
            .envelopes(series)
            .context("failed to compare record envelopes")?;
        let (streaks, streak_summaries) =
            self.streaks(series).context("failed to detect streaks")?;
        let i_months = self.cfg.channel_indices(&self.cfg.input.months)?;
        let i_seasons = self.cfg.channel_indices(&self.cfg.input.seasons)?;

        Ok(Report {
            n_rows: series.len(),
            n_rejected,
            trend,
            records,
            envelopes,
            streaks,
            streak_summaries,
            channels: summarize_channels(series),
            seasonal_deviations: seasonal_deviations(series, &i_months, &i_seasons),
            year_extremes: year_extremes(series, &i_months),
        })
    }

    fn trend(&self, series: &Series) -> Result<TrendReport> {
        let channel = &self.cfg.trend.channel;
        let i_channel = self.cfg.channel_index(channel)?;
        let seg = segment(series, i_channel, self.cfg.trend.bucket_size);

        let mut rows = Vec::with_capacity(seg.buckets.len() + 1);
        let mut skipped = Vec::new();
        match seg.overall {
            Ok(res) => {
                log::info!(
                    "{channel} overall trend: slope = {:.6}, intercept = {:.4}",
                    res.slope,
                    res.intercept
                );
                rows.push(TrendRow {
                    label: "Overall".to_string(),
                    slope: res.slope,
                    intercept: res.intercept,
                });
            }
            Err(err) => {
                log::warn!("{channel} overall trend skipped: {err}");
                skipped.push("Overall".to_string());
            }
        }
        for bucket in seg.buckets {
            let label = bucket.label();
            match bucket.fit {
                Ok(res) => rows.push(TrendRow {
                    label,
                    slope: res.slope,
                    intercept: res.intercept,
                }),
                Err(err) => {
                    log::warn!("{channel} bucket {label} skipped: {err}");
                    skipped.push(label);
                }
            }
        }

        Ok(TrendReport {
            channel: channel.clone(),
            rows,
            skipped,
        })
    }

    fn envelopes(&self, series: &Series) -> Result<Vec<ChannelEnvelope>> {
        let tolerance = self.cfg.trend.stationary_tolerance;
        let mut all = Vec::new();
        for i_channel in self.cfg.record_channels()? {
            let channel = &series.channels()[i_channel];
            match records::envelope_trend(series, i_channel, tolerance) {
                Ok(trend) => {
                    log::info!("{channel} against its records: {:?}", trend.interpretation);
                    all.push(ChannelEnvelope {
                        channel: channel.clone(),
                        trend,
                    });
                }
                Err(err) => log::warn!("{channel} envelope trend skipped: {err}"),
            }
        }
        Ok(all)
    }

    fn records(&self, series: &Series) -> Result<Vec<ChannelRecords>> {
        let mut all = Vec::new();
        for i_channel in self.cfg.record_channels()? {
            let channel = &series.channels()[i_channel];
            for &extreme in &self.cfg.records.extremes {
                let track = records::track(series, i_channel, extreme);
                let gap_trend = match track.gap_trend() {
                    Ok(res) => Some(res),
                    Err(err) => {
                        log::debug!("{channel} {} gap trend skipped: {err}", extreme.name());
                        None
                    }
                };
                log::debug!(
                    "{channel} {}: {} gaps",
                    extreme.name(),
                    track.gaps.len()
                );
                all.push(ChannelRecords {
                    channel: channel.clone(),
                    extreme,
                    record_years: track.record_years(),
                    gaps: track.gaps,
                    gap_trend,
                });
            }
        }
        Ok(all)
    }

    fn streaks(&self, series: &Series) -> Result<(Vec<Streak>, Vec<StreakSummary>)> {
        let threshold = self.cfg.streaks.threshold;
        let i_months = self.cfg.channel_indices(&self.cfg.input.months)?;

        // Each sequence with the kinds it is scanned for and the run length.
        let mut scans = Vec::new();
        for i_channel in self.cfg.channel_indices(&self.cfg.streaks.channels)? {
            let seq = Sequence::channel(series, i_channel);
            scans.push((seq, StreakKind::ALL.to_vec(), threshold));
        }
        if self.cfg.streaks.monthly && !i_months.is_empty() {
            let seq = Sequence::interleaved(MONTHLY_SEQUENCE, series, &i_months);
            scans.push((seq, StreakKind::ALL.to_vec(), threshold));
        }
        if self.cfg.streaks.extreme_years && !i_months.is_empty() {
            for kind in StreakKind::ALL {
                let seq = Sequence::extreme_years(
                    EXTREME_YEARS_SEQUENCE,
                    series,
                    &i_months,
                    kind,
                    threshold,
                );
                scans.push((seq, vec![kind], NonZeroUsize::MIN));
            }
        }

        let mut streaks = Vec::new();
        let mut summaries = Vec::new();
        for (seq, kinds, min_len) in &scans {
            for &kind in kinds {
                let found = StreakDetector::new(kind, *min_len).detect(seq);
                let summary = StreakSummary::new(&seq.name, kind, &found);
                log::info!(
                    "{} {} streaks: {} (longest {}, ongoing {})",
                    seq.name,
                    kind.name(),
                    summary.n_streaks,
                    summary.longest,
                    summary.ongoing
                );
                streaks.extend(found);
                summaries.push(summary);
            }
        }
        Ok((streaks, summaries))
    }
}

impl Report {
    /// Write the tables and the full report into `dir`, creating it if needed.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("failed to create {dir:?}"))?;

        write_table(dir.join("trends.csv"), &self.trend.rows)?;

        let gap_rows: Vec<_> = self
            .records
            .iter()
            .flat_map(|rec| {
                rec.gaps.iter().map(|gap| GapRow {
                    channel: &rec.channel,
                    extreme: rec.extreme,
                    start_year: gap.start_year,
                    size: gap.size,
                })
            })
            .collect();
        write_table(dir.join("gaps.csv"), &gap_rows)?;

        let gap_trend_rows: Vec<_> = self
            .records
            .iter()
            .filter_map(|rec| {
                let res = rec.gap_trend?;
                Some(GapTrendRow {
                    channel: &rec.channel,
                    extreme: rec.extreme,
                    slope: res.slope,
                    intercept: res.intercept,
                })
            })
            .collect();
        write_table(dir.join("gap_trends.csv"), &gap_trend_rows)?;

        let envelope_rows: Vec<_> = self
            .envelopes
            .iter()
            .map(|env| EnvelopeRow {
                channel: &env.channel,
                raw_slope: env.trend.raw.slope,
                envelope_slope: env.trend.envelope.slope,
                interpretation: env.trend.interpretation,
            })
            .collect();
        write_table(dir.join("envelope_trends.csv"), &envelope_rows)?;

        let streak_rows: Vec<_> = self
            .streaks
            .iter()
            .map(|streak| StreakRow {
                sequence: &streak.sequence,
                kind: streak.kind,
                start: streak.start.to_string(),
                end: streak.end.as_ref().map(ToString::to_string),
                duration: streak.duration,
                ongoing: streak.is_ongoing(),
            })
            .collect();
        write_table(dir.join("streaks.csv"), &streak_rows)?;

        let file = dir.join("report.msgpack");
        let file = File::create(&file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write_named(&mut writer, self).context("failed to serialize report")?;
        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Load a report previously written by [`Report::save`].
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let file = dir.as_ref().join("report.msgpack");
        let file = File::open(&file).with_context(|| format!("failed to open {file:?}"))?;
        let reader = BufReader::new(file);
        decode::from_read(reader).context("failed to deserialize report")
    }
}

fn write_table<P: AsRef<Path>, S: Serialize>(file: P, rows: &[S]) -> Result<()> {
    let file = file.as_ref();
    let mut writer =
        csv::Writer::from_path(file).with_context(|| format!("failed to create {file:?}"))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row to {file:?}"))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {file:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;

    fn config() -> Config {
        Config::from_toml(
            r#"
[trend]
channel = "J-D"
bucket_size = 4

[records]
channels = ["J-D", "JJA"]
extremes = ["warmest", "coldest"]

[streaks]
threshold = 2
channels = ["J-D"]
"#,
        )
        .unwrap()
    }

    /// Months sit 0.1 below the annual mean except February, 0.1 above.
    fn series() -> Series {
        let anomalies = [-0.3, -0.2, 0.1, -0.1, 0.2, 0.3, 0.25, 0.4, 0.5];
        let rows = anomalies
            .iter()
            .enumerate()
            .map(|(i, &val)| {
                let mut values = vec![Some(val - 0.1); 12];
                values[1] = Some(val + 0.1);
                values.extend([Some(val); 5]);
                Row {
                    year: 1990 + i as i32,
                    values,
                }
            })
            .collect();
        Series::from_rows(config().channel_names(), rows).0
    }

    #[test]
    fn report_collects_every_analysis() {
        let cfg = config();
        let report = Analyzer::new(&cfg).analyze(&series(), 2).unwrap();

        assert_eq!(report.n_rows, 9);
        assert_eq!(report.n_rejected, 2);

        let labels: Vec<_> = report.trend.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Overall", "1990s", "1994s"]);
        assert_eq!(report.trend.skipped, vec!["1998s".to_string()]);
        assert!(report.trend.rows[0].slope > 0.0);

        assert_eq!(report.records.len(), 4);
        let warmest = &report.records[0];
        assert_eq!(warmest.channel, "J-D");
        assert_eq!(warmest.extreme, Extreme::Warmest);
        assert_eq!(warmest.record_years, vec![1990, 1991, 1992, 1994, 1995, 1997, 1998]);
        assert!(warmest.gap_trend.is_some());
        let coldest = &report.records[1];
        assert_eq!(coldest.record_years, vec![1990]);
        assert!(coldest.gaps.is_empty());
        assert!(coldest.gap_trend.is_none());

        let channels: Vec<_> = report.envelopes.iter().map(|e| e.channel.as_str()).collect();
        assert_eq!(channels, vec!["J-D", "JJA"]);
        assert_eq!(report.envelopes[0].trend, report.envelopes[1].trend);

        let hot: Vec<_> = report
            .streaks
            .iter()
            .filter(|s| s.sequence == "J-D" && s.kind == StreakKind::Hot)
            .collect();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].start.year, 1994);
        assert!(hot[0].is_ongoing());

        let hot_years: Vec<_> = report
            .streaks
            .iter()
            .filter(|s| s.sequence == EXTREME_YEARS_SEQUENCE && s.kind == StreakKind::Hot)
            .collect();
        assert_eq!(hot_years.len(), 1);
        assert_eq!(hot_years[0].start.year, 1994);
        assert_eq!(hot_years[0].duration, 5);
        assert_eq!(report.streak_summaries.len(), 6);

        assert_eq!(report.channels.len(), 17);
        assert_eq!(report.seasonal_deviations.len(), 12);
        assert_eq!(report.seasonal_deviations[0].channel, "Jan");
        assert!((report.seasonal_deviations[0].report.mean + 0.1).abs() < 1e-9);
        assert!((report.seasonal_deviations[1].report.mean - 0.1).abs() < 1e-9);
        assert_eq!(report.year_extremes.len(), 9);
        assert_eq!(report.year_extremes[0].warmest.0, "Feb");
    }

    #[test]
    fn analysis_is_repeatable() {
        let cfg = config();
        let series = series();
        let analyzer = Analyzer::new(&cfg);
        assert_eq!(
            analyzer.analyze(&series, 0).unwrap(),
            analyzer.analyze(&series, 0).unwrap()
        );
    }
}
