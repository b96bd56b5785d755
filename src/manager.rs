use crate::analysis::{Analyzer, Report};
use crate::config::Config;
use crate::series::read_series;
use anyhow::{Context, Result};
use glob::glob;
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

/// Drives the analysis of every table in a data directory.
pub struct Manager {
    data_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        let config_file = data_dir.join("config.toml");
        let cfg = if config_file.is_file() {
            Config::from_file(&config_file).context("failed to construct cfg")?
        } else {
            log::info!("{config_file:?} not found, using defaults");
            Config::default()
        };
        log::debug!("{cfg:#?}");

        Ok(Self { data_dir, cfg })
    }

    pub fn analyze_data(&self) -> Result<()> {
        let files = self.data_files().context("failed to list data files")?;
        if files.is_empty() {
            log::warn!("no data files found in {:?}", self.data_dir);
        }

        let analyzer = Analyzer::new(&self.cfg);
        for file in files {
            let report = self
                .analyze_file(&analyzer, &file)
                .with_context(|| format!("failed to analyze {file:?}"))?;

            let results_dir = self.results_dir(&file)?;
            report
                .save(&results_dir)
                .context("failed to save results")?;
            log::info!("saved results of {file:?} to {results_dir:?}");
        }

        Ok(())
    }

    fn analyze_file(&self, analyzer: &Analyzer<'_>, file: &Path) -> Result<Report> {
        let reader = BufReader::new(
            File::open(file).with_context(|| format!("failed to open {file:?}"))?,
        );
        let (series, rejected) = read_series(
            reader,
            self.cfg.delimiter(),
            &self.cfg.row_parser(),
            self.cfg.channel_names(),
        )?;
        log::info!(
            "read {file:?}: {} rows accepted, {} rejected",
            series.len(),
            rejected.len()
        );

        analyzer.analyze(&series, rejected.len())
    }

    pub fn clean_results(&self) -> Result<()> {
        let results_root = self.data_dir.join("results");
        if !results_root.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&results_root)
            .with_context(|| format!("failed to remove {results_root:?}"))?;
        log::info!("removed {results_root:?}");
        Ok(())
    }

    fn data_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.data_dir.join("*.csv");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut files: Vec<_> = glob(pattern)
            .context("failed to glob data files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    fn results_dir(&self, file: &Path) -> Result<PathBuf> {
        let stem = file
            .file_stem()
            .with_context(|| format!("{file:?} has no file name"))?;
        Ok(self.data_dir.join("results").join(stem))
    }
}
