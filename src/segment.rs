//! Trend of a channel over the whole series and over consecutive buckets.
//!
//! Buckets are formed by row position, not by calendar decade: a series
//! starting in 1887 yields buckets labelled `1887s`, `1897s` and so on, and
//! the last bucket may hold fewer rows than the rest.

use crate::error::EngineResult;
use crate::regression::{RegressionResult, fit};
use crate::series::{Series, points_of};
use std::num::NonZeroUsize;

pub const DEFAULT_BUCKET_SIZE: NonZeroUsize = NonZeroUsize::new(10).unwrap();

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    /// Year of the first row in the bucket.
    pub start_year: i32,
    pub n_rows: usize,
    /// Points that entered the regression (rows with a reading).
    pub n_points: usize,
    pub fit: EngineResult<RegressionResult>,
}

impl Bucket {
    pub fn label(&self) -> String {
        format!("{}s", self.start_year)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub overall: EngineResult<RegressionResult>,
    pub buckets: Vec<Bucket>,
}

/// Regress one channel against year, overall and per bucket.
///
/// A failing bucket does not affect the others or the overall fit.
pub fn segment(series: &Series, i_channel: usize, bucket_size: NonZeroUsize) -> Segmentation {
    let (xs, ys) = series.points(i_channel);
    let overall = fit(&xs, &ys);

    let buckets = series
        .rows()
        .chunks(bucket_size.get())
        .map(|rows| {
            let (xs, ys) = points_of(rows, i_channel);
            let bucket = Bucket {
                start_year: rows[0].year,
                n_rows: rows.len(),
                n_points: xs.len(),
                fit: fit(&xs, &ys),
            };
            log::debug!("bucket {}: {:?}", bucket.label(), bucket.fit);
            bucket
        })
        .collect();

    Segmentation { overall, buckets }
}
