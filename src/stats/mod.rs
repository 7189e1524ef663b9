//! Comparative statistics over a user's ratings export.
//!
//! Every row is resolved through the [`ResolutionCache`], rows without
//! usable public data are dropped, and the remaining [`MovieStat`]s are
//! ranked by a metric. Rows are resolved with bounded parallelism but the
//! result never depends on completion order.

mod models;

pub use models::*;

use crate::metrics::record_skipped_row;
use crate::movie_store::MovieKey;
use crate::resolver::{Resolution, ResolutionCache, ResolveError};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reference year for vote count normalisation.
pub const DEFAULT_CURRENT_YEAR: i32 = 2025;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Length of the top and bottom rankings.
pub const RANKING_SIZE: usize = 5;

/// What to do with a row whose external lookup failed or could not be
/// attempted because no external source is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceErrorPolicy {
    /// Log the failure and leave the row out.
    #[default]
    Skip,
    /// Fail the whole analysis.
    Abort,
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Analysis cancelled")]
    Cancelled,

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Resolved rows of one batch, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBatch {
    pub stats: Vec<MovieStat>,
    pub skipped: usize,
}

pub struct StatisticsEngine {
    cache: Arc<ResolutionCache>,
    current_year: i32,
    concurrency: usize,
    on_source_error: SourceErrorPolicy,
}

impl StatisticsEngine {
    pub fn new(cache: Arc<ResolutionCache>) -> Self {
        Self {
            cache,
            current_year: DEFAULT_CURRENT_YEAR,
            concurrency: DEFAULT_CONCURRENCY,
            on_source_error: SourceErrorPolicy::default(),
        }
    }

    pub fn with_current_year(mut self, current_year: i32) -> Self {
        self.current_year = current_year;
        self
    }

    /// Number of rows resolved at the same time. Values below 1 mean 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_source_error_policy(mut self, policy: SourceErrorPolicy) -> Self {
        self.on_source_error = policy;
        self
    }

    /// Resolves `rows` and ranks them by `metric`.
    ///
    /// Cancellation is checked before each row; a cancelled run returns
    /// [`AnalyzeError::Cancelled`] and no partial summary.
    pub async fn analyze<F>(
        &self,
        rows: &[RatingRow],
        metric: F,
        cancel: &CancellationToken,
    ) -> Result<AggregateSummary, AnalyzeError>
    where
        F: Fn(&MovieStat) -> f64,
    {
        let batch = self.resolve_rows(rows, cancel).await?;
        Ok(summarize(&batch.stats, metric))
    }

    /// Resolves `rows` once and builds both the rating and obscurity rankings.
    pub async fn report(
        &self,
        rows: &[RatingRow],
        cancel: &CancellationToken,
    ) -> Result<StatsReport, AnalyzeError> {
        let batch = self.resolve_rows(rows, cancel).await?;
        let rating = summarize(&batch.stats, |s| Metric::RatingDifference.value(s));
        let obscurity = summarize(&batch.stats, |s| Metric::Popularity.value(s));

        info!(
            "Analyzed {} movies ({} skipped)",
            batch.stats.len(),
            batch.skipped
        );
        Ok(StatsReport::new(
            rating,
            obscurity,
            batch.stats.len(),
            batch.skipped,
        ))
    }

    pub async fn resolve_rows(
        &self,
        rows: &[RatingRow],
        cancel: &CancellationToken,
    ) -> Result<ResolvedBatch, AnalyzeError> {
        let mut resolved: Vec<(usize, Option<MovieStat>)> = stream::iter(rows.iter().enumerate())
            .map(|(index, row)| async move {
                if cancel.is_cancelled() {
                    return Err(AnalyzeError::Cancelled);
                }
                let stat = self.resolve_row(row).await?;
                Ok((index, stat))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        if cancel.is_cancelled() {
            return Err(AnalyzeError::Cancelled);
        }

        resolved.sort_by_key(|(index, _)| *index);
        let total = resolved.len();
        let stats: Vec<MovieStat> = resolved.into_iter().filter_map(|(_, stat)| stat).collect();
        let skipped = total - stats.len();

        Ok(ResolvedBatch { stats, skipped })
    }

    async fn resolve_row(&self, row: &RatingRow) -> Result<Option<MovieStat>, AnalyzeError> {
        let key = MovieKey::new(row.title.clone(), row.year);

        match self.cache.resolve(&key).await {
            Ok(Resolution::Found { record, .. }) => {
                if record.is_usable() {
                    Ok(Some(MovieStat::new(row, &record, self.current_year)))
                } else {
                    debug!("Skipping {}: incomplete public data", key);
                    record_skipped_row("unusable");
                    Ok(None)
                }
            }
            Ok(Resolution::NotFound) => {
                debug!("Skipping {}: not found", key);
                record_skipped_row("not_found");
                Ok(None)
            }
            Ok(Resolution::Ignored) => {
                debug!("Skipping {}: ignored by override", key);
                record_skipped_row("ignored");
                Ok(None)
            }
            Err(ResolveError::InvalidKey(_)) => {
                warn!("Skipping row with blank title (year {})", row.year);
                record_skipped_row("invalid_key");
                Ok(None)
            }
            Err(ResolveError::SourceUnavailable(e))
                if self.on_source_error == SourceErrorPolicy::Skip =>
            {
                warn!("Skipping {}: {}", key, e);
                record_skipped_row("source_unavailable");
                Ok(None)
            }
            // offline runs: anything not held locally is left out
            Err(ResolveError::SourceNotConfigured)
                if self.on_source_error == SourceErrorPolicy::Skip =>
            {
                debug!("Skipping {}: not held locally and no external source", key);
                record_skipped_row("source_not_configured");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Ranks `stats` by `metric`.
///
/// The sort is stable, so equal metric values keep their input order in
/// `top5`. `bottom5` reads the descending order from its tail.
pub fn summarize<F>(stats: &[MovieStat], metric: F) -> AggregateSummary
where
    F: Fn(&MovieStat) -> f64,
{
    let mut scored: Vec<(f64, &MovieStat)> = stats.iter().map(|s| (metric(s), s)).collect();

    let average_metric = if scored.is_empty() {
        0.0
    } else {
        scored.iter().map(|(value, _)| value).sum::<f64>() / scored.len() as f64
    };

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let top5 = scored
        .iter()
        .take(RANKING_SIZE)
        .map(|(_, stat)| (*stat).clone())
        .collect();
    let bottom5 = scored
        .iter()
        .rev()
        .take(RANKING_SIZE)
        .map(|(_, stat)| (*stat).clone())
        .collect();

    AggregateSummary {
        average_metric,
        top5,
        bottom5,
    }
}
