//! Leaderboard aggregation and re-pagination.
//!
//! The stats API pages its `top` listing with its own, unknown page size and
//! never reports a total. The aggregator walks those pages in order until the
//! upstream runs dry, then cuts the concatenated list into pages of our own
//! size.

use crate::config::LeaderboardConfig;
use crate::models::{AggregatedResult, LeaderboardEntry, OutputPage, SortKey, StopReason};
use crate::upstream::{StatsSource, UpstreamError, UpstreamPage};
use indicatif::ProgressBar;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Bounds on a single aggregation run.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum number of upstream pages to request.
    pub max_upstream_pages: u32,
    /// Wall-clock budget for the whole run.
    pub deadline: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_upstream_pages: 1000,
            deadline: Some(Duration::from_secs(60)),
        }
    }
}

impl From<&LeaderboardConfig> for AggregatorConfig {
    fn from(config: &LeaderboardConfig) -> Self {
        Self {
            max_upstream_pages: config.max_upstream_pages,
            deadline: (config.deadline_seconds > 0)
                .then(|| Duration::from_secs(config.deadline_seconds)),
        }
    }
}

/// Fetches every upstream page for a sort key and re-pages the result.
pub struct Aggregator<'a> {
    source: &'a dyn StatsSource,
    config: AggregatorConfig,
    progress: Option<ProgressBar>,
}

impl<'a> Aggregator<'a> {
    pub fn new(source: &'a dyn StatsSource, config: AggregatorConfig) -> Self {
        Self {
            source,
            config,
            progress: None,
        }
    }

    /// Report fetched pages on a spinner.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Request upstream pages 1, 2, 3, ... until one of them is empty or
    /// answers with a non-success status, or a configured bound is hit.
    ///
    /// An upstream with exactly `max_upstream_pages` pages still ends as
    /// `Exhausted`: the page after the limit is requested and only its
    /// entries are dropped when it is not empty.
    ///
    /// Entries keep upstream order. Whatever was collected before the loop
    /// stopped is returned; only transport failures are errors.
    pub async fn fetch_all_upstream_pages(
        &self,
        sort: SortKey,
    ) -> Result<AggregatedResult, UpstreamError> {
        let started = Instant::now();
        let mut entries: Vec<LeaderboardEntry> = Vec::new();
        let mut upstream_pages = 0u32;

        let stop_reason = loop {
            // Past the limit one more page is requested, only to tell a
            // finished upstream from a truncated one.
            let past_limit = upstream_pages >= self.config.max_upstream_pages;
            let page = upstream_pages.saturating_add(1);
            debug!("Fetching upstream page {} (sort={})", page, sort);

            let fetch = self.source.fetch_top_page(sort, page);
            let response = match self.config.deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_sub(started.elapsed());
                    match tokio::time::timeout(remaining, fetch).await {
                        Ok(response) => response?,
                        Err(_) => {
                            warn!(
                                "Fetch deadline of {:?} exceeded at upstream page {} (sort={})",
                                deadline, page, sort
                            );
                            break StopReason::Deadline;
                        }
                    }
                }
                None => fetch.await?,
            };

            match response {
                UpstreamPage::Unavailable(status) => {
                    warn!(
                        "Upstream page {} answered {}; keeping {} entries collected so far",
                        page,
                        status,
                        entries.len()
                    );
                    break StopReason::UpstreamUnavailable(status.as_u16());
                }
                UpstreamPage::Entries(batch) if batch.is_empty() => {
                    debug!("Upstream page {} is empty, end of data", page);
                    break StopReason::Exhausted;
                }
                UpstreamPage::Entries(_) if past_limit => {
                    warn!(
                        "Stopping after {} upstream pages for sort={} (page limit)",
                        upstream_pages, sort
                    );
                    break StopReason::PageLimit;
                }
                UpstreamPage::Entries(batch) => {
                    upstream_pages += 1;
                    entries.extend(batch);

                    if let Some(ref pb) = self.progress {
                        pb.set_message(format!(
                            "{} players from {} upstream pages",
                            entries.len(),
                            upstream_pages
                        ));
                    }
                }
            }
        };

        info!(
            "Aggregated {} players from {} upstream pages (sort={}, {}) in {:.2}s",
            entries.len(),
            upstream_pages,
            sort,
            stop_reason,
            started.elapsed().as_secs_f64()
        );

        Ok(AggregatedResult {
            entries,
            upstream_pages,
            stop_reason,
        })
    }

    /// Aggregate the whole leaderboard and return one page of it.
    pub async fn get_leaderboard_page(
        &self,
        sort: SortKey,
        requested_page: u32,
        page_size: usize,
    ) -> Result<OutputPage, UpstreamError> {
        let aggregated = self.fetch_all_upstream_pages(sort).await?;

        let mut page = compute_output_page(&aggregated.entries, requested_page, page_size);
        page.complete = aggregated.is_complete();
        Ok(page)
    }
}

/// Cut one page out of the aggregated entries.
///
/// The requested page is clamped to the last page. With no entries at all
/// there are zero pages and the requested number is passed through with an
/// empty slice. The slice never holds more than `page_size` entries.
pub fn compute_output_page(
    entries: &[LeaderboardEntry],
    requested_page: u32,
    page_size: usize,
) -> OutputPage {
    let total_players = entries.len();
    let total_pages = if page_size == 0 {
        0
    } else {
        u32::try_from(total_players.div_ceil(page_size)).unwrap_or(u32::MAX)
    };

    let page = if total_pages > 0 {
        requested_page.min(total_pages)
    } else {
        requested_page
    };

    let start = (page.saturating_sub(1) as usize)
        .saturating_mul(page_size)
        .min(total_players);
    let end = (page as usize)
        .saturating_mul(page_size)
        .min(total_players)
        .max(start);

    OutputPage {
        page,
        total_pages,
        total_players,
        complete: true,
        leaderboard: entries[start..end].to_vec(),
        page_size,
    }
}
