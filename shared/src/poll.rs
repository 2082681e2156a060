//! Client convergence loop.
//!
//! Repeatedly reads a lead record until a terminal status is observed. The
//! loop is sequential (lookups never overlap), bounded for the not-found
//! race right after submission, and cancellable at every await point so a
//! discarded consumer leaves no orphaned polling behind.
//!
//! Works over any [`LeadStore`], so the polling transport can be swapped for
//! a push channel without touching the status state machine.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::models::Lead;
use crate::store::LeadStore;
use crate::Result;

/// Tuning knobs for the convergence loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Fixed delay between lookups.
    pub interval: Duration,
    /// How many extra lookups to allow before a missing record is terminal.
    /// Covers the race between insert and first read after submission.
    pub not_found_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            not_found_retries: 5,
        }
    }
}

/// How the convergence loop ended.
#[derive(Debug)]
pub enum WatchOutcome {
    /// The lead reached `completed` or `failed`.
    Terminal(Lead),
    /// The record never appeared within the bounded retries.
    NotFound,
    /// The caller cancelled the watch.
    Cancelled,
}

/// Poll the store by slug until the lead reaches a terminal status, the
/// not-found budget runs out, or `cancel` fires.
///
/// The first lookup is immediate; subsequent lookups are one `interval`
/// apart, so the loop stops within one interval of the terminal transition.
pub async fn watch_lead(
    store: &dyn LeadStore,
    slug: &str,
    config: PollConfig,
    cancel: CancellationToken,
) -> Result<WatchOutcome> {
    let mut not_found_left = config.not_found_retries;

    loop {
        let lookup = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(WatchOutcome::Cancelled),
            result = store.get_by_slug(slug) => result?,
        };

        match lookup {
            Some(lead) if lead.status.is_terminal() => {
                info!(slug, status = %lead.status, "lead reached terminal status");
                return Ok(WatchOutcome::Terminal(lead));
            }
            Some(_) => {
                debug!(slug, "lead still processing");
            }
            None if not_found_left == 0 => {
                info!(slug, "lead not found after bounded retries");
                return Ok(WatchOutcome::NotFound);
            }
            None => {
                debug!(slug, retries_left = not_found_left, "lead not found yet, retrying");
                not_found_left -= 1;
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(WatchOutcome::Cancelled),
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}
