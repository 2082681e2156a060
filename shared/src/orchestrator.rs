//! Analysis orchestrator: drives one analysis job from trigger to terminal state.
//!
//! Invoked once per submission. The reasoning service is called at most once
//! per invocation; retries belong to the caller. The single commit is a
//! guarded update, so duplicate triggers can never clobber a completed
//! analysis.

use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{analysis_prompt, normalize_analysis, placeholder_analysis};
use crate::models::{Analysis, LeadStatus};
use crate::reasoning::ReasoningService;
use crate::store::LeadStore;
use crate::{Error, Result};

/// Run the analysis job for one lead.
///
/// Terminal-state handling:
/// - already `completed`: returns the stored analysis without any write
/// - already `failed`: refuses to re-run (terminal states never revert)
/// - reasoning service absent or unreachable: commits the deterministic
///   placeholder so the lead still reaches a terminal-looking state
/// - malformed reasoning output: marks the lead `failed` and propagates
///   [`Error::MalformedAnalysis`] with the raw text
pub async fn run_analysis(
    store: &dyn LeadStore,
    reasoning: Option<&dyn ReasoningService>,
    lead_id: Uuid,
    document_url: &str,
) -> Result<Analysis> {
    let lead = store
        .get(lead_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("lead {lead_id}")))?;

    match lead.status {
        LeadStatus::Completed => {
            info!(%lead_id, "analysis already completed, skipping");
            return lead
                .analysis
                .ok_or_else(|| Error::Internal(format!("completed lead {lead_id} has no analysis")));
        }
        LeadStatus::Failed => {
            return Err(Error::Validation(format!(
                "lead {lead_id} already failed: {}",
                lead.error_detail.as_deref().unwrap_or("unknown reason")
            )));
        }
        LeadStatus::Processing => {}
    }

    let analysis = match reasoning {
        None => {
            warn!(%lead_id, "no reasoning service configured, using placeholder analysis");
            placeholder_analysis()
        }
        Some(service) => {
            match service.generate(&analysis_prompt(document_url), true).await {
                Ok(raw) => match normalize_analysis(&raw) {
                    Ok(analysis) => analysis,
                    Err(err) => {
                        warn!(%lead_id, raw_len = raw.len(), "reasoning output failed normalization");
                        store
                            .fail(lead_id, "reasoning service returned an unreadable analysis")
                            .await?;
                        return Err(err);
                    }
                },
                Err(Error::ReasoningUnavailable(reason)) => {
                    warn!(%lead_id, %reason, "reasoning service unavailable, using placeholder analysis");
                    placeholder_analysis()
                }
                Err(other) => return Err(other),
            }
        }
    };

    if store.complete(lead_id, &analysis).await? {
        info!(%lead_id, "analysis committed");
        return Ok(analysis);
    }

    // Lost the guarded update: some other trigger reached a terminal state
    // first. Surface whatever it wrote.
    let current = store
        .get(lead_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("lead {lead_id}")))?;
    match current.analysis {
        Some(existing) => {
            info!(%lead_id, "lost completion race, returning existing analysis");
            Ok(existing)
        }
        None => Err(Error::Validation(format!(
            "lead {lead_id} reached a terminal state without an analysis"
        ))),
    }
}
