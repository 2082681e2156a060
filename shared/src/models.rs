//! Shared data models: leads, analyses, conversation turns, and the wire payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

/// Lifecycle state of a lead's analysis job.
///
/// The only legal transitions are `Processing -> Completed` and
/// `Processing -> Failed`. Terminal states never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Processing,
    Completed,
    Failed,
}

impl LeadStatus {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Completed | LeadStatus::Failed)
    }

    /// Whether the automaton permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: LeadStatus) -> bool {
        matches!(
            (self, next),
            (LeadStatus::Processing, LeadStatus::Completed)
                | (LeadStatus::Processing, LeadStatus::Failed)
        )
    }

    /// Database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Processing => "processing",
            LeadStatus::Completed => "completed",
            LeadStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "processing" => Ok(LeadStatus::Processing),
            "completed" => Ok(LeadStatus::Completed),
            "failed" => Ok(LeadStatus::Failed),
            other => Err(Error::Validation(format!("unknown lead status: {other}"))),
        }
    }
}

/// Structured savings/sizing recommendation produced for a lead.
///
/// Field names are the wire contract; optional fields are omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Current monthly bill average in dollars.
    pub monthly_avg: f64,
    /// Daily consumption in kWh.
    pub daily_kwh: f64,
    /// Recommended hardware sizing, free text.
    pub zero_bill_system: String,
    /// Why this specific sizing is needed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub necessity_explanation: Option<String>,
    /// Projected 10-year cost of doing nothing.
    pub cost_10_years: f64,
    /// Usage pattern summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_profile: Option<String>,
    /// Estimated monthly savings in dollars.
    pub potential_savings: f64,
    /// Years to payback.
    pub roi_years: f64,
}

/// One submitted analysis request, keyed publicly by `slug`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Public retrieval URL of the uploaded bill. Set once at creation.
    pub document_url: String,
    /// URL-safe public lookup key. Uniqueness is enforced by the store.
    pub slug: String,
    pub status: LeadStatus,
    pub analysis: Option<Analysis>,
    /// Short failure summary, set only when `status` is `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Create a fresh lead in the `processing` state.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        document_url: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            document_url: document_url.into(),
            slug: slug.into(),
            status: LeadStatus::Processing,
            analysis: None,
            error_detail: None,
            created_at: Utc::now(),
        }
    }

    /// Attach an analysis and move to `completed`.
    ///
    /// Guarded: rejects the transition unless the lead is still `processing`,
    /// so a completed analysis can never be overwritten.
    pub fn complete(&mut self, analysis: Analysis) -> Result<()> {
        if !self.status.can_transition_to(LeadStatus::Completed) {
            return Err(Error::Validation(format!(
                "illegal transition {} -> completed for lead {}",
                self.status, self.id
            )));
        }
        self.analysis = Some(analysis);
        self.status = LeadStatus::Completed;
        Ok(())
    }

    /// Record a failure and move to `failed`. The analysis stays null.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        if !self.status.can_transition_to(LeadStatus::Failed) {
            return Err(Error::Validation(format!(
                "illegal transition {} -> failed for lead {}",
                self.status, self.id
            )));
        }
        self.error_detail = Some(reason.into());
        self.status = LeadStatus::Failed;
        Ok(())
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of the chat transcript. The transcript is transient and owned by
/// the caller; the assembler never stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Analysis job invocation payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub lead_id: Uuid,
    pub document_url: String,
}

/// Analysis job success payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: Analysis,
}

/// Chat invocation payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ConversationTurn>,
    pub lead_id: Uuid,
}

/// Chat reply payload. Always returned with a 200, even in degraded mode.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
}

/// Generate a short URL-safe slug for a lead's public page.
///
/// Collisions are statistically negligible but not guaranteed; the store's
/// unique index is the backstop.
pub fn new_slug() -> String {
    let id = Uuid::new_v4();
    id.simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_analysis() -> Analysis {
        Analysis {
            monthly_avg: 245.0,
            daily_kwh: 22.5,
            zero_bill_system: "6.6kW Solar + 10kWh Battery".into(),
            necessity_explanation: None,
            cost_10_years: 29400.0,
            energy_profile: Some("Evening Peaking".into()),
            potential_savings: 185.0,
            roi_years: 4.2,
        }
    }

    #[test]
    fn test_status_transitions() {
        assert!(LeadStatus::Processing.can_transition_to(LeadStatus::Completed));
        assert!(LeadStatus::Processing.can_transition_to(LeadStatus::Failed));
        assert!(!LeadStatus::Completed.can_transition_to(LeadStatus::Processing));
        assert!(!LeadStatus::Completed.can_transition_to(LeadStatus::Failed));
        assert!(!LeadStatus::Failed.can_transition_to(LeadStatus::Completed));
        assert!(!LeadStatus::Processing.can_transition_to(LeadStatus::Processing));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!LeadStatus::Processing.is_terminal());
        assert!(LeadStatus::Completed.is_terminal());
        assert!(LeadStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            LeadStatus::Processing,
            LeadStatus::Completed,
            LeadStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<LeadStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn test_complete_attaches_analysis_exactly_once() {
        let mut lead = Lead::new("Ada", "ada@example.com", "+61400000000", "https://x", "ab12cd34");
        assert_eq!(lead.status, LeadStatus::Processing);
        assert!(lead.analysis.is_none());

        lead.complete(sample_analysis()).unwrap();
        assert_eq!(lead.status, LeadStatus::Completed);
        assert!(lead.analysis.is_some());

        // A second completion must not clobber the stored analysis.
        let err = lead.complete(sample_analysis()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_fail_leaves_analysis_null() {
        let mut lead = Lead::new("Ada", "ada@example.com", "+61400000000", "https://x", "ab12cd34");
        lead.fail("reasoning service returned garbage").unwrap();
        assert_eq!(lead.status, LeadStatus::Failed);
        assert!(lead.analysis.is_none());
        assert!(lead.error_detail.is_some());

        assert!(lead.complete(sample_analysis()).is_err());
        assert!(lead.fail("again").is_err());
    }

    #[test]
    fn test_invariant_analysis_iff_completed() {
        let mut completed = Lead::new("A", "a@b.c", "1", "https://x", "s1s1s1s1");
        completed.complete(sample_analysis()).unwrap();
        let mut failed = Lead::new("B", "b@b.c", "2", "https://x", "s2s2s2s2");
        failed.fail("nope").unwrap();
        let processing = Lead::new("C", "c@b.c", "3", "https://x", "s3s3s3s3");

        for lead in [&completed, &failed, &processing] {
            assert_eq!(
                lead.analysis.is_some(),
                lead.status == LeadStatus::Completed
            );
        }
    }

    #[test]
    fn test_slug_shape() {
        let slug = new_slug();
        assert_eq!(slug.len(), 8);
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(new_slug(), new_slug());
    }

    #[test]
    fn test_analysis_wire_names() {
        let json = serde_json::to_value(sample_analysis()).unwrap();
        let obj = json.as_object().unwrap();
        for field in [
            "monthly_avg",
            "daily_kwh",
            "zero_bill_system",
            "cost_10_years",
            "potential_savings",
            "roi_years",
        ] {
            assert!(obj.contains_key(field), "missing field {field}");
        }
        // Optional fields absent when None.
        assert!(!obj.contains_key("necessity_explanation"));
    }

    #[test]
    fn test_turn_roles_serialize_lowercase() {
        let turn = ConversationTurn::user("hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains(r#""role":"user""#));
    }
}
