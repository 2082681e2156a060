//! Asynchronous dispatch of the analysis job.
//!
//! Submission and analysis run in separate Lambdas; the submit handler fires
//! the analyze function with an event-type invoke and returns immediately,
//! leaving the lead in `processing` until the job commits a terminal state.

use aws_sdk_lambda::types::InvocationType;
use aws_sdk_lambda::Client as LambdaClient;
use tracing::info;
use uuid::Uuid;

use crate::models::AnalyzeRequest;
use crate::{Error, Result};

/// Client for triggering the analysis Lambda.
pub struct AnalysisDispatcher {
    lambda_client: LambdaClient,
    analyze_function_name: String,
}

impl AnalysisDispatcher {
    pub fn new(lambda_client: LambdaClient, analyze_function_name: String) -> Self {
        Self {
            lambda_client,
            analyze_function_name,
        }
    }

    /// Fire-and-forget trigger of the analysis job for one lead.
    pub async fn dispatch(&self, lead_id: Uuid, document_url: &str) -> Result<()> {
        let payload = serde_json::to_vec(&AnalyzeRequest {
            lead_id,
            document_url: document_url.to_string(),
        })
        .map_err(Error::Serialization)?;

        self.lambda_client
            .invoke()
            .function_name(&self.analyze_function_name)
            .invocation_type(InvocationType::Event)
            .payload(aws_sdk_lambda::primitives::Blob::new(payload))
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to dispatch analysis job: {e}")))?;

        info!(%lead_id, "analysis job dispatched");
        Ok(())
    }
}
