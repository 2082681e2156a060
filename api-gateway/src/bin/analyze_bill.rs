//! Analyze Bill Lambda - Runs the analysis job for one lead.
//!
//! Invoked asynchronously by the submit Lambda (or re-triggered manually).
//! Drives the reasoning service, normalizes its output into the canonical
//! Analysis schema, and commits the terminal status to the lead record.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{error_response, json_response};
use shared::parse_body;
use shared::reasoning::ReasoningService;
use shared::{
    get_database_credentials, run_analysis, AnalyzeRequest, AnalyzeResponse, Config, GeminiClient,
    PgLeadStore,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState {
    store: PgLeadStore,
    reasoning: Option<GeminiClient>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env().map_err(|e| format!("Missing configuration: {e}"))?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);

        let creds = get_database_credentials(&secrets_client, &config.db_secret_arn).await?;
        let pool = shared::db::create_pool(&config, &creds).await?;

        let reasoning = GeminiClient::from_config(&config);
        if reasoning.is_none() {
            info!("no reasoning API key configured, analysis will run in degraded mode");
        }

        Ok(Self {
            store: PgLeadStore::new(pool),
            reasoning,
        })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let request: AnalyzeRequest = parse_body!(event.body());

    info!(lead_id = %request.lead_id, "processing analysis job");

    let reasoning = state.reasoning.as_ref().map(|c| c as &dyn ReasoningService);
    match run_analysis(&state.store, reasoning, request.lead_id, &request.document_url).await {
        Ok(analysis) => json_response(
            200,
            &AnalyzeResponse {
                success: true,
                analysis,
            },
        ),
        Err(e) => {
            error!(lead_id = %request.lead_id, "analysis job failed: {e}");
            error_response(e.status_code(), e.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
