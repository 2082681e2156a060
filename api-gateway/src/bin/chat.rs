//! Chat Lambda - Produces one assistant reply per user message.
//!
//! The lead's analysis (or a pending notice) grounds the prompt. The chat
//! surface never sees a provider error: internal failures come back as a
//! 200 with the apology turn substituted.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::json_response;
use shared::parse_body;
use shared::reasoning::ReasoningService;
use shared::{
    assemble_reply, get_database_credentials, ChatRequest, ChatResponse, Config, GeminiClient,
    PgLeadStore,
};
use std::sync::Arc;
use tracing::info;
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

        Ok(Self {
            store: PgLeadStore::new(pool),
            reasoning: GeminiClient::from_config(&config),
        })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let request: ChatRequest = parse_body!(event.body());

    info!(lead_id = %request.lead_id, turns = request.messages.len(), "processing chat turn");

    let reasoning = state.reasoning.as_ref().map(|c| c as &dyn ReasoningService);
    let reply = assemble_reply(&state.store, reasoning, request.lead_id, &request.messages).await;

    json_response(
        200,
        &ChatResponse {
            content: reply.content,
        },
    )
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
