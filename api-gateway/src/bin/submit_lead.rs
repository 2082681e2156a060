//! Submit Lead Lambda - Handles the bill submission pipeline.
//!
//! Uploads the bill document, creates the lead record in `processing`, and
//! dispatches the analysis job asynchronously. If the upload fails, no lead
//! record is created; if dispatch fails, the record stays `processing` so
//! the job can be re-triggered.

use base64::Engine;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::{Deserialize, Serialize};
use shared::http::{error_response, json_response};
use shared::models::new_slug;
use shared::parse_body;
use shared::{
    get_database_credentials, AnalysisDispatcher, Config, DocumentStore, Lead, LeadStore,
    PgLeadStore,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use validator::Validate;

/// Submission payload: contact details plus the bill document.
#[derive(Debug, Deserialize, Validate)]
struct SubmitLeadRequest {
    #[validate(length(min = 2, message = "Name is required"))]
    name: String,
    #[validate(email(message = "Invalid email address"))]
    email: String,
    #[validate(length(min = 8, message = "Phone number is required"))]
    phone: String,
    /// Base64-encoded document bytes.
    document_base64: String,
    /// MIME type of the document; defaults to PDF.
    content_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitLeadResponse {
    lead_id: Uuid,
    slug: String,
    document_url: String,
}

/// Application state shared across requests.
struct AppState {
    store: PgLeadStore,
    documents: DocumentStore,
    dispatcher: AnalysisDispatcher,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env().map_err(|e| format!("Missing configuration: {e}"))?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);
        let s3_client = aws_sdk_s3::Client::new(&aws_config);
        let lambda_client = aws_sdk_lambda::Client::new(&aws_config);

        let creds = get_database_credentials(&secrets_client, &config.db_secret_arn).await?;
        let pool = shared::db::create_pool(&config, &creds).await?;

        Ok(Self {
            store: PgLeadStore::new(pool),
            documents: DocumentStore::new(
                s3_client,
                config.document_bucket.clone(),
                config.aws_region.clone(),
            ),
            dispatcher: AnalysisDispatcher::new(lambda_client, config.analyze_function_name),
        })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let request: SubmitLeadRequest = parse_body!(event.body());

    if let Err(errors) = request.validate() {
        return error_response(400, errors.to_string());
    }

    let bytes = match base64::engine::general_purpose::STANDARD.decode(&request.document_base64) {
        Ok(bytes) => bytes,
        Err(_) => return error_response(400, "document_base64 is not valid base64"),
    };
    let content_type = request.content_type.as_deref().unwrap_or("application/pdf");

    // Upload precedes record creation: a rejected upload leaves no lead behind.
    let document_url = match state.documents.put_document(content_type, bytes).await {
        Ok(url) => url,
        Err(e) => {
            error!("document upload failed: {e}");
            return error_response(e.status_code(), e.to_string());
        }
    };

    let lead = Lead::new(
        request.name,
        request.email,
        request.phone,
        document_url.clone(),
        new_slug(),
    );
    if let Err(e) = state.store.insert(&lead).await {
        error!(lead_id = %lead.id, "failed to insert lead: {e}");
        return error_response(e.status_code(), e.to_string());
    }

    info!(lead_id = %lead.id, slug = %lead.slug, "lead created");

    // The record stays `processing` if dispatch fails, so the job can be
    // re-triggered against the same lead.
    if let Err(e) = state.dispatcher.dispatch(lead.id, &document_url).await {
        error!(lead_id = %lead.id, "failed to dispatch analysis job: {e}");
        return error_response(502, "Submission stored but analysis could not be started");
    }

    json_response(
        201,
        &SubmitLeadResponse {
            lead_id: lead.id,
            slug: lead.slug,
            document_url,
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
