//! Configuration management for Lambda functions.

use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database host
    pub db_host: String,
    /// Database name
    pub db_name: String,
    /// ARN of the secret containing database credentials
    pub db_secret_arn: String,
    /// AWS region
    pub aws_region: String,
    /// S3 bucket holding uploaded bills
    pub document_bucket: String,
    /// Name of the Lambda that runs the analysis job
    pub analyze_function_name: String,
    /// Reasoning service API key; absent means degraded mode
    pub gemini_api_key: Option<String>,
    /// Reasoning model identifier
    pub gemini_model: String,
    /// Reasoning endpoint base URL (overridable for testing)
    pub gemini_base_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            db_host: env::var("DATABASE_HOST")?,
            db_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "zero_bill".to_string()),
            db_secret_arn: env::var("DATABASE_URL_SECRET_ARN")?,
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            document_bucket: env::var("DOCUMENT_BUCKET")
                .unwrap_or_else(|_| "zero-bill-documents".to_string()),
            analyze_function_name: env::var("ANALYZE_FUNCTION_NAME")
                .unwrap_or_else(|_| "zero-bill-analyze".to_string()),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| crate::reasoning::DEFAULT_MODEL.to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| crate::reasoning::DEFAULT_BASE_URL.to_string()),
        })
    }
}
