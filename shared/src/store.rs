//! Lead record store.
//!
//! The trait is the seam between the state machine and the transport: the
//! poller and orchestrator only see [`LeadStore`], so the Postgres backend
//! can be swapped (or faked in tests) without touching either.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Analysis, Lead, LeadStatus};
use crate::{Error, Result};

/// Read/update primitives over the canonical lead records.
///
/// Updates are atomic per key; no cross-key transactions are assumed.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Insert a freshly submitted lead. Fails on slug collision.
    async fn insert(&self, lead: &Lead) -> Result<()>;

    /// Fetch one lead by id.
    async fn get(&self, id: Uuid) -> Result<Option<Lead>>;

    /// Fetch one lead by its public slug.
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Lead>>;

    /// Attach an analysis and mark the lead completed, guarded on the lead
    /// still being `processing`. Returns whether a row actually changed;
    /// `false` means another writer already reached a terminal state.
    async fn complete(&self, id: Uuid, analysis: &Analysis) -> Result<bool>;

    /// Mark the lead failed with a short reason, same guard as [`complete`].
    ///
    /// [`complete`]: LeadStore::complete
    async fn fail(&self, id: Uuid, reason: &str) -> Result<bool>;
}

/// Postgres-backed lead store.
pub struct PgLeadStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    document_url: String,
    slug: String,
    status: String,
    analysis: Option<serde_json::Value>,
    error_detail: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = Error;

    fn try_from(row: LeadRow) -> Result<Lead> {
        let analysis = row
            .analysis
            .map(serde_json::from_value::<Analysis>)
            .transpose()?;
        Ok(Lead {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            document_url: row.document_url,
            slug: row.slug,
            status: row.status.parse::<LeadStatus>()?,
            analysis,
            error_detail: row.error_detail,
            created_at: row.created_at,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, name, email, phone, document_url, slug, status, analysis, error_detail, created_at";

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn insert(&self, lead: &Lead) -> Result<()> {
        let analysis = lead
            .analysis
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO leads (id, name, email, phone, document_url, slug, status, analysis, error_detail, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(lead.id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.document_url)
        .bind(&lead.slug)
        .bind(lead.status.as_str())
        .bind(analysis)
        .bind(&lead.error_detail)
        .bind(lead.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Error::Validation(format!("slug already taken: {}", lead.slug))
            }
            other => Error::Database(other),
        })?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lead>> {
        let row: Option<LeadRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM leads WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Lead::try_from).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Lead>> {
        let row: Option<LeadRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM leads WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Lead::try_from).transpose()
    }

    async fn complete(&self, id: Uuid, analysis: &Analysis) -> Result<bool> {
        // Guard on the status column: exactly one writer can win the
        // processing -> completed edge, so a duplicate trigger is a no-op.
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET status = 'completed', analysis = $2
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(serde_json::to_value(analysis)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail(&self, id: Uuid, reason: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET status = 'failed', error_detail = $2
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
