// SQLite StatusRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use jobrelay_core::domain::background_job::merge_metadata;
use jobrelay_core::domain::{BackgroundJob, JobStatus, NewBackgroundJob, StatusUpdate};
use jobrelay_core::error::{AppError, Result};
use jobrelay_core::port::{IdProvider, StatusRepository, TimeProvider};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub struct SqliteStatusRepository {
    pool: SqlitePool,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteStatusRepository {
    pub fn new(
        pool: SqlitePool,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            pool,
            id_provider,
            time_provider,
        }
    }
}

#[async_trait]
impl StatusRepository for SqliteStatusRepository {
    async fn create(&self, new_job: NewBackgroundJob) -> Result<BackgroundJob> {
        let job = BackgroundJob::from_new(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            new_job,
        );

        sqlx::query(
            r#"
            INSERT INTO background_jobs (
                id, session_id, api_type, task_type, raw_input,
                include_syntax, temperature, visible,
                status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.session_id)
        .bind(&job.api_type)
        .bind(&job.task_type)
        .bind(&job.raw_input)
        .bind(job.include_syntax)
        .bind(job.temperature)
        .bind(job.visible)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(job_id = %job.id, session_id = %job.session_id, "Background job created");
        Ok(job)
    }

    async fn update_status(&self, update: StatusUpdate) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let stored: Option<Option<String>> =
            sqlx::query_scalar("SELECT metadata FROM background_jobs WHERE id = ?")
                .bind(&update.job_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        let Some(stored_metadata) = stored else {
            return Err(AppError::NotFound(format!("Job {} not found", update.job_id)));
        };

        // Metadata patches merge into the stored object
        let metadata = match &update.metadata {
            Some(patch) => {
                let base = stored_metadata
                    .as_deref()
                    .and_then(|s| serde_json::from_str(s).ok());
                Some(merge_metadata(base, patch.clone()).to_string())
            }
            None => stored_metadata,
        };
        let usage = update.usage.clone().unwrap_or_default();

        sqlx::query(
            r#"
            UPDATE background_jobs SET
                status = ?,
                updated_at = ?,
                start_time = COALESCE(?, start_time),
                end_time = CASE WHEN ? THEN NULL ELSE COALESCE(?, end_time) END,
                response = COALESCE(?, response),
                status_message = COALESCE(?, status_message),
                error_message = COALESCE(?, error_message),
                metadata = ?,
                tokens_sent = COALESCE(?, tokens_sent),
                tokens_received = COALESCE(?, tokens_received),
                total_tokens = COALESCE(?, total_tokens)
            WHERE id = ?
            "#,
        )
        .bind(update.status.as_str())
        .bind(update.updated_at)
        .bind(update.start_time)
        .bind(update.clear_end_time)
        .bind(update.end_time)
        .bind(&update.response)
        .bind(&update.status_message)
        .bind(&update.error_message)
        .bind(&metadata)
        .bind(usage.tokens_sent)
        .bind(usage.tokens_received)
        .bind(usage.total_tokens)
        .bind(&update.job_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(job_id = %update.job_id, status = %update.status, "Status updated");
        Ok(())
    }

    async fn find_by_id(&self, job_id: &str) -> Result<Option<BackgroundJob>> {
        let row = sqlx::query_as::<_, BackgroundJobRow>(
            "SELECT * FROM background_jobs WHERE id = ?",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(BackgroundJobRow::into_job).transpose()
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Vec<BackgroundJob>> {
        let rows: Vec<BackgroundJobRow> = sqlx::query_as(
            "SELECT * FROM background_jobs WHERE session_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(BackgroundJobRow::into_job).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BackgroundJobRow {
    id: String,
    session_id: String,
    api_type: String,
    task_type: String,
    raw_input: String,
    include_syntax: bool,
    temperature: f64,
    visible: bool,
    status: String,
    status_message: Option<String>,
    error_message: Option<String>,
    response: Option<String>,
    metadata: Option<String>,
    tokens_sent: Option<i64>,
    tokens_received: Option<i64>,
    total_tokens: Option<i64>,
    created_at: i64,
    updated_at: i64,
    start_time: Option<i64>,
    end_time: Option<i64>,
}

impl BackgroundJobRow {
    fn into_job(self) -> Result<BackgroundJob> {
        let status = JobStatus::from_str(&self.status).map_err(|_| {
            AppError::Database(format!(
                "Job {} has unknown status '{}'",
                self.id, self.status
            ))
        })?;
        let metadata = self
            .metadata
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok());

        Ok(BackgroundJob {
            id: self.id,
            session_id: self.session_id,
            api_type: self.api_type,
            task_type: self.task_type,
            raw_input: self.raw_input,
            include_syntax: self.include_syntax,
            temperature: self.temperature,
            visible: self.visible,
            status,
            status_message: self.status_message,
            error_message: self.error_message,
            response: self.response,
            metadata,
            tokens_sent: self.tokens_sent,
            tokens_received: self.tokens_received,
            total_tokens: self.total_tokens,
            created_at: self.created_at,
            updated_at: self.updated_at,
            start_time: self.start_time,
            end_time: self.end_time,
        })
    }
}
