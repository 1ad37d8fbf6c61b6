//! Listener row repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use picket_core::error::{AppError, ErrorKind};
use picket_core::result::AppResult;
use picket_entity::listener::{ListenerRow, NewListenerRow};

use crate::store::ListenerStore;

/// Repository for the `listeners` table.
#[derive(Debug, Clone)]
pub struct ListenerRepository {
    pool: PgPool,
}

impl ListenerRepository {
    /// Create a new listener repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListenerStore for ListenerRepository {
    async fn insert(&self, row: NewListenerRow) -> AppResult<ListenerRow> {
        let row = row.into_row();
        sqlx::query_as::<_, ListenerRow>(
            "INSERT INTO listeners (id, name, module, listener_category, options, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.module)
        .bind(&row.listener_category)
        .bind(&row.options)
        .bind(row.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert listener", e))
    }

    async fn replace(&self, row: NewListenerRow) -> AppResult<ListenerRow> {
        let row = row.into_row();
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query("DELETE FROM listeners WHERE name = $1")
            .bind(&row.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete listener", e)
            })?;

        let stored = sqlx::query_as::<_, ListenerRow>(
            "INSERT INTO listeners (id, name, module, listener_category, options, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.module)
        .bind(&row.listener_category)
        .bind(&row.options)
        .bind(row.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert listener", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit listener", e)
        })?;
        Ok(stored)
    }

    async fn delete_by_name(&self, name: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM listeners WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete listener", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn list_all(&self) -> AppResult<Vec<ListenerRow>> {
        sqlx::query_as::<_, ListenerRow>("SELECT * FROM listeners ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list listeners", e))
    }

    async fn find_id(&self, name_or_id: &str) -> AppResult<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM listeners WHERE name = $1 OR id::text = $1 \
             ORDER BY created_at LIMIT 1",
        )
        .bind(name_or_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to resolve listener id", e))
    }

    async fn find_name(&self, id_or_name: &str) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM listeners WHERE name = $1 OR id::text = $1 \
             ORDER BY created_at LIMIT 1",
        )
        .bind(id_or_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to resolve listener name", e)
        })
    }

    async fn find_module(&self, name: &str) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT module FROM listeners WHERE name = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to resolve listener module", e)
        })
    }

    async fn find_options(&self, name: &str) -> AppResult<Option<serde_json::Value>> {
        sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT options FROM listeners WHERE name = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load listener options", e)
        })
    }
}
