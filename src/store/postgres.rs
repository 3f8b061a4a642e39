//! Postgres-backed stores
//!
//! Tables are created by `migrations/0001_procedures_and_documents.sql`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use super::documents::{merge_json, DocumentStore};
use super::procedures::{parse_definition, ProcedureStore};
use crate::interpreter::types::ProcedureDefinition;

/* ===================== Procedures ===================== */

#[derive(Debug, Clone)]
pub struct PgProcedureStore {
    pool: PgPool,
}

impl PgProcedureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Hash definition text using SHA256
fn hash_definition(definition: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(definition.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl ProcedureStore for PgProcedureStore {
    async fn fetch(&self, name: &str) -> Result<Option<ProcedureDefinition>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT definition
            FROM procedures
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch procedure '{}'", name))?;

        row.map(|(text,)| parse_definition(name, &text)).transpose()
    }

    async fn store(&self, name: &str, definition: &str) -> Result<()> {
        parse_definition(name, definition)?;
        let version_hash = hash_definition(definition);

        sqlx::query(
            r#"
            INSERT INTO procedures (name, version_hash, definition)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
            SET version_hash = EXCLUDED.version_hash,
                definition = EXCLUDED.definition,
                updated_at = NOW()
            "#,
        )
        .bind(name)
        .bind(&version_hash)
        .bind(definition)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to store procedure '{}'", name))?;

        tracing::info!(name, version = &version_hash[..8], "stored procedure");
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM procedures WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete procedure '{}'", name))?;

        Ok(result.rows_affected() > 0)
    }
}

/* ===================== Documents ===================== */

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, index: &str, id: &str) -> Result<Option<JsonValue>> {
        let row: Option<(JsonValue,)> = sqlx::query_as(
            r#"
            SELECT body
            FROM documents
            WHERE index_name = $1 AND id = $2
            "#,
        )
        .bind(index)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to get document '{}/{}'", index, id))?;

        Ok(row.map(|(body,)| body))
    }

    async fn index(&self, index: &str, id: &str, document: JsonValue) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (index_name, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (index_name, id) DO UPDATE
            SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(index)
        .bind(id)
        .bind(&document)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to index document '{}/{}'", index, id))?;

        Ok(())
    }

    async fn update(&self, index: &str, id: &str, partial: JsonValue) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row: Option<(JsonValue,)> = sqlx::query_as(
            r#"
            SELECT body
            FROM documents
            WHERE index_name = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(index)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .with_context(|| format!("Failed to lock document '{}/{}'", index, id))?;

        let Some((mut body,)) = row else {
            return Ok(false);
        };
        merge_json(&mut body, partial);

        sqlx::query(
            r#"
            UPDATE documents
            SET body = $3, updated_at = NOW()
            WHERE index_name = $1 AND id = $2
            "#,
        )
        .bind(index)
        .bind(id)
        .bind(&body)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to update document '{}/{}'", index, id))?;

        tx.commit().await.context("Failed to commit document update")?;
        Ok(true)
    }

    async fn bulk_index(&self, index: &str, documents: Vec<(String, JsonValue)>) -> Result<usize> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let count = documents.len();

        for (id, document) in documents {
            sqlx::query(
                r#"
                INSERT INTO documents (index_name, id, body)
                VALUES ($1, $2, $3)
                ON CONFLICT (index_name, id) DO UPDATE
                SET body = EXCLUDED.body, updated_at = NOW()
                "#,
            )
            .bind(index)
            .bind(&id)
            .bind(&document)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to index document '{}/{}'", index, id))?;
        }

        tx.commit().await.context("Failed to commit bulk index")?;
        Ok(count)
    }

    /// Writes are committed synchronously, so this only reports the count
    async fn refresh(&self, index: &str) -> Result<usize> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM documents WHERE index_name = $1")
                .bind(index)
                .fetch_one(&self.pool)
                .await
                .with_context(|| format!("Failed to refresh index '{}'", index))?;

        Ok(usize::try_from(count).unwrap_or(0))
    }
}
