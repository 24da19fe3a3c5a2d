use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use tracing::debug;

use super::{ConsumeOutcome, DocRef, DocumentStore, StoreError};

/// Document store backed by a single JSONB table in Postgres.
#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get_by_key(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query_as::<_, (Json<Value>,)>(
            r#"
            SELECT body
            FROM documents
            WHERE collection = $1 AND key = $2
            "#,
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|(body,)| body.0))
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        equals: &Value,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let rows = sqlx::query_as::<_, (String, Json<Value>)>(
            r#"
            SELECT key, body
            FROM documents
            WHERE collection = $1 AND body -> $2::text = $3
            ORDER BY key
            LIMIT $4
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(Json(equals))
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|(k, body)| (k, body.0)).collect())
    }

    async fn set_by_key(&self, collection: &str, key: &str, fields: Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, key, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key)
            DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(Json(fields))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete_by_key(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM documents WHERE collection = $1 AND key = $2")
            .bind(collection)
            .bind(key)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn atomic_increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let row = sqlx::query_as::<_, (i64,)>(INCREMENT_SQL)
            .bind(collection)
            .bind(key)
            .bind(field)
            .bind(delta)
            .fetch_optional(&self.db)
            .await?;
        row.map(|(v,)| v).ok_or_else(|| StoreError::Missing {
            collection: collection.to_string(),
            key: key.to_string(),
        })
    }

    async fn create_if_absent(
        &self,
        collection: &str,
        key: &str,
        fields: Value,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            INSERT INTO documents (collection, key, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(Json(fields))
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn consume_and_increment(
        &self,
        consume: DocRef<'_>,
        target: DocRef<'_>,
        field: &str,
        delta: i64,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut tx = self.db.begin().await?;

        let deleted = sqlx::query("DELETE FROM documents WHERE collection = $1 AND key = $2")
            .bind(consume.collection)
            .bind(consume.key)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(ConsumeOutcome::NothingToConsume);
        }

        let new_value = sqlx::query_as::<_, (i64,)>(INCREMENT_SQL)
            .bind(target.collection)
            .bind(target.key)
            .bind(field)
            .bind(delta)
            .fetch_optional(&mut *tx)
            .await?
            .map(|(v,)| v);

        tx.commit().await?;
        debug!(
            consumed = %consume.key,
            target = %target.key,
            ?new_value,
            "consume_and_increment committed"
        );
        Ok(ConsumeOutcome::Consumed { new_value })
    }

    async fn top_by_field(
        &self,
        collection: &str,
        field: &str,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let rows = sqlx::query_as::<_, (String, Json<Value>)>(
            r#"
            SELECT key, body
            FROM documents
            WHERE collection = $1
            ORDER BY COALESCE((body ->> $2::text)::bigint, 0) DESC, key ASC
            LIMIT $3
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|(k, body)| (k, body.0)).collect())
    }
}

const INCREMENT_SQL: &str = r#"
    UPDATE documents
    SET body = jsonb_set(
            body,
            ARRAY[$3::text],
            to_jsonb(COALESCE((body ->> $3::text)::bigint, 0) + $4::bigint)
        ),
        updated_at = now()
    WHERE collection = $1 AND key = $2
    RETURNING (body ->> $3::text)::bigint
"#;
