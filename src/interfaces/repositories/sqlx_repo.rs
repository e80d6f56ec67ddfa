use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    entities::{document::{DocumentFilter, StoredDocument}, resource::ResourceKind},
    errors::AppError,
    repositories::document::DocumentRepository,
};

/// Postgres JSONB document store.
#[derive(Clone)]
pub struct SqlxDocumentRepo {
    pub pool: PgPool,
}

impl SqlxDocumentRepo {
    pub fn new(pool: PgPool) -> Self {
        SqlxDocumentRepo { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    resource: String,
    data: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for StoredDocument {
    type Error = AppError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(StoredDocument {
            id: row.id,
            resource: row.resource.parse().map_err(AppError::Internal)?,
            data: row.data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ACTIVE_CLAUSE: &str =
    "($2::boolean IS NULL OR COALESCE((data->>'active')::boolean, TRUE) = $2)";

#[async_trait]
impl DocumentRepository for SqlxDocumentRepo {
    async fn insert(&self, kind: ResourceKind, data: &Map<String, Value>) -> Result<StoredDocument, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (id, resource, data)
            VALUES ($1, $2, $3)
            RETURNING id, resource, data, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(kind.as_str())
        .bind(Json(data))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, kind: ResourceKind, id: Uuid) -> Result<StoredDocument, AppError> {
        sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, resource, data, created_at, updated_at
            FROM documents
            WHERE resource = $1 AND id = $2
            "#,
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", kind.label(), id)))?
        .try_into()
    }

    async fn list(&self, kind: ResourceKind, filter: &DocumentFilter) -> Result<(Vec<StoredDocument>, u64), AppError> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            SELECT id, resource, data, created_at, updated_at
            FROM documents
            WHERE resource = $1 AND {ACTIVE_CLAUSE}
            ORDER BY (data->>'order')::double precision ASC NULLS LAST, created_at DESC
            OFFSET $3 LIMIT $4
            "#
        ))
        .bind(kind.as_str())
        .bind(filter.active)
        .bind(filter.offset as i64)
        .bind(filter.limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM documents WHERE resource = $1 AND {ACTIVE_CLAUSE}"
        ))
        .bind(kind.as_str())
        .bind(filter.active)
        .fetch_one(&self.pool)
        .await?;

        let documents = rows
            .into_iter()
            .map(StoredDocument::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((documents, total as u64))
    }

    async fn replace(&self, kind: ResourceKind, id: Uuid, data: &Map<String, Value>) -> Result<StoredDocument, AppError> {
        sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE documents
            SET data = $3, updated_at = NOW()
            WHERE resource = $1 AND id = $2
            RETURNING id, resource, data, created_at, updated_at
            "#,
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(Json(data))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", kind.label(), id)))?
        .try_into()
    }

    async fn delete(&self, kind: ResourceKind, id: Uuid) -> Result<StoredDocument, AppError> {
        sqlx::query_as::<_, DocumentRow>(
            r#"
            DELETE FROM documents
            WHERE resource = $1 AND id = $2
            RETURNING id, resource, data, created_at, updated_at
            "#,
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", kind.label(), id)))?
        .try_into()
    }

    async fn check_connection(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
