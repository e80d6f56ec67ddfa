use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    entities::{document::{DocumentFilter, StoredDocument}, resource::ResourceKind},
    errors::AppError,
};

/// Document store behind every content collection.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Inserts a new document and returns it with its generated id
    async fn insert(&self, kind: ResourceKind, data: &Map<String, Value>) -> Result<StoredDocument, AppError>;

    /// Retrieves a document by id, `NotFound` when absent
    async fn find_by_id(&self, kind: ResourceKind, id: Uuid) -> Result<StoredDocument, AppError>;

    /// Lists documents ordered by `order` then newest first, with the unpaged total
    async fn list(&self, kind: ResourceKind, filter: &DocumentFilter) -> Result<(Vec<StoredDocument>, u64), AppError>;

    /// Replaces the stored fields of a document
    async fn replace(&self, kind: ResourceKind, id: Uuid, data: &Map<String, Value>) -> Result<StoredDocument, AppError>;

    /// Removes a document, returning what was deleted
    async fn delete(&self, kind: ResourceKind, id: Uuid) -> Result<StoredDocument, AppError>;

    async fn check_connection(&self) -> Result<(), AppError>;
}

#[async_trait]
impl<T: DocumentRepository + ?Sized> DocumentRepository for Arc<T> {
    async fn insert(&self, kind: ResourceKind, data: &Map<String, Value>) -> Result<StoredDocument, AppError> {
        (**self).insert(kind, data).await
    }

    async fn find_by_id(&self, kind: ResourceKind, id: Uuid) -> Result<StoredDocument, AppError> {
        (**self).find_by_id(kind, id).await
    }

    async fn list(&self, kind: ResourceKind, filter: &DocumentFilter) -> Result<(Vec<StoredDocument>, u64), AppError> {
        (**self).list(kind, filter).await
    }

    async fn replace(&self, kind: ResourceKind, id: Uuid, data: &Map<String, Value>) -> Result<StoredDocument, AppError> {
        (**self).replace(kind, id, data).await
    }

    async fn delete(&self, kind: ResourceKind, id: Uuid) -> Result<StoredDocument, AppError> {
        (**self).delete(kind, id).await
    }

    async fn check_connection(&self) -> Result<(), AppError> {
        (**self).check_connection().await
    }
}
