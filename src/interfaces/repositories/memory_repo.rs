use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    entities::{document::{DocumentFilter, StoredDocument}, resource::ResourceKind},
    errors::AppError,
    repositories::document::DocumentRepository,
};

/// Process-local document store, used when no database is configured.
#[derive(Default)]
pub struct MemoryDocumentRepo {
    documents: DashMap<(ResourceKind, Uuid), StoredDocument>,
}

impl MemoryDocumentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn not_found(kind: ResourceKind, id: Uuid) -> AppError {
    AppError::NotFound(format!("{} {}", kind.label(), id))
}

fn listing_order(a: &StoredDocument, b: &StoredDocument) -> Ordering {
    match (a.order(), b.order()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.created_at.cmp(&a.created_at))
}

#[async_trait]
impl DocumentRepository for MemoryDocumentRepo {
    async fn insert(&self, kind: ResourceKind, data: &Map<String, Value>) -> Result<StoredDocument, AppError> {
        let now = Utc::now();
        let document = StoredDocument {
            id: Uuid::new_v4(),
            resource: kind,
            data: data.clone(),
            created_at: now,
            updated_at: now,
        };
        self.documents.insert((kind, document.id), document.clone());
        Ok(document)
    }

    async fn find_by_id(&self, kind: ResourceKind, id: Uuid) -> Result<StoredDocument, AppError> {
        self.documents
            .get(&(kind, id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| not_found(kind, id))
    }

    async fn list(&self, kind: ResourceKind, filter: &DocumentFilter) -> Result<(Vec<StoredDocument>, u64), AppError> {
        let mut matching: Vec<StoredDocument> = self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .filter(|entry| filter.active.is_none_or(|active| entry.value().is_active() == active))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(listing_order);

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit.map_or(usize::MAX, |l| l as usize))
            .collect();

        Ok((page, total))
    }

    async fn replace(&self, kind: ResourceKind, id: Uuid, data: &Map<String, Value>) -> Result<StoredDocument, AppError> {
        let mut entry = self
            .documents
            .get_mut(&(kind, id))
            .ok_or_else(|| not_found(kind, id))?;
        entry.data = data.clone();
        entry.updated_at = Utc::now();
        Ok(entry.value().clone())
    }

    async fn delete(&self, kind: ResourceKind, id: Uuid) -> Result<StoredDocument, AppError> {
        self.documents
            .remove(&(kind, id))
            .map(|(_, document)| document)
            .ok_or_else(|| not_found(kind, id))
    }

    async fn check_connection(&self) -> Result<(), AppError> {
        Ok(())
    }
}
