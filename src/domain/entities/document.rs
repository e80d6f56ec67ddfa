use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::entities::resource::ResourceKind;

// ───── Stored documents ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: Uuid,
    pub resource: ResourceKind,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    /// API representation: the document fields plus `_id` and timestamps.
    pub fn to_json(&self) -> Value {
        let mut body = self.data.clone();
        body.insert("_id".into(), Value::String(self.id.to_string()));
        body.insert("createdAt".into(), Value::String(self.created_at.to_rfc3339()));
        body.insert("updatedAt".into(), Value::String(self.updated_at.to_rfc3339()));
        Value::Object(body)
    }

    pub fn is_active(&self) -> bool {
        self.data.get("active").and_then(Value::as_bool).unwrap_or(true)
    }

    pub fn order(&self) -> Option<f64> {
        self.data.get("order").and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub active: Option<bool>,
    pub offset: u64,
    pub limit: Option<u64>,
}

// ───── List queries ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ListQuery {
    pub active: Option<bool>,

    #[validate(range(min = 1, message = "page starts at 1"))]
    pub page: Option<u64>,

    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u64>,
}

impl ListQuery {
    pub const DEFAULT_LIMIT: u64 = 10;

    /// Achievements are always paginated; other collections only when asked.
    pub fn is_paginated(&self, kind: ResourceKind) -> bool {
        kind.list_key().is_some() || self.page.is_some() || self.limit.is_some()
    }

    pub fn to_filter(&self, kind: ResourceKind) -> DocumentFilter {
        if !self.is_paginated(kind) {
            return DocumentFilter { active: self.active, offset: 0, limit: None };
        }
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT);
        DocumentFilter {
            active: self.active,
            offset: (page - 1) * limit,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Pagination { page, limit, total, pages }
    }
}

#[derive(Debug)]
pub struct ListPage {
    pub items: Vec<Value>,
    pub pagination: Option<Pagination>,
}

impl ListPage {
    /// Response body in the collection's list shape.
    pub fn into_body(self, kind: ResourceKind) -> Value {
        match kind.list_key() {
            Some(key) => serde_json::json!({
                "success": true,
                "data": { key: self.items, "pagination": self.pagination },
            }),
            None => {
                let mut body = serde_json::json!({ "success": true, "data": self.items });
                if let Some(pagination) = self.pagination {
                    body["pagination"] = serde_json::json!(pagination);
                }
                body
            }
        }
    }
}

// ───── Submitted payloads ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A create/update request after bracket-notation fields were rebuilt into JSON.
#[derive(Debug, Default)]
pub struct FormPayload {
    pub fields: Map<String, Value>,
    pub files: Vec<UploadedFile>,
}

impl FormPayload {
    pub fn from_json(fields: Map<String, Value>) -> Self {
        FormPayload { fields, files: Vec::new() }
    }
}
