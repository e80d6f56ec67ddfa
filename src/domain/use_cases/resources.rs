use std::sync::Arc;

use serde_json::{Map, Value};
use validator::Validate;

use crate::{
    entities::{
        asset::AssetRef,
        contact_me::ContactSubmission,
        document::{FormPayload, ListPage, ListQuery, Pagination, UploadedFile},
        resource::ResourceKind,
        schema::{apply_defaults, asset_paths, check_required, coerce_fields, FieldKind},
    },
    errors::AppError,
    repositories::document::DocumentRepository,
    storage::uploads::UploadStore,
    utils::valid_uuid::valid_uuid,
};

pub struct ResourceHandler<R>
where
    R: DocumentRepository,
{
    pub repo: R,
    pub uploads: Arc<UploadStore>,
}

impl<R> ResourceHandler<R>
where
    R: DocumentRepository,
{
    pub fn new(repo: R, uploads: Arc<UploadStore>) -> Self {
        ResourceHandler { repo, uploads }
    }

    /// Lists a collection, optionally filtered by `active` and paginated
    pub async fn list(&self, kind: ResourceKind, query: &ListQuery) -> Result<ListPage, AppError> {
        query.validate()?;

        let filter = query.to_filter(kind);
        let (documents, total) = self.repo.list(kind, &filter).await?;

        let pagination = filter.limit.map(|limit| {
            Pagination::new(query.page.unwrap_or(1), limit, total)
        });

        Ok(ListPage {
            items: documents.iter().map(|d| d.to_json()).collect(),
            pagination,
        })
    }

    /// Retrieves a single document
    pub async fn get(&self, kind: ResourceKind, id: &str) -> Result<Value, AppError> {
        let id = valid_uuid(id)?;
        Ok(self.repo.find_by_id(kind, id).await?.to_json())
    }

    /// Creates a document from submitted fields and uploads
    pub async fn create(&self, kind: ResourceKind, payload: FormPayload) -> Result<Value, AppError> {
        let mut data = coerce_fields(kind, payload.fields)?;
        keep_owned_assets(kind, &mut data, &[]);
        apply_defaults(kind, &mut data);

        if kind == ResourceKind::Contact {
            ContactSubmission::from_fields(&data)?.validate()?;
        }

        // Fail on missing fields before anything is written to disk.
        check_required(kind, &data)?;

        let stored = self.store_files(kind, &payload.files).await?;
        attach_files(kind, &mut data, &stored);

        match self.repo.insert(kind, &data).await {
            Ok(document) => {
                tracing::info!("Created {} {}", kind, document.id);
                Ok(document.to_json())
            }
            Err(e) => {
                self.discard(&stored).await;
                Err(e)
            }
        }
    }

    /// Updates a document. Omitted fields keep their stored values; uploaded
    /// files are appended after the retained asset references.
    pub async fn update(&self, kind: ResourceKind, id: &str, payload: FormPayload) -> Result<Value, AppError> {
        let id = valid_uuid(id)?;
        let existing = self.repo.find_by_id(kind, id).await?;

        let mut patch = coerce_fields(kind, payload.fields)?;
        keep_owned_assets(kind, &mut patch, &asset_paths(kind, &existing.data));
        let mut merged = existing.data.clone();
        for (name, value) in patch.iter() {
            merged.insert(name.clone(), value.clone());
        }
        check_required(kind, &merged)?;

        let stored = self.store_files(kind, &payload.files).await?;
        attach_files(kind, &mut merged, &stored);

        let document = match self.repo.replace(kind, id, &merged).await {
            Ok(document) => document,
            Err(e) => {
                self.discard(&stored).await;
                return Err(e);
            }
        };

        let still_used = asset_paths(kind, &document.data);
        let orphaned: Vec<String> = asset_paths(kind, &existing.data)
            .into_iter()
            .filter(|path| !still_used.contains(path))
            .collect();
        self.uploads.remove_all(&orphaned).await;

        tracing::info!("Updated {} {} ({} files added, {} removed)", kind, id, stored.len(), orphaned.len());
        Ok(document.to_json())
    }

    /// Deletes a document and the files it referenced
    pub async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), AppError> {
        let id = valid_uuid(id)?;
        let removed = self.repo.delete(kind, id).await?;

        self.uploads.remove_all(&asset_paths(kind, &removed.data)).await;

        tracing::info!("Deleted {} {}", kind, id);
        Ok(())
    }

    /// Flips the `active` flag of a service
    pub async fn toggle(&self, kind: ResourceKind, id: &str) -> Result<Value, AppError> {
        if !kind.supports_toggle() {
            return Err(AppError::NotFound(format!("{} cannot be toggled", kind.label())));
        }
        let id = valid_uuid(id)?;
        let existing = self.repo.find_by_id(kind, id).await?;

        let mut data = existing.data.clone();
        let active = existing.is_active();
        data.insert("active".into(), Value::Bool(!active));

        let document = self.repo.replace(kind, id, &data).await?;
        tracing::info!("Toggled {} {} to active={}", kind, id, !active);
        Ok(document.to_json())
    }

    async fn store_files(&self, kind: ResourceKind, files: &[UploadedFile]) -> Result<Vec<(String, AssetRef)>, AppError> {
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            if !kind.accepts_files(&file.field) {
                self.discard(&stored).await;
                return Err(AppError::BadRequest(format!(
                    "{} does not accept files under '{}'",
                    kind.label(),
                    file.field
                )));
            }
            match self.uploads.save(file).await {
                Ok(asset) => stored.push((file.field.clone(), asset)),
                Err(e) => {
                    self.discard(&stored).await;
                    return Err(e.into());
                }
            }
        }
        Ok(stored)
    }

    async fn discard(&self, stored: &[(String, AssetRef)]) {
        let urls: Vec<String> = stored.iter().map(|(_, asset)| asset.url.clone()).collect();
        self.uploads.remove_all(&urls).await;
    }
}

/// Drops submitted asset references the document did not already hold, so a
/// stored file is never shared between documents and removing one document
/// cannot delete another's files. New files only arrive as uploads.
fn keep_owned_assets(kind: ResourceKind, data: &mut Map<String, Value>, owned: &[String]) {
    let is_owned = |item: &Value| {
        let url = item.as_str().or_else(|| item.get("url").and_then(Value::as_str));
        url.is_some_and(|url| owned.iter().any(|path| path == url))
    };

    for spec in kind.schema() {
        match spec.kind {
            FieldKind::Assets => {
                if let Some(Value::Array(items)) = data.get_mut(spec.name) {
                    let before = items.len();
                    items.retain(|item| is_owned(item));
                    if items.len() < before {
                        tracing::warn!("Ignored {} foreign reference(s) in {}.{}", before - items.len(), kind, spec.name);
                    }
                }
            }
            FieldKind::Image => {
                if data.get(spec.name).is_some_and(|image| image.is_string() && !is_owned(image)) {
                    tracing::warn!("Ignored foreign reference in {}.{}", kind, spec.name);
                    data.remove(spec.name);
                }
            }
            _ => {}
        }
    }
}

/// Places stored uploads into their fields. `data` already holds the submitted
/// retained list (or the stored one when none was sent); asset lists grow in
/// selection order and single-image fields take the last uploaded file.
fn attach_files(kind: ResourceKind, data: &mut Map<String, Value>, stored: &[(String, AssetRef)]) {
    for (field, asset) in stored {
        let Some(spec) = kind.field(field) else { continue };
        match spec.kind {
            FieldKind::Assets => {
                let mut list = data
                    .get(field)
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                list.push(serde_json::json!({ "url": asset.url, "name": asset.name }));
                data.insert(field.clone(), Value::Array(list));
            }
            FieldKind::Image => {
                data.insert(field.clone(), Value::String(asset.url.clone()));
            }
            _ => {}
        }
    }
}
