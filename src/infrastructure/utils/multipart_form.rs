use actix_multipart::Multipart;
use actix_web::{http::header::CONTENT_TYPE, web, HttpRequest};
use futures_util::StreamExt;
use serde_json::{Map, Value};

use crate::{
    entities::document::{FormPayload, UploadedFile},
    errors::AppError,
    utils::bracket_fields::reconstruct,
};

/// Upper bound for a single non-file part.
const MAX_TEXT_PART_BYTES: usize = 256 * 1024;

/// Upper bound for a JSON create/update body.
const MAX_JSON_BYTES: usize = 1024 * 1024;

/// Reads a create/update body that is either `multipart/form-data` or JSON.
pub async fn read_form_payload(
    req: &HttpRequest,
    mut payload: web::Payload,
    max_file_bytes: usize,
    max_files: usize,
) -> Result<FormPayload, AppError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::new(req.headers(), payload);
        return read_multipart(multipart, max_file_bytes, max_files).await;
    }

    if !content_type.starts_with("application/json") {
        return Err(AppError::UnsupportedMediaType(
            "Request must be either application/json or multipart/form-data".into(),
        ));
    }

    let mut body = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Failed to read body: {}", e)))?;
        if body.len() + chunk.len() > MAX_JSON_BYTES {
            return Err(AppError::PayloadTooLarge(format!("JSON body exceeds {} bytes", MAX_JSON_BYTES)));
        }
        body.extend_from_slice(&chunk);
    }

    let fields: Map<String, Value> = serde_json::from_slice(&body)?;
    Ok(FormPayload::from_json(fields))
}

/// Drains a multipart body: parts carrying a filename are collected as uploads
/// (in submission order), the rest are rebuilt from bracket notation into JSON.
pub async fn read_multipart(
    mut payload: Multipart,
    max_file_bytes: usize,
    max_files: usize,
) -> Result<FormPayload, AppError> {
    let mut text_entries = Vec::new();
    let mut files = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = item?;

        let (name, file_name) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => continue,
        };
        if name.is_empty() {
            continue;
        }

        let limit = if file_name.is_some() { max_file_bytes } else { MAX_TEXT_PART_BYTES };
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::PayloadTooLarge(format!(
                    "Part '{}' exceeds {} bytes",
                    name, limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match file_name {
            Some(file_name) => {
                // Browsers send an empty file part when nothing was selected.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                if files.len() >= max_files {
                    return Err(AppError::PayloadTooLarge(format!(
                        "At most {} files per request",
                        max_files
                    )));
                }
                files.push(UploadedFile { field: name, file_name, bytes });
            }
            None => {
                let value = String::from_utf8(bytes)
                    .map_err(|_| AppError::BadRequest(format!("Field '{}' is not valid UTF-8", name)))?;
                text_entries.push((name, value));
            }
        }
    }

    tracing::debug!(
        "Parsed multipart body with {} fields and {} files",
        text_entries.len(),
        files.len()
    );

    Ok(FormPayload {
        fields: reconstruct(text_entries),
        files,
    })
}
