use uuid::Uuid;

use crate::errors::AppError;

/// Parses a document id from a path segment.
pub fn valid_uuid(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::BadRequest(format!("Invalid document id: {}", id)))
}
