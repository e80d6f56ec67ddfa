use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

use crate::errors::{AppError, FieldError};

/// Visitor submission from the public contact form.
#[derive(Debug, Deserialize, Validate)]
pub struct ContactSubmission {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "A valid email address is required"))]
    pub email: String,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    #[validate(length(max = 150))]
    pub subject: Option<String>,

    #[validate(length(min = 5, max = 5000, message = "Message must be between 5 and 5000 characters"))]
    pub message: String,
}

impl ContactSubmission {
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, AppError> {
        serde_json::from_value(Value::Object(fields.clone()))
            .map_err(|e| AppError::Validation(vec![FieldError::new("contact", e.to_string())]))
    }
}
