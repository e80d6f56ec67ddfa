use actix_web::web;

use crate::errors::AppError;

/// Malformed query strings and path segments answer with the same
/// `{ success: false, message }` body as every other error.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, req| {
        tracing::debug!("Bad query string on {}: {}", req.path(), err);
        AppError::BadRequest(format!("Invalid query string: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, req| {
        tracing::debug!("Bad path segment on {}: {}", req.path(), err);
        AppError::BadRequest(format!("Invalid path: {}", err)).into()
    }));
}
