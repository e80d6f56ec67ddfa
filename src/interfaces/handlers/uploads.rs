use actix_web::{
    http::header::{CacheControl, CacheDirective},
    web, HttpResponse, Responder,
};
use tracing::instrument;

use crate::{errors::AppError, storage::uploads::PUBLIC_PREFIX, AppState};

/// Serves a stored upload by the relative path recorded in documents.
#[instrument(skip(state))]
pub async fn serve_upload(
    tail: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let reference = format!("{}/{}", PUBLIC_PREFIX, tail.into_inner());
    let (bytes, content_type) = state.resource_handler.uploads.read(&reference).await?;

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header(CacheControl(vec![CacheDirective::Public, CacheDirective::MaxAge(86_400)]))
        .body(bytes))
}
