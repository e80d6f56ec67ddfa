use actix_web::{web, HttpRequest, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::{document::ListQuery, resource::ResourceKind},
    errors::AppError,
    use_cases::extractors::AdminClaims,
    utils::multipart_form::read_form_payload,
    AppState,
};

fn resource_kind(raw: &str) -> Result<ResourceKind, AppError> {
    raw.parse().map_err(AppError::NotFound)
}

/// Contact messages are admin-only to read; everything else is public.
fn ensure_readable(kind: ResourceKind, claims: &Option<AdminClaims>) -> Result<(), AppError> {
    if kind.public_read() || claims.is_some() {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

#[instrument(skip(claims, state, query))]
pub async fn list_resources(
    claims: Option<AdminClaims>,
    resource: web::Path<String>,
    query: web::Query<ListQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let kind = resource_kind(&resource)?;
    ensure_readable(kind, &claims)?;

    let page = state.resource_handler.list(kind, &query).await?;
    Ok(HttpResponse::Ok().json(page.into_body(kind)))
}

#[instrument(skip(claims, state))]
pub async fn get_resource(
    claims: Option<AdminClaims>,
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (resource, id) = path.into_inner();
    let kind = resource_kind(&resource)?;
    ensure_readable(kind, &claims)?;

    let document = state.resource_handler.get(kind, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "data": document })))
}

#[instrument(skip(claims, req, state, body))]
pub async fn create_resource(
    claims: Option<AdminClaims>,
    req: HttpRequest,
    resource: web::Path<String>,
    state: web::Data<AppState>,
    body: web::Payload,
) -> Result<impl Responder, AppError> {
    let kind = resource_kind(&resource)?;
    if !kind.public_create() && claims.is_none() {
        return Err(AppError::Unauthorized);
    }

    let payload = read_form_payload(
        &req,
        body,
        state.resource_handler.uploads.max_bytes(),
        state.max_files_per_request,
    )
    .await?;

    let document = state.resource_handler.create(kind, payload).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "success": true, "data": document })))
}

#[instrument(skip(_claims, req, state, body))]
pub async fn update_resource(
    _claims: AdminClaims,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
    body: web::Payload,
) -> Result<impl Responder, AppError> {
    let (resource, id) = path.into_inner();
    let kind = resource_kind(&resource)?;

    let payload = read_form_payload(
        &req,
        body,
        state.resource_handler.uploads.max_bytes(),
        state.max_files_per_request,
    )
    .await?;

    let document = state.resource_handler.update(kind, &id, payload).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "data": document })))
}

#[instrument(skip(_claims, state))]
pub async fn delete_resource(
    _claims: AdminClaims,
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (resource, id) = path.into_inner();
    let kind = resource_kind(&resource)?;

    state.resource_handler.delete(kind, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("{} deleted successfully", kind.label())
    })))
}

#[instrument(skip(_claims, state))]
pub async fn toggle_service(
    _claims: AdminClaims,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let document = state
        .resource_handler
        .toggle(ResourceKind::Services, &id)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "data": document })))
}
