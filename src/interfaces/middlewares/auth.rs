use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web, Error, HttpMessage, ResponseError,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::{rc::Rc, task::{Context, Poll}};

use crate::{entities::token::Claims, errors::AuthError, AppState};

pub struct AuthMiddleware;

impl<S> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let public = is_public_route(req.path(), req.method());

            match get_valid_claims(&req) {
                Ok(claims) => {
                    if !public && !claims.admin {
                        tracing::warn!("Non-admin token used for {} {}", req.method(), req.path());
                        return Ok(reject(req, AuthError::Forbidden("Admin access required".into())));
                    }
                    req.extensions_mut().insert(claims);
                }
                Err(_) if public => {}
                Err(err) => {
                    tracing::warn!("Rejected {} {}: {}", req.method(), req.path(), err);
                    return Ok(reject(req, err));
                }
            }

            service.call(req).await
        })
    }
}

/// Reads are public except contact messages; the contact form is the only
/// public write. Preflight requests always pass.
fn is_public_route(path: &str, method: &Method) -> bool {
    let contact = path == "/api/contact" || path.starts_with("/api/contact/");

    match *method {
        Method::OPTIONS => true,
        Method::GET | Method::HEAD => !contact,
        Method::POST => path == "/api/contact",
        _ => false,
    }
}

fn extract_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| {
            let parts: Vec<&str> = header.split_whitespace().collect();
            if parts.len() == 2 && parts[0].eq_ignore_ascii_case("bearer") {
                Some(parts[1].to_string())
            } else {
                None
            }
        })
}

fn get_valid_claims(req: &ServiceRequest) -> Result<Claims, AuthError> {
    let state = req.app_data::<web::Data<AppState>>()
        .ok_or_else(|| {
            tracing::error!("AppState missing in middleware");
            AuthError::MissingState
        })?;

    let token = extract_token(req).ok_or(AuthError::MissingCredentials)?;
    let decoded = state.jwt_service.decode_jwt(&token)?;
    Ok(decoded.claims)
}

fn reject(req: ServiceRequest, err: AuthError) -> ServiceResponse<BoxBody> {
    req.into_response(err.error_response())
}
