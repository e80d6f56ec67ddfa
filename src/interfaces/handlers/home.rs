use actix_web::{get, HttpResponse, Responder};

use crate::entities::resource::ResourceKind;

#[get("/")]
pub async fn home() -> impl Responder {
    let resources: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.as_str()).collect();

    HttpResponse::Ok().json(serde_json::json!({
        "message": "Site content API",
        "status": "Ok",
        "version": env!("CARGO_PKG_VERSION"),
        "resources": resources,
        "uploads": "/uploads"
    }))
}
