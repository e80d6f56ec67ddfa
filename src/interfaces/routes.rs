use actix_web::web;

use crate::handlers::{home::home, uploads};

mod json_error;
mod resources;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);

    cfg.service(
        web::resource("/uploads/{tail:.*}")
            .route(web::get().to(uploads::serve_upload))
    );

    cfg.service(
        web::scope("/api")
            .configure(resources::config_routes)
    );

    cfg.configure(json_error::config_routes);
}
