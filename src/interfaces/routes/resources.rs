use actix_web::web;

use crate::handlers::resources;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    // Registered ahead of `/{resource}/{id}` so the literal segment wins.
    cfg.service(
        web::resource("/services/{id}/toggle")
            .route(web::patch().to(resources::toggle_service))
    )
    .service(
        web::resource("/{resource}")
            .route(web::get().to(resources::list_resources))
            .route(web::post().to(resources::create_resource))
    )
    .service(
        web::resource("/{resource}/{id}")
            .route(web::get().to(resources::get_resource))
            .route(web::put().to(resources::update_resource))
            .route(web::delete().to(resources::delete_resource))
    );
}
