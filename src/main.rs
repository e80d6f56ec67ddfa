use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, middleware::NormalizePath, web, App, HttpServer};
use site_cms::{
    db::postgres::{create_pool, run_migrations},
    graceful_shutdown::shutdown_signal,
    middlewares::auth::AuthMiddleware,
    repositories::{document::DocumentRepository, memory_repo::MemoryDocumentRepo, sqlx_repo::SqlxDocumentRepo},
    routes::configure_routes,
    settings::AppConfig,
    AppState,
};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

fn cors_for(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        cors.allow_any_origin()
    } else {
        origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin))
            .supports_credentials()
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let config = match AppConfig::new() {
        Ok(cfg) => {
            tracing::info!("Loaded configuration: {:?}", cfg);
            cfg
        },
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let repo: Arc<dyn DocumentRepository> = if config.uses_database() {
        let pool = create_pool(&config.database_url)
            .await
            .map_err(|e| std::io::Error::other(format!("Database connection failed: {}", e)))?;
        run_migrations(&pool)
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Arc::new(SqlxDocumentRepo::new(pool))
    } else {
        tracing::warn!("No database URL configured, documents are kept in memory");
        Arc::new(MemoryDocumentRepo::new())
    };

    if let Err(e) = repo.check_connection().await {
        tracing::error!("Document store is unreachable: {}", e);
        return Err(std::io::Error::other(e.to_string()));
    }

    tokio::fs::create_dir_all(config.upload_path()).await?;

    let app_state = web::Data::new(AppState::new(&config, repo));
    let cors_origins = config.cors_origins();

    let server_addr = config.bind_address();

    tracing::info!(
        "🚀 Starting {} v{} on {}",
        config.server.name,
        env!("CARGO_PKG_VERSION"),
        server_addr
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(AuthMiddleware)
            .wrap(NormalizePath::trim())
            .wrap(cors_for(&cors_origins))
            .wrap(TracingLogger::default())
            .configure(configure_routes)
    })
    .workers(config.server.worker_count)
    .bind(server_addr)?
    .run();

    tokio::select! {
        res = server => res,
        _ = shutdown_signal() => Ok(()),
    }
}
