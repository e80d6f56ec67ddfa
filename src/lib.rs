use std::sync::Arc;

mod domain;
mod interfaces;
mod infrastructure;
pub mod client;
pub mod errors;
pub mod settings;
pub mod graceful_shutdown;

pub use domain::{entities, use_cases};
pub use interfaces::{handlers, repositories, middlewares, routes};
pub use infrastructure::{auth, db, storage, utils};

use auth::jwt::JwtService;
use repositories::document::DocumentRepository;
use storage::uploads::UploadStore;
use use_cases::resources::ResourceHandler;

pub struct AppState {
    pub resource_handler: AppResourceHandler,
    pub jwt_service: JwtService,
    pub max_files_per_request: usize,
}

pub type AppResourceHandler = ResourceHandler<Arc<dyn DocumentRepository>>;

impl AppState {
    pub fn new(config: &settings::AppConfig, repo: Arc<dyn DocumentRepository>) -> Self {
        let uploads = Arc::new(UploadStore::new(config.upload_path(), config.max_upload_bytes()));

        AppState {
            resource_handler: ResourceHandler::new(repo, uploads),
            jwt_service: JwtService::new(&config.auth),
            max_files_per_request: config.uploads.max_files_per_request,
        }
    }
}
