use actix_web::{middleware::NormalizePath, web, App, HttpServer};
use reqwest::Client;
use site_cms::{
    middlewares::auth::AuthMiddleware,
    repositories::{document::DocumentRepository, memory_repo::MemoryDocumentRepo},
    routes::configure_routes,
    settings::{AppConfig, AppEnvironment},
    AppState,
};
use std::{net::TcpListener, path::PathBuf, sync::Arc, time::Duration};
use uuid::Uuid;

/// Smallest PNG header `infer` recognises as `image/png`.
#[allow(dead_code)]
pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, 0x49, 0x48, 0x44, 0x52];

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub config: AppConfig,
    pub admin_token: String,
    pub visitor_token: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let config = test_config();

        let repo: Arc<dyn DocumentRepository> = Arc::new(MemoryDocumentRepo::new());
        let state = web::Data::new(AppState::new(&config, repo));

        let admin_token = state.jwt_service.create_jwt("admin", true).expect("Failed to sign admin token");
        let visitor_token = state.jwt_service.create_jwt("visitor", false).expect("Failed to sign token");

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .wrap(AuthMiddleware)
                .wrap(NormalizePath::trim())
                .configure(configure_routes)
        })
        .listen(listener)
        .expect("Failed to bind server")
        .workers(1)
        .run();

        tokio::spawn(server);

        let client = Client::new();
        while client.get(&address).send().await.is_err() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Self {
            address,
            client,
            config,
            admin_token,
            visitor_token,
        }
    }

    #[allow(dead_code)]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.address, path.trim_start_matches('/'))
    }

    #[allow(dead_code)]
    pub fn upload_root(&self) -> PathBuf {
        self.config.upload_path()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(self.config.upload_path());
    }
}

fn test_config() -> AppConfig {
    let upload_dir = std::env::temp_dir().join(format!("site-cms-test-{}", Uuid::new_v4()));

    let mut config = AppConfig {
        env: AppEnvironment::Testing,
        ..AppConfig::default()
    };
    config.server.name = "Site CMS Test".into();
    config.server.port = 0;
    config.server.worker_count = 1;
    config.auth.jwt_secret = "test_jwt_secret_that_is_long_enough_for_hs512_1234567890".into();
    config.auth.jwt_expiration_minutes = 5;
    config.uploads.dir = upload_dir.to_string_lossy().into_owned();
    config.uploads.max_file_mb = 1;
    config.uploads.max_files_per_request = 5;
    config
}
