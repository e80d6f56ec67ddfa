//! Admin-side pipeline: assembles multipart submissions, talks to the content
//! API, resolves stored asset paths into loadable URLs and keeps the query
//! cache consistent after mutations.

pub mod api;
pub mod asset_url;
pub mod cache;
pub mod config;
pub mod errors;
pub mod form_data;
pub mod notify;
pub mod service;
pub mod session;

pub use api::{ApiClient, Envelope};
pub use asset_url::{AssetUrlConfig, AssetUrlResolver};
pub use cache::{CacheCoordinator, QueryCache, QueryKey};
pub use config::ClientConfig;
pub use errors::ClientError;
pub use form_data::{assemble, EntityDraft, FieldValue, PendingUpload, Scalar, SubmissionEnvelope};
pub use notify::{Notice, Notifier, TracingNotifier};
pub use service::{ContentService, Scope};
pub use session::AdminSession;
