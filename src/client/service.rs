use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use super::{
    api::{ApiClient, Envelope},
    asset_url::AssetUrlResolver,
    cache::{CacheCoordinator, QueryCache, QueryKey},
    config::ClientConfig,
    errors::ClientError,
    form_data::{assemble, EntityDraft, FieldValue, PendingUpload, Scalar, SubmissionEnvelope},
    notify::{Notice, Notifier},
    session::AdminSession,
};
use crate::entities::{asset::AssetRef, resource::ResourceKind, schema::FieldKind};

/// Which audience a query is made for. Public views only see active entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Public,
    Admin,
}

impl Scope {
    pub fn qualifier(&self) -> &'static str {
        match self {
            Scope::Public => "public",
            Scope::Admin => "admin",
        }
    }

    fn parse(raw: &str) -> Option<Scope> {
        match raw {
            "public" => Some(Scope::Public),
            "admin" => Some(Scope::Admin),
            _ => None,
        }
    }
}

/// Admin-side entry point for reading and mutating content.
///
/// Every successful mutation invalidates the collection's cached queries
/// before the success notice goes out.
pub struct ContentService {
    api: ApiClient,
    resolver: AssetUrlResolver,
    coordinator: CacheCoordinator,
    session: Arc<AdminSession>,
    notifier: Arc<dyn Notifier>,
}

impl ContentService {
    pub fn new(
        config: &ClientConfig,
        session: Arc<AdminSession>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ClientError> {
        Ok(ContentService {
            api: ApiClient::new(config)?,
            resolver: AssetUrlResolver::new(config.asset_config()),
            coordinator: CacheCoordinator::new(Arc::new(QueryCache::new(config.cache_ttl))),
            session,
            notifier,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn resolver(&self) -> &AssetUrlResolver {
        &self.resolver
    }

    pub fn coordinator(&self) -> &CacheCoordinator {
        &self.coordinator
    }

    pub fn session(&self) -> &AdminSession {
        &self.session
    }

    pub fn list_key(kind: ResourceKind, scope: Scope) -> QueryKey {
        QueryKey::new(kind.as_str()).with(scope.qualifier())
    }

    pub fn item_key(kind: ResourceKind, scope: Scope, id: &str) -> QueryKey {
        Self::list_key(kind, scope).with(id)
    }

    /// Entries of a collection with asset paths already resolved.
    pub async fn list(&self, kind: ResourceKind, scope: Scope) -> Result<Vec<Value>, ClientError> {
        let api = self.api.clone();
        let resolver = self.resolver.clone();
        let token = self.token_for(scope);
        let path = format!("api/{}", kind);
        let query: Vec<(&'static str, String)> = match scope {
            Scope::Public => vec![("active", "true".to_string())],
            Scope::Admin => Vec::new(),
        };

        let fetched = self
            .coordinator
            .cache()
            .fetch_with(Self::list_key(kind, scope), move || async move {
                let body = api.get_json(&path, &query, token.as_deref()).await?;
                let mut items = kind.unwrap_list(body)?.items;
                for item in items.iter_mut() {
                    resolver.resolve_entity(kind, item);
                }
                Ok(Value::Array(items))
            })
            .await;

        match fetched {
            Ok(Value::Array(items)) => Ok(items),
            Ok(other) => Err(ClientError::Decode(format!("Expected a list, got {}", other))),
            Err(err) => Err(self.report(err)),
        }
    }

    /// One entity with asset paths resolved.
    pub async fn get(&self, kind: ResourceKind, scope: Scope, id: &str) -> Result<Value, ClientError> {
        let api = self.api.clone();
        let resolver = self.resolver.clone();
        let token = self.token_for(scope);
        let path = format!("api/{}/{}", kind, id);

        self.coordinator
            .cache()
            .fetch_with(Self::item_key(kind, scope, id), move || async move {
                let body = api.get_json(&path, &[], token.as_deref()).await?;
                let mut entity = Envelope::<Value>::from_value(body)?.into_data()?;
                resolver.resolve_entity(kind, &mut entity);
                Ok(entity)
            })
            .await
            .map_err(|err| self.report(err))
    }

    /// Creates an entity from a draft plus files for the collection's file field.
    pub async fn create(
        &self,
        kind: ResourceKind,
        draft: &EntityDraft,
        files: &[PendingUpload],
    ) -> Result<Value, ClientError> {
        let envelope = self.envelope_for(kind, draft, files)?;
        self.submit(kind, None, envelope).await
    }

    /// Updates an entity. The draft must carry every field to keep; retained
    /// assets go in as `FieldValue::Assets` and new files are appended.
    pub async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        draft: &EntityDraft,
        files: &[PendingUpload],
    ) -> Result<Value, ClientError> {
        let envelope = self.envelope_for(kind, draft, files)?;
        self.submit(kind, Some(id), envelope).await
    }

    /// Sends a prepared envelope, e.g. one carrying a second file field.
    /// Creates when `id` is `None`, updates otherwise.
    pub async fn submit(
        &self,
        kind: ResourceKind,
        id: Option<&str>,
        envelope: SubmissionEnvelope,
    ) -> Result<Value, ClientError> {
        let token = self.session.token();
        let (method, path, verb) = match id {
            None => (Method::POST, format!("api/{}", kind), "created"),
            Some(id) => (Method::PUT, format!("api/{}/{}", kind, id), "updated"),
        };

        let result = self
            .api
            .send_multipart(method, &path, envelope, token.as_deref())
            .await
            .and_then(|body| Envelope::<Value>::from_value(body)?.into_data());

        let mut entity = self.finish(kind, result, verb)?;
        self.resolver.resolve_entity(kind, &mut entity);
        Ok(entity)
    }

    pub async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), ClientError> {
        let token = self.session.token();
        let path = format!("api/{}/{}", kind, id);

        let result = self
            .api
            .send_json(Method::DELETE, &path, None, token.as_deref())
            .await;

        self.finish(kind, result, "deleted").map(|_| ())
    }

    /// Flips a service between active and inactive.
    pub async fn toggle_service(&self, id: &str) -> Result<Value, ClientError> {
        let kind = ResourceKind::Services;
        let token = self.session.token();
        let path = format!("api/{}/{}/toggle", kind, id);

        let result = self
            .api
            .send_json(Method::PATCH, &path, None, token.as_deref())
            .await
            .and_then(|body| Envelope::<Value>::from_value(body)?.into_data());

        let mut entity = self.finish(kind, result, "updated")?;
        self.resolver.resolve_entity(kind, &mut entity);
        Ok(entity)
    }

    /// Re-runs the queries evicted by earlier mutations. Returns how many
    /// were refreshed.
    pub async fn refetch_invalidated(&self) -> usize {
        let mut refreshed = 0;
        for key in self.coordinator.take_refetch_queue() {
            let Ok(kind) = key.resource().parse::<ResourceKind>() else {
                continue;
            };
            let scope = key.qualifiers().first().and_then(|q| Scope::parse(q));

            let outcome = match (scope, key.qualifiers().get(1)) {
                (Some(scope), None) => self.list(kind, scope).await.map(|_| ()),
                (Some(scope), Some(id)) => self.get(kind, scope, id).await.map(|_| ()),
                (None, _) => continue,
            };

            match outcome {
                Ok(()) => refreshed += 1,
                Err(err) => tracing::debug!("Refetch of {} failed: {}", key, err),
            }
        }
        refreshed
    }

    fn token_for(&self, scope: Scope) -> Option<String> {
        match scope {
            Scope::Admin => self.session.token(),
            Scope::Public => None,
        }
    }

    fn envelope_for(
        &self,
        kind: ResourceKind,
        draft: &EntityDraft,
        files: &[PendingUpload],
    ) -> Result<SubmissionEnvelope, ClientError> {
        let file_field = match (kind.primary_file_field(), files.is_empty()) {
            (Some(field), _) => field,
            (None, true) => "",
            (None, false) => {
                return Err(self.report(ClientError::Rejected(format!(
                    "{} does not accept files",
                    kind.label()
                ))));
            }
        };

        let draft = self.with_stored_references(kind, draft);
        assemble(Some(&draft), files, file_field).map_err(|err| self.report(err))
    }

    /// Drafts built from fetched entities carry resolved URLs; the server
    /// expects the relative references it handed out.
    fn with_stored_references(&self, kind: ResourceKind, draft: &EntityDraft) -> EntityDraft {
        let mut draft = draft.clone();
        for field in kind.schema() {
            let stored = match (field.kind, draft.get(field.name)) {
                (FieldKind::Image, Some(FieldValue::Scalar(Scalar::Text(url)))) => {
                    FieldValue::from(self.resolver.to_stored(url))
                }
                (FieldKind::Assets, Some(FieldValue::Assets(refs))) => FieldValue::Assets(
                    refs.iter()
                        .map(|asset| AssetRef {
                            url: self.resolver.to_stored(&asset.url),
                            name: asset.name.clone(),
                        })
                        .collect(),
                ),
                _ => continue,
            };
            draft.set(field.name, stored);
        }
        draft
    }

    /// Success path: invalidate the collection, then tell the operator.
    fn finish<T>(&self, kind: ResourceKind, result: Result<T, ClientError>, verb: &str) -> Result<T, ClientError> {
        match result {
            Ok(value) => {
                self.coordinator.invalidate_and_refetch(kind.as_str());
                self.notifier
                    .notify(Notice::Success(format!("{} {} successfully", kind.label(), verb)));
                Ok(value)
            }
            Err(err) => Err(self.report(err)),
        }
    }

    /// Routes a failure to the session and the operator, returning it.
    fn report(&self, err: ClientError) -> ClientError {
        if self.session.observe(&err) {
            return err;
        }
        match err.user_message() {
            Some(message) => self.notifier.notify(Notice::Error(message)),
            None => tracing::debug!("Suppressed notice for {}", err),
        }
        err
    }
}
