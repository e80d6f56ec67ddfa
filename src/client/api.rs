use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use url::Url;

use super::{config::ClientConfig, errors::ClientError, form_data::SubmissionEnvelope};
use crate::entities::{document::Pagination, resource::ResourceKind};

/// Normalised `{ success, data }` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

impl<T: DeserializeOwned> Envelope<T> {
    pub fn from_value(body: Value) -> Result<Self, ClientError> {
        Ok(serde_json::from_value(body)?)
    }

    /// The payload of a successful envelope.
    pub fn into_data(self) -> Result<T, ClientError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ClientError::Decode(
                self.message.unwrap_or_else(|| "Request reported failure".into()),
            ))
        }
    }
}

/// One page of a collection after unwrapping its resource-specific shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResult {
    pub items: Vec<Value>,
    pub pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct FlatList {
    #[serde(default = "default_success")]
    success: bool,
    data: Vec<Value>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct AchievementPage {
    achievements: Vec<Value>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

impl ResourceKind {
    /// Unwraps a list response. Achievements answer with
    /// `{ data: { achievements, pagination } }`, every other collection with
    /// `{ data: [...], pagination? }`.
    pub fn unwrap_list(&self, body: Value) -> Result<ListResult, ClientError> {
        match self {
            ResourceKind::Achievements => {
                let page = Envelope::<AchievementPage>::from_value(body)?.into_data()?;
                Ok(ListResult { items: page.achievements, pagination: page.pagination })
            }
            _ => {
                let list: FlatList = serde_json::from_value(body)?;
                if !list.success {
                    return Err(ClientError::Decode(format!("{} list reported failure", self.label())));
                }
                Ok(ListResult { items: list.data, pagination: list.pagination })
            }
        }
    }
}

/// HTTP transport for the content API. Credentials are passed per call.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    json_timeout: Duration,
    multipart_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let raw = format!("{}/", config.api_base().trim_end_matches('/'));
        let base = Url::parse(&raw)
            .map_err(|e| ClientError::Rejected(format!("Invalid API origin '{}': {}", raw, e)))?;

        Ok(ApiClient {
            http: Client::new(),
            base,
            json_timeout: config.json_timeout,
            multipart_timeout: config.multipart_timeout,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Rejected(format!("Invalid path '{}': {}", path, e)))
    }

    fn request(&self, method: Method, url: Url, token: Option<&str>, timeout: Duration) -> RequestBuilder {
        let builder = self.http.request(method, url).timeout(timeout);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(builder: RequestBuilder) -> Result<Value, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = ClientError::from_status(status, &body);
            tracing::debug!("Request failed with {}: {}", status, err);
            return Err(err);
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// GET with one automatic retry on network failure or timeout.
    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<&str>,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;

        let attempt = || {
            Self::execute(self.request(Method::GET, url.clone(), token, self.json_timeout).query(query))
        };

        match attempt().await {
            Err(err) if err.is_retryable() => {
                tracing::warn!("GET {} failed ({}), retrying once", path, err);
                attempt().await
            }
            result => result,
        }
    }

    /// JSON mutation. Never retried.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let mut builder = self.request(method, url, token, self.json_timeout);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Self::execute(builder).await
    }

    /// Multipart create/update with the longer upload timeout. Never retried.
    pub async fn send_multipart(
        &self,
        method: Method,
        path: &str,
        envelope: SubmissionEnvelope,
        token: Option<&str>,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let form = envelope.into_form()?;
        let builder = self
            .request(method, url, token, self.multipart_timeout)
            .multipart(form);
        Self::execute(builder).await
    }

    /// Downloads a resolved asset URL, returning the bytes and content type.
    pub async fn fetch_asset(&self, url: &str) -> Result<(Vec<u8>, Option<String>), ClientError> {
        let url = match Url::parse(url) {
            Ok(absolute) => absolute,
            Err(_) => self.endpoint(url)?,
        };

        let response = self
            .request(Method::GET, url, None, self.json_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status, &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }
}
