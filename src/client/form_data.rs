use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};

use super::errors::ClientError;
use crate::entities::asset::AssetRef;

/// Fields the server manages itself and never accepts back.
const SYSTEM_FIELDS: [&str; 5] = ["_id", "id", "createdAt", "updatedAt", "__v"];

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Scalar {
    fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.trim().is_empty())
    }

    /// Form encoding: booleans become `"true"`/`"false"`, whole numbers drop the fraction.
    pub fn to_form_value(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            Scalar::Number(n) => n.to_string(),
        }
    }

    fn from_json(value: &Value) -> Option<Scalar> {
        match value {
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value as f64)
    }
}

/// One field of an entity being edited.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Left out of the submission entirely.
    Null,
    Scalar(Scalar),
    List(Vec<Scalar>),
    /// Existing stored files the entity keeps.
    Assets(Vec<AssetRef>),
    /// Ordered sub-keys, e.g. social links.
    Mapping(Vec<(String, Scalar)>),
    /// Explicitly empties a list field on the server.
    Clear,
}

macro_rules! scalar_field_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_field_from!(&str, String, bool, f64, i64, Scalar);

impl FieldValue {
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn mapping<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Scalar>,
    {
        FieldValue::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Converts a field of a fetched entity back into an editable value.
    pub fn from_json(value: &Value) -> FieldValue {
        match value {
            Value::Null => FieldValue::Null,
            Value::Array(items) if items.iter().any(|i| i.get("url").is_some()) => FieldValue::Assets(
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<AssetRef>(item.clone()).ok())
                    .collect(),
            ),
            Value::Array(items) => FieldValue::List(items.iter().filter_map(Scalar::from_json).collect()),
            Value::Object(entries) => FieldValue::Mapping(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Scalar::from_json(v).unwrap_or(Scalar::Text(String::new()))))
                    .collect(),
            ),
            scalar => Scalar::from_json(scalar).map(FieldValue::Scalar).unwrap_or(FieldValue::Null),
        }
    }
}

/// Ordered field map of the entity being created or edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDraft {
    fields: Vec<(String, FieldValue)>,
}

impl EntityDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field, keeping its original position when it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Seeds an edit form from an entity returned by the API. Every field is
    /// carried over so an update preserves what the operator did not touch.
    pub fn from_entity(entity: &Map<String, Value>) -> Self {
        let fields = entity
            .iter()
            .filter(|(name, _)| !SYSTEM_FIELDS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), FieldValue::from_json(value)))
            .collect();
        EntityDraft { fields }
    }
}

/// A file picked by the operator and not yet submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingUpload {
    /// Wraps selected bytes, sniffing the content type from the data.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let content_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        PendingUpload { file_name: file_name.into(), content_type, bytes }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Rejected(format!("Cannot read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        Ok(PendingUpload::new(file_name, bytes))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopePart {
    Text { name: String, value: String },
    File { name: String, upload: PendingUpload },
}

impl EnvelopePart {
    pub fn name(&self) -> &str {
        match self {
            EnvelopePart::Text { name, .. } | EnvelopePart::File { name, .. } => name,
        }
    }
}

/// Ordered multipart body for one create or update call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionEnvelope {
    parts: Vec<EnvelopePart>,
}

impl SubmissionEnvelope {
    pub fn parts(&self) -> &[EnvelopePart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Text entries as `(key, value)` pairs in emission order.
    pub fn text_entries(&self) -> Vec<(&str, &str)> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                EnvelopePart::Text { name, value } => Some((name.as_str(), value.as_str())),
                EnvelopePart::File { .. } => None,
            })
            .collect()
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.text_entries()
            .into_iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn files_for(&self, field: &str) -> Vec<&PendingUpload> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                EnvelopePart::File { name, upload } if name == field => Some(upload),
                _ => None,
            })
            .collect()
    }

    pub fn has_files(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, EnvelopePart::File { .. }))
    }

    fn push_text(&mut self, name: String, value: String) {
        self.parts.push(EnvelopePart::Text { name, value });
    }

    /// Appends files under one shared key, in selection order. Used for the
    /// primary file field and for a second one such as `documents`.
    pub fn push_files(&mut self, field: &str, files: &[PendingUpload]) -> Result<(), ClientError> {
        if files.is_empty() {
            return Ok(());
        }
        if field.trim().is_empty() {
            return Err(ClientError::Rejected("File field name is required".into()));
        }
        self.parts.extend(files.iter().map(|upload| EnvelopePart::File {
            name: field.to_string(),
            upload: upload.clone(),
        }));
        Ok(())
    }

    /// Builds the HTTP body, preserving part order.
    pub fn into_form(self) -> Result<Form, ClientError> {
        self.parts.into_iter().try_fold(Form::new(), |form, part| match part {
            EnvelopePart::Text { name, value } => Ok(form.text(name, value)),
            EnvelopePart::File { name, upload } => {
                let file = Part::bytes(upload.bytes)
                    .file_name(upload.file_name)
                    .mime_str(&upload.content_type)
                    .map_err(|e| ClientError::Rejected(format!("Invalid content type: {}", e)))?;
                Ok(form.part(name, file))
            }
        })
    }
}

/// Flattens an entity edit plus selected files into the bracket-notation
/// multipart layout the content API parses.
///
/// Sequences emit `field[i]` with blank items dropped before indexing, asset
/// refs emit `field[i][url]`/`field[i][name]`, mappings emit `field[key]`,
/// booleans emit `"true"`/`"false"`, and every file goes under `file_field`
/// without an index. Empty sequences emit nothing; [`FieldValue::Clear`] emits
/// the `field[]` tombstone.
pub fn assemble(
    entity: Option<&EntityDraft>,
    files: &[PendingUpload],
    file_field: &str,
) -> Result<SubmissionEnvelope, ClientError> {
    let entity = entity.ok_or_else(|| ClientError::InvalidInput("missing data".into()))?;
    let mut envelope = SubmissionEnvelope::default();

    for (name, value) in entity.fields() {
        match value {
            FieldValue::Null => {}
            FieldValue::Scalar(scalar) => envelope.push_text(name.to_string(), scalar.to_form_value()),
            FieldValue::List(items) => {
                for (i, item) in items.iter().filter(|item| !item.is_blank()).enumerate() {
                    envelope.push_text(format!("{}[{}]", name, i), item.to_form_value());
                }
            }
            FieldValue::Assets(refs) => {
                for (i, asset) in refs.iter().filter(|asset| !asset.is_blank()).enumerate() {
                    envelope.push_text(format!("{}[{}][url]", name, i), asset.url.clone());
                    if let Some(file_name) = &asset.name {
                        envelope.push_text(format!("{}[{}][name]", name, i), file_name.clone());
                    }
                }
            }
            FieldValue::Mapping(entries) => {
                for (key, item) in entries {
                    envelope.push_text(format!("{}[{}]", name, key), item.to_form_value());
                }
            }
            FieldValue::Clear => envelope.push_text(format!("{}[]", name), String::new()),
        }
    }

    envelope.push_files(file_field, files)?;

    tracing::debug!(
        "Assembled submission with {} parts ({} files under '{}')",
        envelope.len(),
        files.len(),
        file_field
    );
    Ok(envelope)
}
