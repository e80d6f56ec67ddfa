use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Number, Value};

use crate::{
    entities::{
        asset::{stored_path, AssetRef},
        resource::ResourceKind,
    },
    errors::{AppError, FieldError},
};

/// Storage shape of a single document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    Date,
    /// Ordered sequence of scalars (`features`, `tags`, ...).
    List,
    /// Ordered sequence of `AssetRef`.
    Assets,
    /// A single stored upload path.
    Image,
    /// Nested mapping of scalars (`socialLinks`).
    Mapping,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default_flag: Option<bool>,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        FieldSpec { name, kind, required: true, default_flag: None }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        FieldSpec { name, kind, required: false, default_flag: None }
    }

    pub const fn flag(name: &'static str, default: bool) -> Self {
        FieldSpec { name, kind: FieldKind::Bool, required: false, default_flag: Some(default) }
    }
}

const SYSTEM_FIELDS: [&str; 4] = ["_id", "id", "createdAt", "updatedAt"];

const NOT_AN_UPLOAD: &str = "must reference an uploaded file (uploads/...)";

/// Casts loosely typed submitted values (multipart text is always a string)
/// into the collection's field kinds. Unknown fields are dropped.
pub fn coerce_fields(kind: ResourceKind, raw: Map<String, Value>) -> Result<Map<String, Value>, AppError> {
    let mut out = Map::new();
    let mut errors = Vec::new();

    for (name, value) in raw {
        if SYSTEM_FIELDS.contains(&name.as_str()) {
            continue;
        }
        let Some(spec) = kind.field(&name) else {
            tracing::debug!("Dropping unknown field '{}' for {}", name, kind);
            continue;
        };
        match coerce_value(spec.kind, value) {
            Ok(v) => {
                out.insert(name, v);
            }
            Err(message) => errors.push(FieldError::new(name, message)),
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(AppError::Validation(errors))
    }
}

fn coerce_value(kind: FieldKind, value: Value) -> Result<Value, &'static str> {
    match kind {
        FieldKind::Text => match value {
            Value::Null | Value::String(_) => Ok(value),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err("must be text"),
        },
        FieldKind::Number => match value {
            Value::Null | Value::Number(_) => Ok(value),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => parse_number(s.trim()).ok_or("must be a number"),
            _ => Err("must be a number"),
        },
        FieldKind::Bool => match value {
            Value::Bool(_) => Ok(value),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err("must be true or false"),
            },
            _ => Err("must be true or false"),
        },
        FieldKind::Date => match value {
            Value::Null => Ok(value),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) if is_date(s.trim()) => Ok(Value::String(s.trim().to_string())),
            _ => Err("must be a date (YYYY-MM-DD or RFC 3339)"),
        },
        FieldKind::List => {
            let items = match value {
                Value::Null => Vec::new(),
                Value::Array(items) => items,
                other => vec![other],
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) if s.trim().is_empty() => {}
                    Value::String(s) => out.push(Value::String(s.trim().to_string())),
                    Value::Number(n) => out.push(Value::String(n.to_string())),
                    Value::Bool(b) => out.push(Value::String(b.to_string())),
                    Value::Null => {}
                    _ => return Err("must be a list of text values"),
                }
            }
            Ok(Value::Array(out))
        }
        FieldKind::Assets => {
            let items = match value {
                Value::Null => Vec::new(),
                Value::Array(items) => items,
                other => vec![other],
            };
            let mut refs = Vec::with_capacity(items.len());
            for item in items {
                let asset = match item {
                    Value::String(url) => AssetRef::new(url),
                    Value::Object(_) => serde_json::from_value::<AssetRef>(item)
                        .map_err(|_| "asset entries need a url")?,
                    Value::Null => continue,
                    _ => return Err("must be a list of assets"),
                };
                if asset.is_blank() {
                    continue;
                }
                let url = stored_path(&asset.url).ok_or(NOT_AN_UPLOAD)?;
                refs.push(AssetRef { url, ..asset });
            }
            serde_json::to_value(refs).map_err(|_| "must be a list of assets")
        }
        FieldKind::Image => match value {
            Value::Null => Ok(value),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(path) => stored_path(&path).map(Value::String).ok_or(NOT_AN_UPLOAD),
            Value::Object(mut obj) => match obj.remove("url") {
                Some(Value::String(url)) if !url.trim().is_empty() => {
                    stored_path(&url).map(Value::String).ok_or(NOT_AN_UPLOAD)
                }
                _ => Err("image must be a path"),
            },
            _ => Err("image must be a path"),
        },
        FieldKind::Mapping => match value {
            Value::Null => Ok(Value::Object(Map::new())),
            Value::Object(obj) => {
                let mut out = Map::new();
                for (key, v) in obj {
                    let text = match v {
                        Value::Null => String::new(),
                        Value::String(s) => s,
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        _ => return Err("must map keys to text values"),
                    };
                    out.insert(key, Value::String(text));
                }
                Ok(Value::Object(out))
            }
            _ => Err("must map keys to text values"),
        },
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
}

/// Fills boolean flags that were not submitted on create.
pub fn apply_defaults(kind: ResourceKind, doc: &mut Map<String, Value>) {
    for spec in kind.schema() {
        if let Some(default) = spec.default_flag {
            doc.entry(spec.name).or_insert(Value::Bool(default));
        }
    }
}

pub fn check_required(kind: ResourceKind, doc: &Map<String, Value>) -> Result<(), AppError> {
    let errors: Vec<FieldError> = kind
        .schema()
        .iter()
        .filter(|spec| spec.required)
        .filter(|spec| match doc.get(spec.name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        })
        .map(|spec| FieldError::new(spec.name, "is required"))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Every upload path a document references, across image and asset-list fields.
pub fn asset_paths(kind: ResourceKind, doc: &Map<String, Value>) -> Vec<String> {
    let mut paths = Vec::new();
    for spec in kind.schema() {
        match (spec.kind, doc.get(spec.name)) {
            (FieldKind::Image, Some(Value::String(path))) => paths.push(path.clone()),
            (FieldKind::Assets, Some(Value::Array(items))) => {
                paths.extend(
                    items
                        .iter()
                        .filter_map(|item| item.get("url").and_then(Value::as_str))
                        .map(str::to_string),
                );
            }
            _ => {}
        }
    }
    paths
}
