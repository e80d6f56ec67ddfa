use serde_json::Value;
use url::Url;

use crate::entities::{asset::AssetRef, resource::ResourceKind, schema::FieldKind};

const PASSTHROUGH_PREFIXES: [&str; 3] = ["http://", "https://", "data:"];

/// Environment the resolver runs in, fixed at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetUrlConfig {
    pub explicit_api_origin: Option<String>,
    pub is_development: bool,
    /// Origin the pages are served from, used in production.
    pub page_origin: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Base {
    /// Root-relative paths answered by the dev server's proxy.
    DevProxy,
    /// Normalised origin without a trailing slash.
    Origin(String),
    /// The configured origin could not be parsed; paths are returned as given.
    Unusable,
}

/// Turns stored relative asset paths into URLs the current environment can load.
#[derive(Debug, Clone)]
pub struct AssetUrlResolver {
    base: Base,
}

impl AssetUrlResolver {
    pub fn new(config: AssetUrlConfig) -> Self {
        let explicit = config
            .explicit_api_origin
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty());

        let base = match (config.is_development, explicit) {
            (true, None) => Base::DevProxy,
            (true, Some(origin)) => normalise_origin(origin),
            (false, _) => normalise_origin(&config.page_origin),
        };

        AssetUrlResolver { base }
    }

    /// Returns a loadable URL, or `""` when there is nothing to load.
    pub fn resolve(&self, reference: Option<&str>) -> String {
        let reference = match reference {
            Some(r) if !r.trim().is_empty() => r.trim(),
            _ => return String::new(),
        };

        let lower = reference.to_ascii_lowercase();
        if PASSTHROUGH_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
            return reference.to_string();
        }

        let path = reference.trim_start_matches('/');
        match &self.base {
            Base::DevProxy => format!("/{}", path),
            Base::Origin(origin) => format!("{}/{}", origin, path),
            Base::Unusable => reference.to_string(),
        }
    }

    pub fn resolve_asset(&self, asset: &AssetRef) -> String {
        self.resolve(Some(&asset.url))
    }

    /// Maps a URL produced by `resolve` back to the relative reference the
    /// server stores. Foreign URLs are returned unchanged.
    pub fn to_stored(&self, url: &str) -> String {
        let url = url.trim();
        let relative = match &self.base {
            Base::Origin(origin) => url.strip_prefix(origin.as_str()).and_then(|rest| rest.strip_prefix('/')),
            Base::DevProxy => url.strip_prefix('/').filter(|rest| !rest.starts_with('/')),
            Base::Unusable => None,
        };
        relative.unwrap_or(url).to_string()
    }

    /// Rewrites every asset field of an entity in place so list views can
    /// hand the URLs straight to `<img>`/`<a>` elements.
    pub fn resolve_entity(&self, kind: ResourceKind, entity: &mut Value) {
        let Some(fields) = entity.as_object_mut() else {
            return;
        };

        for field in kind.schema() {
            let Some(value) = fields.get_mut(field.name) else {
                continue;
            };
            match (field.kind, value) {
                (FieldKind::Image, Value::String(path)) => *path = self.resolve(Some(path.as_str())),
                (FieldKind::Assets, Value::Array(items)) => {
                    for item in items.iter_mut() {
                        match item {
                            Value::String(path) => *path = self.resolve(Some(path.as_str())),
                            Value::Object(_) => {
                                let Ok(asset) = serde_json::from_value::<AssetRef>(item.clone()) else {
                                    continue;
                                };
                                item["url"] = Value::String(self.resolve_asset(&asset));
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn normalise_origin(origin: &str) -> Base {
    match Url::parse(origin.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Base::Origin(url.as_str().trim_end_matches('/').to_string())
        }
        Ok(url) => {
            tracing::warn!("Asset origin '{}' is not an http(s) origin, paths stay unresolved", url);
            Base::Unusable
        }
        Err(e) => {
            tracing::warn!("Asset origin '{}' is invalid ({}), paths stay unresolved", origin, e);
            Base::Unusable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn production(origin: &str) -> AssetUrlResolver {
        AssetUrlResolver::new(AssetUrlConfig {
            explicit_api_origin: None,
            is_development: false,
            page_origin: origin.into(),
        })
    }

    fn development(explicit: Option<&str>) -> AssetUrlResolver {
        AssetUrlResolver::new(AssetUrlConfig {
            explicit_api_origin: explicit.map(str::to_string),
            is_development: true,
            page_origin: "http://localhost:3000".into(),
        })
    }

    #[test]
    fn absolute_and_data_urls_pass_through() {
        let resolver = production("https://example.com");

        for url in [
            "https://example.com/a.png",
            "http://cdn.example.com/b.jpg",
            "data:image/png;base64,iVBORw0KGgo=",
        ] {
            assert_eq!(resolver.resolve(Some(url)), url);
            assert_eq!(resolver.resolve(Some(&resolver.resolve(Some(url)))), url);
        }
    }

    #[test]
    fn leading_slash_does_not_change_the_result() {
        for resolver in [production("https://example.com/"), development(None), development(Some("http://localhost:5000"))] {
            assert_eq!(
                resolver.resolve(Some("/uploads/images/a.jpg")),
                resolver.resolve(Some("uploads/images/a.jpg"))
            );
        }
    }

    #[test]
    fn missing_references_resolve_to_empty() {
        let resolver = production("https://example.com");
        assert_eq!(resolver.resolve(None), "");
        assert_eq!(resolver.resolve(Some("")), "");
        assert_eq!(resolver.resolve(Some("   ")), "");
    }

    #[test]
    fn joins_origin_with_exactly_one_slash() {
        assert_eq!(
            production("https://example.com/").resolve(Some("/uploads/images/a.jpg")),
            "https://example.com/uploads/images/a.jpg"
        );
        assert_eq!(
            production("https://example.com/site").resolve(Some("uploads/a.jpg")),
            "https://example.com/site/uploads/a.jpg"
        );
    }

    #[test]
    fn development_uses_proxy_unless_origin_is_explicit() {
        assert_eq!(development(None).resolve(Some("uploads/a.jpg")), "/uploads/a.jpg");
        assert_eq!(
            development(Some("http://localhost:5000/")).resolve(Some("uploads/a.jpg")),
            "http://localhost:5000/uploads/a.jpg"
        );
    }

    #[test]
    fn unusable_origin_falls_back_to_input() {
        let resolver = production("not a url");
        assert_eq!(resolver.resolve(Some("/uploads/a.jpg")), "/uploads/a.jpg");
    }

    #[test]
    fn resolved_urls_map_back_to_stored_references() {
        let resolver = production("https://example.com");
        let resolved = resolver.resolve(Some("uploads/images/a.png"));
        assert_eq!(resolver.to_stored(&resolved), "uploads/images/a.png");
        assert_eq!(resolver.to_stored("https://cdn.example.org/a.png"), "https://cdn.example.org/a.png");

        let dev = development(None);
        assert_eq!(dev.to_stored(&dev.resolve(Some("uploads/a.jpg"))), "uploads/a.jpg");
        assert_eq!(dev.to_stored("//cdn.example.org/a.png"), "//cdn.example.org/a.png");
    }

    #[test]
    fn resolves_asset_fields_of_entities() {
        let resolver = production("https://example.com");
        let mut entity = json!({
            "title": "Award",
            "images": [{ "url": "uploads/images/a.png", "name": "a.png" }, "uploads/images/b.png"],
            "documents": [{ "url": "/uploads/documents/c.pdf" }]
        });

        resolver.resolve_entity(ResourceKind::Achievements, &mut entity);

        assert_eq!(entity["images"][0]["url"], "https://example.com/uploads/images/a.png");
        assert_eq!(entity["images"][0]["name"], "a.png");
        assert_eq!(entity["images"][1], "https://example.com/uploads/images/b.png");
        assert_eq!(entity["documents"][0]["url"], "https://example.com/uploads/documents/c.pdf");
        assert_eq!(entity["title"], "Award");
    }
}
