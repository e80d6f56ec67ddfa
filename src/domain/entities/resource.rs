use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::entities::schema::{FieldKind, FieldSpec};

/// Every content collection exposed under `/api/{resource}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Achievements,
    Services,
    Projects,
    Team,
    Content,
    Customizations,
    Contact,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Achievements,
        ResourceKind::Services,
        ResourceKind::Projects,
        ResourceKind::Team,
        ResourceKind::Content,
        ResourceKind::Customizations,
        ResourceKind::Contact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Achievements => "achievements",
            ResourceKind::Services => "services",
            ResourceKind::Projects => "projects",
            ResourceKind::Team => "team",
            ResourceKind::Content => "content",
            ResourceKind::Customizations => "customizations",
            ResourceKind::Contact => "contact",
        }
    }

    /// Human label used in response messages.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Achievements => "Achievement",
            ResourceKind::Services => "Service",
            ResourceKind::Projects => "Project",
            ResourceKind::Team => "Team member",
            ResourceKind::Content => "Content section",
            ResourceKind::Customizations => "Customization",
            ResourceKind::Contact => "Contact message",
        }
    }

    pub fn schema(&self) -> &'static [FieldSpec] {
        match self {
            ResourceKind::Achievements => ACHIEVEMENT_FIELDS,
            ResourceKind::Services => SERVICE_FIELDS,
            ResourceKind::Projects => PROJECT_FIELDS,
            ResourceKind::Team => TEAM_FIELDS,
            ResourceKind::Content => CONTENT_FIELDS,
            ResourceKind::Customizations => CUSTOMIZATION_FIELDS,
            ResourceKind::Contact => CONTACT_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.schema().iter().find(|f| f.name == name)
    }

    /// Multipart keys this resource accepts file parts under.
    pub fn file_fields(&self) -> Vec<&'static str> {
        self.schema()
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Assets | FieldKind::Image))
            .map(|f| f.name)
            .collect()
    }

    /// The shared key the admin forms attach their main file selection under.
    pub fn primary_file_field(&self) -> Option<&'static str> {
        self.file_fields().into_iter().next()
    }

    pub fn accepts_files(&self, field: &str) -> bool {
        self.file_fields().contains(&field)
    }

    /// Only services expose `PATCH /{id}/toggle`.
    pub fn supports_toggle(&self) -> bool {
        matches!(self, ResourceKind::Services)
    }

    /// Contact submissions come from anonymous visitors.
    pub fn public_create(&self) -> bool {
        matches!(self, ResourceKind::Contact)
    }

    /// Contact messages are never listed publicly.
    pub fn public_read(&self) -> bool {
        !matches!(self, ResourceKind::Contact)
    }

    /// Achievements answer list calls with `{ data: { achievements, pagination } }`.
    pub fn list_key(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Achievements => Some("achievements"),
            _ => None,
        }
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown resource: {}", s))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ───── Collection schemas ───────────────────────────────────────────

const ACHIEVEMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("title", FieldKind::Text),
    FieldSpec::optional("description", FieldKind::Text),
    FieldSpec::optional("category", FieldKind::Text),
    FieldSpec::optional("date", FieldKind::Date),
    FieldSpec::optional("images", FieldKind::Assets),
    FieldSpec::optional("documents", FieldKind::Assets),
    FieldSpec::optional("tags", FieldKind::List),
    FieldSpec::flag("featured", false),
    FieldSpec::flag("active", true),
    FieldSpec::optional("order", FieldKind::Number),
];

const SERVICE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("title", FieldKind::Text),
    FieldSpec::required("description", FieldKind::Text),
    FieldSpec::optional("icon", FieldKind::Text),
    FieldSpec::optional("image", FieldKind::Image),
    FieldSpec::optional("features", FieldKind::List),
    FieldSpec::optional("price", FieldKind::Text),
    FieldSpec::flag("popular", false),
    FieldSpec::flag("active", true),
    FieldSpec::optional("order", FieldKind::Number),
];

const PROJECT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("title", FieldKind::Text),
    FieldSpec::optional("description", FieldKind::Text),
    FieldSpec::optional("client", FieldKind::Text),
    FieldSpec::optional("category", FieldKind::Text),
    FieldSpec::optional("technologies", FieldKind::List),
    FieldSpec::optional("images", FieldKind::Assets),
    FieldSpec::optional("liveUrl", FieldKind::Text),
    FieldSpec::optional("githubUrl", FieldKind::Text),
    FieldSpec::optional("completedAt", FieldKind::Date),
    FieldSpec::flag("featured", false),
    FieldSpec::flag("active", true),
    FieldSpec::optional("order", FieldKind::Number),
];

const TEAM_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldKind::Text),
    FieldSpec::required("position", FieldKind::Text),
    FieldSpec::optional("bio", FieldKind::Text),
    FieldSpec::optional("email", FieldKind::Text),
    FieldSpec::optional("image", FieldKind::Image),
    FieldSpec::optional("skills", FieldKind::List),
    FieldSpec::optional("socialLinks", FieldKind::Mapping),
    FieldSpec::flag("active", true),
    FieldSpec::optional("order", FieldKind::Number),
];

const CONTENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("section", FieldKind::Text),
    FieldSpec::optional("title", FieldKind::Text),
    FieldSpec::optional("subtitle", FieldKind::Text),
    FieldSpec::optional("body", FieldKind::Text),
    FieldSpec::optional("image", FieldKind::Image),
    FieldSpec::optional("items", FieldKind::List),
    FieldSpec::flag("active", true),
    FieldSpec::optional("order", FieldKind::Number),
];

const CUSTOMIZATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("siteName", FieldKind::Text),
    FieldSpec::optional("tagline", FieldKind::Text),
    FieldSpec::optional("primaryColor", FieldKind::Text),
    FieldSpec::optional("secondaryColor", FieldKind::Text),
    FieldSpec::optional("heroTitle", FieldKind::Text),
    FieldSpec::optional("heroSubtitle", FieldKind::Text),
    FieldSpec::optional("image", FieldKind::Image),
    FieldSpec::optional("contactInfo", FieldKind::Mapping),
    FieldSpec::optional("socialLinks", FieldKind::Mapping),
    FieldSpec::flag("active", true),
];

const CONTACT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldKind::Text),
    FieldSpec::required("email", FieldKind::Text),
    FieldSpec::optional("phone", FieldKind::Text),
    FieldSpec::optional("subject", FieldKind::Text),
    FieldSpec::required("message", FieldKind::Text),
    FieldSpec::flag("read", false),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_segments_case_insensitively() {
        assert_eq!("Services".parse::<ResourceKind>().unwrap(), ResourceKind::Services);
        assert!("blog".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn file_fields_follow_schema_order() {
        assert_eq!(ResourceKind::Achievements.file_fields(), vec!["images", "documents"]);
        assert_eq!(ResourceKind::Services.primary_file_field(), Some("image"));
        assert_eq!(ResourceKind::Projects.primary_file_field(), Some("images"));
        assert_eq!(ResourceKind::Contact.primary_file_field(), None);
    }

    #[test]
    fn only_services_toggle() {
        let toggling: Vec<_> = ResourceKind::ALL.iter().filter(|k| k.supports_toggle()).collect();
        assert_eq!(toggling, vec![&ResourceKind::Services]);
    }
}
