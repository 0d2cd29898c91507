use serde::{Deserialize, Serialize};

/// Structured template configuration carried by a case study agent. The JSON
/// shape is shared with the admin UI, hence the camelCase field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub slide_width: Option<f64>,
    #[serde(default)]
    pub slide_height: Option<f64>,
    #[serde(default)]
    pub branding: Option<BrandingConfig>,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
}

impl TemplateConfig {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Comma-separated section keys, in declared order, as handed to the
    /// section-extraction prompt.
    pub fn section_keys(&self) -> String {
        self.sections
            .iter()
            .map(|section| section.key.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The section rule set serialized for the content validator.
    pub fn rules_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.sections)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionConfig {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub section_type: Option<SectionType>,
    #[serde(default)]
    pub position: Option<PositionConfig>,
    #[serde(default)]
    pub content_rules: Option<ContentRulesConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionType {
    Text,
    BulletList,
    TagList,
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingConfig {
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub accent_color: Option<String>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub heading_font_family: Option<String>,
    #[serde(default)]
    pub heading_font_size: Option<i32>,
    #[serde(default)]
    pub body_font_size: Option<i32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionConfig {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRulesConfig {
    #[serde(default)]
    pub max_characters: Option<i32>,
    #[serde(default)]
    pub min_bullets: Option<i32>,
    #[serde(default)]
    pub max_bullets: Option<i32>,
    #[serde(default)]
    pub max_bullet_chars: Option<i32>,
    #[serde(default)]
    pub min_items: Option<i32>,
    #[serde(default)]
    pub max_items: Option<i32>,
}
