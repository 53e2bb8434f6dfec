//! Domain types for table-driven slide decks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Settings every deck can rely on, used when the Config table omits them.
pub const CONFIG_DEFAULTS: &[(&str, ConfigDefault)] = &[
    ("title_slide_font_size", ConfigDefault::Number(44.0)),
    ("section_slide_font_size", ConfigDefault::Number(40.0)),
    ("content_title_font_size", ConfigDefault::Number(36.0)),
    ("subtitle_font_size", ConfigDefault::Number(24.0)),
    ("bullet_font_size", ConfigDefault::Number(20.0)),
    ("header_font", ConfigDefault::Text("Arial")),
    ("body_font", ConfigDefault::Text("Arial")),
    ("text_color", ConfigDefault::Text("#000000")),
];

/// A compile-time default for a config key.
#[derive(Debug, Clone, Copy)]
pub enum ConfigDefault {
    Number(f64),
    Text(&'static str),
}

impl From<ConfigDefault> for ConfigValue {
    fn from(value: ConfigDefault) -> Self {
        match value {
            ConfigDefault::Number(n) => ConfigValue::Number(n),
            ConfigDefault::Text(s) => ConfigValue::Text(s.to_string()),
        }
    }
}

/// A single typed config value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl ConfigValue {
    /// Coerce a raw cell: numeric-looking text becomes a number, literal
    /// `true`/`false` a boolean, anything else stays text.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        if looks_numeric(trimmed) {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() {
                    return ConfigValue::Number(n);
                }
            }
        }
        match raw {
            "true" => ConfigValue::Bool(true),
            "false" => ConfigValue::Bool(false),
            _ => ConfigValue::Text(raw.to_string()),
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text view of the value, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Whether the value would count as "set": non-zero, true, or non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            ConfigValue::Number(n) => *n != 0.0,
            ConfigValue::Bool(b) => *b,
            ConfigValue::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            ConfigValue::Number(n) => write!(f, "{}", n),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Text(s) => f.write_str(s),
        }
    }
}

fn looks_numeric(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() || c == '.' => true,
        Some('+') | Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit() || c == '.'),
        _ => false,
    }
}

/// Deck settings keyed by normalized setting name.
///
/// Loaded fresh for each run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    values: BTreeMap<String, ConfigValue>,
}

impl Config {
    /// Create an empty config with no defaults applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from explicit pairs, then fill in defaults.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        let mut config = Self::new();
        for (key, value) in pairs {
            config.values.insert(key.into(), value.into());
        }
        config.apply_defaults();
        config
    }

    pub(crate) fn insert(&mut self, key: String, value: ConfigValue) {
        self.values.insert(key, value);
    }

    /// Insert every default whose key is absent.
    pub(crate) fn apply_defaults(&mut self) {
        for (key, default) in CONFIG_DEFAULTS {
            self.values
                .entry((*key).to_string())
                .or_insert_with(|| (*default).into());
        }
    }

    /// Look up a value by normalized key.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    /// A numeric setting, if present and numeric.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ConfigValue::as_f64)
    }

    /// A setting rendered as text, if present and set.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|v| v.is_truthy())
            .map(ToString::to_string)
    }

    /// Numeric setting with a fallback.
    pub fn number_or(&self, key: &str, fallback: f64) -> f64 {
        self.number(key).unwrap_or(fallback)
    }

    /// Text setting with a fallback.
    pub fn text_or(&self, key: &str, fallback: &str) -> String {
        self.text(key).unwrap_or_else(|| fallback.to_string())
    }

    /// The configured deck title, if any.
    pub fn deck_title(&self) -> Option<String> {
        self.text("deck_title")
    }

    /// The configured footer text, if any.
    pub fn footer_text(&self) -> Option<String> {
        self.text("footer_text")
    }

    /// Number of settings, defaults included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over settings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

/// The structural template kind applied to a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutKind {
    /// Centered title and subtitle.
    Title,
    /// Centered section header with a short body.
    Section,
    /// Title with a left-aligned bullet body. Any unrecognized layout name.
    Content,
}

impl LayoutKind {
    /// Map a layout name from the Slides table. Matching is exact.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Title" => Self::Title,
            "Section" => Self::Section,
            _ => Self::Content,
        }
    }
}

/// One normalized row of the Slides table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// Numeric sort key.
    pub order: f64,

    /// Grouping hint, also passed to theme resolution.
    pub section_id: String,

    /// Layout name as written in the table (`Content` when blank).
    pub layout: String,

    /// Slide title. Never empty for loaded slides.
    pub title: String,

    pub subtitle: String,

    /// Raw delimited bullet text, see [`crate::tabular::format_bullets`].
    pub bullets: String,

    pub speaker_notes: String,

    /// Asset name of an image to place on the slide.
    pub media_ref: String,

    /// Asset name of a chart image to place on the slide.
    pub chart_ref: String,
}

impl Slide {
    /// Create a content slide with only the required fields set.
    pub fn new(order: f64, title: impl Into<String>) -> Self {
        Self {
            order,
            section_id: String::new(),
            layout: "Content".to_string(),
            title: title.into(),
            subtitle: String::new(),
            bullets: String::new(),
            speaker_notes: String::new(),
            media_ref: String::new(),
            chart_ref: String::new(),
        }
    }

    /// Set the layout name.
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_bullets(mut self, bullets: impl Into<String>) -> Self {
        self.bullets = bullets.into();
        self
    }

    pub fn with_speaker_notes(mut self, notes: impl Into<String>) -> Self {
        self.speaker_notes = notes.into();
        self
    }

    pub fn with_media_ref(mut self, media_ref: impl Into<String>) -> Self {
        self.media_ref = media_ref.into();
        self
    }

    pub fn with_chart_ref(mut self, chart_ref: impl Into<String>) -> Self {
        self.chart_ref = chart_ref.into();
        self
    }

    /// Layout kind selected by the `layout` field.
    pub fn layout_kind(&self) -> LayoutKind {
        LayoutKind::from_name(&self.layout)
    }
}

/// Derived background/text color pair for a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub background_color: String,
    pub text_color: String,
}

/// Remote `version.json` contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteVersionDescriptor {
    /// Dot-separated numeric version.
    pub version: String,

    #[serde(rename = "releaseDate", default)]
    pub release_date: String,

    /// Human-readable change lines, newest first.
    #[serde(default)]
    pub changes: Vec<String>,
}

impl RemoteVersionDescriptor {
    /// Parse a `version.json` body.
    pub fn from_json(body: &str) -> crate::Result<Self> {
        serde_json::from_str(body).map_err(|e| crate::Error::VersionError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(ConfigValue::coerce("44"), ConfigValue::Number(44.0));
        assert_eq!(ConfigValue::coerce("-1.5"), ConfigValue::Number(-1.5));
        assert_eq!(ConfigValue::coerce(".5"), ConfigValue::Number(0.5));
        assert_eq!(ConfigValue::coerce(" 12 "), ConfigValue::Number(12.0));
    }

    #[test]
    fn test_coerce_booleans_and_text() {
        assert_eq!(ConfigValue::coerce("true"), ConfigValue::Bool(true));
        assert_eq!(ConfigValue::coerce("false"), ConfigValue::Bool(false));
        assert_eq!(
            ConfigValue::coerce("True"),
            ConfigValue::Text("True".to_string())
        );
        assert_eq!(
            ConfigValue::coerce("#000000"),
            ConfigValue::Text("#000000".to_string())
        );
        assert_eq!(
            ConfigValue::coerce("inf"),
            ConfigValue::Text("inf".to_string())
        );
        assert_eq!(
            ConfigValue::coerce("12px"),
            ConfigValue::Text("12px".to_string())
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_pairs([("deck_title", "X")]);
        assert_eq!(config.number("title_slide_font_size"), Some(44.0));
        assert_eq!(config.text("body_font"), Some("Arial".to_string()));
        assert_eq!(config.deck_title(), Some("X".to_string()));
        assert_eq!(config.footer_text(), None);
        assert_eq!(config.len(), CONFIG_DEFAULTS.len() + 1);
    }

    #[test]
    fn test_display_whole_numbers() {
        assert_eq!(ConfigValue::Number(44.0).to_string(), "44");
        assert_eq!(ConfigValue::Number(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_layout_kind() {
        assert_eq!(LayoutKind::from_name("Title"), LayoutKind::Title);
        assert_eq!(LayoutKind::from_name("Section"), LayoutKind::Section);
        assert_eq!(LayoutKind::from_name("title"), LayoutKind::Content);
        assert_eq!(LayoutKind::from_name("Chart"), LayoutKind::Content);
    }

    #[test]
    fn test_version_descriptor_json() {
        let descriptor = RemoteVersionDescriptor::from_json(
            r#"{"version":"1.3.0","releaseDate":"2025-10-03","changes":["a","b"]}"#,
        )
        .unwrap();
        assert_eq!(descriptor.version, "1.3.0");
        assert_eq!(descriptor.release_date, "2025-10-03");
        assert_eq!(descriptor.changes, vec!["a", "b"]);

        assert!(RemoteVersionDescriptor::from_json("not json").is_err());
    }
}
