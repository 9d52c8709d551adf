use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::AppPlatform;

/// Field-value map for one activity/award entry, keyed by template field key
pub type EntryFields = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Dropdown,
    Checkboxes,
    Radio,
    Hidden,
}

impl FieldKind {
    pub fn is_text_like(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Textarea)
    }
}

/// When a field is shown, expressed over the current form state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum Visibility {
    #[default]
    Always,
    FieldIn { key: String, values: Vec<String> },
    FieldNotIn { key: String, values: Vec<String> },
}

impl Visibility {
    pub fn is_always(&self) -> bool {
        matches!(self, Visibility::Always)
    }

    pub fn is_visible(&self, state: &EntryFields) -> bool {
        let current = |key: &str| state.get(key).and_then(Value::as_str);
        match self {
            Visibility::Always => true,
            Visibility::FieldIn { key, values } => {
                current(key).is_some_and(|v| values.iter().any(|x| x == v))
            }
            Visibility::FieldNotIn { key, values } => {
                !current(key).is_some_and(|v| values.iter().any(|x| x == v))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Fixed choices; `None` means the template's category list is used
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Visibility::is_always")]
    pub visibility: Visibility,
    /// Fixed value of a hidden field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldDescriptor {
    pub fn new(key: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            max_length: None,
            min: None,
            max: None,
            options: None,
            required: false,
            help_text: None,
            visibility: Visibility::Always,
            value: None,
        }
    }

    pub fn text(key: &str, label: &str, max_length: usize) -> Self {
        Self::new(key, label, FieldKind::Text).max_length(max_length)
    }

    pub fn textarea(key: &str, label: &str, max_length: usize) -> Self {
        Self::new(key, label, FieldKind::Textarea).max_length(max_length)
    }

    pub fn number(key: &str, label: &str, min: f64, max: f64) -> Self {
        let mut field = Self::new(key, label, FieldKind::Number);
        field.min = Some(min);
        field.max = Some(max);
        field
    }

    pub fn hidden(key: &str, label: &str, value: &str) -> Self {
        let mut field = Self::new(key, label, FieldKind::Hidden);
        field.value = Some(value.to_string());
        field
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn options(mut self, options: &[&str]) -> Self {
        self.options = Some(options.iter().map(|o| o.to_string()).collect());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn help(mut self, text: &str) -> Self {
        self.help_text = Some(text.to_string());
        self
    }

    pub fn shown_when_in(mut self, key: &str, values: &[&str]) -> Self {
        self.visibility = Visibility::FieldIn {
            key: key.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        };
        self
    }

    pub fn hidden_when_in(mut self, key: &str, values: &[&str]) -> Self {
        self.visibility = Visibility::FieldNotIn {
            key: key.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        };
        self
    }

    pub fn is_visible(&self, state: &EntryFields) -> bool {
        self.kind != FieldKind::Hidden && self.visibility.is_visible(state)
    }
}

/// One named list inside a sectioned template (e.g. Common App awards)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSection {
    pub key: String,
    pub label: String,
    pub description: String,
    pub max_items: usize,
    pub fields: Vec<FieldDescriptor>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "camelCase")]
pub enum TemplateLayout {
    #[serde(rename_all = "camelCase")]
    Flat {
        max_items: Option<usize>,
        fields: Vec<FieldDescriptor>,
        categories: Vec<String>,
    },
    Sectioned { sections: Vec<TemplateSection> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationTemplate {
    pub platform: AppPlatform,
    pub name: String,
    #[serde(flatten)]
    pub layout: TemplateLayout,
}

impl ApplicationTemplate {
    pub fn sections(&self) -> &[TemplateSection] {
        match &self.layout {
            TemplateLayout::Sectioned { sections } => sections,
            TemplateLayout::Flat { .. } => &[],
        }
    }

    /// Section by key, falling back to the first section.
    pub fn section(&self, key: Option<&str>) -> Option<&TemplateSection> {
        let sections = self.sections();
        key.and_then(|k| sections.iter().find(|s| s.key == k))
            .or_else(|| sections.first())
    }
}
