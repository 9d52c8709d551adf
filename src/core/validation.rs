use serde_json::Value;
use thiserror::Error;

use crate::core::templates::{fields_for_section, max_items_for_section};
use crate::models::{ApplicationTemplate, EntryFields, FieldDescriptor, TemplateLayout};

/// First rule an activity entry breaks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{label} exceeds maximum length of {max_length} characters")]
    FieldTooLong {
        key: String,
        label: String,
        max_length: usize,
    },

    #[error("{label} is required")]
    FieldRequired { key: String, label: String },

    #[error("You can only add up to {max} {section_label} for {template}")]
    CollectionFull {
        max: usize,
        section_label: String,
        template: String,
    },
}

impl ValidationError {
    /// Key of the offending field, if the error is about one
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::FieldTooLong { key, .. } | ValidationError::FieldRequired { key, .. } => Some(key),
            ValidationError::CollectionFull { .. } => None,
        }
    }
}

/// Whether a write adds a new entry or replaces an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// `existing` is the number of entries already stored in the target list
    Create { existing: usize },
    Edit,
}

/// Check a single field against its descriptor
pub fn validate_field(field: &FieldDescriptor, value: Option<&Value>) -> Result<(), ValidationError> {
    if let (true, Some(max_length), Some(Value::String(text))) =
        (field.kind.is_text_like(), field.max_length, value)
    {
        if text.chars().count() > max_length {
            return Err(ValidationError::FieldTooLong {
                key: field.key.clone(),
                label: field.label.clone(),
                max_length,
            });
        }
    }

    if field.required && is_empty_value(value) {
        return Err(ValidationError::FieldRequired {
            key: field.key.clone(),
            label: field.label.clone(),
        });
    }

    Ok(())
}

/// Field checks only, in template order. Fields hidden by their visibility
/// rule and hidden-kind fields are skipped.
pub fn validate_fields(
    template: &ApplicationTemplate,
    section: Option<&str>,
    entry: &EntryFields,
) -> Result<(), ValidationError> {
    fields_for_section(template, section)
        .iter()
        .filter(|field| field.is_visible(entry))
        .try_for_each(|field| validate_field(field, entry.get(&field.key)))
}

/// Full write-time validation: field checks first, then the item cap when creating
pub fn validate_entry(
    template: &ApplicationTemplate,
    section: Option<&str>,
    entry: &EntryFields,
    mode: WriteMode,
) -> Result<(), ValidationError> {
    validate_fields(template, section, entry)?;

    if let WriteMode::Create { existing } = mode {
        let max = max_items_for_section(template, section);
        if existing >= max {
            return Err(ValidationError::CollectionFull {
                max,
                section_label: section_label(template, section),
                template: template.name.clone(),
            });
        }
    }

    Ok(())
}

fn section_label(template: &ApplicationTemplate, section: Option<&str>) -> String {
    match &template.layout {
        TemplateLayout::Sectioned { .. } => template
            .section(section)
            .map(|s| s.label.to_lowercase())
            .unwrap_or_else(|| "activities".to_string()),
        TemplateLayout::Flat { .. } => "activities".to_string(),
    }
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}
