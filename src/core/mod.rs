// Core algorithm exports
pub mod catalog;
pub mod crypto;
pub mod filters;
pub mod formatters;
pub mod matcher;
pub mod prompts;
pub mod scoring;
pub mod templates;
pub mod validation;

pub use catalog::{CatalogError, CollegeCatalog};
pub use crypto::{CryptoError, FieldCipher};
pub use filters::{matches_catalog_filter, passes_hard_constraints};
pub use matcher::{recommend, MatchResult, Matcher, DEFAULT_MAX_RESULTS};
pub use prompts::{prompts_for_college, EssayPrompt};
pub use scoring::{calculate_match_score, ScoreBreakdown};
pub use templates::{
    categories_for_section, character_count, fields_for_section, has_sections, initialize_state,
    max_items_for_section, resolve_template,
};
pub use validation::{validate_entry, validate_fields, ValidationError, WriteMode};
