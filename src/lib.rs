//! Sunrise - college application tracking service
//!
//! This library provides the decision logic behind the tracker: the college
//! matching pipeline (filter, score, rank), the per-platform activity
//! templates and their validator, and field-level encryption of profile data.
//! Storage and accounts sit behind the `DocumentStore` and `IdentityProvider`
//! traits.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{recommend, resolve_template, validate_entry, CollegeCatalog, FieldCipher, Matcher};
pub use crate::models::{
    ApplicationTemplate, CollegeRecord, RecommendRequest, RecommendResponse, ScoredCollege, ScoringThresholds,
    UserProfile,
};
