use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::core::filters::matches_catalog_filter;
use crate::models::{AppPlatform, CatalogFilter, CollegeRecord};

/// Catalog shipped with the service
const EMBEDDED_CATALOG: &str = include_str!("../../data/colleges.json");

/// Prestige ratings live on a fixed 1-5 scale
const PRESTIGE_SCALE: std::ops::RangeInclusive<u8> = 1..=5;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid college record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Duplicate college id: {0}")]
    DuplicateId(String),
}

/// Immutable collection of college reference records.
///
/// Records are validated once at load time and kept sorted by display name,
/// which is also the tie-break order the matcher preserves.
#[derive(Debug, Clone)]
pub struct CollegeCatalog {
    colleges: Vec<CollegeRecord>,
}

impl CollegeCatalog {
    /// Load the catalog compiled into the binary
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Load a catalog from a JSON file on disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let records: Vec<CollegeRecord> = serde_json::from_str(raw)?;
        Self::from_records(records)
    }

    pub fn from_records(mut records: Vec<CollegeRecord>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            validate_record(record)?;
            if !seen.insert(record.id.as_str()) {
                return Err(CatalogError::DuplicateId(record.id.clone()));
            }
        }

        records.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!("Loaded catalog with {} colleges", records.len());

        Ok(Self { colleges: records })
    }

    pub fn all(&self) -> &[CollegeRecord] {
        &self.colleges
    }

    pub fn len(&self) -> usize {
        self.colleges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colleges.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CollegeRecord> {
        self.colleges.iter().find(|c| c.id == id)
    }

    /// Case-insensitive substring search on the display name; empty term returns all
    pub fn search(&self, term: &str) -> Vec<&CollegeRecord> {
        let term = term.trim().to_lowercase();
        self.colleges
            .iter()
            .filter(|c| term.is_empty() || c.name.to_lowercase().contains(&term))
            .collect()
    }

    pub fn by_platform(&self, platform: AppPlatform) -> Vec<&CollegeRecord> {
        self.colleges
            .iter()
            .filter(|c| c.application.app_type == platform)
            .collect()
    }

    pub fn filter(&self, filter: &CatalogFilter) -> Vec<&CollegeRecord> {
        self.colleges
            .iter()
            .filter(|c| matches_catalog_filter(c, filter))
            .collect()
    }
}

fn validate_record(record: &CollegeRecord) -> Result<(), CatalogError> {
    let invalid = |reason: &str| CatalogError::InvalidRecord {
        id: record.id.clone(),
        reason: reason.to_string(),
    };

    if record.id.trim().is_empty() {
        return Err(invalid("empty id"));
    }
    if !(0.0..=1.0).contains(&record.acceptance_rate) {
        return Err(invalid("acceptance rate outside [0, 1]"));
    }
    if !record.gpa_range().is_ordered() {
        return Err(invalid("GPA range low > high"));
    }
    if !record.sat_range().is_ordered() {
        return Err(invalid("SAT range low > high"));
    }
    if !record.act_range().is_ordered() {
        return Err(invalid("ACT range low > high"));
    }
    if let Some((major, _)) = record
        .areas_of_interest
        .iter()
        .find(|(_, area)| !PRESTIGE_SCALE.contains(&area.prestige))
    {
        return Err(invalid(&format!("prestige for {} outside 1-5", major)));
    }

    Ok(())
}
