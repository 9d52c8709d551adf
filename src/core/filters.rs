use crate::models::{CatalogFilter, CollegeRecord, NumericFilter, UserProfile};

/// Region hard constraint. No preference keeps every college.
#[inline]
pub fn matches_region(college: &CollegeRecord, profile: &UserProfile) -> bool {
    match profile.region.as_deref() {
        Some(region) => college.region == region,
        None => true,
    }
}

/// Public/private hard constraint. No preference keeps every college.
#[inline]
pub fn matches_cost_type(college: &CollegeRecord, profile: &UserProfile) -> bool {
    match profile.cost_pref {
        Some(cost_type) => college.cost.cost_type == cost_type,
        None => true,
    }
}

/// Filter stage of the recommendation pipeline
#[inline]
pub fn passes_hard_constraints(college: &CollegeRecord, profile: &UserProfile) -> bool {
    matches_region(college, profile) && matches_cost_type(college, profile)
}

/// Browse-filter over the catalog.
///
/// Unlike the recommendation filter, GPA/SAT here must fall inside the
/// middle-50% range and the prestige level is a hard floor.
pub fn matches_catalog_filter(college: &CollegeRecord, filter: &CatalogFilter) -> bool {
    if let Some(region) = filter.region.as_deref() {
        if college.region != region {
            return false;
        }
    }

    if let Some(cost_type) = filter.cost_type {
        if college.cost.cost_type != cost_type {
            return false;
        }
    }

    match filter.gpa {
        Some(NumericFilter::Value(gpa)) if !college.gpa_range().contains(gpa) => return false,
        Some(NumericFilter::Unparsed) => return false,
        _ => {}
    }

    match filter.sat {
        Some(NumericFilter::Value(sat)) if !college.sat_range().contains(sat) => return false,
        Some(NumericFilter::Unparsed) => return false,
        _ => {}
    }

    if let (Some(major), Some(level)) = (filter.major.as_deref(), filter.prestige_level) {
        match college.prestige_for(major) {
            Some(prestige) if prestige >= level => {}
            _ => return false,
        }
    }

    true
}
