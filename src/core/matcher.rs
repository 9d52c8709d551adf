use crate::core::{filters::passes_hard_constraints, scoring::calculate_match_score};
use crate::models::{CollegeRecord, ScoredCollege, ScoringThresholds, UserProfile};

/// Upper bound on recommendations returned for one query
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Result of the matching process
#[derive(Debug)]
pub struct MatchResult {
    pub colleges: Vec<ScoredCollege>,
    pub total_candidates: usize,
}

/// College recommendation pipeline
///
/// # Pipeline Stages
/// 1. Hard constraints (region, public/private)
/// 2. Band scoring (GPA, test score, major prestige)
/// 3. Ranking: drop zero scores, stable sort by score, truncate
#[derive(Debug, Clone)]
pub struct Matcher {
    thresholds: ScoringThresholds,
    max_results: usize,
}

impl Matcher {
    pub fn new(thresholds: ScoringThresholds, max_results: usize) -> Self {
        Self {
            thresholds,
            max_results,
        }
    }

    pub fn with_default_thresholds() -> Self {
        Self::new(ScoringThresholds::default(), DEFAULT_MAX_RESULTS)
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Rank the catalog for a profile, returning at most `max_results` colleges
    pub fn recommend(&self, profile: &UserProfile, catalog: &[CollegeRecord]) -> MatchResult {
        self.recommend_with_limit(profile, catalog, self.max_results)
    }

    /// Same as [`Matcher::recommend`] with a caller limit; the configured cap still applies
    pub fn recommend_with_limit(
        &self,
        profile: &UserProfile,
        catalog: &[CollegeRecord],
        limit: usize,
    ) -> MatchResult {
        let total_candidates = catalog.len();

        let mut scored: Vec<ScoredCollege> = catalog
            .iter()
            // Stage 1: hard constraints
            .filter(|college| passes_hard_constraints(college, profile))
            // Stage 2: scoring
            .filter_map(|college| {
                let breakdown = calculate_match_score(college, profile, &self.thresholds);

                if breakdown.total > 0 {
                    Some(ScoredCollege {
                        college: college.clone(),
                        match_score: breakdown.total,
                        gpa_band: breakdown.gpa_band,
                        test_band: breakdown.test_band,
                    })
                } else {
                    None
                }
            })
            .collect();

        // Stage 3: stable sort keeps catalog order among equal scores
        scored.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        scored.truncate(limit.min(self.max_results));

        tracing::debug!(
            "Recommended {} of {} colleges",
            scored.len(),
            total_candidates
        );

        MatchResult {
            colleges: scored,
            total_candidates,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_thresholds()
    }
}

/// Rank `catalog` for `profile` with the default thresholds and cap
pub fn recommend(profile: &UserProfile, catalog: &[CollegeRecord]) -> Vec<ScoredCollege> {
    Matcher::default().recommend(profile, catalog).colleges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::CollegeCatalog;
    use crate::models::{CostType, TestType};

    fn strong_profile() -> UserProfile {
        UserProfile {
            gpa: Some(3.95),
            test_type: Some(TestType::Sat),
            sat_score: Some(1540),
            major: Some("Computer Science".to_string()),
            major_prestige_threshold: Some(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_recommend_basic() {
        let catalog = CollegeCatalog::embedded().unwrap();
        let matcher = Matcher::with_default_thresholds();

        let result = matcher.recommend(&strong_profile(), catalog.all());

        assert_eq!(result.total_candidates, catalog.len());
        assert!(!result.colleges.is_empty());
        for pair in result.colleges.windows(2) {
            assert!(pair[0].match_score >= pair[1].match_score);
        }
        assert!(result.colleges.iter().all(|c| c.match_score > 0));
    }

    #[test]
    fn test_region_and_cost_filtering() {
        let catalog = CollegeCatalog::embedded().unwrap();
        let mut profile = strong_profile();
        profile.region = Some("West".to_string());
        profile.cost_pref = Some(CostType::Private);

        let result = Matcher::default().recommend(&profile, catalog.all());

        assert_eq!(result.colleges.len(), 1);
        assert_eq!(result.colleges[0].college.id, "stanford-university");
    }

    #[test]
    fn test_empty_profile_recommends_nothing() {
        let catalog = CollegeCatalog::embedded().unwrap();
        let result = Matcher::default().recommend(&UserProfile::default(), catalog.all());
        assert!(result.colleges.is_empty());
    }

    #[test]
    fn test_respects_limit() {
        let catalog = CollegeCatalog::embedded().unwrap();
        let result = Matcher::default().recommend_with_limit(&strong_profile(), catalog.all(), 3);
        assert_eq!(result.colleges.len(), 3);
    }

    #[test]
    fn test_limit_cannot_exceed_cap() {
        let catalog = CollegeCatalog::embedded().unwrap();
        let matcher = Matcher::new(ScoringThresholds::default(), 2);
        let result = matcher.recommend_with_limit(&strong_profile(), catalog.all(), 50);
        assert_eq!(result.colleges.len(), 2);
    }
}
