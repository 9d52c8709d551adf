use crate::models::{Band, CollegeRecord, ScoringThresholds, StatRange, TestType, UserProfile};

/// Per-college outcome of the scoring stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub gpa_band: Band,
    pub test_band: Band,
    pub prestige_points: u32,
    pub total: u32,
}

/// Calculate the match score of one college for a profile
///
/// Scoring formula (points from `ScoringThresholds`, defaults shown):
/// score =
///     gpa band          # target +30, safety +20, reach +10
///   + test band         # same points, only for the profile's test type
///   + major prestige    # rating >= threshold +40, >= threshold - 1 +20
pub fn calculate_match_score(
    college: &CollegeRecord,
    profile: &UserProfile,
    thresholds: &ScoringThresholds,
) -> ScoreBreakdown {
    let gpa_band = gpa_band(college.gpa_range(), profile.gpa, thresholds.gpa_reach_margin);

    let test_band = match profile.test_type {
        Some(TestType::Sat) => score_band(college.sat_range(), profile.sat_score, thresholds.sat_reach_margin),
        Some(TestType::Act) => score_band(college.act_range(), profile.act_score, thresholds.act_reach_margin),
        None => Band::Miss,
    };

    let prestige_points = prestige_points(college, profile, thresholds);

    let total = band_points(gpa_band, thresholds) + band_points(test_band, thresholds) + prestige_points;

    ScoreBreakdown {
        gpa_band,
        test_band,
        prestige_points,
        total,
    }
}

/// Place a value relative to an inclusive range.
///
/// Above the range is a safety, in range is a target, and within
/// `reach_floor..low` is a reach. `NaN` compares false everywhere and lands
/// on `Miss`.
#[inline]
pub fn classify<T: PartialOrd + Copy>(value: T, range: &StatRange<T>, reach_floor: T) -> Band {
    if range.contains(value) {
        Band::Target
    } else if value > range.high {
        Band::Safety
    } else if value >= reach_floor && value < range.low {
        Band::Reach
    } else {
        Band::Miss
    }
}

#[inline]
fn gpa_band(range: &StatRange<f64>, gpa: Option<f64>, margin: f64) -> Band {
    match gpa {
        Some(gpa) => classify(gpa, range, range.low - margin),
        None => Band::Miss,
    }
}

#[inline]
fn score_band(range: &StatRange<u32>, score: Option<u32>, margin: u32) -> Band {
    match score {
        Some(score) => classify(score, range, range.low.saturating_sub(margin)),
        None => Band::Miss,
    }
}

#[inline]
pub fn band_points(band: Band, thresholds: &ScoringThresholds) -> u32 {
    match band {
        Band::Target => thresholds.target_points,
        Band::Safety => thresholds.safety_points,
        Band::Reach => thresholds.reach_points,
        Band::Miss => 0,
    }
}

/// Prestige term; zero when the major, the threshold, or the college's rating is missing
#[inline]
fn prestige_points(college: &CollegeRecord, profile: &UserProfile, thresholds: &ScoringThresholds) -> u32 {
    let (Some(major), Some(threshold)) = (profile.major.as_deref(), profile.major_prestige_threshold) else {
        return 0;
    };
    let Some(rating) = college.prestige_for(major) else {
        return 0;
    };

    if rating >= threshold {
        thresholds.prestige_match_points
    } else if rating >= threshold.saturating_sub(1) {
        thresholds.prestige_near_points
    } else {
        0
    }
}
