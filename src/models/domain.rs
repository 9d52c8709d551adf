use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::lenient;

/// Application platform a college (or activity list) is submitted through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppPlatform {
    CommonApp,
    Uc,
    Mit,
    CoalitionApp,
    #[serde(other)]
    Other,
}

impl AppPlatform {
    pub const ALL: [AppPlatform; 5] = [
        AppPlatform::CommonApp,
        AppPlatform::Uc,
        AppPlatform::Mit,
        AppPlatform::CoalitionApp,
        AppPlatform::Other,
    ];

    /// Resolve a loosely written platform id.
    ///
    /// The id is lower-cased and stripped of underscores and whitespace before
    /// the alias lookup, so `"Common_App"`, `"common app"` and `"commonApp"`
    /// all land on [`AppPlatform::CommonApp`]. Anything unrecognised is
    /// [`AppPlatform::Other`].
    pub fn from_id(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| *c != '_' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "commonapp" | "common" => AppPlatform::CommonApp,
            "uc" => AppPlatform::Uc,
            "mit" => AppPlatform::Mit,
            "coalitionapp" | "coalition" => AppPlatform::CoalitionApp,
            _ => AppPlatform::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppPlatform::CommonApp => "commonApp",
            AppPlatform::Uc => "uc",
            AppPlatform::Mit => "mit",
            AppPlatform::CoalitionApp => "coalitionApp",
            AppPlatform::Other => "other",
        }
    }
}

impl std::fmt::Display for AppPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostType {
    Public,
    Private,
}

impl CostType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "public" => Some(CostType::Public),
            "private" => Some(CostType::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestType {
    #[serde(rename = "SAT")]
    Sat,
    #[serde(rename = "ACT")]
    Act,
}

impl TestType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "SAT" => Some(TestType::Sat),
            "ACT" => Some(TestType::Act),
            _ => None,
        }
    }
}

/// Inclusive statistical range (`low <= high` is checked when the catalog loads)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatRange<T> {
    pub low: T,
    pub high: T,
}

impl<T: PartialOrd + Copy> StatRange<T> {
    pub fn new(low: T, high: T) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn contains(&self, value: T) -> bool {
        value >= self.low && value <= self.high
    }

    pub fn is_ordered(&self) -> bool {
        self.low <= self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialAid {
    pub average_aid: f64,
    pub percent_receiving_aid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostInfo {
    #[serde(rename = "type")]
    pub cost_type: CostType,
    pub in_state: f64,
    pub out_of_state: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_aid: Option<FinancialAid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRanges {
    #[serde(rename = "SAT")]
    pub sat: StatRange<u32>,
    #[serde(rename = "ACT")]
    pub act: StatRange<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Middle50 {
    #[serde(rename = "SAT_ACT")]
    pub tests: TestRanges,
    #[serde(rename = "GPA_unweighted")]
    pub gpa_unweighted: StatRange<f64>,
}

/// A single application deadline.
///
/// Catalog data writes deadlines as a date string, `"Rolling"` (or `true`) for
/// rolling admission, and `false`/`null` when the round is not offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDeadline", into = "RawDeadline")]
pub enum Deadline {
    Date(NaiveDate),
    Rolling,
    NotOffered,
    Text(String),
}

impl Deadline {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Deadline::NotOffered;
        }
        if trimmed.eq_ignore_ascii_case("rolling") {
            return Deadline::Rolling;
        }
        match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(date) => Deadline::Date(date),
            Err(_) => Deadline::Text(trimmed.to_string()),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Deadline::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn is_offered(&self) -> bool {
        !matches!(self, Deadline::NotOffered)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDeadline {
    Flag(bool),
    Text(String),
    Missing(Option<()>),
}

impl From<RawDeadline> for Deadline {
    fn from(raw: RawDeadline) -> Self {
        match raw {
            RawDeadline::Flag(true) => Deadline::Rolling,
            RawDeadline::Flag(false) | RawDeadline::Missing(_) => Deadline::NotOffered,
            RawDeadline::Text(text) => Deadline::parse(&text),
        }
    }
}

impl From<Deadline> for RawDeadline {
    fn from(deadline: Deadline) -> Self {
        match deadline {
            Deadline::Date(date) => RawDeadline::Text(date.format("%Y-%m-%d").to_string()),
            Deadline::Rolling => RawDeadline::Text("Rolling".to_string()),
            Deadline::NotOffered => RawDeadline::Flag(false),
            Deadline::Text(text) => RawDeadline::Text(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub app_type: AppPlatform,
    #[serde(default)]
    pub deadlines: BTreeMap<String, Deadline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaOfInterest {
    pub prestige: u8,
}

/// Static reference record for one college
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollegeRecord {
    pub id: String,
    #[serde(rename = "university")]
    pub name: String,
    pub location: String,
    pub region: String,
    #[serde(rename = "total_cost")]
    pub cost: CostInfo,
    pub acceptance_rate: f64,
    #[serde(rename = "middle_50_percent")]
    pub middle_50: Middle50,
    #[serde(rename = "application_info")]
    pub application: ApplicationInfo,
    #[serde(default)]
    pub areas_of_interest: BTreeMap<String, AreaOfInterest>,
}

impl CollegeRecord {
    pub fn gpa_range(&self) -> &StatRange<f64> {
        &self.middle_50.gpa_unweighted
    }

    pub fn sat_range(&self) -> &StatRange<u32> {
        &self.middle_50.tests.sat
    }

    pub fn act_range(&self) -> &StatRange<u32> {
        &self.middle_50.tests.act
    }

    pub fn prestige_for(&self, major: &str) -> Option<u8> {
        self.areas_of_interest.get(major).map(|area| area.prestige)
    }

    /// Earliest dated deadline, falling back to the first rolling round.
    pub fn next_deadline(&self) -> Option<(&str, &Deadline)> {
        let deadlines = &self.application.deadlines;
        deadlines
            .iter()
            .filter(|(_, d)| d.date().is_some())
            .min_by_key(|(_, d)| d.date())
            .or_else(|| deadlines.iter().find(|(_, d)| **d == Deadline::Rolling))
            .map(|(kind, d)| (kind.as_str(), d))
    }
}

/// Academic profile used to rank colleges.
///
/// Numeric fields accept numbers or strings; unparseable input is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub gpa: Option<f64>,
    #[serde(rename = "testType", default, deserialize_with = "lenient::test_type_opt")]
    pub test_type: Option<TestType>,
    #[serde(rename = "satScore", alias = "sat", default, deserialize_with = "lenient::u32_opt")]
    pub sat_score: Option<u32>,
    #[serde(rename = "actScore", alias = "act", default, deserialize_with = "lenient::u32_opt")]
    pub act_score: Option<u32>,
    #[serde(alias = "location", default, deserialize_with = "lenient::preference_opt")]
    pub region: Option<String>,
    #[serde(rename = "costPref", default, deserialize_with = "lenient::cost_type_opt")]
    pub cost_pref: Option<CostType>,
    #[serde(default, deserialize_with = "lenient::text_opt")]
    pub major: Option<String>,
    #[serde(
        rename = "majorPrestigeThreshold",
        alias = "majorPrestige",
        default,
        deserialize_with = "lenient::u8_opt"
    )]
    pub major_prestige_threshold: Option<u8>,
}

/// Admissions band of one statistic relative to a college's middle 50%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Target,
    Safety,
    Reach,
    Miss,
}

/// College annotated with its match score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCollege {
    #[serde(flatten)]
    pub college: CollegeRecord,
    #[serde(rename = "matchScore")]
    pub match_score: u32,
    #[serde(rename = "gpaBand")]
    pub gpa_band: Band,
    #[serde(rename = "testBand")]
    pub test_band: Band,
}

/// Band boundaries and points used by the scorer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringThresholds {
    pub target_points: u32,
    pub safety_points: u32,
    pub reach_points: u32,
    pub gpa_reach_margin: f64,
    pub sat_reach_margin: u32,
    pub act_reach_margin: u32,
    pub prestige_match_points: u32,
    pub prestige_near_points: u32,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            target_points: 30,
            safety_points: 20,
            reach_points: 10,
            gpa_reach_margin: 0.2,
            sat_reach_margin: 100,
            act_reach_margin: 2,
            prestige_match_points: 40,
            prestige_near_points: 20,
        }
    }
}

/// Numeric browse filter value as it arrived
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericFilter<T> {
    Value(T),
    /// Present but not a number; matches no college
    Unparsed,
}

/// Hard filters for browsing the catalog
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CatalogFilter {
    #[serde(default, deserialize_with = "lenient::preference_opt")]
    pub region: Option<String>,
    #[serde(rename = "costType", default, deserialize_with = "lenient::cost_type_opt")]
    pub cost_type: Option<CostType>,
    #[serde(default, deserialize_with = "lenient::f64_filter")]
    pub gpa: Option<NumericFilter<f64>>,
    #[serde(default, deserialize_with = "lenient::u32_filter")]
    pub sat: Option<NumericFilter<u32>>,
    #[serde(default, deserialize_with = "lenient::text_opt")]
    pub major: Option<String>,
    #[serde(rename = "prestigeLevel", default, deserialize_with = "lenient::u8_opt")]
    pub prestige_level: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_aliases() {
        assert_eq!(AppPlatform::from_id("commonApp"), AppPlatform::CommonApp);
        assert_eq!(AppPlatform::from_id("Common_App"), AppPlatform::CommonApp);
        assert_eq!(AppPlatform::from_id("common"), AppPlatform::CommonApp);
        assert_eq!(AppPlatform::from_id("coalition app"), AppPlatform::CoalitionApp);
        assert_eq!(AppPlatform::from_id("UC"), AppPlatform::Uc);
        assert_eq!(AppPlatform::from_id(""), AppPlatform::Other);
        assert_eq!(AppPlatform::from_id("stanford"), AppPlatform::Other);
    }

    #[test]
    fn test_deadline_forms() {
        let deadlines: BTreeMap<String, Deadline> = serde_json::from_value(json!({
            "earlyAction": "2025-11-01",
            "earlyDecision": false,
            "priority": true,
            "regularDecision": "Rolling",
            "other": null,
        }))
        .unwrap();

        assert_eq!(
            deadlines["earlyAction"],
            Deadline::Date(NaiveDate::from_ymd_opt(2025, 11, 1).unwrap())
        );
        assert_eq!(deadlines["earlyDecision"], Deadline::NotOffered);
        assert_eq!(deadlines["priority"], Deadline::Rolling);
        assert_eq!(deadlines["regularDecision"], Deadline::Rolling);
        assert_eq!(deadlines["other"], Deadline::NotOffered);

        let back = serde_json::to_value(&deadlines["earlyAction"]).unwrap();
        assert_eq!(back, json!("2025-11-01"));
    }

    #[test]
    fn test_profile_lenient_fields() {
        let profile: UserProfile = serde_json::from_value(json!({
            "gpa": "3.85",
            "testType": "sat",
            "sat": "1450",
            "location": "None",
            "costPref": "none",
            "major": "",
            "majorPrestige": "4",
        }))
        .unwrap();

        assert_eq!(profile.gpa, Some(3.85));
        assert_eq!(profile.test_type, Some(TestType::Sat));
        assert_eq!(profile.sat_score, Some(1450));
        assert_eq!(profile.region, None);
        assert_eq!(profile.cost_pref, None);
        assert_eq!(profile.major, None);
        assert_eq!(profile.major_prestige_threshold, Some(4));
    }

    #[test]
    fn test_profile_garbage_numbers_become_none() {
        let profile: UserProfile = serde_json::from_value(json!({
            "gpa": "four point oh",
            "actScore": [],
            "majorPrestigeThreshold": -3,
        }))
        .unwrap();

        assert_eq!(profile.gpa, None);
        assert_eq!(profile.act_score, None);
        assert_eq!(profile.major_prestige_threshold, None);
    }

    #[test]
    fn test_stat_range_inclusive() {
        let range = StatRange::new(3.5, 3.9);
        assert!(range.contains(3.5));
        assert!(range.contains(3.9));
        assert!(!range.contains(3.91));
        assert!(range.is_ordered());
        assert!(!StatRange::new(36, 34).is_ordered());
    }
}
