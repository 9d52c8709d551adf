use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AppPlatform, Deadline, UserProfile};
use super::template::EntryFields;

/// Plaintext profile as entered during onboarding.
///
/// Each field is persisted as its own encrypted token; see
/// `services::tracker::Tracker::save_profile`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub name: String,
    pub city: String,
    pub gpa: String,
    #[serde(default = "default_gpa_scale")]
    pub gpa_scale: String,
    #[serde(default)]
    pub weighted: bool,
    #[serde(default = "default_test_type")]
    pub test_type: String,
    #[serde(default)]
    pub test_score: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub cost_pref: String,
    #[serde(default)]
    pub major_prestige: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
}

fn default_gpa_scale() -> String {
    "4".to_string()
}

fn default_test_type() -> String {
    "SAT".to_string()
}

impl ProfileFields {
    /// Build the matching query from stored profile values.
    ///
    /// Goes through the same lenient parsing as a request body, so a stored
    /// garbage GPA simply scores nothing.
    pub fn to_user_profile(&self) -> UserProfile {
        let score_key = if self.test_type.eq_ignore_ascii_case("ACT") {
            "actScore"
        } else {
            "satScore"
        };
        let mut value = serde_json::json!({
            "gpa": self.gpa,
            "testType": self.test_type,
            "region": self.location,
            "costPref": self.cost_pref,
            "major": self.major,
            "majorPrestigeThreshold": self.major_prestige,
        });
        value[score_key] = serde_json::Value::String(self.test_score.clone());
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa_scale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_pref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_prestige: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
}

/// A college on the user's list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeEntry {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default = "not_offered")]
    pub deadline: Deadline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_type: Option<String>,
    #[serde(alias = "activityTemplateType", default = "other_platform")]
    pub app_type: AppPlatform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn not_offered() -> Deadline {
    Deadline::NotOffered
}

fn other_platform() -> AppPlatform {
    AppPlatform::Other
}

/// One activity or award on a platform list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(default)]
    pub id: String,
    pub app_type: AppPlatform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: EntryFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Essay {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub word_limit: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

impl Essay {
    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_colleges: usize,
    pub total_activities: usize,
    pub upcoming_deadlines: usize,
}

/// One college deadline placed on the calendar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineItem {
    pub college_id: String,
    pub college_name: String,
    pub deadline: Deadline,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_type: Option<String>,
    pub app_type: AppPlatform,
    /// Whole days from today; only set on upcoming entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until: Option<i64>,
}

impl DeadlineItem {
    pub fn for_college(college: &CollegeEntry) -> Self {
        Self {
            college_id: college.id.clone(),
            college_name: college.name.clone(),
            deadline: college.deadline.clone(),
            deadline_type: college.deadline_type.clone(),
            app_type: college.app_type,
            days_until: None,
        }
    }
}

/// A user's deadlines grouped for a month view, plus the upcoming list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineCalendar {
    /// Dated deadlines by day, past ones included
    pub by_date: BTreeMap<NaiveDate, Vec<DeadlineItem>>,
    /// Deadlines on or after today, soonest first
    pub upcoming: Vec<DeadlineItem>,
    /// Rolling and free-text deadlines, which have no calendar day
    pub undated: Vec<DeadlineItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{CostType, TestType};

    #[test]
    fn test_profile_fields_to_user_profile() {
        let fields = ProfileFields {
            name: "Ada".into(),
            city: "Seattle".into(),
            gpa: "3.8".into(),
            test_type: "ACT".into(),
            test_score: "33".into(),
            location: "PNW".into(),
            cost_pref: "public".into(),
            major_prestige: "3".into(),
            major: Some("Computer Science".into()),
            ..Default::default()
        };

        let profile = fields.to_user_profile();
        assert_eq!(profile.gpa, Some(3.8));
        assert_eq!(profile.test_type, Some(TestType::Act));
        assert_eq!(profile.act_score, Some(33));
        assert_eq!(profile.sat_score, None);
        assert_eq!(profile.region.as_deref(), Some("PNW"));
        assert_eq!(profile.cost_pref, Some(CostType::Public));
        assert_eq!(profile.major_prestige_threshold, Some(3));
    }

    #[test]
    fn test_activity_entry_flattens_fields() {
        let value = serde_json::json!({
            "id": "a1",
            "appType": "commonApp",
            "section": "awards",
            "updatedAt": "2025-10-01T00:00:00Z",
            "awardName": "National Merit",
        });
        let entry: ActivityEntry = serde_json::from_value(value).unwrap();
        assert_eq!(entry.app_type, AppPlatform::CommonApp);
        assert_eq!(entry.fields["awardName"], "National Merit");
        assert!(!entry.fields.contains_key("appType"));
    }

    #[test]
    fn test_essay_word_count() {
        let essay = Essay {
            id: "e1".into(),
            title: "Why us".into(),
            prompt: String::new(),
            body: "  one two\nthree  ".into(),
            category: String::new(),
            word_limit: Some(250),
            updated_at: Utc::now(),
        };
        assert_eq!(essay.word_count(), 3);
    }
}
