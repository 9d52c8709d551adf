use std::sync::OnceLock;

use serde_json::Value;

use crate::models::{
    AppPlatform, ApplicationTemplate, EntryFields, FieldDescriptor, FieldKind, TemplateLayout,
    TemplateSection,
};

/// Cap used when a template declares none
pub const DEFAULT_MAX_ITEMS: usize = 10;

const GRADES: &[&str] = &["9", "10", "11", "12"];
const GRADES_WITH_PG: &[&str] = &["9", "10", "11", "12", "Post-graduate"];

struct Registry {
    common_app: ApplicationTemplate,
    uc: ApplicationTemplate,
    mit: ApplicationTemplate,
    coalition_app: ApplicationTemplate,
    other: ApplicationTemplate,
}

impl Registry {
    fn get(&self, platform: AppPlatform) -> &ApplicationTemplate {
        match platform {
            AppPlatform::CommonApp => &self.common_app,
            AppPlatform::Uc => &self.uc,
            AppPlatform::Mit => &self.mit,
            AppPlatform::CoalitionApp => &self.coalition_app,
            AppPlatform::Other => &self.other,
        }
    }
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Registry {
        common_app: common_app(),
        uc: uc(),
        mit: mit(),
        coalition_app: coalition_app(),
        other: other(),
    })
}

/// Template for a platform id. Unknown ids resolve to the generic template.
pub fn resolve_template(platform_id: &str) -> &'static ApplicationTemplate {
    template_for(AppPlatform::from_id(platform_id))
}

pub fn template_for(platform: AppPlatform) -> &'static ApplicationTemplate {
    registry().get(platform)
}

pub fn fields_for_section<'a>(
    template: &'a ApplicationTemplate,
    section: Option<&str>,
) -> &'a [FieldDescriptor] {
    match &template.layout {
        TemplateLayout::Flat { fields, .. } => fields,
        TemplateLayout::Sectioned { .. } => template
            .section(section)
            .map(|s| s.fields.as_slice())
            .unwrap_or(&[]),
    }
}

pub fn categories_for_section<'a>(
    template: &'a ApplicationTemplate,
    section: Option<&str>,
) -> &'a [String] {
    match &template.layout {
        TemplateLayout::Flat { categories, .. } => categories,
        TemplateLayout::Sectioned { .. } => template
            .section(section)
            .map(|s| s.categories.as_slice())
            .unwrap_or(&[]),
    }
}

pub fn max_items_for_section(template: &ApplicationTemplate, section: Option<&str>) -> usize {
    match &template.layout {
        TemplateLayout::Flat { max_items, .. } => max_items.unwrap_or(DEFAULT_MAX_ITEMS),
        TemplateLayout::Sectioned { .. } => template
            .section(section)
            .map(|s| s.max_items)
            .unwrap_or(DEFAULT_MAX_ITEMS),
    }
}

pub fn has_sections(template: &ApplicationTemplate) -> bool {
    !template.sections().is_empty()
}

/// Empty form state for a template section
pub fn initialize_state(template: &ApplicationTemplate, section: Option<&str>) -> EntryFields {
    let mut state = EntryFields::new();

    for field in fields_for_section(template, section) {
        let initial = match (field.kind, field.value.as_deref()) {
            (FieldKind::Checkboxes, _) => Value::Array(Vec::new()),
            (FieldKind::Hidden, Some(value)) if !value.is_empty() => Value::String(value.to_string()),
            _ => Value::String(String::new()),
        };
        state.insert(field.key.clone(), initial);
    }

    if let Some(section) = section.filter(|s| !s.is_empty()) {
        state.insert("section".to_string(), Value::String(section.to_string()));
    }

    state
}

/// Counter shown next to length-limited inputs, e.g. `"12/50"`
pub fn character_count(value: Option<&str>, max_length: usize) -> String {
    let count = value.map(|v| v.chars().count()).unwrap_or(0);
    format!("{}/{}", count, max_length)
}

fn categories(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn hours_per_week() -> FieldDescriptor {
    FieldDescriptor::number("hoursPerWeek", "Hours per week", 0.0, 168.0)
}

fn weeks_per_year() -> FieldDescriptor {
    FieldDescriptor::number("weeksPerYear", "Weeks per year", 0.0, 52.0)
}

fn common_app() -> ApplicationTemplate {
    let activities = TemplateSection {
        key: "activities".to_string(),
        label: "Activities".to_string(),
        description: "Extracurricular activities and work experience".to_string(),
        max_items: 10,
        fields: vec![
            FieldDescriptor::hidden("section", "Section", "activities").required(),
            FieldDescriptor::new("activityCategory", "Activity Category", FieldKind::Dropdown).required(),
            FieldDescriptor::text("activityName", "Position/Leadership description and organization name", 50)
                .required()
                .help("50 characters max"),
            FieldDescriptor::textarea(
                "description",
                "Please describe this activity, including what you accomplished and any recognition you received, etc.",
                150,
            )
            .required()
            .help("150 characters max"),
            FieldDescriptor::new("gradesParticipated", "Participation grade levels", FieldKind::Checkboxes)
                .options(GRADES_WITH_PG)
                .required(),
            FieldDescriptor::new("timing", "Timing of participation", FieldKind::Checkboxes)
                .options(&["School year", "School break", "All year"])
                .required(),
            FieldDescriptor::number("hoursPerWeek", "Hours spent per week", 0.0, 168.0).required(),
            FieldDescriptor::number("weeksPerYear", "Weeks spent per year", 0.0, 52.0).required(),
            FieldDescriptor::new(
                "intendToContinue",
                "I intend to participate in a similar activity in college",
                FieldKind::Radio,
            )
            .options(&["Yes", "No"])
            .required(),
        ],
        categories: categories(&[
            "Academic",
            "Art",
            "Athletics: Club",
            "Athletics: JV/Varsity",
            "Career Oriented",
            "Community Service (Volunteer)",
            "Computer/Technology",
            "Cultural",
            "Dance",
            "Debate/Speech",
            "Environmental",
            "Family Responsibilities",
            "Foreign Exchange",
            "Journalism/Publication",
            "Junior R.O.T.C.",
            "LGBT",
            "Music: Instrumental",
            "Music: Vocal",
            "Religious",
            "Research",
            "Robotics",
            "School Spirit",
            "Science/Math",
            "Student Govt./Politics",
            "Theater/Drama",
            "Work (Paid)",
            "Other Club/Activity",
        ]),
    };

    let awards = TemplateSection {
        key: "awards".to_string(),
        label: "Honors & Awards".to_string(),
        description: "Academic honors, awards, and recognition".to_string(),
        max_items: 5,
        fields: vec![
            FieldDescriptor::hidden("section", "Section", "awards").required(),
            FieldDescriptor::new("awardCategory", "Honor Category", FieldKind::Dropdown).required(),
            FieldDescriptor::text("awardName", "Honor name", 100)
                .required()
                .help("100 characters max"),
            FieldDescriptor::textarea(
                "description",
                "Please describe this honor, noting what it was awarded for and its significance",
                150,
            )
            .required()
            .help("150 characters max"),
            FieldDescriptor::new("gradeReceived", "Grade level(s) when you received this honor", FieldKind::Checkboxes)
                .options(GRADES_WITH_PG)
                .required(),
            FieldDescriptor::new("recognitionLevel", "Level of recognition", FieldKind::Dropdown)
                .options(&["School", "State/Regional", "National", "International"])
                .required(),
        ],
        categories: categories(&[
            "Academic",
            "Art",
            "Athletics",
            "Community Service",
            "Cultural",
            "Debate/Forensics",
            "Journalism/Publication",
            "Music",
            "Religious",
            "STEM/Science",
            "Student Government",
            "Theater/Drama",
            "Other",
        ]),
    };

    ApplicationTemplate {
        platform: AppPlatform::CommonApp,
        name: "Common App".to_string(),
        layout: TemplateLayout::Sectioned {
            sections: vec![activities, awards],
        },
    }
}

fn uc() -> ApplicationTemplate {
    const NO_TIME_COMMITMENT: &[&str] = &["Awards or honors", "Coursework other than A-G"];

    ApplicationTemplate {
        platform: AppPlatform::Uc,
        name: "UC Application".to_string(),
        layout: TemplateLayout::Flat {
            max_items: Some(20),
            fields: vec![
                FieldDescriptor::new("category", "Activity Category", FieldKind::Dropdown).required(),
                FieldDescriptor::text("activityName", "Activity/Program/Course Name", 50)
                    .required()
                    .help("50 characters max"),
                FieldDescriptor::text("role", "Position/Leadership", 50).shown_when_in(
                    "category",
                    &["Extracurricular activities", "Volunteer & Community service"],
                ),
                FieldDescriptor::textarea("description", "Description", 350)
                    .required()
                    .help("350 characters max. Describe your participation, responsibilities, and achievements."),
                FieldDescriptor::new("gradesParticipated", "Grade level(s)", FieldKind::Checkboxes)
                    .options(GRADES)
                    .required(),
                hours_per_week()
                    .required()
                    .hidden_when_in("category", NO_TIME_COMMITMENT),
                weeks_per_year()
                    .required()
                    .hidden_when_in("category", NO_TIME_COMMITMENT),
                FieldDescriptor::new("recognitionLevel", "Level of recognition", FieldKind::Dropdown)
                    .options(&["School", "District/Region", "State", "National", "International"])
                    .required()
                    .shown_when_in("category", &["Awards or honors"]),
                FieldDescriptor::new("gradeReceived", "Grade level when you received this honor", FieldKind::Dropdown)
                    .options(GRADES)
                    .required()
                    .shown_when_in("category", &["Awards or honors"]),
            ],
            categories: categories(&[
                "Coursework other than A-G",
                "Educational preparation programs",
                "Volunteer & Community service",
                "Work experience",
                "Awards or honors",
                "Extracurricular activities",
            ]),
        },
    }
}

fn mit() -> ApplicationTemplate {
    ApplicationTemplate {
        platform: AppPlatform::Mit,
        name: "MIT Application".to_string(),
        layout: TemplateLayout::Flat {
            max_items: Some(5),
            fields: vec![
                FieldDescriptor::new("category", "Type", FieldKind::Radio)
                    .options(&["Activities", "Awards/Honors"])
                    .required(),
                FieldDescriptor::text("activityName", "Activity/Award Name", 100)
                    .required()
                    .help("100 characters max"),
                FieldDescriptor::textarea(
                    "description",
                    "What you did (Activities) / What you achieved (Awards)",
                    200,
                )
                .required()
                .help("200 characters max. Be specific about your role, impact, and achievements."),
                FieldDescriptor::new("gradesParticipated", "Grade levels", FieldKind::Checkboxes)
                    .options(GRADES)
                    .required(),
                FieldDescriptor::number("hoursPerWeek", "Approximate hours per week", 0.0, 168.0)
                    .required()
                    .shown_when_in("category", &["Activities"]),
                FieldDescriptor::number("weeksPerYear", "Approximate weeks per year", 0.0, 52.0)
                    .required()
                    .shown_when_in("category", &["Activities"]),
            ],
            categories: categories(&["Activities", "Awards/Honors"]),
        },
    }
}

fn coalition_app() -> ApplicationTemplate {
    ApplicationTemplate {
        platform: AppPlatform::CoalitionApp,
        name: "Coalition Application".to_string(),
        layout: TemplateLayout::Flat {
            max_items: Some(8),
            fields: vec![
                FieldDescriptor::new("activityCategory", "Activity Category", FieldKind::Dropdown).required(),
                FieldDescriptor::text("activityName", "Activity Name", 100)
                    .required()
                    .help("100 characters max"),
                FieldDescriptor::text("role", "Your role or position", 100).help("100 characters max"),
                FieldDescriptor::textarea("description", "Description of your involvement and accomplishments", 250)
                    .required()
                    .help("250 characters max"),
                FieldDescriptor::new("gradesParticipated", "Grade levels participated", FieldKind::Checkboxes)
                    .options(GRADES_WITH_PG)
                    .required(),
                FieldDescriptor::new("timing", "When did you participate?", FieldKind::Checkboxes)
                    .options(&["During school year", "During school break", "All year"])
                    .required(),
                hours_per_week().required(),
                weeks_per_year().required(),
            ],
            categories: categories(&[
                "Academic Interest",
                "Arts",
                "Athletics",
                "Community Service",
                "Employment",
                "Extracurricular",
                "Family Responsibilities",
                "Other",
                "Religious",
                "Research",
            ]),
        },
    }
}

fn other() -> ApplicationTemplate {
    ApplicationTemplate {
        platform: AppPlatform::Other,
        name: "Other/Generic Application".to_string(),
        layout: TemplateLayout::Flat {
            max_items: Some(15),
            fields: vec![
                FieldDescriptor::new("activityCategory", "Activity Category", FieldKind::Dropdown).required(),
                FieldDescriptor::text("activityName", "Activity/Award Name", 100)
                    .required()
                    .help("100 characters max"),
                FieldDescriptor::text("role", "Your role or position", 100),
                FieldDescriptor::textarea("description", "Description of involvement and accomplishments", 500)
                    .required()
                    .help("500 characters max"),
                FieldDescriptor::new("gradesParticipated", "Grade levels", FieldKind::Checkboxes)
                    .options(GRADES_WITH_PG)
                    .required(),
                hours_per_week(),
                weeks_per_year(),
            ],
            categories: categories(&[
                "Academic",
                "Arts/Music",
                "Athletics",
                "Community Service",
                "Employment",
                "Leadership",
                "Awards/Honors",
                "Other",
            ]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(resolve_template("commonApp").platform, AppPlatform::CommonApp);
        assert_eq!(resolve_template("Common App").platform, AppPlatform::CommonApp);
        assert_eq!(resolve_template("common_app").platform, AppPlatform::CommonApp);
        assert_eq!(resolve_template("coalition").platform, AppPlatform::CoalitionApp);
        assert_eq!(resolve_template("UC").platform, AppPlatform::Uc);
        assert_eq!(resolve_template("MIT").platform, AppPlatform::Mit);
    }

    #[test]
    fn test_resolve_unknown_falls_back() {
        for id in ["", "questbridge", "   ", "common-app-2"] {
            assert_eq!(resolve_template(id).platform, AppPlatform::Other, "id {:?}", id);
        }
        assert_eq!(resolve_template("nope").name, "Other/Generic Application");
    }

    #[test]
    fn test_common_app_sections() {
        let template = resolve_template("commonApp");
        assert!(has_sections(template));
        assert_eq!(max_items_for_section(template, Some("awards")), 5);
        assert_eq!(max_items_for_section(template, Some("activities")), 10);
        assert_eq!(max_items_for_section(template, None), 10);

        let awards = fields_for_section(template, Some("awards"));
        assert_eq!(awards[1].key, "awardCategory");

        // Unknown section falls back to the first one
        let fallback = fields_for_section(template, Some("essays"));
        assert_eq!(fallback[1].key, "activityCategory");
        assert_eq!(categories_for_section(template, Some("awards")).len(), 13);
    }

    #[test]
    fn test_flat_templates() {
        let uc = resolve_template("uc");
        assert!(!has_sections(uc));
        assert_eq!(max_items_for_section(uc, Some("awards")), 20);
        assert_eq!(fields_for_section(uc, None).len(), 9);
        assert_eq!(categories_for_section(uc, None).len(), 6);

        assert_eq!(max_items_for_section(resolve_template("mit"), None), 5);
        assert_eq!(max_items_for_section(resolve_template("coalitionApp"), None), 8);
        assert_eq!(max_items_for_section(resolve_template("other"), None), 15);
    }

    #[test]
    fn test_initialize_state() {
        let template = resolve_template("commonApp");
        let state = initialize_state(template, Some("awards"));

        let keys: Vec<&str> = fields_for_section(template, Some("awards"))
            .iter()
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(state.len(), keys.len());
        for key in keys {
            assert!(state.contains_key(key));
        }
        assert_eq!(state["section"], json!("awards"));
        assert_eq!(state["gradeReceived"], json!([]));
        assert_eq!(state["awardName"], json!(""));
        assert_eq!(state["recognitionLevel"], json!(""));
    }

    #[test]
    fn test_initialize_state_flat_without_section() {
        let state = initialize_state(resolve_template("mit"), None);
        assert!(!state.contains_key("section"));
        assert_eq!(state["gradesParticipated"], json!([]));
        assert_eq!(state["hoursPerWeek"], json!(""));
    }

    #[test]
    fn test_visibility_on_uc_fields() {
        let fields = fields_for_section(resolve_template("uc"), None);
        let hours = fields.iter().find(|f| f.key == "hoursPerWeek").unwrap();
        let award: EntryFields = json!({"category": "Awards or honors"}).as_object().cloned().unwrap();
        let work: EntryFields = json!({"category": "Work experience"}).as_object().cloned().unwrap();
        assert!(!hours.is_visible(&award));
        assert!(hours.is_visible(&work));
    }

    #[test]
    fn test_character_count() {
        assert_eq!(character_count(Some("hello"), 50), "5/50");
        assert_eq!(character_count(None, 150), "0/150");
        assert_eq!(character_count(Some("café"), 10), "4/10");
    }
}
