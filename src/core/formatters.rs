use crate::models::Deadline;

/// Display name for an application platform id
pub fn format_app_type(app_type: &str) -> String {
    let known = match app_type {
        "" => "Other",
        "commonApp" | "common_app" | "common" => "Common App",
        "uc" | "UC" => "UC Application",
        "coalitionApp" | "coalition_app" | "coalition" => "Coalition App",
        "mit" | "MIT" => "MIT",
        "stanford" => "Stanford Application",
        "harvard" => "Harvard Application",
        "other" => "College-Specific Application",
        "custom" => "Custom Application",
        _ => return title_case(app_type),
    };
    known.to_string()
}

/// Compact label for badges and tabs
pub fn app_type_short(app_type: &str) -> String {
    let short = match app_type {
        "commonApp" | "common_app" => "Common App",
        "uc" => "UC",
        "coalitionApp" => "Coalition",
        "mit" => "MIT",
        "stanford" => "Stanford",
        "harvard" => "Harvard",
        "other" => "Other",
        _ => return format_app_type(app_type),
    };
    short.to_string()
}

pub fn format_deadline_type(deadline_type: &str) -> String {
    let known = match deadline_type {
        "" => "",
        "earlyDecision" | "ED" => "Early Decision",
        "earlyAction" | "EA" => "Early Action",
        "regularDecision" | "RD" => "Regular Decision",
        "restrictiveEarlyAction" | "REA" => "Restrictive Early Action",
        "rollingAdmission" => "Rolling Admission",
        "priority" => "Priority",
        _ => return title_case(deadline_type),
    };
    known.to_string()
}

/// `"Rolling Admission"`, `"No deadline"`, `"November 1, 2025"`, or the raw text
pub fn format_deadline(deadline: &Deadline) -> String {
    match deadline {
        Deadline::NotOffered => "No deadline".to_string(),
        Deadline::Rolling => "Rolling Admission".to_string(),
        Deadline::Date(date) => date.format("%B %-d, %Y").to_string(),
        Deadline::Text(text) => text.clone(),
    }
}

/// Split camelCase and snake_case into capitalized words
fn title_case(raw: &str) -> String {
    let mut spaced = String::with_capacity(raw.len() + 4);
    for c in raw.chars() {
        match c {
            '_' => spaced.push(' '),
            c if c.is_uppercase() => {
                spaced.push(' ');
                spaced.push(c);
            }
            c => spaced.push(c),
        }
    }

    spaced
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
