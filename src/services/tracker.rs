use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use moka::sync::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use super::documents::{paths, Document, DocumentStore, SnapshotCallback, StoredDocument, Subscription};
use super::error::BackendError;
use crate::core::catalog::CollegeCatalog;
use crate::core::crypto::{CryptoError, FieldCipher};
use crate::core::matcher::{MatchResult, Matcher};
use crate::core::templates::{has_sections, template_for};
use crate::core::validation::{validate_entry, ValidationError, WriteMode};
use crate::models::{
    ActivityEntry, ActivityRequest, AppPlatform, CollegeEntry, DashboardStats, Deadline, DeadlineCalendar,
    DeadlineItem, EntryFields, Essay, EssayRequest, NewCollegeRequest, ProfileFields, ProfileUpdate,
};

/// Plaintext profile key and the document key its encrypted token lives under
const PROFILE_KEYS: [(&str, &str); 11] = [
    ("name", "encryptedName"),
    ("city", "encryptedCity"),
    ("gpa", "encryptedGPA"),
    ("gpaScale", "encryptedGpaScale"),
    ("weighted", "encryptedWeighted"),
    ("testType", "encryptedTestType"),
    ("testScore", "encryptedTestScore"),
    ("location", "encryptedLocation"),
    ("costPref", "encryptedCostPref"),
    ("majorPrestige", "encryptedMajorPrestige"),
    ("major", "encryptedMajor"),
];

/// Keys owned by the entry itself rather than the template form
const RESERVED_ACTIVITY_KEYS: [&str; 4] = ["id", "appType", "section", "updatedAt"];

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Never says which field failed to decrypt
    #[error("Failed to load profile data")]
    ProfileLoad,

    #[error("Failed to save profile data: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown college: {0}")]
    UnknownCollege(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Per-user application data on top of a document store
pub struct Tracker<S: DocumentStore> {
    store: S,
    cipher: FieldCipher,
    catalog: Arc<CollegeCatalog>,
    /// One lock per `{uid}/{platform}` list; creates count then write under it
    create_locks: Cache<String, Arc<Mutex<()>>>,
}

impl<S: DocumentStore> Tracker<S> {
    pub fn new(store: S, cipher: FieldCipher, catalog: Arc<CollegeCatalog>) -> Self {
        let create_locks = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(600))
            .build();

        Self {
            store,
            cipher,
            catalog,
            create_locks,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &CollegeCatalog {
        &self.catalog
    }

    // Profile

    /// Replace the profile; every field is stored as its own encrypted token
    pub async fn save_profile(&self, uid: &str, profile: &ProfileFields) -> Result<(), TrackerError> {
        let plain = to_document(profile)?;
        let mut doc = self.encrypt_profile(uid, &plain)?;
        doc.insert("updatedAt".into(), Value::String(Utc::now().to_rfc3339()));

        self.store.set(&paths::user(uid)?, doc).await?;
        tracing::info!("Saved profile for {}", uid);
        Ok(())
    }

    /// Profile with encrypted tokens decrypted over any legacy plaintext keys
    pub async fn load_profile(&self, uid: &str) -> Result<Option<ProfileFields>, TrackerError> {
        let Some(doc) = self.store.get(&paths::user(uid)?).await? else {
            return Ok(None);
        };

        let mut profile = ProfileFields {
            gpa_scale: "4".into(),
            test_type: "SAT".into(),
            ..Default::default()
        };

        for (plain_key, encrypted_key) in PROFILE_KEYS {
            let value = match doc.get(encrypted_key) {
                Some(Value::String(token)) => Some(self.cipher.decrypt_field::<Value>(uid, token).map_err(|_| {
                    tracing::warn!("Could not decrypt {} for {}", encrypted_key, uid);
                    TrackerError::ProfileLoad
                })?),
                _ => doc.get(plain_key).cloned(),
            };
            if let Some(value) = value {
                apply_profile_value(&mut profile, plain_key, &value);
            }
        }

        Ok(Some(profile))
    }

    /// Merge the given fields into an existing profile
    pub async fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> Result<(), TrackerError> {
        let plain = to_document(update)?;
        if plain.is_empty() {
            return Err(TrackerError::InvalidInput("no profile fields to update".into()));
        }

        let mut doc = self.encrypt_profile(uid, &plain)?;
        doc.insert("updatedAt".into(), Value::String(Utc::now().to_rfc3339()));

        self.store.update(&paths::user(uid)?, doc).await.map_err(|e| match e {
            BackendError::NotFound(path) => TrackerError::NotFound(path),
            other => other.into(),
        })?;
        tracing::info!("Updated {} profile fields for {}", plain.len(), uid);
        Ok(())
    }

    pub async fn delete_profile(&self, uid: &str) -> Result<(), TrackerError> {
        self.store.delete(&paths::user(uid)?).await?;
        Ok(())
    }

    fn encrypt_profile(&self, uid: &str, plain: &Document) -> Result<Document, TrackerError> {
        let mut doc = Document::new();
        for (plain_key, encrypted_key) in PROFILE_KEYS {
            match plain.get(plain_key) {
                Some(Value::Null) | None => {}
                Some(value) => {
                    let token = self.cipher.encrypt_field(uid, value)?;
                    doc.insert(encrypted_key.to_string(), Value::String(token));
                }
            }
        }
        Ok(doc)
    }

    // Colleges

    /// Add a college to the user's list.
    ///
    /// Catalog-linked entries take their name and platform from the catalog and,
    /// unless the request gives one, the earliest offered deadline. They are
    /// keyed by catalog id, so adding the same college twice replaces it.
    pub async fn add_college(&self, uid: &str, request: &NewCollegeRequest) -> Result<CollegeEntry, TrackerError> {
        let requested_deadline = request.deadline.as_deref().map(Deadline::parse);

        let entry = match request.catalog_id.as_deref().filter(|id| !id.is_empty()) {
            Some(catalog_id) => {
                let record = self
                    .catalog
                    .get(catalog_id)
                    .ok_or_else(|| TrackerError::UnknownCollege(catalog_id.to_string()))?;
                let next = record.next_deadline();

                let (deadline, deadline_type) = match requested_deadline {
                    Some(deadline) => (deadline, request.deadline_type.clone()),
                    None => (
                        next.map(|(_, d)| d.clone()).unwrap_or(Deadline::NotOffered),
                        next.map(|(kind, _)| kind.to_string()),
                    ),
                };

                CollegeEntry {
                    id: record.id.clone(),
                    name: record.name.clone(),
                    deadline,
                    deadline_type,
                    app_type: record.application.app_type,
                    catalog_id: Some(record.id.clone()),
                    created_at: Utc::now(),
                }
            }
            None => {
                let name = request
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| TrackerError::InvalidInput("college name is required".into()))?;

                CollegeEntry {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    deadline: requested_deadline.unwrap_or(Deadline::NotOffered),
                    deadline_type: request.deadline_type.clone(),
                    app_type: request
                        .app_type
                        .as_deref()
                        .map(AppPlatform::from_id)
                        .unwrap_or(AppPlatform::Other),
                    catalog_id: None,
                    created_at: Utc::now(),
                }
            }
        };

        self.store
            .set(&paths::college(uid, &entry.id)?, to_document(&entry)?)
            .await?;
        tracing::info!("Added college {} for {}", entry.id, uid);
        Ok(entry)
    }

    /// Colleges in the order they were added
    pub async fn list_colleges(&self, uid: &str) -> Result<Vec<CollegeEntry>, TrackerError> {
        let snapshot = self.store.list(&paths::colleges(uid)?).await?;
        let mut colleges: Vec<CollegeEntry> = decode_all(snapshot);
        colleges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(colleges)
    }

    pub async fn get_college(&self, uid: &str, college_id: &str) -> Result<Option<CollegeEntry>, TrackerError> {
        let path = paths::college(uid, college_id)?;
        match self.store.get(&path).await? {
            Some(data) => Ok(Some(decode(StoredDocument {
                id: college_id.to_string(),
                data,
            })?)),
            None => Ok(None),
        }
    }

    /// Remove a college together with its essays
    pub async fn delete_college(&self, uid: &str, college_id: &str) -> Result<(), TrackerError> {
        let essays = self.store.list(&paths::essays(uid, college_id)?).await?;
        for essay in &essays {
            self.store.delete(&paths::essay(uid, college_id, &essay.id)?).await?;
        }
        self.store.delete(&paths::college(uid, college_id)?).await?;

        tracing::info!("Deleted college {} ({} essays) for {}", college_id, essays.len(), uid);
        Ok(())
    }

    /// Live view of the user's college list
    pub async fn watch_colleges(&self, uid: &str, callback: SnapshotCallback) -> Result<Subscription, TrackerError> {
        Ok(self.store.subscribe(&paths::colleges(uid)?, callback).await?)
    }

    // Essays

    pub async fn list_essays(&self, uid: &str, college_id: &str) -> Result<Vec<Essay>, TrackerError> {
        let snapshot = self.store.list(&paths::essays(uid, college_id)?).await?;
        let mut essays: Vec<Essay> = decode_all(snapshot);
        essays.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(essays)
    }

    /// Create (`essay_id = None`) or replace an essay on a college already on the list
    pub async fn save_essay(
        &self,
        uid: &str,
        college_id: &str,
        essay_id: Option<&str>,
        request: &EssayRequest,
    ) -> Result<Essay, TrackerError> {
        if self.store.get(&paths::college(uid, college_id)?).await?.is_none() {
            return Err(TrackerError::NotFound(format!("college {}", college_id)));
        }

        let essay = Essay {
            id: essay_id
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            title: request.title.trim().to_string(),
            prompt: request.prompt.clone(),
            body: request.body.clone(),
            category: request.category.clone(),
            word_limit: request.word_limit,
            updated_at: Utc::now(),
        };

        self.store
            .set(&paths::essay(uid, college_id, &essay.id)?, to_document(&essay)?)
            .await?;
        tracing::debug!("Saved essay {} ({} words)", essay.id, essay.word_count());
        Ok(essay)
    }

    pub async fn delete_essay(&self, uid: &str, college_id: &str, essay_id: &str) -> Result<(), TrackerError> {
        self.store.delete(&paths::essay(uid, college_id, essay_id)?).await?;
        Ok(())
    }

    // Activities

    /// Entries on a platform list; for sectioned templates, only the given section
    pub async fn list_activities(
        &self,
        uid: &str,
        platform: AppPlatform,
        section: Option<&str>,
    ) -> Result<Vec<ActivityEntry>, TrackerError> {
        let snapshot = self.store.list(&paths::activities(uid, platform)?).await?;
        let mut entries: Vec<ActivityEntry> = decode_all(snapshot);

        if let Some(section) = section {
            entries.retain(|entry| entry.section.as_deref().unwrap_or_default() == section);
        }
        entries.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(entries)
    }

    /// Validate against the platform template and store.
    ///
    /// `activity_id = None` creates a new entry and is subject to the list's
    /// item cap; creates on one list are serialized so the cap holds under
    /// concurrent writes. An id edits an existing entry.
    pub async fn save_activity(
        &self,
        uid: &str,
        platform: AppPlatform,
        activity_id: Option<&str>,
        request: &ActivityRequest,
    ) -> Result<ActivityEntry, TrackerError> {
        let template = template_for(platform);

        let section = if has_sections(template) {
            let requested = request
                .section
                .as_deref()
                .or_else(|| request.fields.get("section").and_then(Value::as_str));
            template.section(requested).map(|s| s.key.clone())
        } else {
            None
        };

        let create_lock = match activity_id {
            Some(_) => None,
            None => Some(
                self.create_locks
                    .get_with(format!("{}/{}", uid, platform.as_str()), || Arc::new(Mutex::new(()))),
            ),
        };
        let _create_guard = match &create_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let mode = match activity_id {
            Some(id) => {
                if self.store.get(&paths::activity(uid, platform, id)?).await?.is_none() {
                    return Err(TrackerError::NotFound(format!("activity {}", id)));
                }
                WriteMode::Edit
            }
            None => WriteMode::Create {
                existing: self.list_activities(uid, platform, section.as_deref()).await?.len(),
            },
        };

        validate_entry(template, section.as_deref(), &request.fields, mode)?;

        let fields: EntryFields = request
            .fields
            .iter()
            .filter(|(key, _)| !RESERVED_ACTIVITY_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let entry = ActivityEntry {
            id: activity_id
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            app_type: platform,
            section,
            updated_at: Utc::now(),
            fields,
        };

        self.store
            .set(&paths::activity(uid, platform, &entry.id)?, to_document(&entry)?)
            .await?;
        tracing::debug!("Saved {} activity {} for {}", platform, entry.id, uid);
        Ok(entry)
    }

    pub async fn delete_activity(&self, uid: &str, platform: AppPlatform, activity_id: &str) -> Result<(), TrackerError> {
        self.store.delete(&paths::activity(uid, platform, activity_id)?).await?;
        Ok(())
    }

    // Aggregates

    pub async fn stats(&self, uid: &str) -> Result<DashboardStats, TrackerError> {
        let colleges = self.list_colleges(uid).await?;

        let mut total_activities = 0;
        for platform in AppPlatform::ALL {
            total_activities += self.store.list(&paths::activities(uid, platform)?).await?.len();
        }

        let today = Utc::now().date_naive();
        let upcoming_deadlines = colleges
            .iter()
            .filter_map(|college| college.deadline.date())
            .filter(|date| *date >= today)
            .count();

        Ok(DashboardStats {
            total_colleges: colleges.len(),
            total_activities,
            upcoming_deadlines,
        })
    }

    /// Lay the user's college deadlines out by day
    ///
    /// `today` anchors the upcoming list and its day counts.
    pub async fn deadlines(&self, uid: &str, today: NaiveDate) -> Result<DeadlineCalendar, TrackerError> {
        let colleges = self.list_colleges(uid).await?;
        let mut calendar = DeadlineCalendar::default();

        for college in &colleges {
            let item = DeadlineItem::for_college(college);
            match college.deadline.date() {
                Some(date) => {
                    if date >= today {
                        calendar.upcoming.push(DeadlineItem {
                            days_until: Some((date - today).num_days()),
                            ..item.clone()
                        });
                    }
                    calendar.by_date.entry(date).or_insert_with(Vec::new).push(item);
                }
                None if college.deadline.is_offered() => calendar.undated.push(item),
                None => {}
            }
        }

        calendar
            .upcoming
            .sort_by(|a, b| a.days_until.cmp(&b.days_until).then_with(|| a.college_name.cmp(&b.college_name)));
        for items in calendar.by_date.values_mut() {
            items.sort_by(|a, b| a.college_name.cmp(&b.college_name));
        }
        calendar.undated.sort_by(|a, b| a.college_name.cmp(&b.college_name));

        Ok(calendar)
    }

    /// Rank the catalog against the stored profile
    pub async fn recommend_for_user(
        &self,
        uid: &str,
        matcher: &Matcher,
        limit: Option<usize>,
    ) -> Result<MatchResult, TrackerError> {
        let profile = self
            .load_profile(uid)
            .await?
            .ok_or_else(|| TrackerError::NotFound("profile".into()))?;

        let limit = limit.unwrap_or_else(|| matcher.max_results());
        Ok(matcher.recommend_with_limit(&profile.to_user_profile(), self.catalog.all(), limit))
    }

    /// Remove everything stored for a user
    pub async fn delete_user_data(&self, uid: &str) -> Result<(), TrackerError> {
        for college in self.store.list(&paths::colleges(uid)?).await? {
            self.delete_college(uid, &college.id).await?;
        }
        for platform in AppPlatform::ALL {
            for activity in self.store.list(&paths::activities(uid, platform)?).await? {
                self.delete_activity(uid, platform, &activity.id).await?;
            }
        }
        self.delete_profile(uid).await?;

        tracing::info!("Deleted all data for {}", uid);
        Ok(())
    }
}

fn to_document<T: Serialize>(value: &T) -> Result<Document, TrackerError> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        _ => Err(TrackerError::InvalidInput("expected an object".into())),
    }
}

fn decode<T: DeserializeOwned>(doc: StoredDocument) -> Result<T, TrackerError> {
    let mut data = doc.data;
    data.insert("id".into(), Value::String(doc.id));
    Ok(serde_json::from_value(Value::Object(data))?)
}

/// Decode a snapshot, skipping documents that no longer fit the model
fn decode_all<T: DeserializeOwned>(snapshot: Vec<StoredDocument>) -> Vec<T> {
    snapshot
        .into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            decode(doc)
                .map_err(|e| tracing::warn!("Skipping malformed document {}: {}", id, e))
                .ok()
        })
        .collect()
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn apply_profile_value(profile: &mut ProfileFields, key: &str, value: &Value) {
    match key {
        "name" => profile.name = text(value),
        "city" => profile.city = text(value),
        "gpa" => profile.gpa = text(value),
        "gpaScale" => profile.gpa_scale = text(value),
        "weighted" => {
            profile.weighted = match value {
                Value::Bool(flag) => *flag,
                other => text(other).eq_ignore_ascii_case("true"),
            }
        }
        "testType" => profile.test_type = text(value),
        "testScore" => profile.test_score = text(value),
        "location" => profile.location = text(value),
        "costPref" => profile.cost_pref = text(value),
        "majorPrestige" => profile.major_prestige = text(value),
        "major" => profile.major = Some(text(value)).filter(|m| !m.is_empty()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::documents::MemoryDocumentStore;
    use chrono::Duration;
    use serde_json::json;

    fn tracker() -> Tracker<MemoryDocumentStore> {
        let catalog = Arc::new(CollegeCatalog::embedded().unwrap());
        Tracker::new(
            MemoryDocumentStore::new(),
            FieldCipher::new("collegeTrackerSalt", 1_000, 16),
            catalog,
        )
    }

    fn profile() -> ProfileFields {
        ProfileFields {
            name: "Ada Lovelace".into(),
            city: "Seattle".into(),
            gpa: "3.8".into(),
            gpa_scale: "4".into(),
            weighted: true,
            test_type: "SAT".into(),
            test_score: "1400".into(),
            location: "PNW".into(),
            cost_pref: "public".into(),
            major_prestige: "3".into(),
            major: Some("Computer Science".into()),
        }
    }

    fn fields(value: Value) -> EntryFields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_profile_is_stored_encrypted() {
        let tracker = tracker();
        tracker.save_profile("u1", &profile()).await.unwrap();

        let raw = tracker.store().get(&paths::user("u1").unwrap()).await.unwrap().unwrap();
        assert!(raw.get("name").is_none());
        assert!(raw.contains_key("encryptedGPA"));
        assert_ne!(raw["encryptedName"], json!("Ada Lovelace"));

        let loaded = tracker.load_profile("u1").await.unwrap().unwrap();
        assert_eq!(loaded, profile());
    }

    #[tokio::test]
    async fn test_profile_from_another_secret_fails_generically() {
        let tracker = tracker();
        tracker.save_profile("u1", &profile()).await.unwrap();

        let raw = tracker.store().get(&paths::user("u1").unwrap()).await.unwrap().unwrap();
        tracker.store().set(&paths::user("u2").unwrap(), raw).await.unwrap();

        let err = tracker.load_profile("u2").await.unwrap_err();
        assert!(matches!(err, TrackerError::ProfileLoad));
        assert_eq!(err.to_string(), "Failed to load profile data");
    }

    #[tokio::test]
    async fn test_legacy_plaintext_profile_loads() {
        let tracker = tracker();
        let doc = fields(json!({"name": "Grace", "gpa": 3.9, "weighted": "true", "testType": "ACT"}));
        tracker.store().set(&paths::user("u1").unwrap(), doc).await.unwrap();

        let loaded = tracker.load_profile("u1").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Grace");
        assert_eq!(loaded.gpa, "3.9");
        assert!(loaded.weighted);
        assert_eq!(loaded.test_type, "ACT");
        assert_eq!(loaded.gpa_scale, "4");
    }

    #[tokio::test]
    async fn test_update_profile_merges() {
        let tracker = tracker();
        let update = ProfileUpdate {
            city: Some("Tacoma".into()),
            ..Default::default()
        };
        assert!(matches!(
            tracker.update_profile("u1", &update).await.unwrap_err(),
            TrackerError::NotFound(_)
        ));

        tracker.save_profile("u1", &profile()).await.unwrap();
        tracker.update_profile("u1", &update).await.unwrap();

        let loaded = tracker.load_profile("u1").await.unwrap().unwrap();
        assert_eq!(loaded.city, "Tacoma");
        assert_eq!(loaded.name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_add_catalog_college_copies_metadata() {
        let tracker = tracker();
        let request = NewCollegeRequest {
            name: None,
            catalog_id: Some("university-of-washington".into()),
            deadline: None,
            deadline_type: None,
            app_type: None,
        };
        let entry = tracker.add_college("u1", &request).await.unwrap();
        assert_eq!(entry.name, "University of Washington");
        assert_eq!(entry.app_type, AppPlatform::CommonApp);
        assert!(entry.deadline.is_offered());
        assert!(entry.deadline_type.is_some());

        let listed = tracker.list_colleges("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "university-of-washington");
    }

    #[tokio::test]
    async fn test_add_college_errors() {
        let tracker = tracker();
        let unknown = NewCollegeRequest {
            name: None,
            catalog_id: Some("hogwarts".into()),
            deadline: None,
            deadline_type: None,
            app_type: None,
        };
        assert!(matches!(
            tracker.add_college("u1", &unknown).await.unwrap_err(),
            TrackerError::UnknownCollege(_)
        ));

        let nameless = NewCollegeRequest {
            catalog_id: None,
            name: Some("   ".into()),
            ..unknown
        };
        assert!(matches!(
            tracker.add_college("u1", &nameless).await.unwrap_err(),
            TrackerError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_college_removes_essays() {
        let tracker = tracker();
        let entry = tracker
            .add_college(
                "u1",
                &NewCollegeRequest {
                    name: Some("Reed College".into()),
                    catalog_id: None,
                    deadline: Some("2026-01-15".into()),
                    deadline_type: Some("regularDecision".into()),
                    app_type: Some("common app".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(entry.app_type, AppPlatform::CommonApp);

        let essay = EssayRequest {
            title: "Why Reed".into(),
            prompt: String::new(),
            body: "Because of the library".into(),
            category: "supplement".into(),
            word_limit: Some(250),
        };
        tracker.save_essay("u1", &entry.id, None, &essay).await.unwrap();
        assert_eq!(tracker.list_essays("u1", &entry.id).await.unwrap().len(), 1);

        tracker.delete_college("u1", &entry.id).await.unwrap();
        assert!(tracker.list_essays("u1", &entry.id).await.unwrap().is_empty());
        assert!(tracker.get_college("u1", &entry.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_essay_requires_college() {
        let tracker = tracker();
        let essay = EssayRequest {
            title: "Orphan".into(),
            prompt: String::new(),
            body: String::new(),
            category: String::new(),
            word_limit: None,
        };
        assert!(matches!(
            tracker.save_essay("u1", "nowhere", None, &essay).await.unwrap_err(),
            TrackerError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_activity_cap_enforced_on_create_only() {
        let tracker = tracker();
        let request = ActivityRequest {
            section: None,
            fields: fields(json!({
                "category": "Awards/Honors",
                "activityName": "USAMO qualifier",
                "description": "Top 250 nationally",
                "gradesParticipated": ["11"],
            })),
        };

        let mut first = None;
        for _ in 0..5 {
            let entry = tracker.save_activity("u1", AppPlatform::Mit, None, &request).await.unwrap();
            first.get_or_insert(entry.id);
        }

        let err = tracker.save_activity("u1", AppPlatform::Mit, None, &request).await.unwrap_err();
        assert_eq!(err.to_string(), "You can only add up to 5 activities for MIT Application");

        let edited = tracker
            .save_activity("u1", AppPlatform::Mit, first.as_deref(), &request)
            .await
            .unwrap();
        assert_eq!(Some(edited.id), first);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_respect_activity_cap() {
        let tracker = Arc::new(tracker());
        let request = Arc::new(ActivityRequest {
            section: None,
            fields: fields(json!({
                "category": "Awards/Honors",
                "activityName": "USAMO qualifier",
                "description": "Top 250 nationally",
                "gradesParticipated": ["11"],
            })),
        });
        for _ in 0..4 {
            tracker.save_activity("u1", AppPlatform::Mit, None, &request).await.unwrap();
        }

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let tracker = tracker.clone();
                let request = request.clone();
                tokio::spawn(async move { tracker.save_activity("u1", AppPlatform::Mit, None, &request).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        let stored = tracker.list_activities("u1", AppPlatform::Mit, None).await.unwrap();
        assert_eq!(stored.len(), 5);
    }

    #[tokio::test]
    async fn test_activity_sections_counted_separately() {
        let tracker = tracker();
        let award = ActivityRequest {
            section: Some("awards".into()),
            fields: fields(json!({
                "awardCategory": "Academic",
                "awardName": "National Merit Finalist",
                "description": "PSAT-based national scholarship recognition",
                "gradeReceived": ["12"],
                "recognitionLevel": "National",
            })),
        };
        let entry = tracker.save_activity("u1", AppPlatform::CommonApp, None, &award).await.unwrap();
        assert_eq!(entry.section.as_deref(), Some("awards"));
        assert!(!entry.fields.contains_key("section"));

        let awards = tracker
            .list_activities("u1", AppPlatform::CommonApp, Some("awards"))
            .await
            .unwrap();
        let activities = tracker
            .list_activities("u1", AppPlatform::CommonApp, Some("activities"))
            .await
            .unwrap();
        assert_eq!(awards.len(), 1);
        assert!(activities.is_empty());
    }

    #[tokio::test]
    async fn test_editing_missing_activity_is_not_found() {
        let tracker = tracker();
        let request = ActivityRequest {
            section: None,
            fields: EntryFields::new(),
        };
        assert!(matches!(
            tracker
                .save_activity("u1", AppPlatform::Other, Some("ghost"), &request)
                .await
                .unwrap_err(),
            TrackerError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_stats_and_cleanup() {
        let tracker = tracker();
        let soon = (Utc::now() + Duration::days(30)).format("%Y-%m-%d").to_string();
        let past = (Utc::now() - Duration::days(30)).format("%Y-%m-%d").to_string();

        for (name, deadline) in [("Future U", soon), ("Past U", past)] {
            tracker
                .add_college(
                    "u1",
                    &NewCollegeRequest {
                        name: Some(name.into()),
                        catalog_id: None,
                        deadline: Some(deadline),
                        deadline_type: None,
                        app_type: None,
                    },
                )
                .await
                .unwrap();
        }
        let request = ActivityRequest {
            section: None,
            fields: fields(json!({
                "activityCategory": "Academic",
                "activityName": "Chess club",
                "description": "Club president",
                "gradesParticipated": ["9", "10"],
            })),
        };
        tracker.save_activity("u1", AppPlatform::Other, None, &request).await.unwrap();
        tracker.save_profile("u1", &profile()).await.unwrap();

        let stats = tracker.stats("u1").await.unwrap();
        assert_eq!(stats.total_colleges, 2);
        assert_eq!(stats.total_activities, 1);
        assert_eq!(stats.upcoming_deadlines, 1);

        tracker.delete_user_data("u1").await.unwrap();
        let stats = tracker.stats("u1").await.unwrap();
        assert_eq!(stats.total_colleges, 0);
        assert_eq!(stats.total_activities, 0);
        assert!(tracker.load_profile("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deadline_calendar_groups_by_day() {
        let tracker = tracker();
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();

        for (name, deadline) in [
            ("Past U", "2025-12-01"),
            ("Westlake", "2026-01-15"),
            ("Eastlake", "2026-01-15"),
            ("Today U", "2026-01-10"),
            ("Rolling U", "rolling"),
            ("Spring U", "Early spring"),
            ("Closed U", ""),
        ] {
            tracker
                .add_college(
                    "u1",
                    &NewCollegeRequest {
                        name: Some(name.into()),
                        catalog_id: None,
                        deadline: Some(deadline.into()),
                        deadline_type: Some("regularDecision".into()),
                        app_type: None,
                    },
                )
                .await
                .unwrap();
        }

        let calendar = tracker.deadlines("u1", today).await.unwrap();

        assert_eq!(calendar.by_date.len(), 3);
        let past = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(calendar.by_date[&past][0].college_name, "Past U");
        assert_eq!(calendar.by_date[&past][0].days_until, None);
        let shared: Vec<_> = calendar.by_date[&NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()]
            .iter()
            .map(|item| item.college_name.as_str())
            .collect();
        assert_eq!(shared, ["Eastlake", "Westlake"]);

        let upcoming: Vec<_> = calendar
            .upcoming
            .iter()
            .map(|item| (item.college_name.as_str(), item.days_until))
            .collect();
        assert_eq!(
            upcoming,
            [("Today U", Some(0)), ("Eastlake", Some(5)), ("Westlake", Some(5))]
        );

        let undated: Vec<_> = calendar.undated.iter().map(|item| item.college_name.as_str()).collect();
        assert_eq!(undated, ["Rolling U", "Spring U"]);
        assert_eq!(calendar.undated[0].deadline, Deadline::Rolling);
        assert_eq!(calendar.undated[0].deadline_type.as_deref(), Some("regularDecision"));
    }

    #[tokio::test]
    async fn test_recommend_for_user_uses_stored_profile() {
        let tracker = tracker();
        let matcher = Matcher::default();
        assert!(matches!(
            tracker.recommend_for_user("u1", &matcher, None).await.unwrap_err(),
            TrackerError::NotFound(_)
        ));

        tracker.save_profile("u1", &profile()).await.unwrap();
        let result = tracker.recommend_for_user("u1", &matcher, None).await.unwrap();
        assert!(!result.colleges.is_empty());
        assert!(result
            .colleges
            .iter()
            .all(|c| c.college.region == "PNW" && c.college.cost.cost_type == crate::models::CostType::Public));
    }
}
