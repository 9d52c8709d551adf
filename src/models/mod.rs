// Model exports
pub mod documents;
pub mod domain;
pub mod lenient;
pub mod requests;
pub mod responses;
pub mod template;

pub use documents::{
    ActivityEntry, CollegeEntry, DashboardStats, DeadlineCalendar, DeadlineItem, Essay, ProfileFields, ProfileUpdate,
};
pub use domain::{
    AppPlatform, Band, CatalogFilter, CollegeRecord, CostType, Deadline, NumericFilter, ScoredCollege,
    ScoringThresholds, StatRange, TestType, UserProfile,
};
pub use requests::{
    ActivityRequest, ChangePasswordRequest, CredentialsRequest, DeleteAccountRequest,
    EssayRequest, NewCollegeRequest, RecommendRequest, SearchQuery, SectionQuery,
};
pub use responses::{
    AuthResponse, ErrorResponse, HealthResponse, RecommendResponse, SessionStateResponse, TemplateResponse,
};
pub use template::{
    ApplicationTemplate, EntryFields, FieldDescriptor, FieldKind, TemplateLayout, TemplateSection,
    Visibility,
};
