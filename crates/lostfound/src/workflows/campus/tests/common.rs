use std::sync::{Arc, Mutex, OnceLock};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::auth::{self, TokenSigner};
use crate::workflows::campus::campus_router;
use crate::workflows::campus::domain::{
    AdminSetting, AuditLogEntry, Claim, ClaimId, ClaimSubmission, Item, ItemId, ItemReport,
    ItemVerification, ItemVerificationAction, Notification, NotificationId, Registration,
    ReportKind, TimelineEvent, User, UserId, UserRole,
};
use crate::workflows::campus::memory::InMemoryRepository;
use crate::workflows::campus::notices::NotificationDraft;
use crate::workflows::campus::repository::{CampusRepository, RepositoryError};
use crate::workflows::campus::service::{CampusService, Clock};

pub(super) const PASSWORD: &str = "secret123";
pub(super) const SECRET: &str = "test-signing-secret";

/// Argon2 is slow in debug builds, so fixtures share one hash of [`PASSWORD`].
pub(super) fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| auth::hash_password(PASSWORD).expect("hash password"))
        .clone()
}

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 2, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Clock that only moves when a test advances it.
pub(super) struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub(super) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

pub(super) type TestService = CampusService<InMemoryRepository>;

pub(super) struct Harness {
    pub service: Arc<TestService>,
    pub repository: Arc<InMemoryRepository>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub(super) fn router(&self) -> axum::Router {
        campus_router(self.service.clone())
    }

    /// Advance time so rows created next sort after the ones already stored.
    pub(super) fn tick(&self) {
        self.clock.advance(Duration::minutes(1));
    }
}

pub(super) fn build_service() -> Harness {
    let repository = Arc::new(InMemoryRepository::default());
    let clock = Arc::new(FixedClock::new(start()));
    let service = Arc::new(CampusService::with_clock(
        repository.clone(),
        TokenSigner::new(SECRET, 60),
        clock.clone(),
    ));
    Harness {
        service,
        repository,
        clock,
    }
}

pub(super) fn registration(email: &str, student_number: &str) -> Registration {
    Registration {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        first_name: "Maria".to_string(),
        last_name: "Santos".to_string(),
        student_number: student_number.to_string(),
        year_level: 2,
        course: "BS Computer Science".to_string(),
        phone: Some("09171234567".to_string()),
    }
}

fn user(
    first_name: &str,
    last_name: &str,
    email: &str,
    student_number: &str,
    role: UserRole,
) -> User {
    User {
        id: UserId(0),
        email: email.to_string(),
        password_hash: password_hash(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        student_number: student_number.to_string(),
        year_level: 3,
        course: "BS Information Technology".to_string(),
        phone: None,
        role,
        is_active: true,
        created_at: start(),
        updated_at: start(),
    }
}

pub(super) fn seed_student(harness: &Harness, first_name: &str, student_number: &str) -> User {
    let email = format!("{}@school.edu", first_name.to_ascii_lowercase());
    harness
        .repository
        .insert_user(user(first_name, "Reyes", &email, student_number, UserRole::Student))
        .expect("insert student")
}

pub(super) fn seed_inactive_student(
    harness: &Harness,
    first_name: &str,
    student_number: &str,
) -> User {
    let email = format!("{}@school.edu", first_name.to_ascii_lowercase());
    let mut account = user(first_name, "Reyes", &email, student_number, UserRole::Student);
    account.is_active = false;
    harness
        .repository
        .insert_user(account)
        .expect("insert inactive student")
}

pub(super) fn seed_admin(harness: &Harness) -> User {
    harness
        .repository
        .insert_user(user(
            "Admin",
            "User",
            "admin@school.edu",
            "ADMIN001",
            UserRole::Admin,
        ))
        .expect("insert admin")
}

pub(super) fn token_for(harness: &Harness, user: &User) -> String {
    harness
        .service
        .login(&user.email, PASSWORD)
        .expect("login")
        .token
        .access_token
}

pub(super) fn found_report() -> ItemReport {
    ItemReport {
        title: "Black Umbrella".to_string(),
        description: "Compact umbrella with a wooden handle".to_string(),
        category: "Accessories".to_string(),
        color: Some("Black".to_string()),
        condition: Some("Good".to_string()),
        location: "Library - 2nd Floor".to_string(),
        date: start() - Duration::days(1),
        kind: ReportKind::Found,
        is_urgent: false,
        reward: None,
        image_url: None,
        contact_method: "email".to_string(),
        submitted_to_security: true,
    }
}

pub(super) fn lost_report() -> ItemReport {
    ItemReport {
        title: "Blue Water Bottle".to_string(),
        description: "Hydro flask with university stickers".to_string(),
        category: "Personal Items".to_string(),
        color: Some("Blue".to_string()),
        condition: None,
        location: "Gymnasium".to_string(),
        date: start() - Duration::days(2),
        kind: ReportKind::Lost,
        is_urgent: true,
        reward: Some("500 PHP".to_string()),
        image_url: None,
        contact_method: "email".to_string(),
        submitted_to_security: false,
    }
}

pub(super) fn approve() -> ItemVerification {
    ItemVerification {
        action: ItemVerificationAction::Approve,
        notes: Some("Checked at the security desk".to_string()),
        rejection_reason: None,
        more_info_message: None,
    }
}

pub(super) fn claim_submission(item: ItemId) -> ClaimSubmission {
    ClaimSubmission {
        item_id: Some(item),
        verification_details: "Initials M.S. carved into the handle".to_string(),
        color: Some("Black".to_string()),
        condition: None,
        location: Some("Library".to_string()),
        date: Some("2025-09-01".to_string()),
    }
}

/// Report a found item as `reporter` and have `admin` publish it.
pub(super) fn published_found_item(harness: &Harness, reporter: &User, admin: &User) -> Item {
    let item = harness
        .service
        .report_item(reporter, found_report())
        .expect("report item");
    harness.tick();
    harness
        .service
        .verify_item(admin, item.id, approve())
        .expect("approve item")
        .1
        .item
}

pub(super) fn claim_on(harness: &Harness, claimant: &User, item: ItemId) -> Claim {
    harness.tick();
    harness
        .service
        .submit_claim(claimant, item, claim_submission(item))
        .expect("submit claim")
}

pub(super) fn notifications_of(harness: &Harness, user: UserId) -> Vec<Notification> {
    harness
        .repository
        .notifications()
        .expect("notifications")
        .into_iter()
        .filter(|notification| notification.user_id == user)
        .collect()
}

pub(super) fn timeline_actions(harness: &Harness, item: ItemId) -> Vec<String> {
    harness
        .repository
        .timeline(item)
        .expect("timeline")
        .into_iter()
        .map(|event| event.action)
        .collect()
}

pub(super) fn audit_actions(harness: &Harness) -> Vec<String> {
    harness
        .repository
        .audit_log()
        .expect("audit log")
        .into_iter()
        .map(|entry| entry.action)
        .collect()
}

pub(super) fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
        .expect("request")
}

pub(super) fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn assert_error(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    let body = read_json_body(response).await;
    assert!(body["error"].is_string(), "expected error payload, got {body}");
    body
}

/// Repository whose backing store is offline.
pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl CampusRepository for UnavailableRepository {
    fn insert_user(&self, _user: User) -> Result<User, RepositoryError> {
        offline()
    }

    fn user(&self, _id: UserId) -> Result<Option<User>, RepositoryError> {
        offline()
    }

    fn user_by_email(&self, _email: &str) -> Result<Option<User>, RepositoryError> {
        offline()
    }

    fn users(&self) -> Result<Vec<User>, RepositoryError> {
        offline()
    }

    fn insert_item(&self, _item: Item) -> Result<Item, RepositoryError> {
        offline()
    }

    fn update_item(&self, _item: Item) -> Result<(), RepositoryError> {
        offline()
    }

    fn item(&self, _id: ItemId) -> Result<Option<Item>, RepositoryError> {
        offline()
    }

    fn items(&self) -> Result<Vec<Item>, RepositoryError> {
        offline()
    }

    fn insert_claim(&self, _claim: Claim) -> Result<Claim, RepositoryError> {
        offline()
    }

    fn update_claim(&self, _claim: Claim) -> Result<(), RepositoryError> {
        offline()
    }

    fn claim(&self, _id: ClaimId) -> Result<Option<Claim>, RepositoryError> {
        offline()
    }

    fn claims(&self) -> Result<Vec<Claim>, RepositoryError> {
        offline()
    }

    fn insert_notification(
        &self,
        _draft: NotificationDraft,
        _created_at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError> {
        offline()
    }

    fn mark_notifications_read(
        &self,
        _user: UserId,
        _id: Option<NotificationId>,
    ) -> Result<usize, RepositoryError> {
        offline()
    }

    fn notifications(&self) -> Result<Vec<Notification>, RepositoryError> {
        offline()
    }

    fn append_timeline(&self, _event: TimelineEvent) -> Result<TimelineEvent, RepositoryError> {
        offline()
    }

    fn timeline(&self, _item: ItemId) -> Result<Vec<TimelineEvent>, RepositoryError> {
        offline()
    }

    fn append_audit(&self, _entry: AuditLogEntry) -> Result<AuditLogEntry, RepositoryError> {
        offline()
    }

    fn audit_log(&self) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        offline()
    }

    fn settings(&self) -> Result<Vec<AdminSetting>, RepositoryError> {
        offline()
    }

    fn upsert_setting(&self, _setting: AdminSetting) -> Result<AdminSetting, RepositoryError> {
        offline()
    }
}
