use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier wrapper for registered users.
    UserId
);
id_type!(
    /// Identifier wrapper for reported items.
    ItemId
);
id_type!(
    /// Identifier wrapper for ownership claims.
    ClaimId
);
id_type!(NotificationId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Faculty,
    Admin,
}

impl UserRole {
    pub fn label(self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Faculty => "faculty",
            UserRole::Admin => "admin",
        }
    }
}

/// Whether the reporter lost the item or found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Lost,
    Found,
}

/// Physical lifecycle of an item, from intake to its final disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    PendingVerification,
    Lost,
    Found,
    Rejected,
    OnHold,
    ReadyForRelease,
    Returned,
    Archived,
    Disposed,
}

impl ItemStatus {
    pub fn label(self) -> &'static str {
        match self {
            ItemStatus::PendingVerification => "pending_verification",
            ItemStatus::Lost => "lost",
            ItemStatus::Found => "found",
            ItemStatus::Rejected => "rejected",
            ItemStatus::OnHold => "on_hold",
            ItemStatus::ReadyForRelease => "ready_for_release",
            ItemStatus::Returned => "returned",
            ItemStatus::Archived => "archived",
            ItemStatus::Disposed => "disposed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Staff review state of a report, tracked separately from the item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
    MoreInfoRequested,
}

impl VerificationStatus {
    pub fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
            VerificationStatus::MoreInfoRequested => "more_info_requested",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
    MoreInfoNeeded,
}

impl ClaimStatus {
    pub fn label(self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::MoreInfoNeeded => "more_info_needed",
        }
    }

    /// Claims still waiting on a staff decision.
    pub fn is_open(self) -> bool {
        matches!(self, ClaimStatus::Pending | ClaimStatus::MoreInfoNeeded)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub student_number: String,
    pub year_level: u8,
    pub course: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub location: String,
    pub date: DateTime<Utc>,
    pub kind: ReportKind,
    pub status: ItemStatus,
    pub verification_status: VerificationStatus,
    pub is_urgent: bool,
    pub reward: Option<String>,
    pub image_url: Option<String>,
    pub contact_method: String,
    pub submitted_to_security: bool,
    pub reference_number: String,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub hold_until: Option<DateTime<Utc>>,
    pub hold_days: u32,
    pub is_published: bool,
    pub reporter_id: UserId,
    pub claimed_by_id: Option<UserId>,
    pub verified_by_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub disposed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub item_id: ItemId,
    pub claimant_id: UserId,
    pub verification_details: String,
    pub claimed_color: Option<String>,
    pub claimed_condition: Option<String>,
    pub claimed_location: Option<String>,
    pub claimed_date: Option<String>,
    pub status: ClaimStatus,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub reviewed_by_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FoundApproved,
    ItemRejected,
    MoreInfoRequested,
    ClaimSubmitted,
    NewClaim,
    ClaimApproved,
    ClaimDenied,
    ItemReturned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub item_id: Option<ItemId>,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of something that happened to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: u64,
    pub item_id: ItemId,
    pub action: String,
    pub description: String,
    pub performed_by_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Item,
    Claim,
    User,
    Settings,
}

/// Append-only record of an administrative action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: u64,
    pub admin_id: UserId,
    pub action: String,
    pub entity_type: AuditEntity,
    pub entity_id: u64,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSetting {
    pub id: u64,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by_id: Option<UserId>,
}

/// Settings seeded the first time an administrator opens the settings page.
pub const DEFAULT_SETTINGS: [(&str, &str, &str); 3] = [
    ("hold_period_days", "7", "Default hold period in days for items"),
    (
        "blur_level",
        "medium",
        "Blur level for published found items (low/medium/high)",
    ),
    (
        "admin_email",
        "admin@school.edu",
        "Admin contact email for notifications",
    ),
];

pub const HOLD_PERIOD_SETTING: &str = "hold_period_days";
pub const DEFAULT_HOLD_DAYS: u32 = 7;
/// Longest hold staff may place on an item, whether per request or as the default.
pub const MAX_HOLD_DAYS: u32 = 365;

/// Account creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub student_number: String,
    pub year_level: u8,
    pub course: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Lost or found report submitted by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    pub location: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date: DateTime<Utc>,
    #[serde(rename = "status")]
    pub kind: ReportKind,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub reward: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_contact_method")]
    pub contact_method: String,
    #[serde(default)]
    pub submitted_to_security: bool,
}

fn default_contact_method() -> String {
    "email".to_string()
}

/// Reporter edits sent in answer to a request for more information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Ownership claim submitted against a found item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSubmission {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    pub verification_details: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Claimant answer to a request for more information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemVerificationAction {
    Approve,
    Reject,
    RequestMoreInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemVerification {
    pub action: ItemVerificationAction,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub more_info_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimVerificationAction {
    Approve,
    Deny,
    RequestMoreInfo,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimVerification {
    pub action: ClaimVerificationAction,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub hold_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingUpdate {
    pub setting_key: String,
    pub setting_value: String,
}

/// An item joined with the user who reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedItem {
    pub item: Item,
    pub reporter: User,
}

/// Full staff view of an item: reporter contact plus newest-first timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDossier {
    pub item: Item,
    pub reporter: User,
    pub timeline: Vec<(TimelineEvent, Option<User>)>,
}

/// A claim joined with its item and claimant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimDossier {
    pub claim: Claim,
    pub item: Item,
    pub claimant: User,
}

/// Offset pagination shared by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }
    }

    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter().skip(self.skip).take(self.limit).collect()
    }
}

/// Filters for the public item listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub status: Option<ItemStatus>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub text: Option<String>,
}

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Accepts RFC 3339, naive ISO timestamps (read as UTC), or a bare `YYYY-MM-DD`.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("failed to parse '{raw}' as an ISO 8601 timestamp"))
}

pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_timestamp(&value).map_err(serde::de::Error::custom))
        .transpose()
}
