//! JSON shapes returned by the HTTP layer. Field names are camelCase for the web client.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    AdminSetting, AuditEntity, AuditLogEntry, Claim, ClaimDossier, ClaimId, ClaimStatus, Item,
    ItemDossier, ItemId, ItemStatus, Notification, NotificationId, NotificationKind,
    ReportedItem, TimelineEvent, User, UserId, UserRole, VerificationStatus,
};
use super::service::Session;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub student_number: String,
    pub year_level: u8,
    pub course: String,
    pub role: UserRole,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            student_number: user.student_number.clone(),
            year_level: user.year_level,
            course: user.course.clone(),
            role: user.role,
        }
    }
}

/// Login and registration response. The token fields keep their OAuth2 names.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserView,
}

impl From<&Session> for TokenResponse {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.token.access_token.clone(),
            token_type: session.token.token_type,
            user: UserView::from(&session.user),
        }
    }
}

/// Public item card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub location: String,
    pub date: DateTime<Utc>,
    pub status: ItemStatus,
    pub verification_status: VerificationStatus,
    pub is_urgent: bool,
    pub reward: Option<String>,
    pub image_url: Option<String>,
    pub reference_number: String,
    pub reporter: UserView,
    pub created_at: DateTime<Utc>,
}

impl ItemView {
    pub fn new(item: &Item, reporter: &User) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            color: item.color.clone(),
            condition: item.condition.clone(),
            location: item.location.clone(),
            date: item.date,
            status: item.status,
            verification_status: item.verification_status,
            is_urgent: item.is_urgent,
            reward: item.reward.clone(),
            image_url: item.image_url.clone(),
            reference_number: item.reference_number.clone(),
            reporter: UserView::from(reporter),
            created_at: item.created_at,
        }
    }
}

impl From<&ReportedItem> for ItemView {
    fn from(reported: &ReportedItem) -> Self {
        Self::new(&reported.item, &reported.reporter)
    }
}

/// Status snapshot returned after a lifecycle action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStateView {
    pub id: ItemId,
    pub reference_number: String,
    pub status: ItemStatus,
    pub verification_status: VerificationStatus,
    pub is_published: bool,
    pub claimed_by: Option<UserId>,
    pub hold_until: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub disposed_at: Option<DateTime<Utc>>,
}

impl From<&Item> for ItemStateView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            reference_number: item.reference_number.clone(),
            status: item.status,
            verification_status: item.verification_status,
            is_published: item.is_published,
            claimed_by: item.claimed_by_id,
            hold_until: item.hold_until,
            returned_at: item.returned_at,
            archived_at: item.archived_at,
            disposed_at: item.disposed_at,
        }
    }
}

/// Contact block staff see for reporters and claimants.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub student_number: String,
    pub year_level: u8,
    pub course: String,
    pub phone: Option<String>,
}

impl From<&User> for ContactView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name(),
            email: user.email.clone(),
            student_number: user.student_number.clone(),
            year_level: user.year_level,
            course: user.course.clone(),
            phone: user.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonRef {
    pub id: UserId,
    pub name: String,
}

impl From<&User> for PersonRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name(),
        }
    }
}

/// Row in the staff verification queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItemView {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub location: String,
    pub date: DateTime<Utc>,
    pub status: ItemStatus,
    pub image_url: Option<String>,
    pub reference_number: String,
    pub is_urgent: bool,
    pub reward: Option<String>,
    pub submitted_to_security: bool,
    pub reporter: ContactView,
    pub created_at: DateTime<Utc>,
    pub verification_status: VerificationStatus,
}

impl From<&ReportedItem> for PendingItemView {
    fn from(ReportedItem { item, reporter }: &ReportedItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            color: item.color.clone(),
            condition: item.condition.clone(),
            location: item.location.clone(),
            date: item.date,
            status: item.status,
            image_url: item.image_url.clone(),
            reference_number: item.reference_number.clone(),
            is_urgent: item.is_urgent,
            reward: item.reward.clone(),
            submitted_to_security: item.submitted_to_security,
            reporter: ContactView::from(reporter),
            created_at: item.created_at,
            verification_status: item.verification_status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntryView {
    pub id: u64,
    pub action: String,
    pub description: String,
    /// Performer's name, or `System` when nobody is attached.
    pub performed_by: String,
    pub created_at: DateTime<Utc>,
}

impl TimelineEntryView {
    fn new(event: &TimelineEvent, performer: Option<&User>) -> Self {
        Self {
            id: event.id,
            action: event.action.clone(),
            description: event.description.clone(),
            performed_by: performer.map_or_else(|| "System".to_string(), User::full_name),
            created_at: event.created_at,
        }
    }
}

/// Everything staff know about an item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetailView {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub location: String,
    pub date: DateTime<Utc>,
    pub status: ItemStatus,
    pub image_url: Option<String>,
    pub reference_number: String,
    pub is_urgent: bool,
    pub reward: Option<String>,
    pub submitted_to_security: bool,
    pub verification_status: VerificationStatus,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub hold_until: Option<DateTime<Utc>>,
    pub hold_days: u32,
    pub is_published: bool,
    pub claimed_by: Option<UserId>,
    pub reporter: ContactView,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub disposed_at: Option<DateTime<Utc>>,
    pub timeline: Vec<TimelineEntryView>,
}

impl From<&ItemDossier> for ItemDetailView {
    fn from(dossier: &ItemDossier) -> Self {
        let item = &dossier.item;
        Self {
            id: item.id,
            title: item.title.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            color: item.color.clone(),
            condition: item.condition.clone(),
            location: item.location.clone(),
            date: item.date,
            status: item.status,
            image_url: item.image_url.clone(),
            reference_number: item.reference_number.clone(),
            is_urgent: item.is_urgent,
            reward: item.reward.clone(),
            submitted_to_security: item.submitted_to_security,
            verification_status: item.verification_status,
            admin_notes: item.admin_notes.clone(),
            rejection_reason: item.rejection_reason.clone(),
            hold_until: item.hold_until,
            hold_days: item.hold_days,
            is_published: item.is_published,
            claimed_by: item.claimed_by_id,
            reporter: ContactView::from(&dossier.reporter),
            created_at: item.created_at,
            verified_at: item.verified_at,
            published_at: item.published_at,
            returned_at: item.returned_at,
            archived_at: item.archived_at,
            disposed_at: item.disposed_at,
            timeline: dossier
                .timeline
                .iter()
                .map(|(event, performer)| TimelineEntryView::new(event, performer.as_ref()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedItemView {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub location: String,
    pub date: DateTime<Utc>,
    pub image_url: Option<String>,
    pub reference_number: String,
}

/// Row in the staff claim queue, with the claimant's answers next to the item's facts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReviewView {
    pub id: ClaimId,
    pub verification_details: String,
    pub claimed_color: Option<String>,
    pub claimed_condition: Option<String>,
    pub claimed_location: Option<String>,
    pub claimed_date: Option<String>,
    pub status: ClaimStatus,
    pub item: ClaimedItemView,
    pub claimant: ContactView,
    pub created_at: DateTime<Utc>,
}

impl From<&ClaimDossier> for ClaimReviewView {
    fn from(ClaimDossier { claim, item, claimant }: &ClaimDossier) -> Self {
        Self {
            id: claim.id,
            verification_details: claim.verification_details.clone(),
            claimed_color: claim.claimed_color.clone(),
            claimed_condition: claim.claimed_condition.clone(),
            claimed_location: claim.claimed_location.clone(),
            claimed_date: claim.claimed_date.clone(),
            status: claim.status,
            item: ClaimedItemView {
                id: item.id,
                title: item.title.clone(),
                description: item.description.clone(),
                color: item.color.clone(),
                condition: item.condition.clone(),
                location: item.location.clone(),
                date: item.date,
                image_url: item.image_url.clone(),
                reference_number: item.reference_number.clone(),
            },
            claimant: ContactView::from(claimant),
            created_at: claim.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyClaimItemView {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
    pub reference_number: String,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyClaimView {
    pub id: ClaimId,
    pub status: ClaimStatus,
    pub verification_details: String,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub item: MyClaimItemView,
}

impl MyClaimView {
    pub fn new(claim: &Claim, item: &Item) -> Self {
        Self {
            id: claim.id,
            status: claim.status,
            verification_details: claim.verification_details.clone(),
            rejection_reason: claim.rejection_reason.clone(),
            created_at: claim.created_at,
            reviewed_at: claim.reviewed_at,
            item: MyClaimItemView {
                id: item.id,
                title: item.title.clone(),
                description: item.description.clone(),
                category: item.category.clone(),
                image_url: item.image_url.clone(),
                reference_number: item.reference_number.clone(),
                status: item.status,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub link: Option<String>,
    pub item_id: Option<ItemId>,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationView {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            is_read: notification.is_read,
            link: notification.link.clone(),
            item_id: notification.item_id,
            created_at: notification.created_at,
        }
    }
}

/// Notification as listed on the staff console, with its recipient.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressedNotificationView {
    #[serde(flatten)]
    pub notification: NotificationView,
    pub user: PersonRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogView {
    pub id: u64,
    pub action: String,
    pub entity_type: AuditEntity,
    pub entity_id: u64,
    pub details: Option<String>,
    pub admin: PersonRef,
    pub created_at: DateTime<Utc>,
}

impl AuditLogView {
    pub fn new(entry: &AuditLogEntry, admin: &User) -> Self {
        Self {
            id: entry.id,
            action: entry.action.clone(),
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            details: entry.details.clone(),
            admin: PersonRef::from(admin),
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingView {
    pub id: u64,
    pub setting_key: String,
    pub setting_value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AdminSetting> for SettingView {
    fn from(setting: &AdminSetting) -> Self {
        Self {
            id: setting.id,
            setting_key: setting.key.clone(),
            setting_value: setting.value.clone(),
            description: setting.description.clone(),
            updated_at: setting.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub student_number: String,
    pub year_level: u8,
    pub course: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for AccountView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            student_number: user.student_number.clone(),
            year_level: user.year_level,
            course: user.course.clone(),
            phone: user.phone.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}
