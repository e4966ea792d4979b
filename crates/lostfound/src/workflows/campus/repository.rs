use chrono::{DateTime, Utc};

use super::domain::{
    AdminSetting, AuditLogEntry, Claim, ClaimId, Item, ItemId, Notification, NotificationId,
    TimelineEvent, User, UserId,
};
use super::notices::NotificationDraft;

/// Storage abstraction so the service module can be exercised in isolation.
///
/// `insert_*` and `append_*` assign identifiers: whatever id the incoming record
/// carries is replaced. Updates overwrite the stored row wholesale, so concurrent
/// writers resolve as last-writer-wins.
pub trait CampusRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the email or student number is taken.
    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn users(&self) -> Result<Vec<User>, RepositoryError>;

    fn insert_item(&self, item: Item) -> Result<Item, RepositoryError>;
    fn update_item(&self, item: Item) -> Result<(), RepositoryError>;
    fn item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;
    fn items(&self) -> Result<Vec<Item>, RepositoryError>;

    fn insert_claim(&self, claim: Claim) -> Result<Claim, RepositoryError>;
    fn update_claim(&self, claim: Claim) -> Result<(), RepositoryError>;
    fn claim(&self, id: ClaimId) -> Result<Option<Claim>, RepositoryError>;
    fn claims(&self) -> Result<Vec<Claim>, RepositoryError>;

    fn insert_notification(
        &self,
        draft: NotificationDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError>;
    /// Marks one notification (or, with `None`, every notification) owned by `user` as read.
    /// Returns how many rows changed.
    fn mark_notifications_read(
        &self,
        user: UserId,
        id: Option<NotificationId>,
    ) -> Result<usize, RepositoryError>;
    fn notifications(&self) -> Result<Vec<Notification>, RepositoryError>;

    fn append_timeline(&self, event: TimelineEvent) -> Result<TimelineEvent, RepositoryError>;
    fn timeline(&self, item: ItemId) -> Result<Vec<TimelineEvent>, RepositoryError>;

    fn append_audit(&self, entry: AuditLogEntry) -> Result<AuditLogEntry, RepositoryError>;
    fn audit_log(&self) -> Result<Vec<AuditLogEntry>, RepositoryError>;

    fn settings(&self) -> Result<Vec<AdminSetting>, RepositoryError>;
    /// Inserts or replaces the setting with the same key.
    fn upsert_setting(&self, setting: AdminSetting) -> Result<AdminSetting, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
