//! Lost-and-found item intake, staff verification, claims, and release.
//!
//! [`CampusService`] owns every lifecycle transition. Each transition writes the item
//! timeline, the staff audit log, and recipient notifications through the
//! [`CampusRepository`] seam; [`campus_router`] exposes the service over HTTP.

mod admin;
pub mod domain;
pub mod lifecycle;
pub mod memory;
pub mod notices;
pub mod repository;
pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use admin::{DashboardStats, UserActivity};
pub use domain::{
    AdminSetting, AuditEntity, AuditLogEntry, Claim, ClaimId, ClaimResponse, ClaimStatus,
    ClaimSubmission, ClaimVerification, ClaimVerificationAction, Item, ItemId, ItemQuery,
    ItemReport, ItemStatus, ItemUpdate, ItemVerification, ItemVerificationAction, Notification,
    NotificationId, NotificationKind, Page, Registration, ReportKind, SettingUpdate,
    TimelineEvent, User, UserId, UserRole, VerificationStatus,
};
pub use lifecycle::LifecycleError;
pub use memory::InMemoryRepository;
pub use notices::NotificationDraft;
pub use repository::{CampusRepository, RepositoryError};
pub use router::{campus_router, AdminUser, ApiForm, ApiJson, ApiPath, ApiQuery, CurrentUser};
pub use service::{CampusService, Clock, PublicStats, ServiceError, Session, SystemClock};
