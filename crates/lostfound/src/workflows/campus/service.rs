use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{self, AccessToken, AuthError, TokenSigner};

use super::domain::{
    AuditEntity, AuditLogEntry, Claim, ClaimId, ClaimResponse, ClaimStatus, ClaimSubmission,
    Item, ItemId, ItemQuery, ItemReport, ItemStatus, ItemUpdate, Notification, NotificationId,
    Page, Registration, ReportedItem, TimelineEvent, User, UserId, UserRole,
    VerificationStatus,
};
use super::lifecycle::{self, LifecycleError};
use super::notices::{self, NotificationDraft};
use super::repository::{CampusRepository, RepositoryError};

/// How many already-read notifications a user sees next to the unread ones.
const READ_NOTIFICATION_HISTORY: usize = 50;

/// Source of "now" so lifecycle timestamps are deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Token plus the profile it was issued for.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: AccessToken,
    pub user: User,
}

/// Public counters shown on the landing dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStats {
    pub total_lost: usize,
    pub total_found: usize,
    pub total_returned: usize,
}

/// Service composing the repository, token signer, and clock.
pub struct CampusService<R> {
    pub(super) repository: Arc<R>,
    signer: TokenSigner,
    pub(super) clock: Arc<dyn Clock>,
}

impl<R> CampusService<R>
where
    R: CampusRepository + 'static,
{
    pub fn new(repository: Arc<R>, signer: TokenSigner) -> Self {
        Self::with_clock(repository, signer, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, signer: TokenSigner, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            signer,
            clock,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Create a student account and sign the new user in.
    pub fn register(&self, registration: Registration) -> Result<Session, ServiceError> {
        let Registration {
            email,
            password,
            first_name,
            last_name,
            student_number,
            year_level,
            course,
            phone,
        } = registration;

        let email = email.trim().to_ascii_lowercase();
        validate_email(&email)?;
        if password.chars().count() < 6 {
            return Err(ServiceError::Validation(
                "password must be at least 6 characters".to_string(),
            ));
        }
        let first_name = required("firstName", first_name)?;
        let last_name = required("lastName", last_name)?;
        let student_number = required("studentNumber", student_number)?;
        let course = required("course", course)?;

        let now = self.clock.now();
        let user = User {
            id: UserId(0),
            email,
            password_hash: auth::hash_password(&password)?,
            first_name,
            last_name,
            student_number,
            year_level,
            course,
            phone,
            role: UserRole::Student,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let user = self.repository.insert_user(user).map_err(|err| match err {
            RepositoryError::Conflict(_) => {
                ServiceError::Conflict("Email or student number already registered".to_string())
            }
            other => other.into(),
        })?;
        info!(user = %user.id, "user registered");
        self.session_for(user)
    }

    /// Exchange credentials for a bearer token.
    pub fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let user = match self.repository.user_by_email(email)? {
            Some(user) if auth::verify_password(password, &user.password_hash) => user,
            _ => {
                warn!("rejected login attempt");
                return Err(ServiceError::InvalidCredentials);
            }
        };
        if !user.is_active {
            return Err(ServiceError::InactiveUser);
        }
        self.session_for(user)
    }

    /// Resolve a bearer token to an active user.
    pub fn authenticate(&self, token: &str) -> Result<User, ServiceError> {
        let claims = self
            .signer
            .verify(token, self.clock.now())
            .map_err(|err| {
                warn!(error = %err, "rejected access token");
                ServiceError::Unauthenticated
            })?;
        let user = self
            .repository
            .user(UserId(claims.user_id))?
            .ok_or(ServiceError::Unauthenticated)?;
        if !user.is_active {
            return Err(ServiceError::InactiveUser);
        }
        Ok(user)
    }

    /// Record a new lost or found report. It stays unpublished until staff verify it.
    pub fn report_item(&self, reporter: &User, report: ItemReport) -> Result<Item, ServiceError> {
        let title = required("title", report.title)?;
        let description = required("description", report.description)?;
        let category = required("category", report.category)?;
        let location = required("location", report.location)?;

        let now = self.clock.now();
        let item = Item {
            id: ItemId(0),
            title,
            description,
            category,
            color: report.color,
            condition: report.condition,
            location,
            date: report.date,
            kind: report.kind,
            status: ItemStatus::PendingVerification,
            verification_status: VerificationStatus::Pending,
            is_urgent: report.is_urgent,
            reward: report.reward,
            image_url: report.image_url,
            contact_method: report.contact_method,
            submitted_to_security: report.submitted_to_security,
            reference_number: reference_number(now),
            admin_notes: None,
            rejection_reason: None,
            hold_until: None,
            hold_days: 0,
            is_published: false,
            reporter_id: reporter.id,
            claimed_by_id: None,
            verified_by_id: None,
            created_at: now,
            updated_at: now,
            verified_at: None,
            published_at: None,
            returned_at: None,
            archived_at: None,
            disposed_at: None,
        };

        let item = self.repository.insert_item(item)?;
        self.record(
            item.id,
            "reported",
            format!("Item reported by {}", reporter.full_name()),
            Some(reporter.id),
        )?;
        info!(
            item = %item.id,
            reference = %item.reference_number,
            kind = ?item.kind,
            "item reported"
        );
        Ok(item)
    }

    /// Published items, newest first.
    pub fn list_items(
        &self,
        query: &ItemQuery,
        page: Page,
    ) -> Result<Vec<ReportedItem>, ServiceError> {
        let text = query.text.as_ref().map(|text| text.to_lowercase());
        let mut items: Vec<Item> = self
            .repository
            .items()?
            .into_iter()
            .filter(|item| item.is_published)
            .filter(|item| query.status.map_or(true, |status| item.status == status))
            .filter(|item| {
                query
                    .category
                    .as_ref()
                    .map_or(true, |category| item.category.eq_ignore_ascii_case(category))
            })
            .filter(|item| {
                query
                    .location
                    .as_ref()
                    .map_or(true, |location| item.location.eq_ignore_ascii_case(location))
            })
            .filter(|item| {
                text.as_ref().map_or(true, |text| {
                    item.title.to_lowercase().contains(text)
                        || item.description.to_lowercase().contains(text)
                })
            })
            .collect();
        newest_first(&mut items, |item| (item.created_at, item.id.0));

        page.apply(items)
            .into_iter()
            .map(|item| self.with_reporter(item))
            .collect()
    }

    /// Published items are public; unpublished ones are visible to their reporter and staff.
    pub fn item(&self, id: ItemId, viewer: Option<&User>) -> Result<ReportedItem, ServiceError> {
        let item = self.fetch_item(id)?;
        let visible = item.is_published
            || viewer.map_or(false, |viewer| {
                viewer.is_admin() || viewer.id == item.reporter_id
            });
        if !visible {
            return Err(ServiceError::NotFound("item"));
        }
        self.with_reporter(item)
    }

    /// Reporter resubmits details after staff asked for more information.
    pub fn update_item(
        &self,
        reporter: &User,
        id: ItemId,
        update: ItemUpdate,
    ) -> Result<Item, ServiceError> {
        let mut item = self.fetch_item(id)?;
        if item.reporter_id != reporter.id {
            return Err(ServiceError::Forbidden);
        }
        lifecycle::ensure_awaiting_details(&item)?;

        if let Some(title) = update.title {
            item.title = required("title", title)?;
        }
        if let Some(description) = update.description {
            item.description = required("description", description)?;
        }
        if let Some(category) = update.category {
            item.category = required("category", category)?;
        }
        if let Some(location) = update.location {
            item.location = required("location", location)?;
        }
        if update.color.is_some() {
            item.color = update.color;
        }
        if update.condition.is_some() {
            item.condition = update.condition;
        }
        if let Some(date) = update.date {
            item.date = date;
        }
        if update.image_url.is_some() {
            item.image_url = update.image_url;
        }

        item.verification_status = VerificationStatus::Pending;
        item.updated_at = self.clock.now();
        self.repository.update_item(item.clone())?;
        self.record(
            item.id,
            "details_updated",
            format!("Details updated by {}", reporter.full_name()),
            Some(reporter.id),
        )?;
        info!(item = %item.id, "item details resubmitted for verification");
        Ok(item)
    }

    /// A published lost item turned up: the reporter or staff mark it found.
    pub fn mark_found(&self, actor: &User, id: ItemId) -> Result<Item, ServiceError> {
        let mut item = self.fetch_item(id)?;
        if !actor.is_admin() && actor.id != item.reporter_id {
            return Err(ServiceError::Forbidden);
        }
        if item.status != ItemStatus::Lost {
            return Err(ServiceError::Validation("Item is not lost".to_string()));
        }
        lifecycle::transition(&mut item, ItemStatus::Found)?;
        item.updated_at = self.clock.now();
        self.repository.update_item(item.clone())?;
        self.record(
            item.id,
            "marked_found",
            format!("Item marked as found by {}", actor.full_name()),
            Some(actor.id),
        )?;
        if actor.is_admin() {
            self.audit(
                actor,
                "mark_found",
                AuditEntity::Item,
                item.id.0,
                format!("Marked item as found: {}", item.title),
            )?;
        }
        info!(item = %item.id, "lost item marked found");
        Ok(item)
    }

    /// Submit an ownership claim against a published found item.
    pub fn submit_claim(
        &self,
        claimant: &User,
        id: ItemId,
        submission: ClaimSubmission,
    ) -> Result<Claim, ServiceError> {
        if submission.item_id.is_some_and(|body_id| body_id != id) {
            return Err(ServiceError::Validation(
                "itemId does not match the claimed item".to_string(),
            ));
        }
        let verification_details =
            required("verificationDetails", submission.verification_details)?;

        let item = self.fetch_item(id)?;
        lifecycle::ensure_claimable(&item)?;
        if item.reporter_id == claimant.id {
            return Err(ServiceError::Validation(
                "You cannot claim an item you reported".to_string(),
            ));
        }
        let duplicate = self.repository.claims()?.into_iter().any(|claim| {
            claim.item_id == id && claim.claimant_id == claimant.id && claim.status.is_open()
        });
        if duplicate {
            return Err(ServiceError::Conflict(
                "You already have an open claim for this item".to_string(),
            ));
        }

        let now = self.clock.now();
        let claim = self.repository.insert_claim(Claim {
            id: ClaimId(0),
            item_id: id,
            claimant_id: claimant.id,
            verification_details,
            claimed_color: submission.color,
            claimed_condition: submission.condition,
            claimed_location: submission.location,
            claimed_date: submission.date,
            status: ClaimStatus::Pending,
            admin_notes: None,
            rejection_reason: None,
            reviewed_by_id: None,
            created_at: now,
            updated_at: now,
            reviewed_at: None,
        })?;

        self.record(
            item.id,
            "claim_submitted",
            format!("Claim submitted by {}", claimant.full_name()),
            Some(claimant.id),
        )?;
        self.notify(notices::claim_submitted(&item))?;
        for admin in self.admins()? {
            self.notify(notices::new_claim_for_admin(admin.id, &item, &claim))?;
        }

        info!(claim = %claim.id, item = %item.id, "claim submitted");
        Ok(claim)
    }

    /// Claims filed by `claimant`, newest first, each with its item.
    pub fn my_claims(&self, claimant: &User) -> Result<Vec<(Claim, Item)>, ServiceError> {
        let mut claims: Vec<Claim> = self
            .repository
            .claims()?
            .into_iter()
            .filter(|claim| claim.claimant_id == claimant.id)
            .collect();
        newest_first(&mut claims, |claim| (claim.created_at, claim.id.0));

        claims
            .into_iter()
            .map(|claim| {
                let item = self.fetch_item(claim.item_id)?;
                Ok((claim, item))
            })
            .collect()
    }

    /// Claimant adds detail after staff asked for more information; the claim re-enters review.
    pub fn respond_to_claim(
        &self,
        claimant: &User,
        id: ClaimId,
        response: ClaimResponse,
    ) -> Result<Claim, ServiceError> {
        let mut claim = self.fetch_claim(id)?;
        if claim.claimant_id != claimant.id {
            return Err(ServiceError::NotFound("claim"));
        }
        lifecycle::ensure_claim_awaiting_info(&claim)?;
        let details = required("details", response.details)?;

        claim.verification_details = format!(
            "{}\n\nAdditional information: {details}",
            claim.verification_details
        );
        claim.status = ClaimStatus::Pending;
        claim.updated_at = self.clock.now();
        self.repository.update_claim(claim.clone())?;
        self.record(
            claim.item_id,
            "claim_info_provided",
            format!("Additional claim details provided by {}", claimant.full_name()),
            Some(claimant.id),
        )?;
        info!(claim = %claim.id, "claim returned to review");
        Ok(claim)
    }

    pub fn public_stats(&self) -> Result<PublicStats, ServiceError> {
        let items = self.repository.items()?;
        let count = |status: ItemStatus| items.iter().filter(|item| item.status == status).count();
        Ok(PublicStats {
            total_lost: count(ItemStatus::Lost),
            total_found: count(ItemStatus::Found),
            total_returned: count(ItemStatus::Returned),
        })
    }

    /// Every unread notification plus the most recent read ones, newest first.
    pub fn notifications_for(&self, user: &User) -> Result<Vec<Notification>, ServiceError> {
        let mut own: Vec<Notification> = self
            .repository
            .notifications()?
            .into_iter()
            .filter(|notification| notification.user_id == user.id)
            .collect();
        newest_first(&mut own, |n| (n.created_at, n.id.0));

        let (unread, read): (Vec<_>, Vec<_>) = own.into_iter().partition(|n| !n.is_read);
        let mut combined = unread;
        combined.extend(read.into_iter().take(READ_NOTIFICATION_HISTORY));
        newest_first(&mut combined, |n| (n.created_at, n.id.0));
        Ok(combined)
    }

    pub fn unread_count(&self, user: &User) -> Result<usize, ServiceError> {
        Ok(self
            .repository
            .notifications()?
            .iter()
            .filter(|n| n.user_id == user.id && !n.is_read)
            .count())
    }

    pub fn mark_notification_read(
        &self,
        user: &User,
        id: NotificationId,
    ) -> Result<(), ServiceError> {
        let owned = self
            .repository
            .notifications()?
            .iter()
            .any(|n| n.id == id && n.user_id == user.id);
        if !owned {
            return Err(ServiceError::NotFound("notification"));
        }
        self.repository.mark_notifications_read(user.id, Some(id))?;
        Ok(())
    }

    pub fn mark_all_read(&self, user: &User) -> Result<usize, ServiceError> {
        Ok(self.repository.mark_notifications_read(user.id, None)?)
    }

    fn session_for(&self, user: User) -> Result<Session, ServiceError> {
        let token = self.signer.issue(user.id.0, self.clock.now())?;
        Ok(Session { token, user })
    }

    pub(super) fn fetch_item(&self, id: ItemId) -> Result<Item, ServiceError> {
        self.repository
            .item(id)?
            .ok_or(ServiceError::NotFound("item"))
    }

    pub(super) fn fetch_claim(&self, id: ClaimId) -> Result<Claim, ServiceError> {
        self.repository
            .claim(id)?
            .ok_or(ServiceError::NotFound("claim"))
    }

    pub(super) fn fetch_user(&self, id: UserId) -> Result<User, ServiceError> {
        self.repository
            .user(id)?
            .ok_or(ServiceError::NotFound("user"))
    }

    pub(super) fn with_reporter(&self, item: Item) -> Result<ReportedItem, ServiceError> {
        let reporter = self.fetch_user(item.reporter_id)?;
        Ok(ReportedItem { item, reporter })
    }

    pub(super) fn admins(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self
            .repository
            .users()?
            .into_iter()
            .filter(|user| user.is_admin() && user.is_active)
            .collect())
    }

    pub(super) fn record(
        &self,
        item: ItemId,
        action: &str,
        description: String,
        performed_by: Option<UserId>,
    ) -> Result<TimelineEvent, ServiceError> {
        Ok(self.repository.append_timeline(TimelineEvent {
            id: 0,
            item_id: item,
            action: action.to_string(),
            description,
            performed_by_id: performed_by,
            created_at: self.clock.now(),
        })?)
    }

    pub(super) fn audit(
        &self,
        admin: &User,
        action: &str,
        entity_type: AuditEntity,
        entity_id: u64,
        details: String,
    ) -> Result<AuditLogEntry, ServiceError> {
        Ok(self.repository.append_audit(AuditLogEntry {
            id: 0,
            admin_id: admin.id,
            action: action.to_string(),
            entity_type,
            entity_id,
            details: Some(details),
            created_at: self.clock.now(),
        })?)
    }

    pub(super) fn notify(&self, draft: NotificationDraft) -> Result<Notification, ServiceError> {
        Ok(self
            .repository
            .insert_notification(draft, self.clock.now())?)
    }
}

/// `LF-<year>-<8 upper hex>`.
pub fn reference_number(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();
    format!("LF-{}-{suffix}", now.year())
}

pub(super) fn newest_first<T, K: Ord>(rows: &mut [T], key: impl Fn(&T) -> K) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

pub(super) fn required(field: &str, value: String) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ServiceError::Validation(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn validate_email(email: &str) -> Result<(), ServiceError> {
    let valid = email
        .split_once('@')
        .map_or(false, |(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });
    if valid {
        Ok(())
    } else {
        Err(ServiceError::Validation(
            "email must be a valid address".to_string(),
        ))
    }
}

/// Error raised by the campus service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Inactive user")]
    InactiveUser,
    #[error("Not enough permissions")]
    Forbidden,
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}
