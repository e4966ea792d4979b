use chrono::Duration;
use serde::Serialize;
use tracing::info;

use crate::auth;

use super::domain::{
    AdminSetting, AuditEntity, AuditLogEntry, ClaimDossier, ClaimId, ClaimStatus,
    ClaimVerification, ClaimVerificationAction, Item, ItemDossier, ItemId, ItemStatus,
    ItemVerification, ItemVerificationAction, Notification, Page, ReportedItem, SettingUpdate,
    User, UserId, UserRole, VerificationStatus, DEFAULT_HOLD_DAYS, DEFAULT_SETTINGS,
    HOLD_PERIOD_SETTING, MAX_HOLD_DAYS,
};
use super::lifecycle;
use super::notices;
use super::repository::CampusRepository;
use super::service::{newest_first, required, CampusService, ServiceError};

/// Window used for the "recent activity" dashboard counters.
const RECENT_WINDOW_DAYS: i64 = 7;

/// Counters for the staff dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub pending_items: usize,
    pub approved_items: usize,
    pub pending_claims: usize,
    pub approved_claims: usize,
    pub items_on_hold: usize,
    pub ready_for_release: usize,
    pub recent_items: usize,
    pub recent_claims: usize,
    pub total_users: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub user_id: UserId,
    pub items_reported: usize,
    pub claims_made: usize,
    pub items_claimed: usize,
}

fn require_admin(user: &User) -> Result<(), ServiceError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

fn count<T>(rows: &[T], predicate: impl Fn(&T) -> bool) -> usize {
    rows.iter().filter(|row| predicate(row)).count()
}

fn valid_hold_days(days: u32) -> bool {
    (1..=MAX_HOLD_DAYS).contains(&days)
}

fn reason_or_default(reason: Option<&str>) -> &str {
    match reason {
        Some(reason) if !reason.trim().is_empty() => reason.trim(),
        _ => "Not specified",
    }
}

impl<R> CampusService<R>
where
    R: CampusRepository + 'static,
{
    /// Create the first administrator if none exists yet; otherwise return the existing one.
    pub fn bootstrap_admin(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        if let Some(existing) = self.admins()?.into_iter().next() {
            return Ok(existing);
        }

        let now = self.clock.now();
        let admin = self.repository.insert_user(User {
            id: UserId(0),
            email: email.trim().to_ascii_lowercase(),
            password_hash: auth::hash_password(password)?,
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            student_number: "ADMIN001".to_string(),
            year_level: 0,
            course: "Administration".to_string(),
            phone: None,
            role: UserRole::Admin,
            is_active: true,
            created_at: now,
            updated_at: now,
        })?;
        info!(admin = %admin.id, email = %admin.email, "bootstrap administrator created");
        Ok(admin)
    }

    /// Insert the default settings that are not present yet.
    pub fn seed_default_settings(
        &self,
        actor: Option<UserId>,
    ) -> Result<Vec<AdminSetting>, ServiceError> {
        let existing = self.repository.settings()?;
        let now = self.clock.now();
        for (key, value, description) in DEFAULT_SETTINGS {
            if existing.iter().any(|setting| setting.key == key) {
                continue;
            }
            self.repository.upsert_setting(AdminSetting {
                id: 0,
                key: key.to_string(),
                value: value.to_string(),
                description: Some(description.to_string()),
                updated_at: now,
                updated_by_id: actor,
            })?;
        }
        Ok(self.repository.settings()?)
    }

    pub fn dashboard_stats(&self, admin: &User) -> Result<DashboardStats, ServiceError> {
        require_admin(admin)?;
        let items = self.repository.items()?;
        let claims = self.repository.claims()?;
        let since = self.clock.now() - Duration::days(RECENT_WINDOW_DAYS);

        Ok(DashboardStats {
            pending_items: count(&items, |item| {
                item.verification_status == VerificationStatus::Pending
            }),
            approved_items: count(&items, |item| {
                item.verification_status == VerificationStatus::Approved
            }),
            pending_claims: count(&claims, |claim| claim.status == ClaimStatus::Pending),
            approved_claims: count(&claims, |claim| claim.status == ClaimStatus::Approved),
            items_on_hold: count(&items, |item| item.status == ItemStatus::OnHold),
            ready_for_release: count(&items, |item| item.status == ItemStatus::ReadyForRelease),
            recent_items: count(&items, |item| item.created_at >= since),
            recent_claims: count(&claims, |claim| claim.created_at >= since),
            total_users: count(&self.repository.users()?, |user| {
                user.role == UserRole::Student
            }),
        })
    }

    /// Reports waiting for a first verification decision, newest first.
    pub fn pending_items(
        &self,
        admin: &User,
        page: Page,
    ) -> Result<Vec<ReportedItem>, ServiceError> {
        require_admin(admin)?;
        let mut items: Vec<Item> = self
            .repository
            .items()?
            .into_iter()
            .filter(|item| item.verification_status == VerificationStatus::Pending)
            .collect();
        newest_first(&mut items, |item| (item.created_at, item.id.0));
        page.apply(items)
            .into_iter()
            .map(|item| self.with_reporter(item))
            .collect()
    }

    pub fn item_dossier(&self, admin: &User, id: ItemId) -> Result<ItemDossier, ServiceError> {
        require_admin(admin)?;
        let ReportedItem { item, reporter } = self.with_reporter(self.fetch_item(id)?)?;
        let mut timeline = self.repository.timeline(id)?;
        newest_first(&mut timeline, |event| (event.created_at, event.id));

        let timeline = timeline
            .into_iter()
            .map(|event| {
                let performer = match event.performed_by_id {
                    Some(user) => self.repository.user(user)?,
                    None => None,
                };
                Ok((event, performer))
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        Ok(ItemDossier {
            item,
            reporter,
            timeline,
        })
    }

    /// Approve, reject, or ask for more information on a report.
    pub fn verify_item(
        &self,
        admin: &User,
        id: ItemId,
        verification: ItemVerification,
    ) -> Result<(String, ItemDossier), ServiceError> {
        require_admin(admin)?;
        let mut item = self.fetch_item(id)?;
        lifecycle::ensure_awaiting_verification(&item)?;
        let now = self.clock.now();

        let message = match verification.action {
            ItemVerificationAction::Approve => {
                let published = lifecycle::published_status(item.kind);
                lifecycle::transition(&mut item, published)?;
                item.verification_status = VerificationStatus::Approved;
                item.is_published = true;
                item.verified_at = Some(now);
                item.published_at = Some(now);
                item.verified_by_id = Some(admin.id);
                item.admin_notes = verification.notes;
                item.rejection_reason = None;
                item.updated_at = now;
                self.repository.update_item(item.clone())?;

                self.record(
                    item.id,
                    "verified",
                    format!("Item verified and approved by {}", admin.full_name()),
                    Some(admin.id),
                )?;
                self.record(
                    item.id,
                    "published",
                    "Item published to dashboard".to_string(),
                    Some(admin.id),
                )?;
                self.audit(
                    admin,
                    "approve_item",
                    AuditEntity::Item,
                    item.id.0,
                    format!("Approved item: {}", item.title),
                )?;
                self.notify(notices::item_approved(&item))?;
                "Item approved and published"
            }
            ItemVerificationAction::Reject => {
                let reason =
                    reason_or_default(verification.rejection_reason.as_deref()).to_string();
                lifecycle::transition(&mut item, ItemStatus::Rejected)?;
                item.verification_status = VerificationStatus::Rejected;
                item.verified_at = Some(now);
                item.verified_by_id = Some(admin.id);
                item.rejection_reason = verification.rejection_reason;
                item.admin_notes = verification.notes;
                item.updated_at = now;
                self.repository.update_item(item.clone())?;

                self.record(
                    item.id,
                    "rejected",
                    format!("Item rejected by {}", admin.full_name()),
                    Some(admin.id),
                )?;
                self.audit(
                    admin,
                    "reject_item",
                    AuditEntity::Item,
                    item.id.0,
                    format!("Rejected item: {}. Reason: {reason}", item.title),
                )?;
                self.notify(notices::item_rejected(&item, &reason))?;
                "Item rejected"
            }
            ItemVerificationAction::RequestMoreInfo => {
                item.verification_status = VerificationStatus::MoreInfoRequested;
                item.admin_notes = verification.notes;
                item.updated_at = now;
                self.repository.update_item(item.clone())?;

                self.record(
                    item.id,
                    "more_info_requested",
                    format!("More information requested by {}", admin.full_name()),
                    Some(admin.id),
                )?;
                self.audit(
                    admin,
                    "request_more_info",
                    AuditEntity::Item,
                    item.id.0,
                    format!("Requested more info for: {}", item.title),
                )?;
                let prompt = verification
                    .more_info_message
                    .as_deref()
                    .map(str::trim)
                    .filter(|message| !message.is_empty())
                    .unwrap_or("Please provide additional details");
                self.notify(notices::item_more_info(&item, prompt))?;
                "More information requested"
            }
        };

        info!(
            item = %item.id,
            action = ?verification.action,
            admin = %admin.id,
            "item verification recorded"
        );
        Ok((message.to_string(), self.item_dossier(admin, id)?))
    }

    /// Open claims waiting for review, newest first.
    pub fn pending_claims(
        &self,
        admin: &User,
        page: Page,
    ) -> Result<Vec<ClaimDossier>, ServiceError> {
        require_admin(admin)?;
        let mut claims: Vec<_> = self
            .repository
            .claims()?
            .into_iter()
            .filter(|claim| claim.status == ClaimStatus::Pending)
            .collect();
        newest_first(&mut claims, |claim| (claim.created_at, claim.id.0));

        page.apply(claims)
            .into_iter()
            .map(|claim| {
                let item = self.fetch_item(claim.item_id)?;
                let claimant = self.fetch_user(claim.claimant_id)?;
                Ok(ClaimDossier {
                    claim,
                    item,
                    claimant,
                })
            })
            .collect()
    }

    /// Approve, deny, ask for more information, or put the claimed item on hold.
    pub fn verify_claim(
        &self,
        admin: &User,
        id: ClaimId,
        verification: ClaimVerification,
    ) -> Result<String, ServiceError> {
        require_admin(admin)?;
        let mut claim = self.fetch_claim(id)?;
        lifecycle::ensure_claim_open(&claim)?;
        let mut item = self.fetch_item(claim.item_id)?;
        let now = self.clock.now();

        let message = match verification.action {
            ClaimVerificationAction::Approve => {
                lifecycle::transition(&mut item, ItemStatus::ReadyForRelease)?;
                item.claimed_by_id = Some(claim.claimant_id);
                item.hold_until = None;
                item.hold_days = 0;
                item.updated_at = now;

                claim.status = ClaimStatus::Approved;
                claim.reviewed_at = Some(now);
                claim.reviewed_by_id = Some(admin.id);
                claim.admin_notes = verification.notes;
                claim.updated_at = now;

                self.repository.update_claim(claim.clone())?;
                self.repository.update_item(item.clone())?;
                self.record(
                    item.id,
                    "claimed",
                    format!("Claim approved by {}", admin.full_name()),
                    Some(admin.id),
                )?;
                self.audit(
                    admin,
                    "approve_claim",
                    AuditEntity::Claim,
                    claim.id.0,
                    format!("Approved claim for item: {}", item.title),
                )?;
                self.notify(notices::claim_approved(&item, claim.claimant_id))?;
                "Claim approved - item ready for release".to_string()
            }
            ClaimVerificationAction::Deny => {
                let reason =
                    reason_or_default(verification.rejection_reason.as_deref()).to_string();
                claim.status = ClaimStatus::Rejected;
                claim.reviewed_at = Some(now);
                claim.reviewed_by_id = Some(admin.id);
                claim.rejection_reason = verification.rejection_reason;
                claim.admin_notes = verification.notes;
                claim.updated_at = now;

                self.repository.update_claim(claim.clone())?;
                self.record(
                    item.id,
                    "claim_denied",
                    format!("Claim denied by {}", admin.full_name()),
                    Some(admin.id),
                )?;
                self.audit(
                    admin,
                    "deny_claim",
                    AuditEntity::Claim,
                    claim.id.0,
                    format!("Denied claim for item: {}", item.title),
                )?;
                self.notify(notices::claim_denied(&item, claim.claimant_id, &reason))?;
                "Claim denied".to_string()
            }
            ClaimVerificationAction::RequestMoreInfo => {
                claim.status = ClaimStatus::MoreInfoNeeded;
                claim.admin_notes = verification.notes.clone();
                claim.updated_at = now;

                self.repository.update_claim(claim.clone())?;
                self.notify(notices::claim_more_info(
                    &item,
                    claim.claimant_id,
                    verification.notes.as_deref(),
                ))?;
                self.audit(
                    admin,
                    "request_claim_info",
                    AuditEntity::Claim,
                    claim.id.0,
                    format!("Requested more info for claim on: {}", item.title),
                )?;
                "More information requested from claimant".to_string()
            }
            ClaimVerificationAction::Hold => {
                let hold_days = match verification.hold_days {
                    Some(days) if !valid_hold_days(days) => {
                        return Err(ServiceError::Validation(format!(
                            "hold_days must be between 1 and {MAX_HOLD_DAYS}"
                        )))
                    }
                    Some(days) => days,
                    None => self.hold_period()?,
                };
                let hold_until = now
                    .checked_add_signed(Duration::days(i64::from(hold_days)))
                    .ok_or_else(|| {
                        ServiceError::Validation("hold_days is out of range".to_string())
                    })?;
                lifecycle::transition(&mut item, ItemStatus::OnHold)?;
                item.hold_until = Some(hold_until);
                item.hold_days = hold_days;
                item.updated_at = now;

                self.repository.update_item(item.clone())?;
                self.record(
                    item.id,
                    "on_hold",
                    format!(
                        "Item placed on hold for {hold_days} days by {}",
                        admin.full_name()
                    ),
                    Some(admin.id),
                )?;
                self.audit(
                    admin,
                    "place_on_hold",
                    AuditEntity::Item,
                    item.id.0,
                    format!("Placed item on hold for {hold_days} days: {}", item.title),
                )?;
                format!("Item placed on hold for {hold_days} days")
            }
        };

        info!(
            claim = %claim.id,
            item = %item.id,
            action = ?verification.action,
            admin = %admin.id,
            "claim verification recorded"
        );
        Ok(message)
    }

    /// Hand a ready item to its approved claimant.
    pub fn release_item(&self, admin: &User, id: ItemId) -> Result<Item, ServiceError> {
        require_admin(admin)?;
        let mut item = self.fetch_item(id)?;
        lifecycle::transition(&mut item, ItemStatus::Returned)?;
        let now = self.clock.now();
        item.returned_at = Some(now);
        item.updated_at = now;
        self.repository.update_item(item.clone())?;

        let recipient = match item.claimed_by_id {
            Some(claimant) => self.repository.user(claimant)?,
            None => None,
        };
        let description = match &recipient {
            Some(claimant) => format!(
                "Item released to {} by {}",
                claimant.full_name(),
                admin.full_name()
            ),
            None => format!("Item released by {}", admin.full_name()),
        };
        self.record(item.id, "returned", description, Some(admin.id))?;
        self.audit(
            admin,
            "release_item",
            AuditEntity::Item,
            item.id.0,
            format!("Released item: {}", item.title),
        )?;
        if let Some(claimant) = recipient {
            self.notify(notices::item_returned(&item, claimant.id))?;
        }
        info!(item = %item.id, admin = %admin.id, "item returned to owner");
        Ok(item)
    }

    pub fn lift_hold(&self, admin: &User, id: ItemId) -> Result<Item, ServiceError> {
        require_admin(admin)?;
        let mut item = self.fetch_item(id)?;
        if item.status != ItemStatus::OnHold {
            return Err(lifecycle::LifecycleError::ItemTransition {
                item: item.id,
                from: item.status,
                to: ItemStatus::Found,
            }
            .into());
        }
        lifecycle::transition(&mut item, ItemStatus::Found)?;
        item.hold_until = None;
        item.hold_days = 0;
        item.updated_at = self.clock.now();
        self.repository.update_item(item.clone())?;

        self.record(
            item.id,
            "hold_lifted",
            format!("Hold lifted by {}", admin.full_name()),
            Some(admin.id),
        )?;
        self.audit(
            admin,
            "lift_hold",
            AuditEntity::Item,
            item.id.0,
            format!("Lifted hold on item: {}", item.title),
        )?;
        Ok(item)
    }

    pub fn archive_item(&self, admin: &User, id: ItemId) -> Result<Item, ServiceError> {
        require_admin(admin)?;
        let mut item = self.fetch_item(id)?;
        lifecycle::transition(&mut item, ItemStatus::Archived)?;
        let now = self.clock.now();
        item.is_published = false;
        item.archived_at = Some(now);
        item.updated_at = now;
        self.repository.update_item(item.clone())?;

        self.record(
            item.id,
            "archived",
            format!("Item archived by {}", admin.full_name()),
            Some(admin.id),
        )?;
        self.audit(
            admin,
            "archive_item",
            AuditEntity::Item,
            item.id.0,
            format!("Archived item: {}", item.title),
        )?;
        info!(item = %item.id, admin = %admin.id, "item archived");
        Ok(item)
    }

    pub fn dispose_item(&self, admin: &User, id: ItemId) -> Result<Item, ServiceError> {
        require_admin(admin)?;
        let mut item = self.fetch_item(id)?;
        lifecycle::transition(&mut item, ItemStatus::Disposed)?;
        let now = self.clock.now();
        item.is_published = false;
        item.disposed_at = Some(now);
        item.updated_at = now;
        self.repository.update_item(item.clone())?;

        self.record(
            item.id,
            "disposed",
            format!("Item disposed by {}", admin.full_name()),
            Some(admin.id),
        )?;
        self.audit(
            admin,
            "dispose_item",
            AuditEntity::Item,
            item.id.0,
            format!("Disposed item: {}", item.title),
        )?;
        info!(item = %item.id, admin = %admin.id, "item disposed");
        Ok(item)
    }

    /// Every notification, optionally for a single user, newest first.
    pub fn all_notifications(
        &self,
        admin: &User,
        user: Option<UserId>,
        page: Page,
    ) -> Result<Vec<(Notification, User)>, ServiceError> {
        require_admin(admin)?;
        let mut notifications: Vec<_> = self
            .repository
            .notifications()?
            .into_iter()
            .filter(|n| user.map_or(true, |user| n.user_id == user))
            .collect();
        newest_first(&mut notifications, |n| (n.created_at, n.id.0));

        page.apply(notifications)
            .into_iter()
            .map(|n| {
                let owner = self.fetch_user(n.user_id)?;
                Ok((n, owner))
            })
            .collect()
    }

    pub fn audit_logs(
        &self,
        admin: &User,
        action: Option<&str>,
        page: Page,
    ) -> Result<Vec<(AuditLogEntry, User)>, ServiceError> {
        require_admin(admin)?;
        let mut entries: Vec<_> = self
            .repository
            .audit_log()?
            .into_iter()
            .filter(|entry| action.map_or(true, |action| entry.action == action))
            .collect();
        newest_first(&mut entries, |entry| (entry.created_at, entry.id));

        page.apply(entries)
            .into_iter()
            .map(|entry| {
                let admin = self.fetch_user(entry.admin_id)?;
                Ok((entry, admin))
            })
            .collect()
    }

    /// Current settings; defaults are written the first time the table is empty.
    pub fn settings(&self, admin: &User) -> Result<Vec<AdminSetting>, ServiceError> {
        require_admin(admin)?;
        let settings = self.repository.settings()?;
        if settings.is_empty() {
            return self.seed_default_settings(Some(admin.id));
        }
        Ok(settings)
    }

    pub fn update_setting(
        &self,
        admin: &User,
        update: SettingUpdate,
    ) -> Result<AdminSetting, ServiceError> {
        require_admin(admin)?;
        let key = required("setting_key", update.setting_key)?;
        let value = required("setting_value", update.setting_value)?;
        if key == HOLD_PERIOD_SETTING && !value.parse::<u32>().is_ok_and(valid_hold_days) {
            return Err(ServiceError::Validation(format!(
                "hold_period_days must be a whole number between 1 and {MAX_HOLD_DAYS}"
            )));
        }

        let setting = self.repository.upsert_setting(AdminSetting {
            id: 0,
            key,
            value,
            description: None,
            updated_at: self.clock.now(),
            updated_by_id: Some(admin.id),
        })?;
        self.audit(
            admin,
            "update_settings",
            AuditEntity::Settings,
            setting.id,
            format!("Updated setting: {} = {}", setting.key, setting.value),
        )?;
        info!(key = %setting.key, admin = %admin.id, "setting updated");
        Ok(setting)
    }

    /// Hold length used when a hold request does not name one.
    pub fn hold_period(&self) -> Result<u32, ServiceError> {
        Ok(self
            .repository
            .settings()?
            .iter()
            .find(|setting| setting.key == HOLD_PERIOD_SETTING)
            .and_then(|setting| setting.value.parse::<u32>().ok())
            .filter(|days| valid_hold_days(*days))
            .unwrap_or(DEFAULT_HOLD_DAYS))
    }

    /// Users, newest first, optionally filtered by a case-insensitive search term.
    pub fn users(
        &self,
        admin: &User,
        search: Option<&str>,
        page: Page,
    ) -> Result<Vec<User>, ServiceError> {
        require_admin(admin)?;
        let needle = search
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);
        let mut users: Vec<User> = self
            .repository
            .users()?
            .into_iter()
            .filter(|user| {
                needle.as_ref().map_or(true, |needle| {
                    [
                        &user.email,
                        &user.first_name,
                        &user.last_name,
                        &user.student_number,
                    ]
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle))
                })
            })
            .collect();
        newest_first(&mut users, |user| (user.created_at, user.id.0));
        Ok(page.apply(users))
    }

    pub fn user_activity(&self, admin: &User, id: UserId) -> Result<UserActivity, ServiceError> {
        require_admin(admin)?;
        self.fetch_user(id)?;
        let items = self.repository.items()?;
        let claims = self.repository.claims()?;
        Ok(UserActivity {
            user_id: id,
            items_reported: items.iter().filter(|item| item.reporter_id == id).count(),
            claims_made: claims.iter().filter(|claim| claim.claimant_id == id).count(),
            items_claimed: items
                .iter()
                .filter(|item| item.claimed_by_id == Some(id))
                .count(),
        })
    }
}
