use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{
    AdminSetting, AuditLogEntry, Claim, ClaimId, Item, ItemId, Notification, NotificationId,
    TimelineEvent, User, UserId,
};
use super::notices::NotificationDraft;
use super::repository::{CampusRepository, RepositoryError};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Sequences {
    user: u64,
    item: u64,
    claim: u64,
    notification: u64,
    timeline: u64,
    audit: u64,
    setting: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    sequences: Sequences,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    claims: Vec<Claim>,
    #[serde(default)]
    notifications: Vec<Notification>,
    #[serde(default)]
    timeline: Vec<TimelineEvent>,
    #[serde(default)]
    audit: Vec<AuditLogEntry>,
    #[serde(default)]
    settings: Vec<AdminSetting>,
}

/// Process-local store, optionally mirrored to a JSON snapshot after every write.
#[derive(Default, Clone)]
pub struct InMemoryRepository {
    state: Arc<Mutex<StoreState>>,
    snapshot: Option<PathBuf>,
}

impl InMemoryRepository {
    /// Opens a snapshot-backed store, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let state = if path.exists() {
            let raw = fs::read(&path).map_err(|err| {
                RepositoryError::Unavailable(format!("read {}: {err}", path.display()))
            })?;
            serde_json::from_slice(&raw).map_err(|err| {
                RepositoryError::Unavailable(format!("parse {}: {err}", path.display()))
            })?
        } else {
            StoreState::default()
        };

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            snapshot: Some(path),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> Result<T, RepositoryError> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.lock()?;
        let Some(path) = &self.snapshot else {
            return f(&mut *guard);
        };
        // Changes become visible only once the snapshot holding them is on disk.
        let mut staged = guard.clone();
        let result = f(&mut staged)?;
        persist(path, &staged)?;
        *guard = staged;
        Ok(result)
    }
}

fn persist(path: &Path, state: &StoreState) -> Result<(), RepositoryError> {
    let encoded = serde_json::to_vec_pretty(state)
        .map_err(|err| RepositoryError::Unavailable(format!("encode snapshot: {err}")))?;
    let staging = path.with_extension("tmp");
    fs::write(&staging, encoded)
        .and_then(|_| fs::rename(&staging, path))
        .map_err(|err| RepositoryError::Unavailable(format!("write {}: {err}", path.display())))?;
    debug!(path = %path.display(), "store snapshot written");
    Ok(())
}

fn replace<T>(rows: &mut [T], row: T, same: impl Fn(&T) -> bool) -> Result<(), RepositoryError> {
    match rows.iter_mut().find(|existing| same(existing)) {
        Some(slot) => {
            *slot = row;
            Ok(())
        }
        None => Err(RepositoryError::NotFound),
    }
}

impl CampusRepository for InMemoryRepository {
    fn insert_user(&self, mut user: User) -> Result<User, RepositoryError> {
        self.write(|state| {
            let taken = state.users.iter().any(|existing| {
                existing.email.eq_ignore_ascii_case(&user.email)
                    || existing.student_number == user.student_number
            });
            if taken {
                return Err(RepositoryError::Conflict(
                    "email or student number already registered".to_string(),
                ));
            }
            user.id = UserId(next(&mut state.sequences.user));
            state.users.push(user.clone());
            Ok(user)
        })
    }

    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.read(|state| state.users.iter().find(|user| user.id == id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.read(|state| {
            state
                .users
                .iter()
                .find(|user| user.email.eq_ignore_ascii_case(email.trim()))
                .cloned()
        })
    }

    fn users(&self) -> Result<Vec<User>, RepositoryError> {
        self.read(|state| state.users.clone())
    }

    fn insert_item(&self, mut item: Item) -> Result<Item, RepositoryError> {
        self.write(|state| {
            if state
                .items
                .iter()
                .any(|existing| existing.reference_number == item.reference_number)
            {
                return Err(RepositoryError::Conflict(format!(
                    "reference number {} already issued",
                    item.reference_number
                )));
            }
            item.id = ItemId(next(&mut state.sequences.item));
            state.items.push(item.clone());
            Ok(item)
        })
    }

    fn update_item(&self, item: Item) -> Result<(), RepositoryError> {
        self.write(|state| {
            let id = item.id;
            replace(&mut state.items, item, |existing| existing.id == id)
        })
    }

    fn item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        self.read(|state| state.items.iter().find(|item| item.id == id).cloned())
    }

    fn items(&self) -> Result<Vec<Item>, RepositoryError> {
        self.read(|state| state.items.clone())
    }

    fn insert_claim(&self, mut claim: Claim) -> Result<Claim, RepositoryError> {
        self.write(|state| {
            claim.id = ClaimId(next(&mut state.sequences.claim));
            state.claims.push(claim.clone());
            Ok(claim)
        })
    }

    fn update_claim(&self, claim: Claim) -> Result<(), RepositoryError> {
        self.write(|state| {
            let id = claim.id;
            replace(&mut state.claims, claim, |existing| existing.id == id)
        })
    }

    fn claim(&self, id: ClaimId) -> Result<Option<Claim>, RepositoryError> {
        self.read(|state| state.claims.iter().find(|claim| claim.id == id).cloned())
    }

    fn claims(&self) -> Result<Vec<Claim>, RepositoryError> {
        self.read(|state| state.claims.clone())
    }

    fn insert_notification(
        &self,
        draft: NotificationDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError> {
        self.write(|state| {
            let notification = Notification {
                id: NotificationId(next(&mut state.sequences.notification)),
                user_id: draft.user_id,
                kind: draft.kind,
                title: draft.title,
                message: draft.message,
                item_id: draft.item_id,
                link: draft.link,
                is_read: false,
                created_at,
            };
            state.notifications.push(notification.clone());
            Ok(notification)
        })
    }

    fn mark_notifications_read(
        &self,
        user: UserId,
        id: Option<NotificationId>,
    ) -> Result<usize, RepositoryError> {
        self.write(|state| {
            let mut changed = 0;
            for notification in state.notifications.iter_mut() {
                let selected = notification.user_id == user
                    && id.map_or(true, |wanted| notification.id == wanted);
                if selected && !notification.is_read {
                    notification.is_read = true;
                    changed += 1;
                }
            }
            Ok(changed)
        })
    }

    fn notifications(&self) -> Result<Vec<Notification>, RepositoryError> {
        self.read(|state| state.notifications.clone())
    }

    fn append_timeline(&self, mut event: TimelineEvent) -> Result<TimelineEvent, RepositoryError> {
        self.write(|state| {
            event.id = next(&mut state.sequences.timeline);
            state.timeline.push(event.clone());
            Ok(event)
        })
    }

    fn timeline(&self, item: ItemId) -> Result<Vec<TimelineEvent>, RepositoryError> {
        self.read(|state| {
            state
                .timeline
                .iter()
                .filter(|event| event.item_id == item)
                .cloned()
                .collect()
        })
    }

    fn append_audit(&self, mut entry: AuditLogEntry) -> Result<AuditLogEntry, RepositoryError> {
        self.write(|state| {
            entry.id = next(&mut state.sequences.audit);
            state.audit.push(entry.clone());
            Ok(entry)
        })
    }

    fn audit_log(&self) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        self.read(|state| state.audit.clone())
    }

    fn settings(&self) -> Result<Vec<AdminSetting>, RepositoryError> {
        self.read(|state| state.settings.clone())
    }

    fn upsert_setting(&self, mut setting: AdminSetting) -> Result<AdminSetting, RepositoryError> {
        self.write(|state| {
            match state
                .settings
                .iter_mut()
                .find(|existing| existing.key == setting.key)
            {
                Some(existing) => {
                    setting.id = existing.id;
                    if setting.description.is_none() {
                        setting.description = existing.description.clone();
                    }
                    *existing = setting.clone();
                }
                None => {
                    setting.id = next(&mut state.sequences.setting);
                    state.settings.push(setting.clone());
                }
            }
            Ok(setting)
        })
    }
}
