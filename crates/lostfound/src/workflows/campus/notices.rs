use super::domain::{Claim, Item, ItemId, NotificationKind, ReportKind, UserId};

/// Notification waiting to be stored for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub item_id: Option<ItemId>,
    pub link: Option<String>,
}

fn item_link(item: &Item) -> Option<String> {
    Some(format!("/items/{}", item.id))
}

pub fn item_approved(item: &Item) -> NotificationDraft {
    NotificationDraft {
        user_id: item.reporter_id,
        kind: NotificationKind::FoundApproved,
        title: "Item Report Approved".to_string(),
        message: format!(
            "Your {} item '{}' has been approved and published.",
            kind_label(item),
            item.title
        ),
        item_id: Some(item.id),
        link: item_link(item),
    }
}

pub fn item_rejected(item: &Item, reason: &str) -> NotificationDraft {
    NotificationDraft {
        user_id: item.reporter_id,
        kind: NotificationKind::ItemRejected,
        title: "Item Report Rejected".to_string(),
        message: format!("Your item '{}' was rejected. Reason: {reason}", item.title),
        item_id: Some(item.id),
        link: None,
    }
}

pub fn item_more_info(item: &Item, message: &str) -> NotificationDraft {
    NotificationDraft {
        user_id: item.reporter_id,
        kind: NotificationKind::MoreInfoRequested,
        title: "More Information Needed".to_string(),
        message: format!("For '{}': {message}", item.title),
        item_id: Some(item.id),
        link: item_link(item),
    }
}

pub fn claim_submitted(item: &Item) -> NotificationDraft {
    NotificationDraft {
        user_id: item.reporter_id,
        kind: NotificationKind::ClaimSubmitted,
        title: "Claim Submitted".to_string(),
        message: format!("Someone has submitted a claim for '{}'.", item.title),
        item_id: Some(item.id),
        link: None,
    }
}

pub fn new_claim_for_admin(admin: UserId, item: &Item, claim: &Claim) -> NotificationDraft {
    NotificationDraft {
        user_id: admin,
        kind: NotificationKind::NewClaim,
        title: "New Claim Submitted".to_string(),
        message: format!(
            "A claim has been submitted for '{}' (Ref: {})",
            item.title, item.reference_number
        ),
        item_id: Some(item.id),
        link: Some(format!("/admin/claims/{}", claim.id)),
    }
}

pub fn claim_approved(item: &Item, claimant: UserId) -> NotificationDraft {
    NotificationDraft {
        user_id: claimant,
        kind: NotificationKind::ClaimApproved,
        title: "Claim Approved".to_string(),
        message: format!(
            "Your claim for '{}' has been approved! Item is ready for release.",
            item.title
        ),
        item_id: Some(item.id),
        link: item_link(item),
    }
}

pub fn claim_denied(item: &Item, claimant: UserId, reason: &str) -> NotificationDraft {
    NotificationDraft {
        user_id: claimant,
        kind: NotificationKind::ClaimDenied,
        title: "Claim Denied".to_string(),
        message: format!("Your claim for '{}' was denied. Reason: {reason}", item.title),
        item_id: Some(item.id),
        link: None,
    }
}

pub fn claim_more_info(item: &Item, claimant: UserId, notes: Option<&str>) -> NotificationDraft {
    let message = match notes {
        Some(notes) if !notes.trim().is_empty() => format!(
            "We need more information about your claim for '{}'. {}",
            item.title,
            notes.trim()
        ),
        _ => format!(
            "We need more information about your claim for '{}'.",
            item.title
        ),
    };

    NotificationDraft {
        user_id: claimant,
        kind: NotificationKind::MoreInfoRequested,
        title: "More Information Needed".to_string(),
        message,
        item_id: Some(item.id),
        link: None,
    }
}

pub fn item_returned(item: &Item, claimant: UserId) -> NotificationDraft {
    NotificationDraft {
        user_id: claimant,
        kind: NotificationKind::ItemReturned,
        title: "Item Released".to_string(),
        message: format!(
            "'{}' (Ref: {}) has been released to you.",
            item.title, item.reference_number
        ),
        item_id: Some(item.id),
        link: item_link(item),
    }
}

fn kind_label(item: &Item) -> &'static str {
    match item.kind {
        ReportKind::Lost => "lost",
        ReportKind::Found => "found",
    }
}
