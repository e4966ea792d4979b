//! Item and claim status rules.
//!
//! Every status change the service performs goes through [`transition`] so the set of
//! legal moves lives in one table. Field bookkeeping (timestamps, reviewer ids) stays
//! with the caller; this module only decides whether a move is allowed.

use super::domain::{
    Claim, ClaimId, ClaimStatus, Item, ItemId, ItemStatus, ReportKind, VerificationStatus,
};

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("item {item} cannot move from {from} to {to}")]
    ItemTransition {
        item: ItemId,
        from: ItemStatus,
        to: ItemStatus,
    },
    #[error("item {0} is not awaiting verification")]
    NotAwaitingVerification(ItemId),
    #[error("item {0} is not awaiting additional details")]
    NotAwaitingDetails(ItemId),
    #[error("item {0} is not available for claiming")]
    NotClaimable(ItemId),
    #[error("claim {claim} is already {status}")]
    ClaimClosed { claim: ClaimId, status: ClaimStatus },
    #[error("claim {0} is not awaiting more information")]
    NotAwaitingClaimInfo(ClaimId),
}

impl ItemStatus {
    /// Statuses reachable in a single step.
    pub fn successors(self) -> &'static [ItemStatus] {
        use ItemStatus::*;
        match self {
            PendingVerification => &[Found, Lost, Rejected, Archived],
            Lost => &[Found, Archived],
            Found => &[ReadyForRelease, OnHold, Archived, Disposed],
            OnHold => &[ReadyForRelease, Found, Archived, Disposed],
            Rejected => &[Archived, Disposed],
            ReadyForRelease => &[Returned],
            Archived => &[Disposed],
            Returned | Disposed => &[],
        }
    }

    pub fn can_transition_to(self, next: ItemStatus) -> bool {
        self.successors().contains(&next)
    }
}

/// Move `item` to `next`, returning the status it left.
pub fn transition(item: &mut Item, next: ItemStatus) -> Result<ItemStatus, LifecycleError> {
    let from = item.status;
    if !from.can_transition_to(next) {
        return Err(LifecycleError::ItemTransition {
            item: item.id,
            from,
            to: next,
        });
    }
    item.status = next;
    Ok(from)
}

/// Status an item takes once staff approve the report.
pub fn published_status(kind: ReportKind) -> ItemStatus {
    match kind {
        ReportKind::Lost => ItemStatus::Lost,
        ReportKind::Found => ItemStatus::Found,
    }
}

pub fn ensure_awaiting_verification(item: &Item) -> Result<(), LifecycleError> {
    let reviewable = matches!(
        item.verification_status,
        VerificationStatus::Pending | VerificationStatus::MoreInfoRequested
    );
    if reviewable && item.status == ItemStatus::PendingVerification {
        Ok(())
    } else {
        Err(LifecycleError::NotAwaitingVerification(item.id))
    }
}

pub fn ensure_awaiting_details(item: &Item) -> Result<(), LifecycleError> {
    if item.verification_status == VerificationStatus::MoreInfoRequested
        && item.status == ItemStatus::PendingVerification
    {
        Ok(())
    } else {
        Err(LifecycleError::NotAwaitingDetails(item.id))
    }
}

pub fn ensure_claimable(item: &Item) -> Result<(), LifecycleError> {
    if item.status == ItemStatus::Found && item.is_published {
        Ok(())
    } else {
        Err(LifecycleError::NotClaimable(item.id))
    }
}

pub fn ensure_claim_open(claim: &Claim) -> Result<(), LifecycleError> {
    if claim.status.is_open() {
        Ok(())
    } else {
        Err(LifecycleError::ClaimClosed {
            claim: claim.id,
            status: claim.status,
        })
    }
}

pub fn ensure_claim_awaiting_info(claim: &Claim) -> Result<(), LifecycleError> {
    if claim.status == ClaimStatus::MoreInfoNeeded {
        Ok(())
    } else {
        Err(LifecycleError::NotAwaitingClaimInfo(claim.id))
    }
}
