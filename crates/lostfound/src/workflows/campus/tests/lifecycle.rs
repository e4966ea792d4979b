use super::common::*;
use crate::workflows::campus::domain::{ClaimStatus, ItemStatus, ReportKind, VerificationStatus};
use crate::workflows::campus::lifecycle::{self, LifecycleError};

const ALL: [ItemStatus; 9] = [
    ItemStatus::PendingVerification,
    ItemStatus::Lost,
    ItemStatus::Found,
    ItemStatus::Rejected,
    ItemStatus::OnHold,
    ItemStatus::ReadyForRelease,
    ItemStatus::Returned,
    ItemStatus::Archived,
    ItemStatus::Disposed,
];

#[test]
fn returned_and_disposed_are_terminal() {
    let terminal: Vec<_> = ALL
        .into_iter()
        .filter(|status| ALL.iter().all(|next| !status.can_transition_to(*next)))
        .collect();
    assert_eq!(terminal, vec![ItemStatus::Returned, ItemStatus::Disposed]);
}

#[test]
fn nothing_returns_to_pending_verification() {
    for status in ALL {
        assert!(
            !status.can_transition_to(ItemStatus::PendingVerification),
            "{status} must not re-enter verification"
        );
    }
}

#[test]
fn release_only_follows_an_approved_claim() {
    let sources: Vec<_> = ALL
        .into_iter()
        .filter(|status| status.can_transition_to(ItemStatus::Returned))
        .collect();
    assert_eq!(sources, vec![ItemStatus::ReadyForRelease]);

    let ready_sources: Vec<_> = ALL
        .into_iter()
        .filter(|status| status.can_transition_to(ItemStatus::ReadyForRelease))
        .collect();
    assert_eq!(ready_sources, vec![ItemStatus::Found, ItemStatus::OnHold]);
}

#[test]
fn transition_updates_status_and_reports_the_previous_one() {
    let harness = build_service();
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let mut item = harness
        .service
        .report_item(&reporter, found_report())
        .expect("report");

    let previous = lifecycle::transition(&mut item, ItemStatus::Found).expect("legal move");
    assert_eq!(previous, ItemStatus::PendingVerification);
    assert_eq!(item.status, ItemStatus::Found);

    let err = lifecycle::transition(&mut item, ItemStatus::Returned).expect_err("illegal move");
    assert_eq!(
        err,
        LifecycleError::ItemTransition {
            item: item.id,
            from: ItemStatus::Found,
            to: ItemStatus::Returned,
        }
    );
    assert_eq!(item.status, ItemStatus::Found, "failed move leaves status untouched");
}

#[test]
fn approval_publishes_according_to_report_kind() {
    assert_eq!(lifecycle::published_status(ReportKind::Lost), ItemStatus::Lost);
    assert_eq!(lifecycle::published_status(ReportKind::Found), ItemStatus::Found);
}

#[test]
fn verification_guard_accepts_pending_and_more_info() {
    let harness = build_service();
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let mut item = harness
        .service
        .report_item(&reporter, found_report())
        .expect("report");

    assert!(lifecycle::ensure_awaiting_verification(&item).is_ok());
    assert_eq!(
        lifecycle::ensure_awaiting_details(&item),
        Err(LifecycleError::NotAwaitingDetails(item.id))
    );

    item.verification_status = VerificationStatus::MoreInfoRequested;
    assert!(lifecycle::ensure_awaiting_verification(&item).is_ok());
    assert!(lifecycle::ensure_awaiting_details(&item).is_ok());

    item.verification_status = VerificationStatus::Approved;
    item.status = ItemStatus::Found;
    assert_eq!(
        lifecycle::ensure_awaiting_verification(&item),
        Err(LifecycleError::NotAwaitingVerification(item.id))
    );
}

#[test]
fn only_published_found_items_are_claimable() {
    let harness = build_service();
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let mut item = harness
        .service
        .report_item(&reporter, found_report())
        .expect("report");

    item.status = ItemStatus::Found;
    assert_eq!(
        lifecycle::ensure_claimable(&item),
        Err(LifecycleError::NotClaimable(item.id))
    );
    item.is_published = true;
    assert!(lifecycle::ensure_claimable(&item).is_ok());
    item.status = ItemStatus::OnHold;
    assert!(lifecycle::ensure_claimable(&item).is_err());
}

#[test]
fn claim_guards_follow_claim_status() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let claimant = seed_student(&harness, "Ana", "2021-00002");
    let item = published_found_item(&harness, &reporter, &admin);
    let mut claim = claim_on(&harness, &claimant, item.id);

    assert!(lifecycle::ensure_claim_open(&claim).is_ok());
    assert_eq!(
        lifecycle::ensure_claim_awaiting_info(&claim),
        Err(LifecycleError::NotAwaitingClaimInfo(claim.id))
    );

    claim.status = ClaimStatus::MoreInfoNeeded;
    assert!(lifecycle::ensure_claim_open(&claim).is_ok());
    assert!(lifecycle::ensure_claim_awaiting_info(&claim).is_ok());

    claim.status = ClaimStatus::Rejected;
    assert_eq!(
        lifecycle::ensure_claim_open(&claim),
        Err(LifecycleError::ClaimClosed {
            claim: claim.id,
            status: ClaimStatus::Rejected,
        })
    );
}
