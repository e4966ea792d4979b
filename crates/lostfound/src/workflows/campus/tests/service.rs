use std::sync::Arc;

use super::common::*;
use crate::auth::TokenSigner;
use crate::workflows::campus::domain::{
    ClaimResponse, ClaimStatus, ClaimVerification, ClaimVerificationAction, ItemId, ItemQuery,
    ItemStatus, ItemUpdate, ItemVerification, ItemVerificationAction, NotificationKind, Page,
    VerificationStatus,
};
use crate::workflows::campus::lifecycle::LifecycleError;
use crate::workflows::campus::repository::{CampusRepository, RepositoryError};
use crate::workflows::campus::service::{CampusService, ServiceError};

#[test]
fn register_normalises_email_and_signs_in() {
    let harness = build_service();
    let mut form = registration("  Maria.Santos@School.EDU ", "2021-12345");
    form.first_name = " Maria ".to_string();

    let session = harness.service.register(form).expect("register");

    assert_eq!(session.user.email, "maria.santos@school.edu");
    assert_eq!(session.user.first_name, "Maria");
    assert_eq!(session.token.token_type, "bearer");
    assert!(session.user.password_hash.starts_with("$argon2id$"));

    let resolved = harness
        .service
        .authenticate(&session.token.access_token)
        .expect("token resolves");
    assert_eq!(resolved.id, session.user.id);
}

#[test]
fn register_rejects_duplicates_and_bad_input() {
    let harness = build_service();
    seed_student(&harness, "Maria", "2021-12345");

    match harness
        .service
        .register(registration("maria@school.edu", "2021-99999"))
    {
        Err(ServiceError::Conflict(message)) => {
            assert_eq!(message, "Email or student number already registered")
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    let mut short = registration("new@school.edu", "2021-55555");
    short.password = "12345".to_string();
    assert!(matches!(
        harness.service.register(short),
        Err(ServiceError::Validation(_))
    ));

    let bad_email = registration("not-an-email", "2021-55555");
    assert!(matches!(
        harness.service.register(bad_email),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn login_rejects_wrong_password_and_inactive_users() {
    let harness = build_service();
    let student = seed_student(&harness, "Maria", "2021-12345");

    assert!(matches!(
        harness.service.login(&student.email, "wrong-password"),
        Err(ServiceError::InvalidCredentials)
    ));
    assert!(matches!(
        harness.service.login("ghost@school.edu", PASSWORD),
        Err(ServiceError::InvalidCredentials)
    ));

    let inactive = seed_inactive_student(&harness, "Pedro", "2021-54321");
    let token = TokenSigner::new(SECRET, 60)
        .issue(inactive.id.0, start())
        .expect("issue token")
        .access_token;

    assert!(matches!(
        harness.service.login(&inactive.email, PASSWORD),
        Err(ServiceError::InactiveUser)
    ));
    assert!(matches!(
        harness.service.authenticate(&token),
        Err(ServiceError::InactiveUser)
    ));
}

#[test]
fn tokens_expire_with_the_clock() {
    let harness = build_service();
    let student = seed_student(&harness, "Maria", "2021-12345");
    let token = token_for(&harness, &student);

    harness.clock.advance(chrono::Duration::minutes(61));

    assert!(matches!(
        harness.service.authenticate(&token),
        Err(ServiceError::Unauthenticated)
    ));
}

#[test]
fn tokens_from_another_secret_are_rejected() {
    let harness = build_service();
    let student = seed_student(&harness, "Maria", "2021-12345");
    let foreign = TokenSigner::new("some-other-secret", 60)
        .issue(student.id.0, start())
        .expect("issue");

    assert!(matches!(
        harness.service.authenticate(&foreign.access_token),
        Err(ServiceError::Unauthenticated)
    ));
}

#[test]
fn report_starts_unpublished_pending_verification() {
    let harness = build_service();
    let reporter = seed_student(&harness, "Juan", "2021-00001");

    let item = harness
        .service
        .report_item(&reporter, found_report())
        .expect("report");

    assert_eq!(item.status, ItemStatus::PendingVerification);
    assert_eq!(item.verification_status, VerificationStatus::Pending);
    assert!(!item.is_published);
    assert!(item.reference_number.starts_with("LF-2025-"));
    let suffix = &item.reference_number["LF-2025-".len()..];
    assert_eq!(suffix.len(), 8);
    assert!(suffix
        .chars()
        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));

    assert_eq!(timeline_actions(&harness, item.id), vec!["reported"]);
    assert!(audit_actions(&harness).is_empty());
}

#[test]
fn report_requires_core_fields() {
    let harness = build_service();
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let mut report = found_report();
    report.title = "   ".to_string();

    match harness.service.report_item(&reporter, report) {
        Err(ServiceError::Validation(message)) => assert_eq!(message, "title is required"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn unpublished_items_are_hidden_from_the_public() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let stranger = seed_student(&harness, "Ana", "2021-00002");
    let item = harness
        .service
        .report_item(&reporter, found_report())
        .expect("report");

    assert!(matches!(
        harness.service.item(item.id, None),
        Err(ServiceError::NotFound("item"))
    ));
    assert!(harness.service.item(item.id, Some(&stranger)).is_err());
    assert!(harness.service.item(item.id, Some(&reporter)).is_ok());
    assert!(harness.service.item(item.id, Some(&admin)).is_ok());

    let listed = harness
        .service
        .list_items(&ItemQuery::default(), Page::new(0, 100))
        .expect("list");
    assert!(listed.is_empty());
}

#[test]
fn listing_filters_and_orders_newest_first() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");

    let found = published_found_item(&harness, &reporter, &admin);
    harness.tick();
    let lost = harness
        .service
        .report_item(&reporter, lost_report())
        .expect("report lost");
    harness
        .service
        .verify_item(&admin, lost.id, approve())
        .expect("approve lost");

    let all = harness
        .service
        .list_items(&ItemQuery::default(), Page::new(0, 100))
        .expect("list");
    let ids: Vec<ItemId> = all.iter().map(|row| row.item.id).collect();
    assert_eq!(ids, vec![lost.id, found.id]);
    assert_eq!(all[0].reporter.id, reporter.id);

    let only_found = harness
        .service
        .list_items(
            &ItemQuery {
                status: Some(ItemStatus::Found),
                ..ItemQuery::default()
            },
            Page::new(0, 100),
        )
        .expect("list found");
    assert_eq!(only_found.len(), 1);
    assert_eq!(only_found[0].item.id, found.id);

    let by_text = harness
        .service
        .list_items(
            &ItemQuery {
                text: Some("HYDRO".to_string()),
                ..ItemQuery::default()
            },
            Page::new(0, 100),
        )
        .expect("search");
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].item.id, lost.id);

    let by_category = harness
        .service
        .list_items(
            &ItemQuery {
                category: Some("accessories".to_string()),
                ..ItemQuery::default()
            },
            Page::new(0, 100),
        )
        .expect("category");
    assert_eq!(by_category.len(), 1);

    let second_page = harness
        .service
        .list_items(&ItemQuery::default(), Page::new(1, 1))
        .expect("page");
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].item.id, found.id);
}

#[test]
fn reporter_resubmits_details_after_more_info_request() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let other = seed_student(&harness, "Ana", "2021-00002");
    let item = harness
        .service
        .report_item(&reporter, found_report())
        .expect("report");

    let update = ItemUpdate {
        description: Some("Compact umbrella, wooden handle, small tear near the tip".to_string()),
        ..ItemUpdate::default()
    };
    assert!(matches!(
        harness.service.update_item(&reporter, item.id, update.clone()),
        Err(ServiceError::Lifecycle(LifecycleError::NotAwaitingDetails(_)))
    ));

    harness
        .service
        .verify_item(
            &admin,
            item.id,
            ItemVerification {
                action: ItemVerificationAction::RequestMoreInfo,
                notes: None,
                rejection_reason: None,
                more_info_message: Some("Describe any damage".to_string()),
            },
        )
        .expect("request info");

    assert!(matches!(
        harness.service.update_item(&other, item.id, update.clone()),
        Err(ServiceError::Forbidden)
    ));

    harness.tick();
    let updated = harness
        .service
        .update_item(&reporter, item.id, update)
        .expect("resubmit");
    assert_eq!(updated.verification_status, VerificationStatus::Pending);
    assert!(updated.description.contains("small tear"));
    assert_eq!(updated.title, "Black Umbrella");
    assert_eq!(
        timeline_actions(&harness, item.id),
        vec!["reported", "more_info_requested", "details_updated"]
    );
}

#[test]
fn mark_found_moves_lost_items_only() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let stranger = seed_student(&harness, "Ana", "2021-00002");
    let lost = harness
        .service
        .report_item(&reporter, lost_report())
        .expect("report");
    harness
        .service
        .verify_item(&admin, lost.id, approve())
        .expect("approve");

    assert!(matches!(
        harness.service.mark_found(&stranger, lost.id),
        Err(ServiceError::Forbidden)
    ));

    let found = harness
        .service
        .mark_found(&reporter, lost.id)
        .expect("mark found");
    assert_eq!(found.status, ItemStatus::Found);
    assert!(timeline_actions(&harness, lost.id).contains(&"marked_found".to_string()));
    assert!(
        !audit_actions(&harness).contains(&"mark_found".to_string()),
        "reporter actions are not audited"
    );

    assert!(matches!(
        harness.service.mark_found(&admin, lost.id),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn claim_submission_notifies_reporter_and_every_admin() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let claimant = seed_student(&harness, "Ana", "2021-00002");
    let item = published_found_item(&harness, &reporter, &admin);

    let claim = claim_on(&harness, &claimant, item.id);

    assert_eq!(claim.status, ClaimStatus::Pending);
    assert_eq!(claim.claimant_id, claimant.id);
    assert_eq!(claim.claimed_color.as_deref(), Some("Black"));

    let reporter_kinds: Vec<_> = notifications_of(&harness, reporter.id)
        .into_iter()
        .map(|n| n.kind)
        .collect();
    assert_eq!(
        reporter_kinds,
        vec![NotificationKind::FoundApproved, NotificationKind::ClaimSubmitted]
    );

    let admin_notes = notifications_of(&harness, admin.id);
    assert_eq!(admin_notes.len(), 1);
    assert_eq!(admin_notes[0].kind, NotificationKind::NewClaim);
    assert_eq!(
        admin_notes[0].link.as_deref(),
        Some(format!("/admin/claims/{}", claim.id).as_str())
    );
    assert!(timeline_actions(&harness, item.id).contains(&"claim_submitted".to_string()));
}

#[test]
fn claim_submission_guards() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let claimant = seed_student(&harness, "Ana", "2021-00002");

    let pending = harness
        .service
        .report_item(&reporter, found_report())
        .expect("report");
    assert!(matches!(
        harness
            .service
            .submit_claim(&claimant, pending.id, claim_submission(pending.id)),
        Err(ServiceError::Lifecycle(LifecycleError::NotClaimable(_)))
    ));

    let item = published_found_item(&harness, &reporter, &admin);
    assert!(matches!(
        harness
            .service
            .submit_claim(&reporter, item.id, claim_submission(item.id)),
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        harness
            .service
            .submit_claim(&claimant, item.id, claim_submission(pending.id)),
        Err(ServiceError::Validation(_))
    ));

    claim_on(&harness, &claimant, item.id);
    assert!(matches!(
        harness
            .service
            .submit_claim(&claimant, item.id, claim_submission(item.id)),
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        harness
            .service
            .submit_claim(&claimant, ItemId(999), claim_submission(ItemId(999))),
        Err(ServiceError::NotFound("item"))
    ));
}

#[test]
fn my_claims_lists_own_claims_newest_first() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let claimant = seed_student(&harness, "Ana", "2021-00002");
    let other = seed_student(&harness, "Ben", "2021-00003");
    let first = published_found_item(&harness, &reporter, &admin);
    harness.tick();
    let second = published_found_item(&harness, &reporter, &admin);

    let older = claim_on(&harness, &claimant, first.id);
    let newer = claim_on(&harness, &claimant, second.id);
    claim_on(&harness, &other, first.id);

    let claims = harness.service.my_claims(&claimant).expect("my claims");
    let ids: Vec<_> = claims.iter().map(|(claim, _)| claim.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert_eq!(claims[0].1.id, second.id);
}

#[test]
fn claimant_response_returns_claim_to_review() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let claimant = seed_student(&harness, "Ana", "2021-00002");
    let item = published_found_item(&harness, &reporter, &admin);
    let claim = claim_on(&harness, &claimant, item.id);

    let response = ClaimResponse {
        details: "There is a receipt inside the sleeve".to_string(),
    };
    assert!(matches!(
        harness
            .service
            .respond_to_claim(&claimant, claim.id, response.clone()),
        Err(ServiceError::Lifecycle(LifecycleError::NotAwaitingClaimInfo(_)))
    ));

    harness
        .service
        .verify_claim(
            &admin,
            claim.id,
            ClaimVerification {
                action: ClaimVerificationAction::RequestMoreInfo,
                notes: Some("What is inside the sleeve?".to_string()),
                rejection_reason: None,
                hold_days: None,
            },
        )
        .expect("request info");

    assert!(matches!(
        harness
            .service
            .respond_to_claim(&reporter, claim.id, response.clone()),
        Err(ServiceError::NotFound("claim"))
    ));

    let updated = harness
        .service
        .respond_to_claim(&claimant, claim.id, response)
        .expect("respond");
    assert_eq!(updated.status, ClaimStatus::Pending);
    assert!(updated
        .verification_details
        .ends_with("Additional information: There is a receipt inside the sleeve"));
}

#[test]
fn public_stats_count_lost_found_and_returned() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    published_found_item(&harness, &reporter, &admin);
    let lost = harness
        .service
        .report_item(&reporter, lost_report())
        .expect("report");
    harness
        .service
        .verify_item(&admin, lost.id, approve())
        .expect("approve");
    harness
        .service
        .report_item(&reporter, found_report())
        .expect("pending report");

    let stats = harness.service.public_stats().expect("stats");
    assert_eq!(stats.total_found, 1);
    assert_eq!(stats.total_lost, 1);
    assert_eq!(stats.total_returned, 0);
}

#[test]
fn notification_reads_are_scoped_to_the_owner() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    let claimant = seed_student(&harness, "Ana", "2021-00002");
    let item = published_found_item(&harness, &reporter, &admin);
    claim_on(&harness, &claimant, item.id);

    let inbox = harness
        .service
        .notifications_for(&reporter)
        .expect("inbox");
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].kind, NotificationKind::ClaimSubmitted, "newest first");
    assert_eq!(harness.service.unread_count(&reporter).expect("count"), 2);

    assert!(matches!(
        harness
            .service
            .mark_notification_read(&claimant, inbox[0].id),
        Err(ServiceError::NotFound("notification"))
    ));

    harness
        .service
        .mark_notification_read(&reporter, inbox[0].id)
        .expect("mark read");
    assert_eq!(harness.service.unread_count(&reporter).expect("count"), 1);

    assert_eq!(harness.service.mark_all_read(&reporter).expect("all"), 1);
    assert_eq!(harness.service.unread_count(&reporter).expect("count"), 0);
    assert_eq!(
        harness.service.unread_count(&admin).expect("admin count"),
        1,
        "other users are untouched"
    );
}

#[test]
fn notification_inbox_caps_read_history() {
    let harness = build_service();
    let admin = seed_admin(&harness);
    let reporter = seed_student(&harness, "Juan", "2021-00001");
    for _ in 0..55 {
        harness.tick();
        harness
            .service
            .report_item(&reporter, found_report())
            .and_then(|item| {
                harness.service.verify_item(
                    &admin,
                    item.id,
                    ItemVerification {
                        action: ItemVerificationAction::Reject,
                        notes: None,
                        rejection_reason: Some("Duplicate report".to_string()),
                        more_info_message: None,
                    },
                )
            })
            .expect("reject");
    }
    harness.service.mark_all_read(&reporter).expect("read all");
    harness.tick();
    published_found_item(&harness, &reporter, &admin);

    let inbox = harness
        .service
        .notifications_for(&reporter)
        .expect("inbox");
    assert_eq!(inbox.len(), 51);
    assert!(!inbox[0].is_read);
    assert!(inbox[1..].iter().all(|n| n.is_read));
}

#[test]
fn repository_outages_surface_as_repository_errors() {
    let service = CampusService::new(
        Arc::new(UnavailableRepository),
        TokenSigner::new(SECRET, 60),
    );

    assert!(matches!(
        service.login("maria@school.edu", PASSWORD),
        Err(ServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
    assert!(matches!(
        service.public_stats(),
        Err(ServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}
