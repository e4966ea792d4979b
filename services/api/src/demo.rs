use chrono::Utc;
use clap::Args;
use lostfound::auth::TokenSigner;
use lostfound::error::AppError;
use lostfound::workflows::campus::views::ItemDetailView;
use lostfound::workflows::campus::{
    CampusService, ClaimSubmission, ClaimVerification, ClaimVerificationAction,
    InMemoryRepository, ItemReport, ItemVerification, ItemVerificationAction, Registration,
    ReportKind, User,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Place the item on hold for this many days before approving the claim.
    #[arg(long)]
    pub(crate) hold_days: Option<u32>,
    /// Print the staff view of the item, timeline included, as JSON at the end.
    #[arg(long)]
    pub(crate) show_dossier: bool,
}

type DemoService = CampusService<InMemoryRepository>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = CampusService::new(
        Arc::new(InMemoryRepository::default()),
        TokenSigner::new("demo-signing-secret", 60),
    );

    println!("Campus lost-and-found demo");
    let admin = service.bootstrap_admin("admin@school.edu", "admin-demo-password")?;
    service.seed_default_settings(Some(admin.id))?;
    let finder = demo_student(&service, "Juan", "Dela Cruz", "2021-00001")?;
    let owner = demo_student(&service, "Maria", "Santos", "2021-12345")?;
    println!(
        "Accounts: admin {}, finder {}, owner {}",
        admin.email, finder.email, owner.email
    );

    let item = service.report_item(&finder, demo_report())?;
    println!(
        "\n1. {} reported '{}' as {} ({})",
        finder.full_name(),
        item.title,
        item.status.label(),
        item.reference_number
    );

    let (outcome, _) = service.verify_item(
        &admin,
        item.id,
        ItemVerification {
            action: ItemVerificationAction::Approve,
            notes: Some("Logged at the security desk".to_string()),
            rejection_reason: None,
            more_info_message: None,
        },
    )?;
    println!("2. Staff verification: {outcome}");

    let claim = service.submit_claim(
        &owner,
        item.id,
        ClaimSubmission {
            item_id: Some(item.id),
            verification_details: "Initials M.S. carved into the wooden handle".to_string(),
            color: Some("Black".to_string()),
            condition: Some("Slightly worn".to_string()),
            location: Some("Library".to_string()),
            date: None,
        },
    )?;
    println!(
        "3. {} claimed the item (claim {}, {})",
        owner.full_name(),
        claim.id,
        claim.status.label()
    );

    if let Some(days) = args.hold_days {
        let hold = decision(ClaimVerificationAction::Hold, Some(days));
        let outcome = service.verify_claim(&admin, claim.id, hold)?;
        println!("   Staff hold: {outcome}");
    }

    let approval = decision(ClaimVerificationAction::Approve, None);
    let outcome = service.verify_claim(&admin, claim.id, approval)?;
    println!("4. Claim review: {outcome}");

    let returned = service.release_item(&admin, item.id)?;
    println!("5. Item released, now {}", returned.status.label());

    println!("\nNotifications");
    for user in [&finder, &owner] {
        for notification in service.notifications_for(user)? {
            println!("- {} <- {}", user.full_name(), notification.title);
        }
    }

    let stats = service.public_stats()?;
    println!(
        "\nPublic stats: {} lost, {} found, {} returned",
        stats.total_lost, stats.total_found, stats.total_returned
    );

    if args.show_dossier {
        let dossier = service.item_dossier(&admin, item.id)?;
        match serde_json::to_string_pretty(&ItemDetailView::from(&dossier)) {
            Ok(json) => println!("\nStaff dossier:\n{json}"),
            Err(err) => println!("\nStaff dossier unavailable: {err}"),
        }
    }

    Ok(())
}

fn demo_student(
    service: &DemoService,
    first_name: &str,
    last_name: &str,
    student_number: &str,
) -> Result<User, AppError> {
    let session = service.register(Registration {
        email: format!("{}@school.edu", first_name.to_ascii_lowercase()),
        password: "student-demo-password".to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        student_number: student_number.to_string(),
        year_level: 2,
        course: "BS Computer Science".to_string(),
        phone: None,
    })?;
    Ok(session.user)
}

fn demo_report() -> ItemReport {
    ItemReport {
        title: "Black Umbrella".to_string(),
        description: "Compact umbrella with a wooden handle".to_string(),
        category: "Accessories".to_string(),
        color: Some("Black".to_string()),
        condition: Some("Good".to_string()),
        location: "Library - 2nd Floor".to_string(),
        date: Utc::now(),
        kind: ReportKind::Found,
        is_urgent: false,
        reward: None,
        image_url: None,
        contact_method: "email".to_string(),
        submitted_to_security: true,
    }
}

fn decision(action: ClaimVerificationAction, hold_days: Option<u32>) -> ClaimVerification {
    ClaimVerification {
        action,
        notes: None,
        rejection_reason: None,
        hold_days,
    }
}
