use crate::infra::{draft_session, sample_schema, InMemoryHospitalBackend, InMemorySessionGateway};
use clap::Args;
use hospital_ops::error::AppError;
use hospital_ops::workflows::allocation::{
    AvailabilitySnapshot, ProposedAllocation, SiteAllocationService, SiteEditForm, SiteId,
    SiteStatus, SubmissionOutcome, UnitId,
};
use hospital_ops::workflows::scp::{classify, is_complete, score, AnswerSet, SessionGateway};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct AvailabilityReportArgs {
    /// Unit to report on (defaults to the seeded demo unit)
    #[arg(long, default_value = "uni-7")]
    pub(crate) unit: String,
    /// Exclude this site's own allocations, as the edit dialog would
    #[arg(long)]
    pub(crate) exclude_site: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the SCP classification portion of the demo.
    #[arg(long)]
    pub(crate) skip_scp: bool,
}

fn demo_service() -> Arc<SiteAllocationService<InMemoryHospitalBackend, InMemoryHospitalBackend>> {
    let backend = Arc::new(InMemoryHospitalBackend::seeded());
    Arc::new(SiteAllocationService::new(backend.clone(), backend))
}

pub(crate) fn run_availability_report(args: AvailabilityReportArgs) -> Result<(), AppError> {
    let service = demo_service();
    let unit_id = UnitId(args.unit);
    let exclude = args.exclude_site.map(SiteId);

    let availability = service
        .availability(&unit_id, exclude.as_ref())
        .map_err(AppError::from)?;

    println!("Role availability for unit {}", unit_id);
    if let Some(site) = &exclude {
        println!("(excluding allocations of site {site})");
    }
    render_availability(&availability);

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = demo_service();
    let unit_id = UnitId("uni-7".to_string());

    println!("Hospital operations demo");

    println!("\nRole availability for unit {}", unit_id);
    let availability = service.availability(&unit_id, None)?;
    render_availability(&availability);

    println!("\nRequesting 2 more Enfermeiro slots for a new site...");
    let oversized = site_form("Box 03", 2);
    match service.submit_site_edit(&unit_id, &oversized)? {
        SubmissionOutcome::Rejected {
            role_label,
            requested,
            available,
        } => println!("- rejected: {role_label} requested {requested}, available {available}"),
        SubmissionOutcome::Applied(report) => {
            println!("- unexpectedly applied to site {}", report.site_id)
        }
    }

    println!("\nRetrying with 1 slot...");
    let sized = site_form("Box 03", 1);
    match service.submit_site_edit(&unit_id, &sized)? {
        SubmissionOutcome::Applied(report) => {
            let path = if report.embedded_payload {
                "embedded payload"
            } else {
                "item-level fallback"
            };
            println!(
                "- applied {} allocation(s) to site {} via {path}",
                report.applied, report.site_id
            );
            for failure in &report.failures {
                println!("  - {} failed: {}", failure.operation, failure.detail);
            }
        }
        SubmissionOutcome::Rejected { role_label, .. } => {
            println!("- unexpectedly rejected on {role_label}")
        }
    }

    println!("\nRole availability after the edit");
    let availability = service.availability(&unit_id, None)?;
    render_availability(&availability);

    if args.skip_scp {
        return Ok(());
    }

    println!("\nSCP classification demo");
    let schema = sample_schema();
    let gateway = InMemorySessionGateway::default();

    let mut answers = AnswerSet::new();
    answers.insert("estado_mental".to_string(), 4);
    answers.insert("oxigenacao".to_string(), 1);
    let partial = score(&schema, &answers);
    println!(
        "- partial preview: {} of {} questions answered, {partial} points so far",
        answers.len(),
        schema.questions.len()
    );

    for question in &schema.questions {
        answers.entry(question.key.clone()).or_insert(2);
    }
    let total = score(&schema, &answers);
    let band = classify(&schema, total).map(|band| band.label.clone());
    println!(
        "- complete: {}, total {total} points -> {}",
        is_complete(&schema, &answers),
        band.as_deref().unwrap_or("(no band)")
    );

    let mut session = draft_session("leito-12", "coren-555");
    let request = session.finalize_request(&schema, &answers)?;
    let outcome = gateway.finalize(&request)?;
    session.adopt(outcome);

    match &session.result {
        Some(result) => println!(
            "- server finalized: {} points -> {} ({:?})",
            result.total_points, result.band, session.state
        ),
        None => println!("- server returned no result"),
    }

    Ok(())
}

fn render_availability(availability: &AvailabilitySnapshot) {
    for entry in availability.entries() {
        println!(
            "- {}: total {}, allocated {}, available {}",
            entry.label, entry.total_headcount, entry.allocated, entry.available
        );
    }
}

fn site_form(name: &str, nurse_quantity: u32) -> SiteEditForm {
    SiteEditForm {
        site_id: None,
        name: name.to_string(),
        status: SiteStatus::Available,
        allocations: vec![ProposedAllocation {
            role_record_id: "cu-enf".to_string(),
            role_label: "Enfermeiro".to_string(),
            quantity: nurse_quantity,
            aliases: ["cu-enf".to_string(), "12".to_string()].into(),
        }],
    }
}
