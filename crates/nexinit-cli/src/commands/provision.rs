use super::{json_pretty, load_config, make_client, make_context, EXIT_SUCCESS};
use nexinit_core::{provision, Outcome, ProvisionReport, RealmOutcome, RotationOutcome};
use std::path::Path;

pub fn run(config_path: Option<&Path>, json: bool) -> Result<u8, String> {
    let config = load_config(config_path)?;
    let api = make_client(&config);
    let ctx = make_context(&api, &config);

    let report = provision(&ctx, &config).map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        print!("{}", summary(&report));
    }
    Ok(EXIT_SUCCESS)
}

fn rotation_label(outcome: RotationOutcome) -> &'static str {
    match outcome {
        RotationOutcome::Skipped => "not configured",
        RotationOutcome::Rotated => "changed",
        RotationOutcome::AlreadyRotated => "already changed",
    }
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Existing => "exists",
        Outcome::Created => "created",
        Outcome::Merged => "updated",
    }
}

fn summary(report: &ProvisionReport) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "provisioned {}", report.server);
    let _ = writeln!(out, "  admin password: {}", rotation_label(report.rotation));
    match &report.realms {
        RealmOutcome::AlreadyActive => {
            let _ = writeln!(out, "  realms: already active");
        }
        RealmOutcome::Activated(realms) => {
            let _ = writeln!(out, "  realms: activated ({})", realms.join(", "));
        }
    }
    for step in &report.resources {
        let _ = writeln!(
            out,
            "  {} {}: {}",
            step.kind,
            step.name,
            outcome_label(step.outcome)
        );
    }
    let verdict = if report.changed() { "changed" } else { "unchanged" };
    let _ = writeln!(out, "{} created, {verdict}", report.created());
    out
}
