use crate::probe::wait_until_ready;
use crate::realms::{activate_realms, RealmOutcome};
use crate::reconcile::{reconcile, Outcome, RemoteResource};
use crate::resources::{BlobStore, DockerGroup, DockerHosted, DockerProxy, RawHosted};
use crate::rotate::{rotate_default_password, RotationOutcome};
use crate::{Context, ProvisionError};
use nexinit_config::NexusConfig;
use serde::Serialize;
use tracing::{info, info_span};

/// Outcome of reconciling one named resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub kind: &'static str,
    pub name: String,
    pub outcome: Outcome,
}

/// What one provisioning run did, step by step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub server: String,
    pub probe_failures: u32,
    pub rotation: RotationOutcome,
    pub realms: RealmOutcome,
    /// Blob stores and repositories, in the order they were reconciled.
    pub resources: Vec<StepReport>,
}

impl ProvisionReport {
    /// Number of resources this run created.
    pub fn created(&self) -> usize {
        self.resources
            .iter()
            .filter(|s| s.outcome == Outcome::Created)
            .count()
    }

    /// Whether this run changed anything on the server.
    pub fn changed(&self) -> bool {
        self.rotation == RotationOutcome::Rotated
            || matches!(self.realms, RealmOutcome::Activated(_))
            || self.resources.iter().any(|s| s.outcome != Outcome::Existing)
    }
}

fn step<R: RemoteResource>(
    ctx: &Context<'_>,
    resource: &R,
    steps: &mut Vec<StepReport>,
) -> Result<(), ProvisionError> {
    let reconciled = reconcile(ctx, resource)?;
    steps.push(StepReport {
        kind: R::KIND,
        name: resource.name().to_owned(),
        outcome: reconciled.outcome,
    });
    Ok(())
}

/// Bring the server to the state `config` describes.
///
/// Blocks until the server is ready, then runs every step in a fixed order and
/// aborts on the first failure. Nothing applied before a failure is undone.
pub fn provision(ctx: &Context<'_>, config: &NexusConfig) -> Result<ProvisionReport, ProvisionError> {
    let span = info_span!("provision", server = ctx.server());
    let _enter = span.enter();

    let probe_failures = wait_until_ready(ctx);
    let rotation = rotate_default_password(ctx, &config.password)?;

    let mut resources = Vec::new();
    for decl in &config.blob_stores {
        step(ctx, &BlobStore::new(decl.clone()), &mut resources)?;
    }

    let realms = activate_realms(ctx, &config.realms)?;

    step(ctx, &DockerHosted::from_config(config), &mut resources)?;
    for decl in &config.docker_group {
        step(
            ctx,
            &DockerProxy::new(decl.clone(), &config.docker_blob_store),
            &mut resources,
        )?;
    }
    // Every member must exist before the group that lists it.
    step(ctx, &DockerGroup::from_config(config), &mut resources)?;

    if let Some(raw) = &config.raw_repo {
        step(ctx, &RawHosted::new(raw.clone()), &mut resources)?;
    }

    let report = ProvisionReport {
        server: ctx.server().to_owned(),
        probe_failures,
        rotation,
        realms,
        resources,
    };
    info!(
        created = report.created(),
        changed = report.changed(),
        "provisioning complete"
    );
    Ok(report)
}
