//! Provisioning engine for nexinit.
//!
//! This crate drives a Nexus repository manager from an unknown starting state
//! to the state a `NexusConfig` describes: it waits for the server, rotates the
//! factory admin password, and reconciles blob stores, active realms, and
//! docker/raw repositories through the administrative API. Every step is
//! idempotent; a second run against a provisioned server creates nothing.

pub mod context;
pub mod definitions;
pub mod probe;
pub mod provision;
pub mod realms;
pub mod reconcile;
pub mod resources;
pub mod rotate;

#[cfg(test)]
mod testing;

pub use context::{Context, DEFAULT_PROBE_INTERVAL};
pub use probe::wait_until_ready;
pub use provision::{provision, ProvisionReport, StepReport};
pub use realms::{activate_realms, RealmOutcome};
pub use reconcile::{reconcile, Outcome, Reconciled, RemoteResource, Update, MAX_CREATE_ATTEMPTS};
pub use resources::{BlobStore, DockerGroup, DockerHosted, DockerProxy, RawHosted};
pub use rotate::{rotate_default_password, RotationOutcome};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("remote error: {0}")]
    Client(#[from] nexinit_client::ClientError),
    #[error("remote error: {operation} returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        operation: String,
        status: u16,
        body: String,
    },
    #[error("remote error: malformed {what} in response: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "reconcile error: {kind} '{name}' still absent after {attempts} accepted creation attempt(s)"
    )]
    ReconcileExhausted {
        kind: &'static str,
        name: String,
        attempts: u32,
    },
}
