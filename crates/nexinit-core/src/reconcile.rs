//! Idempotent read-or-create reconciliation of remote resources.
//!
//! Every resource kind follows the same shape: read it, create it if absent,
//! re-read to verify, and merge collection-valued fields into it if it exists
//! but lacks entries the current configuration requires. A resource that is
//! still absent after one accepted creation is a permanent failure.

use crate::context::expect_status;
use crate::{Context, ProvisionError};
use nexinit_client::ApiRequest;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Number of creation attempts before a persistent `404` becomes fatal.
pub const MAX_CREATE_ATTEMPTS: u32 = 1;

/// Statuses accepted for a replacing update.
pub const UPDATE_ACCEPTED: [u16; 3] = [200, 201, 204];

/// A corrective replacement of an existing resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update<P> {
    pub path: String,
    pub payload: P,
}

/// One kind of remote resource, keyed by name.
pub trait RemoteResource {
    /// Body returned by the existence check.
    type Observed: DeserializeOwned;
    /// Body sent on creation and update.
    type Payload: Serialize;

    /// Human-readable kind, used in logs and errors.
    const KIND: &'static str;

    fn name(&self) -> &str;

    fn fetch_path(&self) -> String;

    fn create_path(&self) -> String;

    /// The one status that means "created".
    fn created_status(&self) -> u16 {
        201
    }

    /// Payload for a freshly created resource.
    fn build_default(&self) -> Self::Payload;

    /// Corrective update for an existing resource, or `None` if it is complete.
    fn merge(&self, _observed: &Self::Observed) -> Option<Update<Self::Payload>> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Existing,
    Created,
    Merged,
}

/// Result of reconciling one resource.
#[derive(Debug, Clone)]
pub struct Reconciled<O> {
    pub outcome: Outcome,
    /// Remote state as last read, before any merge update was applied.
    pub observed: O,
}

/// Drive `resource` to existence and completeness.
pub fn reconcile<R: RemoteResource>(
    ctx: &Context<'_>,
    resource: &R,
) -> Result<Reconciled<R::Observed>, ProvisionError> {
    let name = resource.name();
    let mut attempts: u32 = 0;

    loop {
        let response = ctx.call(&ApiRequest::get(resource.fetch_path()))?;
        match response.status {
            200 => {
                let observed: R::Observed =
                    response.json().map_err(|source| ProvisionError::Decode {
                        what: format!("{} '{name}'", R::KIND),
                        source,
                    })?;

                let outcome = if let Some(update) = resource.merge(&observed) {
                    let request = ApiRequest::put_json(update.path, &update.payload)?;
                    let response = ctx.call(&request)?;
                    expect_status(&response, &UPDATE_ACCEPTED, || {
                        format!("update {} '{name}'", R::KIND)
                    })?;
                    info!("{} {name} updated", R::KIND);
                    Outcome::Merged
                } else if attempts > 0 {
                    Outcome::Created
                } else {
                    info!("{} {name} already defined", R::KIND);
                    Outcome::Existing
                };
                return Ok(Reconciled { outcome, observed });
            }
            404 if attempts < MAX_CREATE_ATTEMPTS => {
                info!("creating {} {name}", R::KIND);
                let request = ApiRequest::post_json(resource.create_path(), &resource.build_default())?;
                let response = ctx.call(&request)?;
                expect_status(&response, &[resource.created_status()], || {
                    format!("create {} '{name}'", R::KIND)
                })?;
                attempts += 1;
                info!("{} {name} created", R::KIND);
                debug!("re-reading {} {name} to verify creation", R::KIND);
            }
            404 => {
                return Err(ProvisionError::ReconcileExhausted {
                    kind: R::KIND,
                    name: name.to_owned(),
                    attempts,
                });
            }
            status => {
                return Err(ProvisionError::UnexpectedStatus {
                    operation: format!("read {} '{name}'", R::KIND),
                    status,
                    body: response.snippet(),
                });
            }
        }
    }
}

/// The replacement list for a replace-whole-list field, if one is needed.
///
/// Returns `None` when every `desired` entry is already in `current`.
/// Otherwise returns `current` unchanged and in order, followed by each
/// `desired` entry it did not already contain.
pub fn union_if_missing(current: &[String], desired: &[String]) -> Option<Vec<String>> {
    let mut present: HashSet<&str> = current.iter().map(String::as_str).collect();
    if desired.iter().all(|d| present.contains(d.as_str())) {
        return None;
    }
    let mut merged = current.to_vec();
    for entry in desired {
        if present.insert(entry.as_str()) {
            merged.push(entry.clone());
        }
    }
    Some(merged)
}
