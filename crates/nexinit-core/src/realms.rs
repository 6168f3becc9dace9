use crate::context::expect_status;
use crate::reconcile::union_if_missing;
use crate::{Context, ProvisionError};
use nexinit_client::ApiRequest;
use serde::Serialize;
use tracing::info;

pub const ACTIVE_REALMS_PATH: &str = "security/realms/active";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "realms")]
pub enum RealmOutcome {
    AlreadyActive,
    /// The full list that was submitted.
    Activated(Vec<String>),
}

/// Make every `requested` realm active without deactivating any other.
///
/// The server replaces the whole active list on update, so when any requested
/// realm is missing a single update carries the current list followed by the
/// missing ones.
pub fn activate_realms(
    ctx: &Context<'_>,
    requested: &[String],
) -> Result<RealmOutcome, ProvisionError> {
    let response = ctx.call(&ApiRequest::get(ACTIVE_REALMS_PATH))?;
    expect_status(&response, &[200], || "read active realms".to_owned())?;
    let active: Vec<String> = response.json().map_err(|source| ProvisionError::Decode {
        what: "active realms".to_owned(),
        source,
    })?;

    let Some(merged) = union_if_missing(&active, requested) else {
        info!(realms = ?requested, "realms already active");
        return Ok(RealmOutcome::AlreadyActive);
    };

    let response = ctx.call(&ApiRequest::put_json(ACTIVE_REALMS_PATH, &merged)?)?;
    expect_status(&response, &[204], || "activate realms".to_owned())?;
    info!(realms = ?merged, "realms activated");
    Ok(RealmOutcome::Activated(merged))
}
