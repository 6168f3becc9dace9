use crate::{Context, ProvisionError};
use nexinit_client::{ApiRequest, Credential};
use nexinit_config::{ADMIN_USER, FACTORY_PASSWORD};
use serde::Serialize;
use tracing::info;

pub fn change_password_path() -> String {
    format!("security/users/{ADMIN_USER}/change-password")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationOutcome {
    /// No password configured, or it equals the factory default.
    Skipped,
    Rotated,
    /// The factory credential was refused: a previous run already rotated it.
    AlreadyRotated,
}

/// Replace the factory admin password with `new_password`.
///
/// Authenticates with the factory credential. `401` means the factory
/// password no longer works and is treated as success; `204` is the rotation
/// itself; anything else is fatal.
pub fn rotate_default_password(
    ctx: &Context<'_>,
    new_password: &str,
) -> Result<RotationOutcome, ProvisionError> {
    if new_password.is_empty() || new_password == FACTORY_PASSWORD {
        info!("admin password rotation not configured");
        return Ok(RotationOutcome::Skipped);
    }

    let request = ApiRequest::put_text(change_password_path(), new_password)
        .with_credential(Credential::FactoryDefault);
    let response = ctx.call(&request)?;
    match response.status {
        401 => {
            info!("admin password already changed");
            Ok(RotationOutcome::AlreadyRotated)
        }
        204 => {
            info!("admin password changed");
            Ok(RotationOutcome::Rotated)
        }
        status => Err(ProvisionError::UnexpectedStatus {
            operation: "change admin password".to_owned(),
            status,
            body: response.snippet(),
        }),
    }
}
