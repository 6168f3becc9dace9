use crate::ProvisionError;
use nexinit_client::{AdminApi, ApiRequest, ApiResponse};
use std::time::Duration;

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(2);

/// Everything a provisioning step needs, passed explicitly.
///
/// Holds the transport handle and a label identifying the target server in
/// log output. There is no global client and no global logger.
pub struct Context<'a> {
    api: &'a dyn AdminApi,
    server: String,
    probe_interval: Duration,
}

impl<'a> Context<'a> {
    pub fn new(api: &'a dyn AdminApi, server: impl Into<String>) -> Self {
        Self {
            api,
            server: server.into(),
            probe_interval: DEFAULT_PROBE_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn api(&self) -> &'a dyn AdminApi {
        self.api
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn probe_interval(&self) -> Duration {
        self.probe_interval
    }

    /// Send one request; transport failures are fatal outside the readiness probe.
    pub(crate) fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ProvisionError> {
        Ok(self.api.send(request)?)
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("server", &self.server)
            .field("probe_interval", &self.probe_interval)
            .finish_non_exhaustive()
    }
}

/// Fail with `UnexpectedStatus` unless `response.status` is one of `accepted`.
pub(crate) fn expect_status(
    response: &ApiResponse,
    accepted: &[u16],
    operation: impl FnOnce() -> String,
) -> Result<(), ProvisionError> {
    if accepted.contains(&response.status) {
        Ok(())
    } else {
        Err(ProvisionError::UnexpectedStatus {
            operation: operation(),
            status: response.status,
            body: response.snippet(),
        })
    }
}
