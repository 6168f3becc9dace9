use crate::Context;
use nexinit_client::ApiRequest;
use tracing::{info, warn};

pub const STATUS_PATH: &str = "status";

/// Block until `GET status` answers 200.
///
/// Transport failures and non-200 answers are both retried after the
/// context's fixed probe interval, with no attempt limit. Returns the number
/// of failed attempts before the server became ready.
pub fn wait_until_ready(ctx: &Context<'_>) -> u32 {
    let request = ApiRequest::get(STATUS_PATH);
    let mut failures: u32 = 0;
    loop {
        match ctx.api().send(&request) {
            Ok(resp) if resp.status == 200 => {
                info!(server = ctx.server(), failures, "server is ready");
                return failures;
            }
            Ok(resp) => {
                info!(
                    server = ctx.server(),
                    status = resp.status,
                    "waiting for server"
                );
            }
            Err(e) => {
                warn!(server = ctx.server(), error = %e, "waiting for server");
            }
        }
        failures = failures.saturating_add(1);
        std::thread::sleep(ctx.probe_interval());
    }
}
