use super::{json_pretty, load_config, make_client, make_context, EXIT_SUCCESS};
use nexinit_core::wait_until_ready;
use std::path::Path;

pub fn run(config_path: Option<&Path>, json: bool) -> Result<u8, String> {
    let config = load_config(config_path)?;
    let api = make_client(&config);
    let ctx = make_context(&api, &config);

    let failures = wait_until_ready(&ctx);

    if json {
        let payload = serde_json::json!({
            "server": ctx.server(),
            "ready": true,
            "probe_failures": failures,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{} is ready ({failures} failed probes)", ctx.server());
    }
    Ok(EXIT_SUCCESS)
}
