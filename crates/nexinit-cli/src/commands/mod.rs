pub mod completions;
pub mod config;
pub mod provision;
pub mod wait;

use nexinit_client::{ClientConfig, HttpApi};
use nexinit_config::NexusConfig;
use nexinit_core::Context;
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn load_config(path: Option<&Path>) -> Result<NexusConfig, String> {
    nexinit_config::load_from_env(path).map_err(|e| e.to_string())
}

pub fn make_client(config: &NexusConfig) -> HttpApi {
    HttpApi::new(ClientConfig::from_nexus(config))
}

pub fn make_context<'a>(api: &'a HttpApi, config: &NexusConfig) -> Context<'a> {
    Context::new(api, api.config().base_url.clone())
        .with_probe_interval(Duration::from_secs(config.probe_interval_secs))
}
