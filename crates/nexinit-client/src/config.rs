use crate::API_BASE_PATH;
use nexinit_config::{NexusConfig, ADMIN_USER, FACTORY_PASSWORD};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `{scheme}://{address}:{port}/service/rest/v1/`, always with a trailing slash.
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub factory_password: String,
    pub timeout: Option<Duration>,
    pub insecure_tls: bool,
}

impl ClientConfig {
    /// Client for a server root such as `http://127.0.0.1:8081`.
    pub fn new(server_url: &str, password: &str) -> Self {
        Self {
            base_url: format!("{}{API_BASE_PATH}", server_url.trim_end_matches('/')),
            username: ADMIN_USER.to_owned(),
            password: password.to_owned(),
            factory_password: FACTORY_PASSWORD.to_owned(),
            timeout: None,
            insecure_tls: false,
        }
    }

    pub fn from_nexus(config: &NexusConfig) -> Self {
        let server = format!("{}://{}:{}", config.scheme, config.address, config.port);
        Self {
            timeout: config.timeout_secs.map(Duration::from_secs),
            insecure_tls: config.insecure_tls,
            ..Self::new(&server, config.operational_password())
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}
