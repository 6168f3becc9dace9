use crate::{AdminApi, ApiRequest, ApiResponse, ClientConfig, ClientError, Credential, Method};
use base64::Engine as _;

/// Blocking HTTP implementation of [`AdminApi`].
///
/// Every request carries `Accept: application/json` and an
/// `Authorization: Basic` header for the admin user. The agent is built with
/// `http_status_as_error(false)` so that 4xx/5xx come back as responses.
pub struct HttpApi {
    config: ClientConfig,
    agent: ureq::Agent,
}

impl HttpApi {
    pub fn new(config: ClientConfig) -> Self {
        let mut builder = ureq::Agent::config_builder().http_status_as_error(false);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout_global(Some(timeout));
        }
        if config.insecure_tls {
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }
        let agent = ureq::Agent::new_with_config(builder.build());
        Self { config, agent }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn authorization(&self, credential: Credential) -> String {
        let password = match credential {
            Credential::Operational => &self.config.password,
            Credential::FactoryDefault => &self.config.factory_password,
        };
        basic_auth(&self.config.username, password)
    }

    fn transport_error(method: Method, url: &str, err: &ureq::Error) -> ClientError {
        ClientError::Transport {
            method,
            url: url.to_owned(),
            message: err.to_string(),
        }
    }
}

pub fn basic_auth(username: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

impl AdminApi for HttpApi {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = self.config.url(&request.path);
        let auth = self.authorization(request.credential);
        tracing::debug!("{} {url}", request.method);

        let result = match request.method {
            Method::Get => self
                .agent
                .get(&url)
                .header("Accept", "application/json")
                .header("Authorization", &auth)
                .call(),
            Method::Post | Method::Put => {
                let builder = if request.method == Method::Post {
                    self.agent.post(&url)
                } else {
                    self.agent.put(&url)
                };
                let builder = builder
                    .header("Accept", "application/json")
                    .header("Authorization", &auth);
                match &request.body {
                    Some(body) => builder
                        .header("Content-Type", body.content_type())
                        .send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut resp = result.map_err(|e| Self::transport_error(request.method, &url, &e))?;
        let status = resp.status().as_u16();
        let body = resp
            .body_mut()
            .read_to_vec()
            .map_err(|e| Self::transport_error(request.method, &url, &e))?;
        tracing::debug!("{} {url} -> {status} ({} bytes)", request.method, body.len());
        Ok(ApiResponse { status, body })
    }
}
