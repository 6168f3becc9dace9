use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

/// Password the server ships with before the first rotation.
pub const FACTORY_PASSWORD: &str = "admin123";

/// Administrative account used for every call.
pub const ADMIN_USER: &str = "admin";

/// Blob store every server ships with; it never needs declaring.
pub const SERVER_DEFAULT_BLOB_STORE: &str = "default";

/// Characters that would change the meaning of a URL path segment.
const PATH_RESERVED: [char; 4] = ['/', '?', '#', '%'];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    ParseJson {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    ParseToml {
        path: String,
        source: toml::de::Error,
    },
    #[error("config error: overlay '{name}' not found in {searched:?}")]
    OverlayNotFound { name: String, searched: Vec<String> },
    #[error("config error: no base config found (tried {0:?})")]
    BaseNotFound(Vec<String>),
    #[error("config error: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full provisioning document.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NexusConfig {
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub insecure_tls: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
    #[serde(default)]
    pub blob_stores: Vec<BlobStoreDecl>,
    #[serde(default = "default_realms")]
    pub realms: Vec<String>,
    #[serde(default = "default_docker_blob_store")]
    pub docker_blob_store: String,
    #[serde(default = "DockerEndpoint::default_push")]
    pub docker_push: DockerEndpoint,
    #[serde(default = "DockerEndpoint::default_pull")]
    pub docker_pull: DockerEndpoint,
    #[serde(default)]
    pub docker_group: Vec<ProxyDecl>,
    #[serde(default)]
    pub raw_repo: Option<RawRepoDecl>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlobStoreDecl {
    pub name: String,
    /// Soft quota in MB. Zero means no quota.
    #[serde(default)]
    pub capacity: u64,
}

/// A docker repository exposed on its own connector port.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DockerEndpoint {
    #[serde(default)]
    pub name: Option<String>,
    pub port: u16,
}

impl DockerEndpoint {
    pub const DEFAULT_PUSH_NAME: &'static str = "dockerLocal";
    pub const DEFAULT_PULL_NAME: &'static str = "dockerGroup";

    fn default_push() -> Self {
        Self {
            name: None,
            port: 8082,
        }
    }

    fn default_pull() -> Self {
        Self {
            name: None,
            port: 8083,
        }
    }
}

/// An upstream registry mirrored through a docker proxy repository.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProxyDecl {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawRepoDecl {
    pub name: String,
    #[serde(default)]
    pub blob_store: Option<String>,
    #[serde(default = "default_write_policy")]
    pub write_policy: String,
    #[serde(default)]
    pub strict_content_type_validation: bool,
    #[serde(default = "default_content_disposition")]
    pub content_disposition: String,
    #[serde(default = "default_true")]
    pub online: bool,
}

fn default_port() -> u16 {
    8081
}

fn default_probe_interval() -> u64 {
    2
}

fn default_realms() -> Vec<String> {
    vec!["DockerToken".to_owned()]
}

fn default_docker_blob_store() -> String {
    "docker".to_owned()
}

fn default_write_policy() -> String {
    "allow".to_owned()
}

fn default_content_disposition() -> String {
    "ATTACHMENT".to_owned()
}

fn default_true() -> bool {
    true
}

impl NexusConfig {
    /// Minimal document pointing at `address`, everything else defaulted.
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_owned(),
            port: default_port(),
            scheme: Scheme::default(),
            password: String::new(),
            insecure_tls: false,
            timeout_secs: None,
            probe_interval_secs: default_probe_interval(),
            blob_stores: Vec::new(),
            realms: default_realms(),
            docker_blob_store: default_docker_blob_store(),
            docker_push: DockerEndpoint::default_push(),
            docker_pull: DockerEndpoint::default_pull(),
            docker_group: Vec::new(),
            raw_repo: None,
        }
    }

    pub fn push_repo_name(&self) -> &str {
        self.docker_push
            .name
            .as_deref()
            .unwrap_or(DockerEndpoint::DEFAULT_PUSH_NAME)
    }

    pub fn pull_repo_name(&self) -> &str {
        self.docker_pull
            .name
            .as_deref()
            .unwrap_or(DockerEndpoint::DEFAULT_PULL_NAME)
    }

    /// Password used for every call except the rotation itself.
    pub fn operational_password(&self) -> &str {
        if self.password.is_empty() {
            FACTORY_PASSWORD
        } else {
            &self.password
        }
    }

    /// Copy with every credential replaced by `***`.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.password.is_empty() {
            copy.password = "***".to_owned();
        }
        for proxy in &mut copy.docker_group {
            if proxy.password.is_some() {
                proxy.password = Some("***".to_owned());
            }
        }
        copy
    }

    /// Blob stores repositories refer to that are neither declared nor the server default.
    pub fn undeclared_blob_stores(&self) -> Vec<&str> {
        let declared: BTreeSet<&str> = self.blob_stores.iter().map(|s| s.name.as_str()).collect();
        let raw = self.raw_repo.as_ref().and_then(|r| r.blob_store.as_deref());
        let mut undeclared: Vec<&str> = std::iter::once(self.docker_blob_store.as_str())
            .chain(raw)
            .filter(|name| *name != SERVER_DEFAULT_BLOB_STORE && !declared.contains(name))
            .collect();
        undeclared.dedup();
        undeclared
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::Invalid("address must not be empty".to_owned()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must not be 0".to_owned()));
        }
        if self.docker_blob_store.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "dockerBlobStore must not be empty".to_owned(),
            ));
        }

        let mut seen = BTreeSet::new();
        for store in &self.blob_stores {
            check_name("blob store", &store.name)?;
            if !seen.insert(store.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate blob store '{}'",
                    store.name
                )));
            }
        }

        let push = self.push_repo_name();
        let pull = self.pull_repo_name();
        check_name("dockerPush", push)?;
        check_name("dockerPull", pull)?;
        if push == pull {
            return Err(ConfigError::Invalid(format!(
                "dockerPush and dockerPull must use different names (both '{push}')"
            )));
        }

        let mut proxies = BTreeSet::new();
        for proxy in &self.docker_group {
            check_name("proxy repository", &proxy.name)?;
            if proxy.name == push || proxy.name == pull {
                return Err(ConfigError::Invalid(format!(
                    "proxy repository '{}' collides with a docker repository name",
                    proxy.name
                )));
            }
            if !proxies.insert(proxy.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate proxy repository '{}'",
                    proxy.name
                )));
            }
            if !(proxy.url.starts_with("http://") || proxy.url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "proxy repository '{}' url is not http(s): '{}'",
                    proxy.name, proxy.url
                )));
            }
            if proxy.username.is_some() && proxy.password.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "proxy repository '{}' has a username but no password",
                    proxy.name
                )));
            }
        }

        if let Some(raw) = &self.raw_repo {
            check_name("rawRepo", &raw.name)?;
        }

        for name in self.undeclared_blob_stores() {
            warn!("blob store '{name}' is not declared in blobStores and must already exist");
        }
        Ok(())
    }
}

/// Resource names become URL path segments and are sent unescaped.
fn check_name(what: &str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{what} name must not be empty")));
    }
    if let Some(c) = name
        .chars()
        .find(|c| PATH_RESERVED.contains(c) || c.is_whitespace() || c.is_control())
    {
        return Err(ConfigError::Invalid(format!(
            "{what} name '{name}' contains {c:?}; names must not contain '/', '?', '#', '%' or whitespace"
        )));
    }
    Ok(())
}

pub fn parse_config_str(input: &str) -> Result<NexusConfig, ConfigError> {
    let config: NexusConfig =
        serde_json::from_str(input).map_err(|source| ConfigError::ParseJson {
            path: "<inline>".to_owned(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let input = r#"{
            "address": "nexus.local",
            "port": 8443,
            "scheme": "https",
            "password": "s3cret",
            "insecureTls": true,
            "timeoutSecs": 30,
            "blobStores": [{"name": "docker", "capacity": 10}, {"name": "raw"}],
            "realms": ["DockerToken", "NpmToken"],
            "dockerPush": {"port": 5000},
            "dockerPull": {"name": "pull", "port": 5001},
            "dockerGroup": [
                {"name": "dockerHub", "url": "https://registry-1.docker.io"},
                {"name": "quay", "url": "https://quay.io", "username": "bot", "password": "pw"}
            ],
            "rawRepo": {"name": "files", "blobStore": "raw"}
        }"#;
        let config = parse_config_str(input).expect("should parse");
        assert_eq!(config.scheme, Scheme::Https);
        assert_eq!(config.blob_stores[0].capacity, 10);
        assert_eq!(config.blob_stores[1].capacity, 0);
        assert_eq!(config.push_repo_name(), "dockerLocal");
        assert_eq!(config.pull_repo_name(), "pull");
        assert_eq!(config.docker_group.len(), 2);
        let raw = config.raw_repo.unwrap();
        assert_eq!(raw.write_policy, "allow");
        assert_eq!(raw.content_disposition, "ATTACHMENT");
        assert!(raw.online);
    }

    #[test]
    fn parses_minimal_document() {
        let config = parse_config_str(r#"{"address": "localhost"}"#).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.scheme, Scheme::Http);
        assert_eq!(config.realms, vec!["DockerToken"]);
        assert_eq!(config.docker_push.port, 8082);
        assert_eq!(config.docker_pull.port, 8083);
        assert_eq!(config.probe_interval_secs, 2);
        assert!(config.raw_repo.is_none());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(parse_config_str(r#"{"address": "x", "adress": "y"}"#).is_err());
    }

    #[test]
    fn rejects_missing_address() {
        assert!(parse_config_str(r#"{"port": 8081}"#).is_err());
    }

    #[test]
    fn operational_password_falls_back_to_factory() {
        let mut config = NexusConfig::new("localhost");
        assert_eq!(config.operational_password(), FACTORY_PASSWORD);
        config.password = "rotated".to_owned();
        assert_eq!(config.operational_password(), "rotated");
    }

    #[test]
    fn rejects_duplicate_blob_store() {
        let mut config = NexusConfig::new("localhost");
        config.blob_stores = vec![
            BlobStoreDecl {
                name: "docker".to_owned(),
                capacity: 1,
            },
            BlobStoreDecl {
                name: "docker".to_owned(),
                capacity: 2,
            },
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate blob store"));
    }

    #[test]
    fn rejects_non_http_proxy_url() {
        let mut config = NexusConfig::new("localhost");
        config.docker_group.push(ProxyDecl {
            name: "hub".to_owned(),
            url: "ftp://example.com".to_owned(),
            username: None,
            password: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_proxy_username_without_password() {
        let mut config = NexusConfig::new("localhost");
        config.docker_group.push(ProxyDecl {
            name: "hub".to_owned(),
            url: "https://example.com".to_owned(),
            username: Some("bot".to_owned()),
            password: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_proxy_named_like_push_repo() {
        let mut config = NexusConfig::new("localhost");
        config.docker_group.push(ProxyDecl {
            name: "dockerLocal".to_owned(),
            url: "https://example.com".to_owned(),
            username: None,
            password: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_names_that_are_not_path_segments() {
        let mut config = NexusConfig::new("localhost");
        config.blob_stores = vec![BlobStoreDecl {
            name: "team/docker".to_owned(),
            capacity: 0,
        }];
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("team/docker"));

        for bad in ["my repo", "a?b", "a#b", "100%", "tab\tname"] {
            let mut config = NexusConfig::new("localhost");
            config.docker_group.push(ProxyDecl {
                name: bad.to_owned(),
                url: "https://example.com".to_owned(),
                username: None,
                password: None,
            });
            assert!(config.validate().is_err(), "accepted proxy name {bad:?}");
        }

        let mut config = NexusConfig::new("localhost");
        config.docker_push.name = Some("docker/local".to_owned());
        assert!(config.validate().is_err());

        let mut config = NexusConfig::new("localhost");
        config.raw_repo = Some(RawRepoDecl {
            name: "raw files".to_owned(),
            blob_store: None,
            write_policy: "allow".to_owned(),
            strict_content_type_validation: false,
            content_disposition: "ATTACHMENT".to_owned(),
            online: true,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_usual_repository_names() {
        let mut config = NexusConfig::new("localhost");
        config.blob_stores = vec![BlobStoreDecl {
            name: "docker-blobs_1.v2".to_owned(),
            capacity: 0,
        }];
        config.docker_group.push(ProxyDecl {
            name: "ghcr.io-mirror".to_owned(),
            url: "https://ghcr.io".to_owned(),
            username: None,
            password: None,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reports_undeclared_blob_stores() {
        let mut config = NexusConfig::new("localhost");
        assert_eq!(config.undeclared_blob_stores(), vec!["docker"]);

        config.blob_stores = vec![BlobStoreDecl {
            name: "docker".to_owned(),
            capacity: 0,
        }];
        assert!(config.undeclared_blob_stores().is_empty());

        config.docker_blob_store = "dokcer".to_owned();
        config.raw_repo = Some(RawRepoDecl {
            name: "files".to_owned(),
            blob_store: Some(SERVER_DEFAULT_BLOB_STORE.to_owned()),
            write_policy: "allow".to_owned(),
            strict_content_type_validation: false,
            content_disposition: "ATTACHMENT".to_owned(),
            online: true,
        });
        assert_eq!(config.undeclared_blob_stores(), vec!["dokcer"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn redacted_hides_passwords() {
        let mut config = NexusConfig::new("localhost");
        config.password = "s3cret".to_owned();
        config.docker_group.push(ProxyDecl {
            name: "quay".to_owned(),
            url: "https://quay.io".to_owned(),
            username: Some("bot".to_owned()),
            password: Some("pw".to_owned()),
        });
        let redacted = config.redacted();
        assert_eq!(redacted.password, "***");
        assert_eq!(redacted.docker_group[0].password.as_deref(), Some("***"));
        assert_eq!(redacted.docker_group[0].username.as_deref(), Some("bot"));
    }
}
