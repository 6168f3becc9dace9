//! Wire payloads and the defaults a freshly created resource gets.
//!
//! Builders here are pure: they turn configuration declarations into the JSON
//! bodies the administrative API expects and never fail.

use nexinit_config::{BlobStoreDecl, ProxyDecl, RawRepoDecl};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Proxy whose name selects the public registry index.
pub const DOCKER_HUB_PROXY: &str = "dockerHub";
pub const DOCKER_HUB_INDEX_URL: &str = "https://index.docker.io";

/// Max age for proxied content, metadata, and negative-cache entries (24h, in minutes).
const CACHE_MINUTES: i64 = 1440;

/// Blob store used by a raw repository when none is declared.
pub const DEFAULT_BLOB_STORE: &str = nexinit_config::SERVER_DEFAULT_BLOB_STORE;

/// Server fields a payload does not model, carried through a read-modify-write untouched.
pub type Extra = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SoftQuota {
    #[serde(rename = "type")]
    pub kind: String,
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlobStoreRequest {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_quota: Option<SoftQuota>,
}

/// Body of `GET blobstores/{name}/quota-status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlobStoreQuotaStatus {
    #[serde(default)]
    pub is_violation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_store_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    pub blob_store_name: String,
    pub strict_content_type_validation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_policy: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cleanup {
    #[serde(default)]
    pub policy_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(default)]
    pub proprietary_components: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DockerAttributes {
    #[serde(default)]
    pub v1_enabled: bool,
    #[serde(default)]
    pub force_basic_auth: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DockerHostedRepository {
    pub name: String,
    pub online: bool,
    pub storage: Storage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<Cleanup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<Component>,
    pub docker: DockerAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupAttributes {
    #[serde(default)]
    pub member_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writable_member: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DockerGroupRepository {
    pub name: String,
    pub online: bool,
    pub storage: Storage,
    pub group: GroupAttributes,
    pub docker: DockerAttributes,
    /// Everything else the server reported, e.g. `component` or `cleanup`.
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyAttributes {
    pub remote_url: String,
    pub content_max_age: i64,
    pub metadata_max_age: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NegativeCache {
    pub enabled: bool,
    pub time_to_live: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HttpClientAuthentication {
    #[serde(rename = "type")]
    pub kind: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntlm_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntlm_domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HttpClientAttributes {
    pub blocked: bool,
    pub auto_block: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<HttpClientAuthentication>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DockerProxyAttributes {
    /// One of `HUB`, `REGISTRY`, `CUSTOM`.
    pub index_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_url: Option<String>,
    #[serde(default)]
    pub cache_foreign_layers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DockerProxyRepository {
    pub name: String,
    pub online: bool,
    pub storage: Storage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<Cleanup>,
    pub proxy: ProxyAttributes,
    pub negative_cache: NegativeCache,
    pub http_client: HttpClientAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_rule_name: Option<String>,
    pub docker: DockerAttributes,
    pub docker_proxy: DockerProxyAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawAttributes {
    pub content_disposition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawHostedRepository {
    pub name: String,
    pub online: bool,
    pub storage: Storage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<Cleanup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<Component>,
    pub raw: RawAttributes,
}

/// File blob store rooted at `<name>/blobs`, with a soft quota when a capacity is declared.
pub fn blob_store_request(decl: &BlobStoreDecl) -> BlobStoreRequest {
    BlobStoreRequest {
        name: decl.name.clone(),
        path: format!("{}/blobs", decl.name),
        soft_quota: (decl.capacity > 0).then(|| SoftQuota {
            kind: "spaceUsedQuota".to_owned(),
            limit: decl.capacity.saturating_mul(1000),
        }),
    }
}

pub fn docker_hosted(name: &str, blob_store: &str, http_port: u16) -> DockerHostedRepository {
    DockerHostedRepository {
        name: name.to_owned(),
        online: true,
        storage: Storage {
            blob_store_name: blob_store.to_owned(),
            strict_content_type_validation: false,
            write_policy: Some("allow".to_owned()),
            extra: Extra::new(),
        },
        cleanup: None,
        component: None,
        docker: DockerAttributes {
            http_port: Some(http_port),
            ..DockerAttributes::default()
        },
    }
}

pub fn docker_group(
    name: &str,
    blob_store: &str,
    http_port: u16,
    members: &[String],
) -> DockerGroupRepository {
    DockerGroupRepository {
        name: name.to_owned(),
        online: true,
        storage: Storage {
            blob_store_name: blob_store.to_owned(),
            strict_content_type_validation: true,
            write_policy: None,
            extra: Extra::new(),
        },
        group: GroupAttributes {
            member_names: members.to_vec(),
            writable_member: None,
            extra: Extra::new(),
        },
        docker: DockerAttributes {
            http_port: Some(http_port),
            ..DockerAttributes::default()
        },
        extra: Extra::new(),
    }
}

pub fn docker_proxy(decl: &ProxyDecl, blob_store: &str) -> DockerProxyRepository {
    let (index_type, index_url) = if decl.name == DOCKER_HUB_PROXY {
        ("HUB", Some(DOCKER_HUB_INDEX_URL.to_owned()))
    } else {
        ("REGISTRY", None)
    };
    let authentication = decl
        .username
        .as_ref()
        .filter(|u| !u.is_empty())
        .map(|username| HttpClientAuthentication {
            kind: "username".to_owned(),
            username: username.clone(),
            password: decl.password.clone().unwrap_or_default(),
            ntlm_host: None,
            ntlm_domain: None,
        });

    DockerProxyRepository {
        name: decl.name.clone(),
        online: true,
        storage: Storage {
            blob_store_name: blob_store.to_owned(),
            strict_content_type_validation: false,
            write_policy: None,
            extra: Extra::new(),
        },
        cleanup: None,
        proxy: ProxyAttributes {
            remote_url: decl.url.clone(),
            content_max_age: CACHE_MINUTES,
            metadata_max_age: CACHE_MINUTES,
        },
        negative_cache: NegativeCache {
            enabled: true,
            time_to_live: CACHE_MINUTES,
        },
        http_client: HttpClientAttributes {
            blocked: false,
            auto_block: true,
            connection: None,
            authentication,
        },
        routing_rule_name: None,
        docker: DockerAttributes::default(),
        docker_proxy: DockerProxyAttributes {
            index_type: index_type.to_owned(),
            index_url,
            cache_foreign_layers: true,
        },
    }
}

pub fn raw_hosted(decl: &RawRepoDecl) -> RawHostedRepository {
    RawHostedRepository {
        name: decl.name.clone(),
        online: decl.online,
        storage: Storage {
            blob_store_name: decl
                .blob_store
                .clone()
                .unwrap_or_else(|| DEFAULT_BLOB_STORE.to_owned()),
            strict_content_type_validation: decl.strict_content_type_validation,
            write_policy: Some(decl.write_policy.clone()),
            extra: Extra::new(),
        },
        cleanup: None,
        component: None,
        raw: RawAttributes {
            content_disposition: decl.content_disposition.clone(),
        },
    }
}
