//! Configuration for nexinit.
//!
//! This crate defines the provisioning document (`NexusConfig`): server address,
//! credentials, blob stores, realms, and the docker/raw repositories to declare.
//! It also implements layered loading (base file plus an environment-selected
//! overlay, deep-merged) and validation of the merged result.

pub mod document;
pub mod load;

pub use document::{
    parse_config_str, BlobStoreDecl, ConfigError, DockerEndpoint, NexusConfig, ProxyDecl,
    RawRepoDecl, Scheme, ADMIN_USER, FACTORY_PASSWORD, SERVER_DEFAULT_BLOB_STORE,
};
pub use load::{load, load_from_env, merge_values, ConfigSources, ENV_CONFIG_FILE, ENV_CONFIG_PATH};
