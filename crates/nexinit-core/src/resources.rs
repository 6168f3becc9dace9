//! One [`RemoteResource`] implementation per resource kind.

use crate::definitions::{
    self, BlobStoreQuotaStatus, BlobStoreRequest, DockerGroupRepository, DockerHostedRepository,
    DockerProxyRepository, RawHostedRepository,
};
use crate::reconcile::{union_if_missing, RemoteResource, Update};
use nexinit_config::{BlobStoreDecl, NexusConfig, ProxyDecl, RawRepoDecl};

/// File blob store; existence is probed through its quota status.
#[derive(Debug, Clone)]
pub struct BlobStore {
    decl: BlobStoreDecl,
}

impl BlobStore {
    pub fn new(decl: BlobStoreDecl) -> Self {
        Self { decl }
    }
}

impl RemoteResource for BlobStore {
    type Observed = BlobStoreQuotaStatus;
    type Payload = BlobStoreRequest;
    const KIND: &'static str = "blob store";

    fn name(&self) -> &str {
        &self.decl.name
    }

    fn fetch_path(&self) -> String {
        format!("blobstores/{}/quota-status", self.decl.name)
    }

    fn create_path(&self) -> String {
        "blobstores/file".to_owned()
    }

    fn created_status(&self) -> u16 {
        204
    }

    fn build_default(&self) -> BlobStoreRequest {
        definitions::blob_store_request(&self.decl)
    }
}

/// Docker hosted repository that clients push to.
#[derive(Debug, Clone)]
pub struct DockerHosted {
    name: String,
    blob_store: String,
    http_port: u16,
}

impl DockerHosted {
    pub fn new(name: &str, blob_store: &str, http_port: u16) -> Self {
        Self {
            name: name.to_owned(),
            blob_store: blob_store.to_owned(),
            http_port,
        }
    }

    pub fn from_config(config: &NexusConfig) -> Self {
        Self::new(
            config.push_repo_name(),
            &config.docker_blob_store,
            config.docker_push.port,
        )
    }
}

impl RemoteResource for DockerHosted {
    type Observed = DockerHostedRepository;
    type Payload = DockerHostedRepository;
    const KIND: &'static str = "docker hosted repository";

    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_path(&self) -> String {
        format!("repositories/docker/hosted/{}", self.name)
    }

    fn create_path(&self) -> String {
        "repositories/docker/hosted".to_owned()
    }

    fn build_default(&self) -> DockerHostedRepository {
        definitions::docker_hosted(&self.name, &self.blob_store, self.http_port)
    }
}

/// Docker group repository that clients pull through.
///
/// Its member list must end up containing every member given here. Members
/// already on the server are kept, ahead of the ones added.
#[derive(Debug, Clone)]
pub struct DockerGroup {
    name: String,
    blob_store: String,
    http_port: u16,
    members: Vec<String>,
}

impl DockerGroup {
    pub fn new(name: &str, blob_store: &str, http_port: u16, members: Vec<String>) -> Self {
        Self {
            name: name.to_owned(),
            blob_store: blob_store.to_owned(),
            http_port,
            members,
        }
    }

    /// The pull group: the push repository followed by every proxy.
    pub fn from_config(config: &NexusConfig) -> Self {
        let members = std::iter::once(config.push_repo_name().to_owned())
            .chain(config.docker_group.iter().map(|p| p.name.clone()))
            .collect();
        Self::new(
            config.pull_repo_name(),
            &config.docker_blob_store,
            config.docker_pull.port,
            members,
        )
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

impl RemoteResource for DockerGroup {
    type Observed = DockerGroupRepository;
    type Payload = DockerGroupRepository;
    const KIND: &'static str = "docker group repository";

    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_path(&self) -> String {
        format!("repositories/docker/group/{}", self.name)
    }

    fn create_path(&self) -> String {
        "repositories/docker/group".to_owned()
    }

    fn build_default(&self) -> DockerGroupRepository {
        definitions::docker_group(&self.name, &self.blob_store, self.http_port, &self.members)
    }

    fn merge(&self, observed: &DockerGroupRepository) -> Option<Update<DockerGroupRepository>> {
        let members = union_if_missing(&observed.group.member_names, &self.members)?;
        let mut payload = observed.clone();
        payload.group.member_names = members;
        Some(Update {
            path: self.fetch_path(),
            payload,
        })
    }
}

/// Docker proxy repository mirroring an upstream registry.
#[derive(Debug, Clone)]
pub struct DockerProxy {
    decl: ProxyDecl,
    blob_store: String,
}

impl DockerProxy {
    pub fn new(decl: ProxyDecl, blob_store: &str) -> Self {
        Self {
            decl,
            blob_store: blob_store.to_owned(),
        }
    }
}

impl RemoteResource for DockerProxy {
    type Observed = DockerProxyRepository;
    type Payload = DockerProxyRepository;
    const KIND: &'static str = "docker proxy repository";

    fn name(&self) -> &str {
        &self.decl.name
    }

    fn fetch_path(&self) -> String {
        format!("repositories/docker/proxy/{}", self.decl.name)
    }

    fn create_path(&self) -> String {
        "repositories/docker/proxy".to_owned()
    }

    fn build_default(&self) -> DockerProxyRepository {
        definitions::docker_proxy(&self.decl, &self.blob_store)
    }
}

#[derive(Debug, Clone)]
pub struct RawHosted {
    decl: RawRepoDecl,
}

impl RawHosted {
    pub fn new(decl: RawRepoDecl) -> Self {
        Self { decl }
    }
}

impl RemoteResource for RawHosted {
    type Observed = RawHostedRepository;
    type Payload = RawHostedRepository;
    const KIND: &'static str = "raw hosted repository";

    fn name(&self) -> &str {
        &self.decl.name
    }

    fn fetch_path(&self) -> String {
        format!("repositories/raw/hosted/{}", self.decl.name)
    }

    fn create_path(&self) -> String {
        "repositories/raw/hosted".to_owned()
    }

    fn build_default(&self) -> RawHostedRepository {
        definitions::raw_hosted(&self.decl)
    }
}
