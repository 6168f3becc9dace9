//! Provisioning runs against a real in-process `nexinit-mock` over HTTP.
//!
//! These tests start the mock server on a random port and drive it with the
//! real `HttpApi` client and the full provisioning sequence.

use nexinit_client::{AdminApi, ApiRequest, ClientConfig, HttpApi};
use nexinit_config::{BlobStoreDecl, NexusConfig, ProxyDecl, RawRepoDecl};
use nexinit_core::{
    provision, wait_until_ready, Context, Outcome, ProvisionError, ProvisionReport, RealmOutcome,
    RotationOutcome,
};
use nexinit_mock::{NexusState, TestServer, FACTORY_PASSWORD};
use serde_json::json;
use std::time::Duration;

fn config_for(server: &TestServer) -> NexusConfig {
    let mut config = NexusConfig::new("127.0.0.1");
    config.port = server.port;
    config.password = "s3cret".to_owned();
    config.blob_stores = vec![BlobStoreDecl {
        name: "docker".to_owned(),
        capacity: 10,
    }];
    config.docker_group = vec![
        ProxyDecl {
            name: "dockerHub".to_owned(),
            url: "https://registry-1.docker.io".to_owned(),
            username: None,
            password: None,
        },
        ProxyDecl {
            name: "quay".to_owned(),
            url: "https://quay.io".to_owned(),
            username: Some("robot".to_owned()),
            password: Some("token".to_owned()),
        },
    ];
    config.raw_repo = Some(RawRepoDecl {
        name: "files".to_owned(),
        blob_store: Some("docker".to_owned()),
        write_policy: "allow".to_owned(),
        strict_content_type_validation: false,
        content_disposition: "ATTACHMENT".to_owned(),
        online: true,
    });
    config
}

fn client_for(config: &NexusConfig) -> HttpApi {
    HttpApi::new(ClientConfig::from_nexus(config))
}

fn run(server: &TestServer, config: &NexusConfig) -> Result<ProvisionReport, ProvisionError> {
    let api = client_for(config);
    let ctx = Context::new(&api, server.url.clone()).with_probe_interval(Duration::from_millis(5));
    provision(&ctx, config)
}

#[test]
fn http_e2e_first_run_provisions_everything() {
    let server = TestServer::start(NexusState::new());
    let config = config_for(&server);

    let report = run(&server, &config).unwrap();
    assert_eq!(report.rotation, RotationOutcome::Rotated);
    assert_eq!(report.created(), 6);

    let state = server.state();
    assert_eq!(state.password(), "s3cret");
    assert_eq!(
        state.realms(),
        vec!["NexusAuthenticatingRealm", "NexusAuthorizingRealm", "DockerToken"]
    );
    assert_eq!(
        state.repository("docker/group", "dockerGroup").unwrap()["group"]["memberNames"],
        json!(["dockerLocal", "dockerHub", "quay"])
    );
    let quay = state.repository("docker/proxy", "quay").unwrap();
    assert_eq!(quay["dockerProxy"]["indexType"], "REGISTRY");
    assert_eq!(quay["httpClient"]["authentication"]["username"], "robot");
    assert_eq!(
        state.repository("docker/hosted", "dockerLocal").unwrap()["docker"]["httpPort"],
        8082
    );
    assert_eq!(
        state.repository("raw/hosted", "files").unwrap()["storage"]["blobStoreName"],
        "docker"
    );
}

#[test]
fn http_e2e_second_run_is_idempotent() {
    let server = TestServer::start(NexusState::new());
    let config = config_for(&server);
    run(&server, &config).unwrap();
    let posts_after_first = server.state().count_method("POST");
    let group_before = server.state().repository("docker/group", "dockerGroup");

    let report = run(&server, &config).unwrap();
    assert_eq!(server.state().count_method("POST"), posts_after_first);
    assert_eq!(report.created(), 0);
    assert!(!report.changed());
    assert_eq!(report.rotation, RotationOutcome::AlreadyRotated);
    assert_eq!(report.realms, RealmOutcome::AlreadyActive);
    assert_eq!(
        server.state().repository("docker/group", "dockerGroup"),
        group_before
    );
}

#[test]
fn http_e2e_blob_store_scenario() {
    let server = TestServer::start(NexusState::new());
    let mut config = config_for(&server);
    config.docker_group.clear();
    config.raw_repo = None;

    run(&server, &config).unwrap();
    let state = server.state();
    assert_eq!(state.count("GET", "blobstores/docker/quota-status"), 2);
    assert_eq!(state.count("POST", "blobstores/file"), 1);
    assert_eq!(
        state.blob_store("docker").unwrap(),
        json!({
            "name": "docker",
            "path": "docker/blobs",
            "softQuota": {"type": "spaceUsedQuota", "limit": 10000}
        })
    );

    run(&server, &config).unwrap();
    assert_eq!(state.count("GET", "blobstores/docker/quota-status"), 3);
    assert_eq!(state.count("POST", "blobstores/file"), 1);
}

#[test]
fn http_e2e_group_keeps_existing_members() {
    let state = NexusState::new();
    state.insert_repository(
        "docker/group",
        json!({
            "name": "dockerGroup",
            "online": true,
            "storage": {"blobStoreName": "docker", "strictContentTypeValidation": true},
            "group": {"memberNames": ["A", "B"]},
            "docker": {"v1Enabled": false, "forceBasicAuth": false, "httpPort": 8083}
        }),
    );
    let server = TestServer::start(state);
    let mut config = config_for(&server);
    config.docker_group.clear();

    let report = run(&server, &config).unwrap();
    let group = report
        .resources
        .iter()
        .find(|s| s.name == "dockerGroup")
        .unwrap();
    assert_eq!(group.outcome, Outcome::Merged);
    assert_eq!(
        server.state().repository("docker/group", "dockerGroup").unwrap()["group"]["memberNames"],
        json!(["A", "B", "dockerLocal"])
    );
    assert_eq!(server.state().count("PUT", "repositories/docker/group/dockerGroup"), 1);
}

#[test]
fn http_e2e_group_merge_keeps_unmodelled_fields() {
    let state = NexusState::new();
    state.insert_repository(
        "docker/group",
        json!({
            "name": "dockerGroup",
            "online": true,
            "storage": {"blobStoreName": "docker", "strictContentTypeValidation": true},
            "group": {"memberNames": ["A"]},
            "docker": {"v1Enabled": false, "forceBasicAuth": false, "httpPort": 8083, "pathEnabled": true},
            "component": {"proprietaryComponents": true},
            "cleanup": {"policyNames": ["weekly"]}
        }),
    );
    let server = TestServer::start(state);
    let mut config = config_for(&server);
    config.docker_group.clear();

    run(&server, &config).unwrap();
    let after = server.state().repository("docker/group", "dockerGroup").unwrap();
    assert_eq!(after["group"]["memberNames"], json!(["A", "dockerLocal"]));
    assert_eq!(after["docker"]["pathEnabled"], true);
    assert_eq!(after["docker"]["httpPort"], 8083);
    assert_eq!(after["component"], json!({"proprietaryComponents": true}));
    assert_eq!(after["cleanup"], json!({"policyNames": ["weekly"]}));
}

#[test]
fn http_e2e_realms_already_active_issue_no_update() {
    let server = TestServer::start(NexusState::new().with_realms(&[
        "NexusAuthenticatingRealm",
        "DockerToken",
    ]));
    let config = config_for(&server);
    let report = run(&server, &config).unwrap();
    assert_eq!(report.realms, RealmOutcome::AlreadyActive);
    assert_eq!(server.state().count("PUT", "security/realms/active"), 0);
}

#[test]
fn http_e2e_rotation_after_manual_change() {
    let server = TestServer::start(NexusState::new().with_password("s3cret"));
    let config = config_for(&server);
    let report = run(&server, &config).unwrap();
    assert_eq!(report.rotation, RotationOutcome::AlreadyRotated);
    assert_ne!(server.state().password(), FACTORY_PASSWORD);
}

#[test]
fn http_e2e_wrong_operational_password_is_fatal() {
    let server = TestServer::start(NexusState::new().with_password("someone-else"));
    let config = config_for(&server);
    let err = run(&server, &config).unwrap_err();
    assert!(matches!(err, ProvisionError::UnexpectedStatus { status: 401, .. }));
    assert_eq!(server.state().count_method("POST"), 0);
}

#[test]
fn http_e2e_probe_waits_through_warmup() {
    let server = TestServer::start(NexusState::new().with_warmup(3));
    let config = config_for(&server);
    let api = client_for(&config);
    let ctx = Context::new(&api, server.url.clone()).with_probe_interval(Duration::from_millis(5));
    assert_eq!(wait_until_ready(&ctx), 3);
    assert_eq!(server.state().count("GET", "status"), 4);
}

#[test]
fn http_e2e_unknown_endpoint_is_reported_not_raised() {
    let server = TestServer::start(NexusState::new());
    let config = config_for(&server);
    let api = client_for(&config);
    let response = api.send(&ApiRequest::get("no/such/thing")).unwrap();
    assert_eq!(response.status, 404);
}
