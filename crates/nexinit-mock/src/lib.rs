//! In-memory stand-in for the Nexus administrative REST API.
//!
//! Models the subset of `/service/rest/v1/` that nexinit drives: server status
//! (with an optional number of warm-up `503` answers), the admin password
//! change, active realms, file blob stores, and docker/raw repositories.
//! Every call except `status` must carry basic auth for `admin` with the
//! current password. List-valued updates replace the stored list wholesale,
//! as the real server does.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info};

pub const API_PREFIX: &str = "/service/rest/v1/";
pub const ADMIN_USER: &str = "admin";
pub const FACTORY_PASSWORD: &str = "admin123";

/// Realms active on a fresh server.
pub const DEFAULT_REALMS: [&str; 2] = ["NexusAuthenticatingRealm", "NexusAuthorizingRealm"];

/// One request as the server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path relative to [`API_PREFIX`].
    pub path: String,
}

struct Inner {
    password: String,
    warmup_remaining: u32,
    realms: Vec<String>,
    blob_stores: BTreeMap<String, Value>,
    /// Keyed by `(format/type, name)`, e.g. `("docker/group", "dockerGroup")`.
    repositories: BTreeMap<(String, String), Value>,
    log: Vec<RecordedRequest>,
}

/// Server-side state shared between the HTTP loop and test assertions.
pub struct NexusState {
    inner: Mutex<Inner>,
}

impl Default for NexusState {
    fn default() -> Self {
        Self::new()
    }
}

impl NexusState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                password: FACTORY_PASSWORD.to_owned(),
                warmup_remaining: 0,
                realms: DEFAULT_REALMS.iter().map(|r| (*r).to_owned()).collect(),
                blob_stores: BTreeMap::new(),
                repositories: BTreeMap::new(),
                log: Vec::new(),
            }),
        }
    }

    /// Answer the next `warmup` status probes with `503`.
    #[must_use]
    pub fn with_warmup(self, warmup: u32) -> Self {
        self.lock().warmup_remaining = warmup;
        self
    }

    #[must_use]
    pub fn with_password(self, password: &str) -> Self {
        password.clone_into(&mut self.lock().password);
        self
    }

    #[must_use]
    pub fn with_realms(self, realms: &[&str]) -> Self {
        self.lock().realms = realms.iter().map(|r| (*r).to_owned()).collect();
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("mock state lock poisoned")
    }

    pub fn password(&self) -> String {
        self.lock().password.clone()
    }

    pub fn realms(&self) -> Vec<String> {
        self.lock().realms.clone()
    }

    pub fn blob_store(&self, name: &str) -> Option<Value> {
        self.lock().blob_stores.get(name).cloned()
    }

    /// Stored definition of `repositories/{format_type}/{name}`.
    pub fn repository(&self, format_type: &str, name: &str) -> Option<Value> {
        self.lock()
            .repositories
            .get(&(format_type.to_owned(), name.to_owned()))
            .cloned()
    }

    /// Store a repository directly, bypassing the API.
    pub fn insert_repository(&self, format_type: &str, definition: Value) {
        let name = definition["name"].as_str().unwrap_or_default().to_owned();
        self.lock()
            .repositories
            .insert((format_type.to_owned(), name), definition);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().log.clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn count_method(&self, method: &str) -> usize {
        self.lock().log.iter().filter(|r| r.method == method).count()
    }
}

/// An administrative endpoint, parsed from a path relative to [`API_PREFIX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Status,
    ChangePassword { user: &'a str },
    ActiveRealms,
    BlobStoreQuota { name: &'a str },
    FileBlobStores,
    /// `repositories/{format}/{type}` or `repositories/{format}/{type}/{name}`.
    Repository {
        format_type: &'a str,
        name: Option<&'a str>,
    },
}

pub fn parse_route(path: &str) -> Option<Route<'_>> {
    let path = path.split('?').next().unwrap_or(path).trim_end_matches('/');
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        ["status"] => Some(Route::Status),
        ["security", "users", user, "change-password"] => {
            Some(Route::ChangePassword { user: *user })
        }
        ["security", "realms", "active"] => Some(Route::ActiveRealms),
        ["blobstores", "file"] => Some(Route::FileBlobStores),
        ["blobstores", name, "quota-status"] => Some(Route::BlobStoreQuota { name: *name }),
        ["repositories", format, kind] => Some(Route::Repository {
            format_type: format_type(path, format, kind),
            name: None,
        }),
        ["repositories", format, kind, name] => Some(Route::Repository {
            format_type: format_type(path, format, kind),
            name: Some(*name),
        }),
        _ => None,
    }
}

/// The `{format}/{type}` slice of a `repositories/...` path.
fn format_type<'a>(path: &'a str, format: &str, kind: &str) -> &'a str {
    let start = "repositories/".len();
    &path[start..start + format.len() + 1 + kind.len()]
}

fn is_known_format_type(format_type: &str) -> bool {
    matches!(
        format_type,
        "docker/hosted" | "docker/group" | "docker/proxy" | "raw/hosted"
    )
}

/// Whether `header` is basic auth for the admin user with `password`.
pub fn is_authorized(header: Option<&str>, password: &str) -> bool {
    let Some(encoded) = header.and_then(|h| h.strip_prefix("Basic ")) else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    decoded == format!("{ADMIN_USER}:{password}").as_bytes()
}

/// Status and optional JSON body produced by [`dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl MockResponse {
    fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "message": message }))
    }
}

/// Apply one request to `state` and produce the answer.
///
/// `path` is relative to [`API_PREFIX`]; `auth` is the raw `Authorization` header.
pub fn dispatch(
    state: &NexusState,
    method: &Method,
    path: &str,
    auth: Option<&str>,
    body: &[u8],
) -> MockResponse {
    let mut inner = state.lock();
    inner.log.push(RecordedRequest {
        method: method.to_string(),
        path: path.to_owned(),
    });

    let Some(route) = parse_route(path) else {
        return MockResponse::error(404, "not found");
    };

    if route == Route::Status {
        return match *method {
            Method::Get if inner.warmup_remaining > 0 => {
                inner.warmup_remaining -= 1;
                MockResponse::empty(503)
            }
            Method::Get => MockResponse::empty(200),
            _ => MockResponse::error(405, "method not allowed"),
        };
    }

    if !is_authorized(auth, &inner.password) {
        return MockResponse::empty(401);
    }

    match (route, method) {
        (Route::ChangePassword { user }, Method::Put) => {
            if user != ADMIN_USER {
                return MockResponse::error(404, "user not found");
            }
            let Ok(new_password) = std::str::from_utf8(body) else {
                return MockResponse::error(400, "password must be text");
            };
            if new_password.is_empty() {
                return MockResponse::error(400, "password required");
            }
            new_password.clone_into(&mut inner.password);
            info!("admin password changed");
            MockResponse::empty(204)
        }
        (Route::ActiveRealms, Method::Get) => {
            MockResponse::json(200, json!(inner.realms.clone()))
        }
        (Route::ActiveRealms, Method::Put) => match serde_json::from_slice::<Vec<String>>(body) {
            Ok(realms) => {
                info!("active realms set to {realms:?}");
                inner.realms = realms;
                MockResponse::empty(204)
            }
            Err(e) => MockResponse::error(400, &format!("invalid realm list: {e}")),
        },
        (Route::BlobStoreQuota { name }, Method::Get) => {
            if inner.blob_stores.contains_key(name) {
                MockResponse::json(
                    200,
                    json!({ "isViolation": false, "message": "", "blobStoreName": name }),
                )
            } else {
                MockResponse::error(404, "blob store not found")
            }
        }
        (Route::FileBlobStores, Method::Post) => {
            let Some((name, definition)) = named_definition(body) else {
                return MockResponse::error(400, "blob store definition requires a name");
            };
            if inner.blob_stores.contains_key(&name) {
                return MockResponse::error(400, "blob store already exists");
            }
            info!("created blob store {name}");
            inner.blob_stores.insert(name, definition);
            MockResponse::empty(204)
        }
        (Route::Repository { format_type, .. }, _) if !is_known_format_type(format_type) => {
            MockResponse::error(404, "unknown repository format")
        }
        (
            Route::Repository {
                format_type,
                name: Some(name),
            },
            Method::Get,
        ) => match inner
            .repositories
            .get(&(format_type.to_owned(), name.to_owned()))
        {
            Some(definition) => MockResponse::json(200, definition.clone()),
            None => MockResponse::error(404, "repository not found"),
        },
        (
            Route::Repository {
                format_type,
                name: None,
            },
            Method::Post,
        ) => {
            let Some((name, definition)) = named_definition(body) else {
                return MockResponse::error(400, "repository definition requires a name");
            };
            if inner.repositories.keys().any(|(_, existing)| *existing == name) {
                return MockResponse::error(400, "repository name already in use");
            }
            info!("created {format_type} repository {name}");
            inner
                .repositories
                .insert((format_type.to_owned(), name), definition);
            MockResponse::empty(201)
        }
        (
            Route::Repository {
                format_type,
                name: Some(name),
            },
            Method::Put,
        ) => {
            let key = (format_type.to_owned(), name.to_owned());
            if !inner.repositories.contains_key(&key) {
                return MockResponse::error(404, "repository not found");
            }
            match serde_json::from_slice::<Value>(body) {
                Ok(definition) => {
                    info!("updated {format_type} repository {name}");
                    inner.repositories.insert(key, definition);
                    MockResponse::empty(204)
                }
                Err(e) => MockResponse::error(400, &format!("invalid definition: {e}")),
            }
        }
        _ => MockResponse::error(405, "method not allowed"),
    }
}

fn named_definition(body: &[u8]) -> Option<(String, Value)> {
    let definition: Value = serde_json::from_slice(body).ok()?;
    let name = definition.get("name")?.as_str()?.to_owned();
    if name.is_empty() {
        return None;
    }
    Some((name, definition))
}

fn read_body(req: &mut tiny_http::Request) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    if req.as_reader().read_to_end(&mut body).is_ok() {
        Some(body)
    } else {
        None
    }
}

fn respond(req: tiny_http::Request, response: MockResponse) {
    let status = StatusCode(response.status);
    let result = match response.body {
        Some(body) => {
            let header =
                Header::from_bytes("Content-Type", "application/json").expect("valid header");
            req.respond(
                Response::from_data(body.to_string().into_bytes())
                    .with_status_code(status)
                    .with_header(header),
            )
        }
        None => req.respond(Response::empty(status)),
    };
    if let Err(e) = result {
        debug!("failed to send response: {e}");
    }
}

/// Handle a single HTTP request against `state`.
pub fn handle_request(state: &NexusState, mut req: tiny_http::Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    let Some(path) = url.strip_prefix(API_PREFIX) else {
        respond(req, MockResponse::error(404, "not found"));
        return;
    };
    let path = path.to_owned();
    let auth = req
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .map(|h| h.value.as_str().to_owned());
    let Some(body) = read_body(&mut req) else {
        respond(req, MockResponse::error(500, "read error"));
        return;
    };

    let response = dispatch(state, &method, &path, auth.as_deref(), &body);
    respond(req, response);
}

/// Start the server loop, blocking the current thread.
pub fn run_server(
    state: &NexusState,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let server = Server::http(addr)?;
    for request in server.incoming_requests() {
        handle_request(state, request);
    }
    Ok(())
}

/// Mock server on a random port, served from a background thread.
///
/// The server listens on `127.0.0.1:{port}`. Dropping the `TestServer` stops it.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    state: Arc<NexusState>,
    server: Arc<Server>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl TestServer {
    pub fn start(state: NexusState) -> Self {
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}");

        let state = Arc::new(state);
        let srv = Arc::clone(&server);
        let shared = Arc::clone(&state);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&shared, request);
            }
        });

        Self {
            url,
            port,
            state,
            server,
            handle: Some(handle),
        }
    }

    pub fn state(&self) -> &NexusState {
        &self.state
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
