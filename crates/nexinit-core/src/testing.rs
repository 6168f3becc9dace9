//! Closure-backed `AdminApi` fake for unit tests.

use nexinit_client::{AdminApi, ApiRequest, ApiResponse, ClientError, Method};
use serde::Serialize;
use std::sync::Mutex;

/// A response carrying `value` as its JSON body.
pub fn json_response(status: u16, value: &impl Serialize) -> ApiResponse {
    ApiResponse {
        status,
        body: serde_json::to_vec(value).unwrap(),
    }
}

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, ClientError> + Send + Sync;

pub struct FnApi {
    handler: Box<Handler>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FnApi {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, ClientError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn refused() -> ClientError {
        ClientError::Transport {
            method: Method::Get,
            url: "http://127.0.0.1:1/service/rest/v1/status".to_owned(),
            message: "connection refused".to_owned(),
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn count_method(&self, method: Method) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

impl AdminApi for FnApi {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}
