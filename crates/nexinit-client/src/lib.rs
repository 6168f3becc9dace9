//! Transport for the Nexus administrative REST API.
//!
//! This crate defines the `AdminApi` seam the provisioning core talks to, the
//! wire-level request/response types, and `HttpApi`, a blocking `ureq`
//! implementation that authenticates every call with HTTP basic auth.
//! Every HTTP status comes back as an `ApiResponse`; only failures to obtain a
//! response at all are reported as `ClientError`.

pub mod config;
pub mod http;

pub use config::ClientConfig;
pub use http::HttpApi;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Path prefix of every administrative endpoint.
pub const API_BASE_PATH: &str = "/service/rest/v1/";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {method} {url}: {message}")]
    Transport {
        method: Method,
        url: String,
        message: String,
    },
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        })
    }
}

/// Which admin password authenticates a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    /// The configured password (or the factory one if none is configured).
    Operational,
    /// The factory default; only used to rotate it away.
    FactoryDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Json(Vec<u8>),
    Text(String),
}

impl Body {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => "application/json",
            Self::Text(_) => "text/plain",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Json(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }
}

/// One call against the API, relative to [`API_BASE_PATH`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Body>,
    pub credential: Credential,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            credential: Credential::Operational,
        }
    }

    pub fn post_json(path: impl Into<String>, body: &impl Serialize) -> Result<Self, ClientError> {
        Ok(Self {
            method: Method::Post,
            path: path.into(),
            body: Some(Body::Json(serde_json::to_vec(body)?)),
            credential: Credential::Operational,
        })
    }

    pub fn put_json(path: impl Into<String>, body: &impl Serialize) -> Result<Self, ClientError> {
        Ok(Self {
            method: Method::Put,
            path: path.into(),
            body: Some(Body::Json(serde_json::to_vec(body)?)),
            credential: Credential::Operational,
        })
    }

    pub fn put_text(path: impl Into<String>, text: &str) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: Some(Body::Text(text.to_owned())),
            credential: Credential::Operational,
        }
    }

    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Decode the JSON body, for fakes and tests that inspect what was sent.
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        match &self.body {
            Some(Body::Json(bytes)) => serde_json::from_slice(bytes).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, truncated for error messages.
    pub fn snippet(&self) -> String {
        const MAX: usize = 200;
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if text.chars().count() > MAX {
            let cut: String = text.chars().take(MAX).collect();
            format!("{cut}…")
        } else {
            text.to_owned()
        }
    }
}

/// The administrative API as seen by the provisioning core.
pub trait AdminApi: Send + Sync {
    /// Perform one call. Non-2xx statuses are returned, not raised.
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError>;
}

impl<T: AdminApi + ?Sized> AdminApi for &T {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        (**self).send(request)
    }
}
