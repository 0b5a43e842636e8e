//! Request / response model and the network seam.
//!
//! The worker and the version endpoint only ever talk to the network through
//! [`Network`]; [`HttpNetwork`] is the reqwest-backed implementation used in
//! production, tests substitute scripted fakes.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::NetworkError;

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }
}

/// Request mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level page navigation
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    NoCors,
}

/// Fetch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Absolute request URL
    pub url: String,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub mode: RequestMode,
}

impl Request {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers: BTreeMap::new(),
            body: None,
            mode: RequestMode::Cors,
        }
    }

    /// Create a navigation request
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Key under which the request is stored in a cache namespace.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.method.as_str(), self.url)
    }
}

/// Fetch response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL after redirects (empty for synthesized responses)
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    /// Create a new response
    pub fn new(status: u16) -> Self {
        Self {
            url: String::new(),
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Network error response (status 0)
    pub fn error() -> Self {
        Self::new(0)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Check if response is OK
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_error(&self) -> bool {
        self.status == 0
    }

    pub fn size(&self) -> usize {
        self.body.len() + self.headers.iter().map(|(k, v)| k.len() + v.len()).sum::<usize>()
    }
}

/// `scheme://host[:port]` of an absolute URL, `None` for relative URLs.
pub fn url_origin(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(&url[..scheme_end + 3 + host_end])
}

/// Path component of a URL without query or fragment.
pub fn url_path(url: &str) -> &str {
    let after_origin = match url_origin(url) {
        Some(origin) => &url[origin.len()..],
        None => url,
    };
    let end = after_origin.find(['?', '#']).unwrap_or(after_origin.len());
    match &after_origin[..end] {
        "" => "/",
        path => path,
    }
}

/// Whether `url` belongs to `origin`. Relative URLs always do.
pub fn is_same_origin(url: &str, origin: &str) -> bool {
    match url_origin(url) {
        Some(o) => o.eq_ignore_ascii_case(origin.trim_end_matches('/')),
        None => true,
    }
}

/// Network seam.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// reqwest-backed network.
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let mut out = Response::new(response.status().as_u16()).with_url(response.url().as_str());
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                out.headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        out.body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();
        Ok(out)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout
    } else if e.is_builder() {
        NetworkError::InvalidRequest(e.to_string())
    } else {
        NetworkError::Transport(e.to_string())
    }
}
