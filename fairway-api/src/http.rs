use hyper::body;
use hyper::client::HttpConnector;
use hyper::{Body, Method};
use hyper_tls::HttpsConnector;
use serde::de::DeserializeOwned;

use crate::Result;

/// The transport underneath [`Client`].
///
/// The fairway API is read-only, only `GET` requests are supported.
///
/// [`Client`]: crate::Client
#[derive(Clone, Debug)]
pub struct Client {
    inner: hyper::Client<HttpsConnector<HttpConnector>>,
}

impl Client {
    pub async fn send(&self, request: Request) -> Result<Response> {
        log::debug!("Sending request: {} {}", request.method, request.uri);

        let req = hyper::Request::builder()
            .method(request.method)
            .uri(request.uri)
            .body(Body::empty())?;

        let resp = self.inner.request(req).await?;

        Ok(Response { inner: resp })
    }
}

impl Default for Client {
    fn default() -> Self {
        Self {
            inner: hyper::Client::builder().build(HttpsConnector::new()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Request {
    uri: String,
    method: Method,
}

#[derive(Clone, Debug)]
pub struct RequestBuilder {
    inner: Request,
}

impl RequestBuilder {
    pub(crate) fn new(uri: String) -> Self {
        Self {
            inner: Request {
                uri,
                method: Method::GET,
            },
        }
    }

    /// Appends `path` to the request uri.
    pub fn uri(mut self, path: &str) -> Self {
        self.inner.uri.push_str(path);
        self
    }

    pub fn build(self) -> Request {
        self.inner
    }
}

#[derive(Debug)]
pub struct Response {
    inner: hyper::Response<Body>,
}

impl Response {
    pub fn status(&self) -> hyper::StatusCode {
        self.inner.status()
    }

    /// Returns `true` if the response contains a 2xx status code.
    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    pub async fn json<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let bytes = body::to_bytes(self.inner.into_body()).await?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}
