pub mod http;
pub mod v1;

use crate::http::{Client as HttpClient, Request, RequestBuilder, Response};
use crate::v1::tournaments::TournamentsClient;

use hyper::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] hyper::Error),
    #[error(transparent)]
    InvalidRequest(#[from] hyper::http::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("bad status: {0}")]
    BadStatus(StatusCode),
}

/// A client for the fairway HTTP API.
#[derive(Clone, Debug, Default)]
pub struct Client {
    base_url: String,
    http: HttpClient,
}

impl Client {
    pub fn new<T>(base_url: T) -> Self
    where
        T: ToString,
    {
        Self {
            base_url: base_url.to_string(),
            http: HttpClient::default(),
        }
    }

    pub fn tournaments(&self) -> TournamentsClient<'_> {
        TournamentsClient::new(self)
    }

    pub(crate) fn request(&self) -> RequestBuilder {
        RequestBuilder::new(self.base_url.clone())
    }

    pub(crate) async fn send(&self, request: Request) -> Result<Response> {
        self.http.send(request).await
    }
}
