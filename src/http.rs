//! Thin wrapper over a shared reqwest client that turns HTTP failures into
//! errors carrying the URL and response body.

use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP request to {url} failed")]
    Request {
        url: String,
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status} with body: {body}")]
    ResponseError {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("{url} returned success, but had malformed JSON response: {body}")]
    BadResponseJson {
        url: String,
        body: String,
        source: serde_json::Error,
    },

    #[error("{url} returned an empty body")]
    EmptyBody { url: String },

    #[error("{url} did not return an image")]
    NotAnImage { url: String },

    #[error("Could not build HTTP client")]
    Client(#[source] reqwest::Error),
}

impl HttpError {
    /// The HTTP status of a non-success response, if this error came from one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::ResponseError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server rejected the identifier embedded in the request.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::NOT_FOUND) | Some(StatusCode::BAD_REQUEST)
        )
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, HttpError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(HttpError::Client)?;

        Ok(Self { client })
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        debug!("Loading {}", url);

        let body = self.execute(self.client.get(url), url).await?;
        if body.is_empty() {
            return Err(HttpError::EmptyBody {
                url: url.to_owned(),
            });
        }

        Ok(body)
    }

    /// Like [`HttpClient::get_bytes`], but rejects bodies that aren't in a
    /// recognised image format.
    pub async fn get_image(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let body = self.get_bytes(url).await?;

        match image::guess_format(&body) {
            Ok(format) => {
                log::trace!("{} returned {:?} image", url, format);
                Ok(body)
            }
            Err(_) => Err(HttpError::NotAnImage {
                url: url.to_owned(),
            }),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        debug!("Loading {}", url);

        let body = self.execute(self.client.get(url), url).await?;
        parse_json(url, body)
    }

    pub async fn post_json<B, T>(&self, url: &str, payload: &B) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("Posting to {}", url);

        let body = self.execute(self.client.post(url).json(payload), url).await?;
        parse_json(url, body)
    }

    async fn execute(&self, request: RequestBuilder, url: &str) -> Result<Vec<u8>, HttpError> {
        let request_error = |source| HttpError::Request {
            url: url.to_owned(),
            source,
        };

        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(request_error)?;

        // Errors are reported through HTTP status codes, handled here.
        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(HttpError::ResponseError {
                url: url.to_owned(),
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        }
    }
}

fn parse_json<T: DeserializeOwned>(url: &str, body: Vec<u8>) -> Result<T, HttpError> {
    serde_json::from_slice(&body).map_err(|source| HttpError::BadResponseJson {
        url: url.to_owned(),
        body: String::from_utf8_lossy(&body).into_owned(),
        source,
    })
}
