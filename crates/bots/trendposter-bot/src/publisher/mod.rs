//! Publish backends, one per platform. Each uploads a local image with a
//! caption and returns the id of the created post.

mod facebook;
mod instagram;
pub mod oauth1;
mod x;

use std::path::{Path, PathBuf};

use reqwest::{Client, StatusCode};
use snafu::Snafu;

use crate::credentials::{Credential, SourceTag};

pub use self::facebook::FacebookPublisher;
pub use self::instagram::InstagramPublisher;
pub use self::x::XPublisher;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PublishError {
    #[snafu(display("{platform} request failed: {source}"))]
    Http {
        platform: SourceTag,
        source: reqwest::Error,
    },
    #[snafu(display("Failed to read image {}: {source}", path.display()))]
    ReadImage {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("{platform} returned HTTP {status}: {body}"))]
    Status {
        platform: SourceTag,
        status: StatusCode,
        body: String,
    },
    #[snafu(display("{platform} response has no `{field}`"))]
    MissingField {
        platform: SourceTag,
        field: &'static str,
    },
    #[snafu(display("{platform} login failed: {reason}"))]
    Login { platform: SourceTag, reason: String },
}

pub type PublishResult<T> = std::result::Result<T, PublishError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: String,
    pub url: String,
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    fn tag(&self) -> SourceTag;

    async fn publish(&self, image: &Path, caption: &str) -> PublishResult<PublishedPost>;
}

/// Creates the backend for a credential.
pub trait PublisherFactory: Send + Sync {
    fn publisher(&self, credential: &Credential) -> Box<dyn Publisher>;
}

/// Real backends sharing one HTTP client.
pub struct HttpPublishers {
    client: Client,
}

impl HttpPublishers {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl PublisherFactory for HttpPublishers {
    fn publisher(&self, credential: &Credential) -> Box<dyn Publisher> {
        let client = self.client.clone();
        match credential.clone() {
            Credential::Instagram { username, password } => {
                Box::new(InstagramPublisher::new(client, username, password))
            }
            Credential::Facebook { page_id, token } => {
                Box::new(FacebookPublisher::new(client, page_id, token))
            }
            Credential::X {
                key,
                key_secret,
                access_token,
                access_token_secret,
                bearer_token: _,
            } => Box::new(XPublisher::new(
                client,
                oauth1::Keys {
                    consumer_key: key,
                    consumer_secret: key_secret,
                    token: access_token,
                    token_secret: access_token_secret,
                },
            )),
        }
    }
}

/// Turn a non-success response into [`PublishError::Status`].
pub(crate) async fn check_status(
    platform: SourceTag,
    response: reqwest::Response,
) -> PublishResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    StatusSnafu {
        platform,
        status,
        body,
    }
    .fail()
}

pub(crate) async fn read_image(path: &Path) -> PublishResult<Vec<u8>> {
    use snafu::ResultExt as _;
    tokio::fs::read(path).await.context(ReadImageSnafu { path })
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "poster.jpg".to_owned())
}

/// Reject empty ids, which some endpoints return on soft failures.
pub(crate) fn non_empty_id(
    platform: SourceTag,
    field: &'static str,
    id: Option<String>,
) -> PublishResult<String> {
    match id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => MissingFieldSnafu { platform, field }.fail(),
    }
}
