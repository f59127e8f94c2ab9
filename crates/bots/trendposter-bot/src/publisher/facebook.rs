use std::path::Path;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use snafu::ResultExt as _;
use tracing::info;

use super::{
    HttpSnafu, PublishResult, PublishedPost, Publisher, check_status, file_name, non_empty_id,
    read_image,
};
use crate::credentials::SourceTag;

const GRAPH_API: &str = "https://graph.facebook.com/v20.0";
const DEFAULT_CAPTION: &str = "Upload foto";
const PLATFORM: SourceTag = SourceTag::Facebook;

#[derive(Debug, Deserialize)]
struct PhotoResponse {
    id: Option<String>,
}

/// Photo posts on a Facebook Page through the Graph API.
pub struct FacebookPublisher {
    client: Client,
    page_id: String,
    token: String,
}

impl FacebookPublisher {
    pub fn new(client: Client, page_id: String, token: String) -> Self {
        Self {
            client,
            page_id,
            token,
        }
    }
}

#[async_trait::async_trait]
impl Publisher for FacebookPublisher {
    fn tag(&self) -> SourceTag {
        PLATFORM
    }

    async fn publish(&self, image: &Path, caption: &str) -> PublishResult<PublishedPost> {
        let bytes = read_image(image).await?;
        let part = Part::bytes(bytes)
            .file_name(file_name(image))
            .mime_str("image/jpeg")
            .context(HttpSnafu { platform: PLATFORM })?;

        let caption = if caption.is_empty() {
            DEFAULT_CAPTION
        } else {
            caption
        };
        let form = Form::new()
            .text("caption", caption.to_owned())
            .text("access_token", self.token.clone())
            .part("source", part);

        let response = self
            .client
            .post(format!("{GRAPH_API}/{}/photos", self.page_id))
            .multipart(form)
            .send()
            .await
            .context(HttpSnafu { platform: PLATFORM })?;
        let response: PhotoResponse = check_status(PLATFORM, response)
            .await?
            .json()
            .await
            .context(HttpSnafu { platform: PLATFORM })?;

        let id = non_empty_id(PLATFORM, "id", response.id)?;
        info!(page_id = %self.page_id, post_id = %id, "Uploaded photo to Facebook page");

        Ok(PublishedPost {
            url: format!("https://fb.com/{id}"),
            id,
        })
    }
}
