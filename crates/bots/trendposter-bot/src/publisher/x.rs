use std::path::Path;

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use snafu::ResultExt as _;
use tracing::info;

use super::oauth1::{self, Keys};
use super::{
    HttpSnafu, PublishResult, PublishedPost, Publisher, check_status, file_name, non_empty_id,
    read_image,
};
use crate::credentials::SourceTag;

const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";
const TWEETS_URL: &str = "https://api.twitter.com/2/tweets";
const PLATFORM: SourceTag = SourceTag::X;

#[derive(Debug, Deserialize)]
struct MediaResponse {
    media_id_string: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: Option<TweetData>,
}

/// Image tweets: media upload followed by a tweet referencing it.
pub struct XPublisher {
    client: Client,
    keys: Keys,
}

impl XPublisher {
    pub fn new(client: Client, keys: Keys) -> Self {
        Self { client, keys }
    }

    fn authorization(&self, url: &str) -> String {
        oauth1::authorization(
            &self.keys,
            "POST",
            url,
            &[],
            &oauth1::nonce(),
            oauth1::timestamp(),
        )
    }

    async fn upload_media(&self, image: &Path) -> PublishResult<String> {
        let bytes = read_image(image).await?;
        let form = Form::new().part("media", Part::bytes(bytes).file_name(file_name(image)));

        let response = self
            .client
            .post(MEDIA_UPLOAD_URL)
            .header(AUTHORIZATION, self.authorization(MEDIA_UPLOAD_URL))
            .multipart(form)
            .send()
            .await
            .context(HttpSnafu { platform: PLATFORM })?;
        let media: MediaResponse = check_status(PLATFORM, response)
            .await?
            .json()
            .await
            .context(HttpSnafu { platform: PLATFORM })?;

        non_empty_id(PLATFORM, "media_id_string", media.media_id_string)
    }
}

#[async_trait::async_trait]
impl Publisher for XPublisher {
    fn tag(&self) -> SourceTag {
        PLATFORM
    }

    async fn publish(&self, image: &Path, caption: &str) -> PublishResult<PublishedPost> {
        let media_id = self.upload_media(image).await?;

        let response = self
            .client
            .post(TWEETS_URL)
            .header(AUTHORIZATION, self.authorization(TWEETS_URL))
            .json(&json!({
                "text": caption,
                "media": { "media_ids": [media_id] },
            }))
            .send()
            .await
            .context(HttpSnafu { platform: PLATFORM })?;
        let tweet: TweetResponse = check_status(PLATFORM, response)
            .await?
            .json()
            .await
            .context(HttpSnafu { platform: PLATFORM })?;

        let id = non_empty_id(PLATFORM, "data.id", tweet.data.and_then(|d| d.id))?;
        let url = format!("https://x.com/user/status/{id}");
        info!(url = %url, "Posted tweet");

        Ok(PublishedPost { id, url })
    }
}
