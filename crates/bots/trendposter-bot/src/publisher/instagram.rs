//! Instagram photo posts through the mobile app API.
//!
//! Every publish logs in from scratch and logs out afterwards; sessions are
//! never persisted.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng as _;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use snafu::ResultExt as _;
use tracing::{debug, info};
use trendposter_util_error::FmtCompact as _;
use uuid::Uuid;

use super::{
    HttpSnafu, LoginSnafu, PublishResult, PublishedPost, Publisher, check_status, non_empty_id,
    read_image,
};
use crate::credentials::SourceTag;

const API: &str = "https://i.instagram.com/api/v1";
const UPLOAD_URL: &str = "https://i.instagram.com/rupload_igphoto";
const APP_ID: &str = "567067343352427";
const APP_USER_AGENT: &str = "Instagram 269.0.0.18.75 Android (26/8.0.0; 480dpi; 1080x1920; \
                              OnePlus; 6T Dev; devitron; qcom; en_US; 314665256)";
const PLATFORM: SourceTag = SourceTag::Instagram;

#[derive(Debug, Deserialize)]
struct ConfiguredMedia {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigureResponse {
    media: Option<ConfiguredMedia>,
}

struct Session {
    authorization: HeaderValue,
    device_id: String,
    uuid: String,
}

pub struct InstagramPublisher {
    client: Client,
    username: String,
    password: String,
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn signed_body(payload: &Value) -> [(&'static str, String); 1] {
    [("signed_body", format!("SIGNATURE.{payload}"))]
}

impl InstagramPublisher {
    pub fn new(client: Client, username: String, password: String) -> Self {
        Self {
            client,
            username,
            password,
        }
    }

    fn app_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));
        headers.insert("X-IG-App-ID", HeaderValue::from_static(APP_ID));
        headers
    }

    fn post(&self, url: String, session: Option<&Session>) -> RequestBuilder {
        let request = self.client.post(url).headers(Self::app_headers());
        match session {
            Some(session) => request.header(AUTHORIZATION, session.authorization.clone()),
            None => request,
        }
    }

    async fn login(&self) -> PublishResult<Session> {
        let uuid = Uuid::new_v4().to_string();
        let device_id = format!("android-{}", &Uuid::new_v4().simple().to_string()[..16]);
        let payload = json!({
            "username": self.username,
            "enc_password": format!("#PWD_INSTAGRAM:0:{}:{}", unix_secs(), self.password),
            "guid": uuid,
            "phone_id": Uuid::new_v4().to_string(),
            "device_id": device_id,
            "login_attempt_count": "0",
        });

        let response = self
            .post(format!("{API}/accounts/login/"), None)
            .form(&signed_body(&payload))
            .send()
            .await
            .context(HttpSnafu { platform: PLATFORM })?;
        let response = check_status(PLATFORM, response).await?;

        let authorization = response
            .headers()
            .get("ig-set-authorization")
            .filter(|v| v.to_str().is_ok_and(|s| !s.is_empty() && !s.ends_with(':')))
            .cloned();
        let Some(authorization) = authorization else {
            return LoginSnafu {
                platform: PLATFORM,
                reason: "no authorization token in response",
            }
            .fail();
        };

        debug!(username = %self.username, "Logged in to Instagram");
        Ok(Session {
            authorization,
            device_id,
            uuid,
        })
    }

    async fn upload_photo(&self, session: &Session, image: &Path) -> PublishResult<String> {
        let bytes = read_image(image).await?;
        let upload_id = unix_millis().to_string();
        let entity_name = format!(
            "{upload_id}_0_{}",
            rand::rng().random_range(1_000_000_000u64..10_000_000_000)
        );
        let params = json!({
            "retry_context": r#"{"num_step_auto_retry":0,"num_reupload":0,"num_step_manual_retry":0}"#,
            "media_type": "1",
            "xsharing_user_ids": "[]",
            "upload_id": upload_id,
            "image_compression": r#"{"lib_name":"moz","lib_version":"3.1.m","quality":"80"}"#,
        });

        let response = self
            .post(format!("{UPLOAD_URL}/{entity_name}"), Some(session))
            .header("X-Instagram-Rupload-Params", params.to_string())
            .header("X-Entity-Name", entity_name.as_str())
            .header("X-Entity-Length", bytes.len().to_string())
            .header("X-Entity-Type", "image/jpeg")
            .header("Offset", "0")
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .context(HttpSnafu { platform: PLATFORM })?;
        check_status(PLATFORM, response).await?;

        Ok(upload_id)
    }

    async fn configure(
        &self,
        session: &Session,
        upload_id: &str,
        caption: &str,
    ) -> PublishResult<String> {
        let payload = json!({
            "upload_id": upload_id,
            "caption": caption,
            "source_type": "4",
            "media_folder": "Camera",
            "device_id": session.device_id,
            "_uuid": session.uuid,
        });

        let response = self
            .post(format!("{API}/media/configure/"), Some(session))
            .form(&signed_body(&payload))
            .send()
            .await
            .context(HttpSnafu { platform: PLATFORM })?;
        let configured: ConfigureResponse = check_status(PLATFORM, response)
            .await?
            .json()
            .await
            .context(HttpSnafu { platform: PLATFORM })?;

        non_empty_id(
            PLATFORM,
            "media.code",
            configured.media.and_then(|m| m.code),
        )
    }

    async fn logout(&self, session: &Session) {
        let payload = json!({
            "_uuid": session.uuid,
            "device_id": session.device_id,
            "one_tap_app_login": true,
        });
        let result = self
            .post(format!("{API}/accounts/logout/"), Some(session))
            .form(&signed_body(&payload))
            .send()
            .await;
        if let Err(err) = result {
            debug!(err = %err.fmt_compact(), "Instagram logout failed");
        }
    }
}

#[async_trait::async_trait]
impl Publisher for InstagramPublisher {
    fn tag(&self) -> SourceTag {
        PLATFORM
    }

    async fn publish(&self, image: &Path, caption: &str) -> PublishResult<PublishedPost> {
        let session = self.login().await?;

        let result = async {
            let upload_id = self.upload_photo(&session, image).await?;
            self.configure(&session, &upload_id, caption).await
        }
        .await;
        self.logout(&session).await;

        let code = result?;
        info!(username = %self.username, code = %code, "Uploaded photo to Instagram");
        Ok(PublishedPost {
            url: format!("https://instagram.com/p/{code}"),
            id: code,
        })
    }
}
