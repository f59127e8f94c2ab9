use reqwest::{Client, StatusCode};
use snafu::{ResultExt as _, Snafu, ensure};
use tracing::{debug, info};

use crate::USER_AGENT;

/// Namespace of the trend annotations in the trending-searches feed.
pub const TRENDS_NS: &str = "https://trends.google.com/trending/rss";

#[derive(Debug, Snafu)]
pub enum FeedError {
    #[snafu(display("Feed request failed: {source}"))]
    Http { source: reqwest::Error },
    #[snafu(display("Feed returned HTTP {status}"))]
    Status { status: StatusCode },
    #[snafu(display("Feed is not well-formed XML: {source}"))]
    Xml { source: roxmltree::Error },
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;

pub async fn fetch_feed(client: &Client, url: &str) -> FeedResult<String> {
    info!(url = %url, "Fetching feed");

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .context(HttpSnafu)?;

    let status = response.status();
    ensure!(status == StatusCode::OK, StatusSnafu { status });

    response.text().await.context(HttpSnafu)
}

/// Article links under `channel/item/ht:news_item/ht:news_item_url`, in
/// document order.
pub fn parse_news_urls(xml: &str) -> FeedResult<Vec<String>> {
    let doc = roxmltree::Document::parse(xml).context(XmlSnafu)?;

    let urls: Vec<String> = doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name("channel"))
        .flat_map(|channel| channel.children().filter(|n| n.has_tag_name("item")))
        .flat_map(|item| {
            item.children()
                .filter(|n| n.has_tag_name((TRENDS_NS, "news_item")))
        })
        .filter_map(|news_item| {
            news_item
                .children()
                .find(|n| n.has_tag_name((TRENDS_NS, "news_item_url")))
        })
        .filter_map(|url| url.text())
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    debug!(count = urls.len(), "Parsed feed");
    Ok(urls)
}
