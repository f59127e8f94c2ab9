use std::time::Duration;

use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use snafu::{ResultExt as _, Snafu, ensure};
use tracing::debug;
use trendposter_ledger::{ArticleMeta, ScrapedArticle};
use trendposter_text::clean_text;

use crate::USER_AGENT;

/// Paragraphs must be longer than this (in characters) to be kept.
pub const MIN_PARAGRAPH_CHARS: usize = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Snafu)]
pub enum ScrapeError {
    #[snafu(display("Failed to build HTTP client: {source}"))]
    Client { source: reqwest::Error },
    #[snafu(display("HTTP request failed: {source}"))]
    Http { source: reqwest::Error },
    #[snafu(display("{url} returned HTTP {status}"))]
    Status { url: String, status: StatusCode },
    #[snafu(display("Invalid selector {selector}"))]
    Selector { selector: &'static str },
}

pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;

/// Access to article pages and the images they reference.
#[async_trait::async_trait]
pub trait WebSource: Send + Sync {
    async fn scrape_article(&self, url: &str) -> ScrapeResult<ScrapedArticle>;

    async fn fetch_bytes(&self, url: &str) -> ScrapeResult<Vec<u8>>;
}

pub struct HttpWebSource {
    client: Client,
}

impl HttpWebSource {
    pub fn new() -> ScrapeResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context(ClientSnafu)?;

        Ok(Self { client })
    }

    async fn get_ok(&self, url: &str) -> ScrapeResult<reqwest::Response> {
        let response = self.client.get(url).send().await.context(HttpSnafu)?;
        let status = response.status();
        ensure!(status == StatusCode::OK, StatusSnafu { url, status });
        Ok(response)
    }
}

#[async_trait::async_trait]
impl WebSource for HttpWebSource {
    async fn scrape_article(&self, url: &str) -> ScrapeResult<ScrapedArticle> {
        let html = self
            .get_ok(url)
            .await?
            .text()
            .await
            .context(HttpSnafu)?;
        parse_article(url, &html)
    }

    async fn fetch_bytes(&self, url: &str) -> ScrapeResult<Vec<u8>> {
        let bytes = self
            .get_ok(url)
            .await?
            .bytes()
            .await
            .context(HttpSnafu)?;
        Ok(bytes.to_vec())
    }
}

fn selector(selector: &'static str) -> ScrapeResult<Selector> {
    Selector::parse(selector).map_err(|_| ScrapeError::Selector { selector })
}

/// Extract title, long paragraphs and Open Graph properties from a page.
pub fn parse_article(url: &str, html: &str) -> ScrapeResult<ScrapedArticle> {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("title")?)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let paragraphs: Vec<String> = document
        .select(&selector("p")?)
        .map(|p| clean_text(&p.text().collect::<String>()))
        .filter(|text| MIN_PARAGRAPH_CHARS < text.chars().count())
        .collect();

    let og = |property: &'static str| -> ScrapeResult<Option<String>> {
        Ok(document
            .select(&selector(property)?)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(clean_text))
    };
    let meta = ArticleMeta {
        og_title: og(r#"meta[property="og:title"]"#)?,
        og_image: og(r#"meta[property="og:image"]"#)?,
        og_description: og(r#"meta[property="og:description"]"#)?,
    };

    debug!(
        url = %url,
        paragraphs = paragraphs.len(),
        has_image = meta.og_image.is_some(),
        "Parsed article page"
    );

    Ok(ScrapedArticle {
        link: url.to_owned(),
        title,
        paragraphs,
        meta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html>
<head>
  <title>  Harga   Emas Naik – Hari Ini </title>
  <meta property="og:title" content="Harga Emas Naik">
  <meta property="og:image" content="https://img.test/emas.jpg">
</head>
<body>
  <p>Short teaser.</p>
  <p>Harga emas batangan naik tajam pada perdagangan hari ini, menurut <b>data</b> resmi.</p>
  <div><p>Para analis memperkirakan kenaikan akan berlanjut hingga akhir pekan depan.</p></div>
</body>
</html>"#;

    #[test]
    fn extracts_title_paragraphs_and_meta() {
        let article = parse_article("https://news.test/emas", PAGE).unwrap();

        assert_eq!(article.link, "https://news.test/emas");
        assert_eq!(article.title.as_deref(), Some("Harga Emas Naik - Hari Ini"));
        assert_eq!(
            article.paragraphs,
            vec![
                "Harga emas batangan naik tajam pada perdagangan hari ini, menurut data resmi.",
                "Para analis memperkirakan kenaikan akan berlanjut hingga akhir pekan depan.",
            ]
        );
        assert_eq!(article.meta.og_title.as_deref(), Some("Harga Emas Naik"));
        assert_eq!(
            article.meta.og_image.as_deref(),
            Some("https://img.test/emas.jpg")
        );
        assert_eq!(article.meta.og_description, None);
    }

    #[test]
    fn page_without_title_or_paragraphs() {
        let article = parse_article("https://news.test/x", "<html><body></body></html>").unwrap();
        assert_eq!(article.title, None);
        assert!(article.paragraphs.is_empty());
        assert_eq!(article.meta, ArticleMeta::default());
    }
}
