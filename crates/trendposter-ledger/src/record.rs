use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::status::Status;

/// Open Graph properties picked from an article page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMeta {
    #[serde(rename = "og:title", default)]
    pub og_title: Option<String>,
    #[serde(rename = "og:image", default)]
    pub og_image: Option<String>,
    #[serde(rename = "og:description", default)]
    pub og_description: Option<String>,
}

/// What the scraper extracts from one article page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedArticle {
    pub link: String,
    pub title: Option<String>,
    /// Cleaned paragraph texts longer than 50 characters, in document order.
    #[serde(default)]
    pub paragraphs: Vec<String>,
    #[serde(default)]
    pub meta: ArticleMeta,
}

/// `null` reads like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One ledger entry; `link` is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub link: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub paragraphs: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: ArticleMeta,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: Status,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    /// Fields written by other tools are carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArticleRecord {
    /// A fresh `pending` record created at `date`.
    pub fn new(article: ScrapedArticle, date: String) -> Self {
        let ScrapedArticle {
            link,
            title,
            paragraphs,
            meta,
        } = article;
        Self {
            link,
            title,
            paragraphs,
            meta,
            status: Status::Pending,
            date,
            post_id: None,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_uses_open_graph_keys() {
        let meta = ArticleMeta {
            og_image: Some("https://a.test/i.jpg".into()),
            ..ArticleMeta::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "og:title": null,
                "og:image": "https://a.test/i.jpg",
                "og:description": null,
            })
        );
    }

    #[test]
    fn unknown_fields_survive_a_rewrite() {
        let raw = r#"{"link":"l","title":null,"paragraphs":[],"meta":{},"status":"done","date":"d","post_id":"9","note":"kept"}"#;
        let record: ArticleRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.status, Status::Done);
        assert_eq!(record.post_id.as_deref(), Some("9"));
        assert_eq!(record.extra.get("note"), Some(&Value::from("kept")));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["note"], "kept");
    }

    #[test]
    fn new_record_is_pending_without_post_id() {
        let record = ArticleRecord::new(
            ScrapedArticle {
                link: "http://a.test/1".into(),
                ..ScrapedArticle::default()
            },
            "2024-01-01 10:00:00".into(),
        );
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.post_id, None);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("post_id").is_none());
    }
}
