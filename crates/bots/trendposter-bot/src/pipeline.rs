//! One pass over the feed: scrape, record, render and publish each article
//! in turn.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use trendposter_ledger::{Ledger, Status, now_timestamp};
use trendposter_poster::{Compositor, PosterSpec, Typeface};
use trendposter_text::{poster_title, safe_filename_from_url, summarize_body};
use trendposter_util_error::{FmtCompact as _, LogResult as _};

use crate::LOG_TARGET;
use crate::background::prepare_background;
use crate::config::Config;
use crate::credentials::read_accounts;
use crate::publisher::PublisherFactory;
use crate::scraper::WebSource;
use crate::sheet::{SheetLog, SheetRow};

/// How far a single article got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOutcome {
    ScrapeFailed,
    AlreadyKnown,
    LedgerFailed,
    RenderFailed,
    /// Poster rendered and every destination attempted.
    Attempted { destinations: usize, published: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub seen: usize,
    pub inserted: usize,
    pub rendered: usize,
    pub published: usize,
}

impl RunSummary {
    fn add(&mut self, outcome: ArticleOutcome) {
        self.seen += 1;
        match outcome {
            ArticleOutcome::ScrapeFailed
            | ArticleOutcome::AlreadyKnown
            | ArticleOutcome::LedgerFailed => {}
            ArticleOutcome::RenderFailed => self.inserted += 1,
            ArticleOutcome::Attempted { published, .. } => {
                self.inserted += 1;
                self.rendered += 1;
                self.published += published;
            }
        }
    }
}

pub struct Pipeline<'a, F> {
    pub config: &'a Config,
    pub source: &'a dyn WebSource,
    pub compositor: &'a Compositor<F>,
    pub ledger: &'a Ledger,
    pub sheet: &'a SheetLog,
    pub publishers: &'a dyn PublisherFactory,
}

impl<F> Pipeline<'_, F>
where
    F: Typeface,
{
    /// Process every url in order. Per-article failures are logged and
    /// never stop the run.
    pub async fn run_once(&self, urls: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();

        for (idx, url) in urls.iter().enumerate() {
            let outcome = self.process_article(idx + 1, url).await;
            debug!(target: LOG_TARGET, idx = idx + 1, ?outcome, "Article done");

            let attempted = matches!(outcome, ArticleOutcome::Attempted { .. });
            summary.add(outcome);

            if attempted && !self.config.post_delay.is_zero() {
                info!(
                    target: LOG_TARGET,
                    secs = self.config.post_delay.as_secs(),
                    "Waiting before next article"
                );
                tokio::time::sleep(self.config.post_delay).await;
            }
        }

        summary
    }

    pub async fn process_article(&self, idx: usize, url: &str) -> ArticleOutcome {
        info!(target: LOG_TARGET, idx, url = %url, "Processing article");

        let article = match self.source.scrape_article(url).await {
            Ok(article) => article,
            Err(err) => {
                warn!(target: LOG_TARGET, url = %url, err = %err.fmt_compact(), "Failed to scrape");
                return ArticleOutcome::ScrapeFailed;
            }
        };

        let title = poster_title(article.title.as_deref()).to_owned();
        let body = summarize_body(&article.paragraphs, article.meta.og_description.as_deref());
        let image_url = article.meta.og_image.clone();
        let link = article.link.clone();

        match self.ledger.insert_if_absent(article) {
            Ok(true) => {}
            Ok(false) => return ArticleOutcome::AlreadyKnown,
            Err(err) => {
                error!(target: LOG_TARGET, link = %link, err = %err.fmt_compact(), "Failed to write ledger");
                return ArticleOutcome::LedgerFailed;
            }
        }

        let Some(poster) = self.render(&link, &title, &body, image_url.as_deref()).await else {
            return ArticleOutcome::RenderFailed;
        };

        let (destinations, published) = self.publish_all(&link, &title, &poster).await;
        ArticleOutcome::Attempted {
            destinations,
            published,
        }
    }

    async fn render(
        &self,
        link: &str,
        title: &str,
        body: &str,
        image_url: Option<&str>,
    ) -> Option<PathBuf> {
        let config = self.config;
        let background = prepare_background(
            self.source,
            image_url,
            &config.default_background,
            &config.output_dir,
        )
        .await;
        let output = config
            .output_dir
            .join(format!("{}.jpg", safe_filename_from_url(link)));

        let rendered = self.compositor.compose(&PosterSpec {
            title,
            body,
            hashtag: &config.poster.hashtag,
            logo: &config.poster.logo,
            background: &background,
            output: &output,
        });
        if let Err(err) = rendered {
            error!(target: LOG_TARGET, link = %link, err = %err.fmt_compact(), "Failed to render poster");
            return None;
        }

        info!(target: LOG_TARGET, path = %output.display(), "Poster rendered");
        Some(output)
    }

    /// Publish `poster` to every destination of every account. Returns the
    /// number of attempts and of successes.
    async fn publish_all(&self, link: &str, caption: &str, poster: &Path) -> (usize, usize) {
        let accounts = match read_accounts(&self.config.credentials) {
            Ok(accounts) => accounts,
            Err(err) => {
                error!(target: LOG_TARGET, err = %err.fmt_compact(), "Failed to read credentials");
                return (0, 0);
            }
        };

        let mut attempts = 0;
        let mut published = 0;
        for account in &accounts {
            for credential in &account.credentials {
                attempts += 1;
                let publisher = self.publishers.publisher(credential);
                let tag = publisher.tag();

                let post = match publisher.publish(poster, caption).await {
                    Ok(post) => {
                        info!(
                            target: LOG_TARGET,
                            sosmed = %tag,
                            username = %account.username,
                            post_url = %post.url,
                            "Published"
                        );
                        Some(post)
                    }
                    Err(err) => {
                        error!(
                            target: LOG_TARGET,
                            sosmed = %tag,
                            username = %account.username,
                            err = %err.fmt_compact(),
                            "Failed to publish"
                        );
                        None
                    }
                };

                let status = match &post {
                    Some(post) => {
                        published += 1;
                        self.ledger
                            .record_publish(link, Some(&post.id))
                            .ok_or_warn("Failed to update ledger");
                        Status::Done
                    }
                    None => Status::Pending,
                };

                self.sheet
                    .append(&SheetRow {
                        sosmed: tag.to_string(),
                        username: account.username.clone(),
                        url_site: link.to_owned(),
                        date_time_post: now_timestamp(),
                        url_sosmed: post.map(|p| p.url),
                        status,
                    })
                    .ok_or_warn("Failed to append sheet row");
            }
        }

        (attempts, published)
    }
}
