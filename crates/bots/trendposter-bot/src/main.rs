use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use reqwest::Client;
use snafu::{ResultExt, Snafu};
use tracing::level_filters::LevelFilter;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, fmt};
use trendposter_bot::config::{Command, ConfigError, DevCommand, Opts};
use trendposter_bot::feed::{FeedError, fetch_feed, parse_news_urls};
use trendposter_bot::pipeline::Pipeline;
use trendposter_bot::publisher::HttpPublishers;
use trendposter_bot::scraper::{HttpWebSource, ScrapeError, WebSource as _};
use trendposter_bot::sheet::SheetLog;
use trendposter_bot::{LOG_TARGET, PROJECT_NAME, USER_AGENT};
use trendposter_ledger::Ledger;
use trendposter_poster::{Compositor, FaceError, PosterError, PosterSpec};

#[derive(Debug, Snafu)]
pub enum BotError {
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },
    #[snafu(display("Logging initialization failed"))]
    Logging,
    #[snafu(display("Failed to open log file {}: {source}", path.display()))]
    LogFile { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to create output dir {}: {source}", path.display()))]
    OutputDir { path: PathBuf, source: io::Error },
    #[snafu(display("HTTP client error: {source}"))]
    Client { source: reqwest::Error },
    #[snafu(display("Feed error: {source}"))]
    Feed { source: FeedError },
    #[snafu(display("Scraper error: {source}"))]
    Scrape { source: ScrapeError },
    #[snafu(display("Font error: {source}"))]
    Face { source: FaceError },
    #[snafu(display("Poster error: {source}"))]
    Poster { source: PosterError },
    #[snafu(display("Serialization error: {source}"))]
    Json { source: serde_json::Error },
}

pub type BotResult<T> = std::result::Result<T, BotError>;

#[snafu::report]
#[tokio::main(flavor = "current_thread")]
async fn main() -> BotResult<()> {
    // A missing .env file is fine; everything can come from flags or the
    // real environment.
    let _ = dotenvy::dotenv();

    let opts = Opts::parse();
    init_logging(opts.log_file.as_deref())?;

    match &opts.command {
        Some(Command::Dev { dev_command }) => handle_dev_cmd(&opts, dev_command).await,
        None => run_bot(&opts).await,
    }
}

fn http_client() -> BotResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context(ClientSnafu)
}

async fn run_bot(opts: &Opts) -> BotResult<()> {
    let config = opts.to_config().context(ConfigSnafu)?;
    info!(
        target: LOG_TARGET,
        rss_url = %config.rss_url,
        ledger = %config.ledger.display(),
        post_delay_secs = config.post_delay.as_secs(),
        "Starting {PROJECT_NAME}"
    );

    let compositor = Compositor::from_config(&config.poster).context(FaceSnafu)?;
    std::fs::create_dir_all(&config.output_dir).context(OutputDirSnafu {
        path: &config.output_dir,
    })?;

    let client = http_client()?;
    let xml = fetch_feed(&client, &config.rss_url)
        .await
        .context(FeedSnafu)?;
    let urls = parse_news_urls(&xml).context(FeedSnafu)?;
    info!(target: LOG_TARGET, count = urls.len(), "Fetched article links");

    let source = HttpWebSource::new().context(ScrapeSnafu)?;
    let ledger = Ledger::new(&config.ledger);
    let sheet = SheetLog::new(&config.sheet);
    let publishers = HttpPublishers::new(client);

    let summary = Pipeline {
        config: &config,
        source: &source,
        compositor: &compositor,
        ledger: &ledger,
        sheet: &sheet,
        publishers: &publishers,
    }
    .run_once(&urls)
    .await;

    info!(
        target: LOG_TARGET,
        seen = summary.seen,
        inserted = summary.inserted,
        rendered = summary.rendered,
        published = summary.published,
        "Run complete"
    );
    Ok(())
}

async fn handle_dev_cmd(opts: &Opts, dev_command: &DevCommand) -> BotResult<()> {
    match dev_command {
        DevCommand::Feed => {
            let rss_url = opts.rss_url().context(ConfigSnafu)?;
            let xml = fetch_feed(&http_client()?, rss_url)
                .await
                .context(FeedSnafu)?;
            for url in parse_news_urls(&xml).context(FeedSnafu)? {
                println!("{url}");
            }
        }
        DevCommand::Scrape { url } => {
            let article = HttpWebSource::new()
                .context(ScrapeSnafu)?
                .scrape_article(url)
                .await
                .context(ScrapeSnafu)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&article).context(JsonSnafu)?
            );
        }
        DevCommand::Poster {
            title,
            body,
            background,
            output,
        } => {
            let poster = opts.poster_config().context(ConfigSnafu)?;
            let compositor = Compositor::from_config(&poster).context(FaceSnafu)?;
            let rendered = compositor
                .compose(&PosterSpec {
                    title,
                    body,
                    hashtag: &poster.hashtag,
                    logo: &poster.logo,
                    background: background.as_deref().unwrap_or(opts.default_background.as_path()),
                    output,
                })
                .context(PosterSnafu)?;
            println!(
                "{} ({}x{}, {} title lines, {} body lines)",
                output.display(),
                rendered.width,
                rendered.height,
                rendered.title_lines.len(),
                rendered.body_lines.len()
            );
        }
    }
    Ok(())
}

pub fn init_logging(log_file: Option<&Path>) -> BotResult<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .context(LogFileSnafu { path })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|_| BotError::Logging)?;

    Ok(())
}
