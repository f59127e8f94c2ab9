use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use snafu::{OptionExt as _, Snafu};
use trendposter_poster::{FontSpec, PosterConfig, PosterStyle};

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Missing required setting `{name}` (--{flag} or ${env})"))]
    Missing {
        name: &'static str,
        flag: &'static str,
        env: &'static str,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Trendposter Bot - renders trending news into posters and posts them
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Trending topics feed to read article links from
    #[arg(long, env = "RSS_URL")]
    pub rss_url: Option<String>,

    /// CSV table with social account credentials
    #[arg(long, env = "DATA")]
    pub credentials: Option<PathBuf>,

    /// JSON ledger of scraped articles
    #[arg(long, env = "LEDGER", default_value = "scraped_result.json")]
    pub ledger: PathBuf,

    /// CSV log of publish attempts
    #[arg(long, env = "SHEET", default_value = "data_sosmed.csv")]
    pub sheet: PathBuf,

    /// Hashtag shown in the poster badge
    #[arg(long, env = "HASHTAG", default_value = "#trending")]
    pub hashtag: String,

    /// Logo pasted in the top-left corner of each poster
    #[arg(long, env = "LOGO", default_value = "logo.png")]
    pub logo: PathBuf,

    /// Hashtag font
    #[arg(long, env = "FONT_1")]
    pub font_1: Option<PathBuf>,

    #[arg(long, env = "FONTSIZE_1", default_value = "36")]
    pub fontsize_1: u32,

    /// Title font
    #[arg(long, env = "FONT_2")]
    pub font_2: Option<PathBuf>,

    #[arg(long, env = "FONTSIZE_2", default_value = "48")]
    pub fontsize_2: u32,

    /// Body font
    #[arg(long, env = "FONT_3")]
    pub font_3: Option<PathBuf>,

    #[arg(long, env = "FONTSIZE_3", default_value = "28")]
    pub fontsize_3: u32,

    /// Background used when an article has no usable og:image
    #[arg(long, env = "DEFAULT_BACKGROUND", default_value = "background.png")]
    pub default_background: PathBuf,

    /// Where posters and downloaded backgrounds are written
    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Pause after each published article, in seconds
    #[arg(long, env = "POST_DELAY_SECS", default_value = "100000")]
    pub post_delay_secs: u64,

    /// Also append log lines to this file
    #[arg(long, env = "LOG")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub enum Command {
    /// Development commands
    Dev {
        #[command(subcommand)]
        dev_command: DevCommand,
    },
}

#[derive(Debug, Parser)]
pub enum DevCommand {
    /// Fetch the feed and print the article links
    Feed,
    /// Scrape one page and print the extracted record
    Scrape { url: String },
    /// Render a single poster without publishing
    Poster {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long)]
        background: Option<PathBuf>,
        #[arg(long, default_value = "poster.jpg")]
        output: PathBuf,
    },
}

/// Settings of a full run, validated once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub rss_url: String,
    pub credentials: PathBuf,
    pub ledger: PathBuf,
    pub sheet: PathBuf,
    pub poster: PosterConfig,
    pub default_background: PathBuf,
    pub output_dir: PathBuf,
    pub post_delay: Duration,
}

impl Opts {
    pub fn rss_url(&self) -> ConfigResult<&str> {
        self.rss_url.as_deref().context(MissingSnafu {
            name: "rss_url",
            flag: "rss-url",
            env: "RSS_URL",
        })
    }

    pub fn poster_config(&self) -> ConfigResult<PosterConfig> {
        let font = |path: &Option<PathBuf>, size: u32, name, flag, env| {
            path.clone()
                .map(|path| FontSpec::new(path, size))
                .context(MissingSnafu { name, flag, env })
        };

        Ok(PosterConfig {
            hashtag_font: font(&self.font_1, self.fontsize_1, "font_1", "font-1", "FONT_1")?,
            title_font: font(&self.font_2, self.fontsize_2, "font_2", "font-2", "FONT_2")?,
            body_font: font(&self.font_3, self.fontsize_3, "font_3", "font-3", "FONT_3")?,
            hashtag: self.hashtag.clone(),
            logo: self.logo.clone(),
            style: PosterStyle::default(),
        })
    }

    pub fn to_config(&self) -> ConfigResult<Config> {
        Ok(Config {
            rss_url: self.rss_url()?.to_owned(),
            credentials: self.credentials.clone().context(MissingSnafu {
                name: "credentials",
                flag: "credentials",
                env: "DATA",
            })?,
            ledger: self.ledger.clone(),
            sheet: self.sheet.clone(),
            poster: self.poster_config()?,
            default_background: self.default_background.clone(),
            output_dir: self.output_dir.clone(),
            post_delay: Duration::from_secs(self.post_delay_secs),
        })
    }
}
