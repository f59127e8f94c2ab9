pub mod background;
pub mod config;
pub mod credentials;
pub mod feed;
pub mod pipeline;
pub mod publisher;
pub mod scraper;
pub mod sheet;

pub const PROJECT_NAME: &str = "trendposter-bot";
pub const LOG_TARGET: &str = "trendposter_bot::main";

/// Browser-like agent; some news sites refuse unknown clients.
pub const USER_AGENT: &str = "Mozilla/5.0";
