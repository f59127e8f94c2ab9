pub mod record;
pub mod status;
pub mod store;

pub use record::{ArticleMeta, ArticleRecord, ScrapedArticle};
pub use status::Status;
pub use store::{Ledger, LedgerError, LedgerResult, UpdateOutcome, now_timestamp};

pub const LOG_TARGET: &str = "trendposter::ledger";
