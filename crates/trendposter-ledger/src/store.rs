//! JSON file ledger of scraped articles, keyed by link.
//!
//! Every operation reads the whole file, modifies it in memory and rewrites
//! it. There is no locking: one process, one caller at a time.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::Serialize as _;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use snafu::{ResultExt as _, Snafu};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, error, info, warn};
use trendposter_util_error::FmtCompact as _;

use crate::LOG_TARGET;
use crate::record::{ArticleRecord, ScrapedArticle};
use crate::status::Status;

#[derive(Debug, Snafu)]
pub enum LedgerError {
    #[snafu(display("Failed to read ledger {}: {source}", path.display()))]
    Read { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to write ledger {}: {source}", path.display()))]
    Write { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to serialize ledger: {source}"))]
    Serialize { source: serde_json::Error },
    #[snafu(display("Ledger {} is not a JSON array", path.display()))]
    NotAnArray { path: PathBuf },
    #[snafu(display("Ledger {} entry {index} has an unexpected shape: {source}", path.display()))]
    Entry {
        path: PathBuf,
        index: usize,
        source: serde_json::Error,
    },
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Result of [`Ledger::update_by_link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The ledger file does not exist yet.
    LedgerMissing,
    LinkNotFound,
}

/// Creation timestamp in local time (UTC if the offset is unknown).
pub fn now_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_bytes(&self) -> LedgerResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LedgerError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Only a syntax error reads as empty. Well-formed JSON that does not
    /// look like a ledger is an error, so the next write cannot drop it.
    fn parse(&self, bytes: &[u8]) -> LedgerResult<Vec<ArticleRecord>> {
        let value: Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    path = %self.path.display(),
                    err = %err.fmt_compact(),
                    "Ledger is not valid JSON, treating it as empty"
                );
                return Ok(Vec::new());
            }
        };
        let Value::Array(entries) = value else {
            return NotAnArraySnafu { path: &self.path }.fail();
        };

        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                serde_json::from_value(entry).context(EntrySnafu {
                    path: &self.path,
                    index,
                })
            })
            .collect()
    }

    /// All records. A missing file or one that is not JSON reads as empty.
    pub fn load(&self) -> LedgerResult<Vec<ArticleRecord>> {
        match self.read_bytes()? {
            Some(bytes) => self.parse(&bytes),
            None => Ok(Vec::new()),
        }
    }

    pub fn get(&self, link: &str) -> LedgerResult<Option<ArticleRecord>> {
        Ok(self.load()?.into_iter().find(|r| r.link == link))
    }

    /// Rewrite the whole file: four-space indent, non-ASCII kept as is.
    pub fn store(&self, records: &[ArticleRecord]) -> LedgerResult<()> {
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        records.serialize(&mut ser).context(SerializeSnafu)?;

        let tmp_path = self.path.with_extension("json.tmp");
        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&buf)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        };
        write().context(WriteSnafu { path: &self.path })
    }

    /// Append `article` as a new `pending` record unless its link is already
    /// present. Returns whether it was inserted.
    pub fn insert_if_absent(&self, article: ScrapedArticle) -> LedgerResult<bool> {
        self.insert_if_absent_at(article, now_timestamp())
    }

    /// [`Self::insert_if_absent`] with an explicit creation timestamp.
    pub fn insert_if_absent_at(&self, article: ScrapedArticle, date: String) -> LedgerResult<bool> {
        let mut records = self.load()?;

        if records.iter().any(|r| r.link == article.link) {
            info!(target: LOG_TARGET, link = %article.link, "Already in ledger, skipping");
            return Ok(false);
        }

        debug!(target: LOG_TARGET, link = %article.link, "Adding article to ledger");
        records.push(ArticleRecord::new(article, date));
        self.store(&records)?;
        Ok(true)
    }

    /// Set the status (and post id, when given) of the first record with
    /// `link`. The file is only rewritten when a record matched.
    pub fn update_by_link(
        &self,
        link: &str,
        status: Status,
        post_id: Option<&str>,
    ) -> LedgerResult<UpdateOutcome> {
        let Some(bytes) = self.read_bytes()? else {
            error!(target: LOG_TARGET, path = %self.path.display(), "Ledger file not found");
            return Ok(UpdateOutcome::LedgerMissing);
        };
        let mut records = self.parse(&bytes)?;

        let Some(record) = records.iter_mut().find(|r| r.link == link) else {
            warn!(target: LOG_TARGET, link = %link, "Link not found in ledger");
            return Ok(UpdateOutcome::LinkNotFound);
        };

        record.status = status;
        if let Some(post_id) = post_id.filter(|id| !id.is_empty()) {
            record.post_id = Some(post_id.to_owned());
        }
        self.store(&records)?;

        info!(target: LOG_TARGET, link = %link, status = %status, "Ledger status updated");
        Ok(UpdateOutcome::Updated)
    }

    /// Apply the outcome of one publish attempt to the record of `link`.
    ///
    /// A failed attempt (no or empty `post_id`) does not touch the ledger.
    pub fn record_publish(
        &self,
        link: &str,
        post_id: Option<&str>,
    ) -> LedgerResult<Option<UpdateOutcome>> {
        let next = Status::Pending.after_publish(post_id);
        if next == Status::Pending {
            debug!(target: LOG_TARGET, link = %link, "Publish failed, record stays pending");
            return Ok(None);
        }
        self.update_by_link(link, next, post_id).map(Some)
    }
}
