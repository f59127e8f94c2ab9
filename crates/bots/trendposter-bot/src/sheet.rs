//! Append-only CSV log of publish attempts, one row per destination.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use snafu::{ResultExt as _, Snafu};
use trendposter_ledger::Status;

pub const HEADER: [&str; 7] = [
    "no",
    "sosmed",
    "username",
    "url site",
    "url sosmed",
    "date time post",
    "status",
];

#[derive(Debug, Snafu)]
pub enum SheetError {
    #[snafu(display("Failed to open sheet {}: {source}", path.display()))]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to access sheet {}: {source}", path.display()))]
    Csv { path: PathBuf, source: csv::Error },
}

pub type SheetResult<T> = std::result::Result<T, SheetError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub sosmed: String,
    pub username: String,
    pub url_site: String,
    pub url_sosmed: Option<String>,
    pub date_time_post: String,
    pub status: Status,
}

#[derive(Debug, Clone)]
pub struct SheetLog {
    path: PathBuf,
}

impl SheetLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number for the next row: one past the last row's `no`, or 1.
    fn next_no(&self) -> SheetResult<u64> {
        if !self.path.exists() {
            return Ok(1);
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .context(CsvSnafu { path: &self.path })?;

        let mut last = None;
        for record in reader.records() {
            last = Some(record.context(CsvSnafu { path: &self.path })?);
        }

        Ok(last
            .and_then(|r| r.get(0).and_then(|no| no.trim().parse::<u64>().ok()))
            .map_or(1, |no| no + 1))
    }

    /// Append `row`, creating the file with a header first if needed.
    /// Returns the assigned `no`.
    pub fn append(&self, row: &SheetRow) -> SheetResult<u64> {
        let no = self.next_no()?;
        let is_new = std::fs::metadata(&self.path).map_or(true, |m| m.len() == 0);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context(OpenSnafu { path: &self.path })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            writer
                .write_record(HEADER)
                .context(CsvSnafu { path: &self.path })?;
        }
        let no_field = no.to_string();
        writer
            .write_record([
                no_field.as_str(),
                row.sosmed.as_str(),
                row.username.as_str(),
                row.url_site.as_str(),
                row.url_sosmed.as_deref().unwrap_or_default(),
                row.date_time_post.as_str(),
                row.status.as_str(),
            ])
            .context(CsvSnafu { path: &self.path })?;
        writer
            .flush()
            .context(OpenSnafu { path: &self.path })?;

        Ok(no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: Status) -> SheetRow {
        SheetRow {
            sosmed: "IG".into(),
            username: "news_bot".into(),
            url_site: "http://a.test/1".into(),
            url_sosmed: (status == Status::Done).then(|| "https://instagram.com/p/abc".into()),
            date_time_post: "2024-01-01 10:00:00".into(),
            status,
        }
    }

    #[test]
    fn creates_file_with_header_and_numbers_rows() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = SheetLog::new(dir.path().join("log.csv"));

        assert_eq!(sheet.append(&row(Status::Done)).unwrap(), 1);
        assert_eq!(sheet.append(&row(Status::Pending)).unwrap(), 2);

        let content = std::fs::read_to_string(sheet.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            [
                "no,sosmed,username,url site,url sosmed,date time post,status",
                "1,IG,news_bot,http://a.test/1,https://instagram.com/p/abc,2024-01-01 10:00:00,done",
                "2,IG,news_bot,http://a.test/1,,2024-01-01 10:00:00,pending",
            ]
        );
    }

    #[test]
    fn header_only_file_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(&path, format!("{}\n", HEADER.join(","))).unwrap();

        assert_eq!(SheetLog::new(&path).append(&row(Status::Done)).unwrap(), 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("no,sosmed").count(), 1);
    }

    #[test]
    fn non_numeric_last_no_restarts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(
            &path,
            "no,sosmed,username,url site,url sosmed,date time post,status\n7,FB,a,b,c,d,done\nx,FB,a,b,c,d,done\n",
        )
        .unwrap();

        assert_eq!(SheetLog::new(&path).append(&row(Status::Done)).unwrap(), 1);
    }

    #[test]
    fn continues_after_last_numbered_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(
            &path,
            "no,sosmed,username,url site,url sosmed,date time post,status\n41,X,a,b,c,d,done\n",
        )
        .unwrap();

        assert_eq!(SheetLog::new(&path).append(&row(Status::Pending)).unwrap(), 42);
    }
}
