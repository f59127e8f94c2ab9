//! Social account table: one CSV row per account, with credential columns
//! for each platform it posts to.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use snafu::{ResultExt as _, Snafu};
use tracing::debug;

pub const IG_FIELDS: [&str; 2] = ["ig_username", "ig_password"];
pub const FB_FIELDS: [&str; 2] = ["fb_id", "fb_token"];
pub const X_FIELDS: [&str; 5] = [
    "x_key",
    "x_keysecret",
    "x_access",
    "x_accesstoken",
    "x_bearertoken",
];

#[derive(Debug, Snafu)]
pub enum CredentialError {
    #[snafu(display("Failed to read credential table {}: {source}", path.display()))]
    Csv { path: PathBuf, source: csv::Error },
}

pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

pub type CredentialRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceTag {
    Instagram,
    Facebook,
    X,
}

impl SourceTag {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTag::Instagram => "IG",
            SourceTag::Facebook => "FB",
            SourceTag::X => "X",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Instagram {
        username: String,
        password: String,
    },
    Facebook {
        page_id: String,
        token: String,
    },
    X {
        key: String,
        key_secret: String,
        access_token: String,
        access_token_secret: String,
        bearer_token: String,
    },
}

impl Credential {
    pub fn tag(&self) -> SourceTag {
        match self {
            Credential::Instagram { .. } => SourceTag::Instagram,
            Credential::Facebook { .. } => SourceTag::Facebook,
            Credential::X { .. } => SourceTag::X,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Instagram { username, .. } => f
                .debug_struct("Instagram")
                .field("username", username)
                .finish_non_exhaustive(),
            Credential::Facebook { page_id, .. } => f
                .debug_struct("Facebook")
                .field("page_id", page_id)
                .finish_non_exhaustive(),
            Credential::X { .. } => f.debug_struct("X").finish_non_exhaustive(),
        }
    }
}

/// One row of the table: display name plus a credential per detected platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialAccount {
    pub username: String,
    pub credentials: Vec<Credential>,
}

fn field<'r>(row: &'r CredentialRow, name: &str) -> &'r str {
    row.get(name).map(|v| v.trim()).unwrap_or_default()
}

fn has_all(row: &CredentialRow, fields: &[&str]) -> bool {
    fields.iter().all(|f| !field(row, f).is_empty())
}

fn has_any(row: &CredentialRow, fields: &[&str]) -> bool {
    fields.iter().any(|f| !field(row, f).is_empty())
}

/// Platforms the row has credentials for. X accepts partial credentials.
pub fn detect_sources(row: &CredentialRow) -> Vec<SourceTag> {
    let mut sources = Vec::new();
    if has_all(row, &IG_FIELDS) {
        sources.push(SourceTag::Instagram);
    }
    if has_all(row, &FB_FIELDS) {
        sources.push(SourceTag::Facebook);
    }
    if has_any(row, &X_FIELDS) {
        sources.push(SourceTag::X);
    }
    sources
}

/// The credential for `tag`, built from that platform's columns only.
pub fn credential_for(row: &CredentialRow, tag: SourceTag) -> Credential {
    let get = |name| field(row, name).to_owned();
    match tag {
        SourceTag::Instagram => Credential::Instagram {
            username: get("ig_username"),
            password: get("ig_password"),
        },
        SourceTag::Facebook => Credential::Facebook {
            page_id: get("fb_id"),
            token: get("fb_token"),
        },
        SourceTag::X => Credential::X {
            key: get("x_key"),
            key_secret: get("x_keysecret"),
            access_token: get("x_access"),
            access_token_secret: get("x_accesstoken"),
            bearer_token: get("x_bearertoken"),
        },
    }
}

pub fn account_from_row(row: &CredentialRow) -> SocialAccount {
    SocialAccount {
        username: field(row, "username").to_owned(),
        credentials: detect_sources(row)
            .into_iter()
            .map(|tag| credential_for(row, tag))
            .collect(),
    }
}

/// Rows keyed by trimmed header; columns without a header are skipped.
pub fn read_rows<R: std::io::Read>(reader: R) -> Result<Vec<CredentialRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .zip(record.iter())
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_accounts(path: &Path) -> CredentialResult<Vec<SocialAccount>> {
    let file = std::fs::File::open(path)
        .map_err(csv::Error::from)
        .context(CsvSnafu { path })?;
    let rows = read_rows(file).context(CsvSnafu { path })?;

    let accounts: Vec<_> = rows.iter().map(account_from_row).collect();
    debug!(path = %path.display(), accounts = accounts.len(), "Loaded credential table");
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
username , ig_username,ig_password,fb_id,fb_token,x_key,x_keysecret,x_access,x_accesstoken,x_bearertoken
Breaking News, breaking , s3cret ,,,,,,,
Page Only,,,1234,tok,,,,,
Everything,ig,pw,99,t2,k,ks,a,at,bt
Partial X,,pw-only,,,k,,,,
";

    fn rows() -> Vec<CredentialRow> {
        read_rows(TABLE.as_bytes()).unwrap()
    }

    #[test]
    fn rows_are_trimmed() {
        let rows = rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["username"], "Breaking News");
        assert_eq!(rows[0]["ig_username"], "breaking");
        assert_eq!(rows[0]["ig_password"], "s3cret");
    }

    #[test]
    fn detects_each_platform() {
        let rows = rows();
        assert_eq!(detect_sources(&rows[0]), vec![SourceTag::Instagram]);
        assert_eq!(detect_sources(&rows[1]), vec![SourceTag::Facebook]);
        assert_eq!(
            detect_sources(&rows[2]),
            vec![SourceTag::Instagram, SourceTag::Facebook, SourceTag::X]
        );
        // Instagram needs both fields; any X field is enough.
        assert_eq!(detect_sources(&rows[3]), vec![SourceTag::X]);
    }

    #[test]
    fn credentials_dispatch_per_platform() {
        let account = account_from_row(&rows()[2]);
        assert_eq!(account.username, "Everything");
        assert_eq!(
            account.credentials,
            vec![
                Credential::Instagram {
                    username: "ig".into(),
                    password: "pw".into()
                },
                Credential::Facebook {
                    page_id: "99".into(),
                    token: "t2".into()
                },
                Credential::X {
                    key: "k".into(),
                    key_secret: "ks".into(),
                    access_token: "a".into(),
                    access_token_secret: "at".into(),
                    bearer_token: "bt".into(),
                },
            ]
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let account = account_from_row(&rows()[0]);
        let debug = format!("{account:?}");
        assert!(debug.contains("breaking"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn missing_columns_detect_nothing() {
        let rows = read_rows("username\nsolo\n".as_bytes()).unwrap();
        assert!(detect_sources(&rows[0]).is_empty());
    }
}
