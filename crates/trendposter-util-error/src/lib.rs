use std::{error, fmt};

use tracing::warn;

/// Displays an error followed by its whole `source()` chain on one line,
/// joined with `: `.
pub struct FmtCompactError<'e, E>(pub &'e E);

impl<E> fmt::Display for FmtCompactError<'_, E>
where
    E: error::Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut error = Some(self.0 as &dyn error::Error);

        while let Some(err) = error {
            f.write_fmt(format_args!("{err}"))?;
            error = err.source();
            if error.is_some() {
                f.write_str(": ")?;
            }
        }

        Ok(())
    }
}

pub trait FmtCompact {
    type Report: fmt::Display;
    fn fmt_compact(self) -> Self::Report;
}

impl<'e, E> FmtCompact for &'e E
where
    E: error::Error,
{
    type Report = FmtCompactError<'e, E>;

    fn fmt_compact(self) -> Self::Report {
        FmtCompactError(self)
    }
}

/// Per-item recovery: log the failure and carry on with `None`.
pub trait LogResult<T> {
    fn ok_or_warn(self, what: &str) -> Option<T>;
}

impl<T, E> LogResult<T> for Result<T, E>
where
    E: error::Error,
{
    fn ok_or_warn(self, what: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(err) => {
                warn!(err = %err.fmt_compact(), "{what}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use snafu::{ResultExt, Snafu};

    use super::*;

    #[derive(Debug, Snafu)]
    enum InnerError {
        #[snafu(display("inner failed"))]
        Inner,
    }

    #[derive(Debug, Snafu)]
    enum OuterError {
        #[snafu(display("outer failed"))]
        Outer { source: InnerError },
    }

    #[test]
    fn compact_joins_source_chain() {
        let err: OuterError = InnerSnafu.fail::<()>().context(OuterSnafu).unwrap_err();
        assert_eq!(err.fmt_compact().to_string(), "outer failed: inner failed");
    }

    #[test]
    fn ok_or_warn_passes_values_through() {
        assert_eq!(Ok::<_, InnerError>(3).ok_or_warn("failed"), Some(3));
        assert_eq!(InnerSnafu.fail::<u32>().ok_or_warn("failed"), None);
    }
}
