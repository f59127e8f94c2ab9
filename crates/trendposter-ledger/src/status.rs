use serde::{Deserialize, Serialize};

/// Publication state of a ledger record.
///
/// Records start `Pending` and become `Done` once any destination returns a
/// post id. There is no way back: a failed attempt leaves the record pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Done,
}

impl Status {
    /// State after a publish attempt that produced `post_id` (`None` or empty
    /// on failure).
    pub fn after_publish(self, post_id: Option<&str>) -> Status {
        if self.is_terminal() {
            return self;
        }
        match post_id {
            Some(id) if !id.is_empty() => Status::Done,
            _ => self,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Status::Done
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Done => "done",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_becomes_done_on_post_id() {
        assert_eq!(Status::Pending.after_publish(Some("123")), Status::Done);
    }

    #[test]
    fn failed_attempt_stays_pending() {
        assert_eq!(Status::Pending.after_publish(None), Status::Pending);
        assert_eq!(Status::Pending.after_publish(Some("")), Status::Pending);
    }

    #[test]
    fn done_is_terminal() {
        assert!(Status::Done.is_terminal());
        assert_eq!(Status::Done.after_publish(None), Status::Done);
        assert!(!Status::Pending.is_terminal());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Pending).unwrap(), "\"pending\"");
        assert_eq!(
            serde_json::from_str::<Status>("\"done\"").unwrap(),
            Status::Done
        );
    }
}
