//! Command completion status.

use std::fmt;

/// Result word of a status response: `OK`, `NO`, or `BAD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The command succeeded.
    Ok,
    /// The command failed (e.g. unknown mailbox).
    No,
    /// The command was malformed or inappropriate.
    Bad,
}

impl Status {
    /// Returns the wire keyword for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
        }
    }

    /// Parses a status keyword. Returns `None` for anything else.
    ///
    /// Matching is exact; servers send these words in uppercase.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
