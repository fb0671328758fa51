//! Response tags.

use std::fmt;

/// Tag prefix of a server response.
///
/// Untagged data lines begin with `*`; command completions echo the tag the
/// client allocated, formatted on the wire as `a` followed by the command
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// An untagged (`*`) response.
    Untagged,
    /// A tagged response answering command number `n`.
    Command(u32),
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Untagged => f.write_str("*"),
            Self::Command(n) => write!(f, "a{n}"),
        }
    }
}
