//! Typed server responses.

use crate::parser::Sexp;

use super::Status;

/// A status response: OK/NO/BAD, an optional bracketed code, and free text.
///
/// For command completions, `extras` carries the untagged responses that
/// arrived between the command being sent and this status, in arrival
/// order. The parser always leaves `extras` empty; the session fills it in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseStatus {
    /// Completion result.
    pub status: Status,
    /// Bracketed response code, when the server sent one.
    pub code: Option<ResponseCode>,
    /// Human-readable text after the code.
    pub text: String,
    /// Untagged responses claimed by this command, in arrival order.
    pub extras: Vec<UntaggedResponse>,
}

/// Structured content of a `[...]` response code.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseCode {
    /// `PERMANENTFLAGS (...)`: flags the client can change permanently.
    PermanentFlags(Vec<String>),
    /// `UIDVALIDITY n`: unique identifier validity value.
    UidValidity(u32),
    /// `UIDNEXT n`: predicted next message UID.
    UidNext(u32),
    /// Any other code, kept as raw text (the keyword plus whatever
    /// followed it inside the brackets).
    Other(String),
}

/// Untagged server data, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum UntaggedResponse {
    /// `* CAPABILITY ...`: the server's capability words.
    Capabilities(Vec<String>),
    /// `* LIST ...`: one mailbox.
    List(ListResponse),
    /// `* FLAGS (...)`: flags applicable in the selected mailbox.
    Flags(Vec<String>),
    /// `* n EXISTS`: message count.
    Exists(u32),
    /// `* n RECENT`: recent-message count.
    Recent(u32),
    /// `* n FETCH (...)`: data for one message.
    Fetch(FetchResponse),
    /// `* OK [PERMANENTFLAGS (...)] ...`, unwrapped from its status line.
    PermanentFlags(Vec<String>),
    /// `* OK [UIDVALIDITY n] ...`, unwrapped from its status line.
    UidValidity(u32),
    /// `* OK [UIDNEXT n] ...`, unwrapped from its status line.
    UidNext(u32),
    /// An untagged OK/NO/BAD whose code (if any) is unstructured.
    Status(ResponseStatus),
}

/// One `LIST` line.
///
/// Each attribute is a tri-state: `None` when the server said nothing,
/// `Some(..)` when one of the six recognized flags pinned it down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListResponse {
    /// `Some(false)` when `\Noinferiors` was present.
    pub inferiors: Option<bool>,
    /// `Some(false)` when `\Noselect` was present.
    pub selectable: Option<bool>,
    /// From `\Marked` / `\Unmarked`.
    pub marked: Option<bool>,
    /// From `\HasChildren` / `\HasNoChildren`.
    pub children: Option<bool>,
    /// Hierarchy delimiter.
    pub delimiter: String,
    /// Mailbox name.
    pub name: String,
}

/// Aggregated untagged data from an `EXAMINE` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamineResponse {
    /// Flags applicable in the mailbox.
    pub flags: Vec<String>,
    /// Message count.
    pub exists: u32,
    /// Recent-message count.
    pub recent: u32,
    /// Flags the client could change permanently (were this not read-only).
    pub permanent_flags: Vec<String>,
    /// UIDVALIDITY value.
    pub uid_validity: u32,
    /// Predicted next UID.
    pub uid_next: u32,
}

/// Data for one message from a `FETCH` response.
///
/// Only the fields the command asked for are populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResponse {
    /// Message sequence number.
    pub seq: u32,
    /// Raw `FLAGS` value, kept as an S-expression.
    pub flags: Option<Sexp>,
    /// Parsed `ENVELOPE`.
    pub envelope: Option<Envelope>,
    /// `INTERNALDATE` string.
    pub internal_date: Option<String>,
    /// `RFC822.SIZE` in bytes.
    pub size: Option<u32>,
    /// Full `RFC822` message body.
    pub rfc822: Option<Vec<u8>>,
    /// `RFC822.HEADER` bytes.
    pub rfc822_header: Option<Vec<u8>>,
}

/// The fixed ten-field message summary from `FETCH ENVELOPE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Date header.
    pub date: Option<String>,
    /// Subject header.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// One envelope address.
///
/// The wire form is a four-tuple of display name, source route, mailbox,
/// and host; `address` is `mailbox@host` when both halves are present and
/// empty when either is NIL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: String,
    /// Source route (obsolete).
    pub source: String,
    /// Composed `mailbox@host`, or empty.
    pub address: String,
}
