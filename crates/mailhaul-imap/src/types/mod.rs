//! Core IMAP types.
//!
//! The data model of the protocol subset this crate speaks: tags, the
//! OK/NO/BAD status word, and the typed untagged responses produced by the
//! response reader.

mod response;
mod status;
mod tag;

pub use response::{
    Address, Envelope, ExamineResponse, FetchResponse, ListResponse, ResponseCode, ResponseStatus,
    UntaggedResponse,
};
pub use status::Status;
pub use tag::Tag;
