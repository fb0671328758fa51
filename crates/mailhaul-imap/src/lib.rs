//! # mailhaul-imap
//!
//! An asynchronous IMAP4rev1 (RFC 3501) client core, covering the subset a
//! mailbox-downloading tool needs: LOGIN, LIST, EXAMINE, and FETCH.
//!
//! The crate is two things joined at the hip:
//!
//! - a **streaming parser** for IMAP's hybrid grammar — atoms, quoted
//!   strings, length-prefixed literals, parenthesized S-expressions,
//!   bracketed status codes — layered as byte source → lexer → S-exp
//!   reader → response classifier;
//! - a **tag-demultiplexing session**: one background task reads
//!   responses and routes them by tag, so the caller gets a plain
//!   call-and-return surface (plus a streaming one for FETCH) over a
//!   protocol that interleaves unsolicited data with command replies.
//!
//! ## Quick start
//!
//! ```ignore
//! use mailhaul_imap::{connect_tls, Session, WILDCARD_ANY};
//!
//! #[tokio::main]
//! async fn main() -> mailhaul_imap::Result<()> {
//!     let stream = connect_tls("imap.example.com", 993).await?;
//!     let (reader, writer) = tokio::io::split(stream);
//!
//!     let mut session = Session::new(reader, writer);
//!     let greeting = session.start().await?;
//!     println!("server says: {greeting}");
//!
//!     session.login("user@example.com", "password").await?;
//!     for mailbox in session.list("", WILDCARD_ANY).await? {
//!         println!("{}", mailbox.name);
//!     }
//!
//!     let examine = session.examine("INBOX").await?;
//!     let messages = session
//!         .fetch(&format!("1:{}", examine.exists), &["RFC822"])
//!         .await?;
//!     println!("downloaded {} messages", messages.len());
//!     Ok(())
//! }
//! ```
//!
//! One command may be in flight per session; issuing a second returns an
//! error rather than corrupting the demultiplexer. Untagged responses the
//! commands don't claim land in a bounded queue drained with
//! [`Session::drain_unsolicited`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc)]

mod error;
pub mod parser;
mod session;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use parser::{ResponseReader, ServerResponse, Sexp};
pub use session::{FetchEvent, Session, WILDCARD_ANY, WILDCARD_ANY_RECURSIVE};
pub use stream::connect_tls;
pub use types::{
    Address, Envelope, ExamineResponse, FetchResponse, ListResponse, ResponseCode, ResponseStatus,
    Status, Tag, UntaggedResponse,
};
