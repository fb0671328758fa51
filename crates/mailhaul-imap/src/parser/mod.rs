//! Streaming parser for the IMAP wire grammar.
//!
//! Layered bottom-up: [`ByteSource`] (buffered bytes with one byte of
//! pushback), [`Lexer`] (tokens, atoms, quoted strings, literals), the
//! S-expression reader on top of it, and [`ResponseReader`], which turns
//! the byte stream into one classified response at a time.

mod lexer;
mod response;
mod sexp;
mod source;

pub use lexer::Lexer;
pub use response::{ResponseReader, ServerResponse};
pub use sexp::Sexp;
pub use source::ByteSource;
