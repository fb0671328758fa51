//! Response classification: one full server response at a time.

use tokio::io::AsyncRead;

use crate::parser::lexer::Lexer;
use crate::parser::sexp::Sexp;
use crate::types::{
    Address, Envelope, FetchResponse, ListResponse, ResponseCode, ResponseStatus, Status, Tag,
    UntaggedResponse,
};
use crate::{Error, Result};

/// A single parsed server response.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerResponse {
    /// Untagged (`*`) data.
    Untagged(UntaggedResponse),
    /// Tagged command completion.
    Tagged {
        /// Command number the server is answering.
        tag: u32,
        /// The completion status line.
        status: ResponseStatus,
    },
}

/// Reads classified responses off the wire.
///
/// Each call to [`read_response`](Self::read_response) consumes exactly one
/// response's bytes; afterwards the reader sits at the first byte of the
/// next response.
pub struct ResponseReader<R> {
    lexer: Lexer<R>,
}

impl<R: AsyncRead + Unpin> ResponseReader<R> {
    /// Creates a new reader over `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            lexer: Lexer::new(inner),
        }
    }

    fn err(&self, message: impl Into<String>) -> Error {
        self.lexer.error(message)
    }

    /// Reads one full response (e.g. `* OK foobar\r\n`).
    pub async fn read_response(&mut self) -> Result<ServerResponse> {
        match self.read_tag().await? {
            Tag::Untagged => Ok(ServerResponse::Untagged(self.read_untagged().await?)),
            Tag::Command(tag) => {
                let status = self.read_status(None).await?;
                Ok(ServerResponse::Tagged { tag, status })
            }
        }
    }

    /// Reads the tag token: `*` for untagged, `aN` for command N.
    async fn read_tag(&mut self) -> Result<Tag> {
        let token = self.lexer.read_token().await?;
        match token.as_bytes().first() {
            None => Err(self.err("read empty tag")),
            Some(b'*') => Ok(Tag::Untagged),
            Some(b'a') => token[1..]
                .parse::<u32>()
                .map(Tag::Command)
                .map_err(|_| self.err(format!("bad tag {token:?}"))),
            Some(_) => Err(self.err(format!("unexpected response tag {token:?}"))),
        }
    }

    /// Dispatches an untagged response on its keyword.
    async fn read_untagged(&mut self) -> Result<UntaggedResponse> {
        let keyword = self.lexer.read_token().await?;
        match keyword.as_str() {
            "CAPABILITY" => self.read_capabilities().await,
            "LIST" => self.read_list().await,
            "FLAGS" => self.read_flags().await,
            "OK" | "NO" | "BAD" => {
                let status = self.read_status(Some(&keyword)).await?;
                // Structured codes stand alone as typed responses; string
                // codes stay attached to the status they arrived on.
                Ok(match status.code {
                    Some(ResponseCode::PermanentFlags(flags)) => {
                        UntaggedResponse::PermanentFlags(flags)
                    }
                    Some(ResponseCode::UidValidity(value)) => {
                        UntaggedResponse::UidValidity(value)
                    }
                    Some(ResponseCode::UidNext(value)) => UntaggedResponse::UidNext(value),
                    _ => UntaggedResponse::Status(status),
                })
            }
            _ => {
                let Ok(num) = keyword.parse::<u32>() else {
                    return Err(self.err(format!("unhandled untagged response {keyword:?}")));
                };
                let item = self.lexer.read_token().await?;
                match item.as_str() {
                    "EXISTS" => {
                        self.lexer.expect_crlf().await?;
                        Ok(UntaggedResponse::Exists(num))
                    }
                    "RECENT" => {
                        self.lexer.expect_crlf().await?;
                        Ok(UntaggedResponse::Recent(num))
                    }
                    "FETCH" => self.read_fetch(num).await,
                    _ => Err(self.err(format!("unhandled untagged response {item:?}"))),
                }
            }
        }
    }

    /// Reads a status response, one starting with OK/NO/BAD.
    ///
    /// `prefetched` carries the keyword when the caller already consumed
    /// it. `extras` on the result is always empty here; the session owns
    /// that field.
    async fn read_status(&mut self, prefetched: Option<&str>) -> Result<ResponseStatus> {
        let keyword = match prefetched {
            Some(k) => k.to_string(),
            None => self.lexer.read_token().await?,
        };
        let status = Status::parse(&keyword)
            .ok_or_else(|| self.err(format!("unexpected status {keyword:?}")))?;

        let mut code = None;
        if self.lexer.peek_byte().await? == b'[' {
            self.lexer.expect("[").await?;
            code = Some(self.read_code().await?);
            self.lexer.expect(" ").await?;
        }

        let text = self.lexer.read_line().await?;
        Ok(ResponseStatus {
            status,
            code,
            text,
            extras: Vec::new(),
        })
    }

    /// Reads the content of a `[...]` response code; the opening bracket
    /// is already consumed, the closing one is consumed here.
    async fn read_code(&mut self) -> Result<ResponseCode> {
        let keyword = self.lexer.read_token().await?;
        match keyword.as_str() {
            "PERMANENTFLAGS" => {
                let flags = self.lexer.read_paren_string_list().await?;
                self.lexer.expect("]").await?;
                Ok(ResponseCode::PermanentFlags(flags))
            }
            "UIDVALIDITY" => {
                let value = self.lexer.read_number().await?;
                self.lexer.expect("]").await?;
                Ok(ResponseCode::UidValidity(value))
            }
            "UIDNEXT" => {
                let value = self.lexer.read_number().await?;
                self.lexer.expect("]").await?;
                Ok(ResponseCode::UidNext(value))
            }
            _ => {
                // Anything else is kept raw: the keyword, plus the rest of
                // the bracket content when there is any.
                let mut rest = self.lexer.read_until(b']').await?;
                rest.pop();
                if rest.is_empty() {
                    Ok(ResponseCode::Other(keyword))
                } else {
                    Ok(ResponseCode::Other(format!(
                        "{keyword} {}",
                        String::from_utf8_lossy(&rest)
                    )))
                }
            }
        }
    }

    /// Reads capability words until the list runs out.
    async fn read_capabilities(&mut self) -> Result<UntaggedResponse> {
        let mut caps = Vec::new();
        loop {
            let cap = self.lexer.read_token().await?;
            if cap.is_empty() {
                break;
            }
            caps.push(cap);
        }
        self.lexer.expect_crlf().await?;
        Ok(UntaggedResponse::Capabilities(caps))
    }

    /// Reads one LIST line: `(flags) "delim" "name"`.
    async fn read_list(&mut self) -> Result<UntaggedResponse> {
        let flags = self.lexer.read_paren_string_list().await?;
        self.lexer.expect(" ").await?;
        let delimiter = self.lexer.read_quoted().await?;
        self.lexer.expect(" ").await?;
        let name = self.lexer.read_quoted().await?;
        self.lexer.expect_crlf().await?;

        let mut list = ListResponse {
            delimiter,
            name,
            ..ListResponse::default()
        };
        for flag in &flags {
            match flag.as_str() {
                "\\Noinferiors" => list.inferiors = Some(false),
                "\\Noselect" => list.selectable = Some(false),
                "\\Marked" => list.marked = Some(true),
                "\\Unmarked" => list.marked = Some(false),
                "\\HasChildren" => list.children = Some(true),
                "\\HasNoChildren" => list.children = Some(false),
                other => return Err(self.err(format!("unknown list flag {other:?}"))),
            }
        }
        Ok(UntaggedResponse::List(list))
    }

    async fn read_flags(&mut self) -> Result<UntaggedResponse> {
        let flags = self.lexer.read_paren_string_list().await?;
        self.lexer.expect_crlf().await?;
        Ok(UntaggedResponse::Flags(flags))
    }

    /// Reads the parenthesized key/value pairs of a FETCH response.
    async fn read_fetch(&mut self, seq: u32) -> Result<UntaggedResponse> {
        let items = self.lexer.read_sexp().await?;
        if items.len() % 2 != 0 {
            return Err(self.err("fetch list must pair keys with values"));
        }

        let mut fetch = FetchResponse {
            seq,
            ..FetchResponse::default()
        };
        let mut items = items.into_iter();
        while let (Some(key), Some(value)) = (items.next(), items.next()) {
            let key = match key {
                Sexp::String(key) => key,
                other => {
                    return Err(self.err(format!(
                        "fetch key is {}, not a string",
                        other.variant_name()
                    )))
                }
            };
            match key.as_str() {
                "ENVELOPE" => fetch.envelope = Some(self.envelope_from_sexp(value)?),
                "FLAGS" => fetch.flags = Some(value),
                "INTERNALDATE" => {
                    fetch.internal_date = Some(self.expect_string(value, "INTERNALDATE")?);
                }
                "RFC822" => fetch.rfc822 = Some(self.expect_bytes(value, "RFC822")?),
                "RFC822.HEADER" => {
                    fetch.rfc822_header = Some(self.expect_bytes(value, "RFC822.HEADER")?);
                }
                "RFC822.SIZE" => {
                    let digits = self.expect_string(value, "RFC822.SIZE")?;
                    fetch.size = Some(
                        digits
                            .parse()
                            .map_err(|_| self.err(format!("bad RFC822.SIZE {digits:?}")))?,
                    );
                }
                other => return Err(self.err(format!("unhandled fetch key {other:?}"))),
            }
        }
        self.lexer.expect_crlf().await?;
        Ok(UntaggedResponse::Fetch(fetch))
    }

    /// Converts a ten-field envelope S-expression.
    fn envelope_from_sexp(&self, value: Sexp) -> Result<Envelope> {
        let fields = match value {
            Sexp::List(fields) => fields,
            other => {
                return Err(self.err(format!(
                    "envelope is {}, not a list",
                    other.variant_name()
                )))
            }
        };
        if fields.len() != 10 {
            return Err(self.err(format!("envelope needed 10 fields, had {}", fields.len())));
        }

        let mut fields = fields.into_iter();
        // Wire order is fixed: date, subject, six address lists, then the
        // two message-id strings.
        let mut next = || fields.next().unwrap_or(Sexp::Nil);
        let date = next();
        let subject = next();
        let from = next();
        let sender = next();
        let reply_to = next();
        let to = next();
        let cc = next();
        let bcc = next();
        let in_reply_to = next();
        let message_id = next();

        Ok(Envelope {
            date: self.nil_or_string(date, "envelope date")?,
            subject: self.nil_or_string(subject, "envelope subject")?,
            from: self.address_list(from, "from")?,
            sender: self.address_list(sender, "sender")?,
            reply_to: self.address_list(reply_to, "reply-to")?,
            to: self.address_list(to, "to")?,
            cc: self.address_list(cc, "cc")?,
            bcc: self.address_list(bcc, "bcc")?,
            in_reply_to: self.nil_or_string(in_reply_to, "in-reply-to")?,
            message_id: self.nil_or_string(message_id, "message-id")?,
        })
    }

    /// Converts a NIL-or-list-of-4-tuples address list.
    fn address_list(&self, value: Sexp, what: &str) -> Result<Vec<Address>> {
        match value {
            Sexp::Nil => Ok(Vec::new()),
            Sexp::List(items) => items
                .into_iter()
                .map(|item| self.address_from_sexp(item, what))
                .collect(),
            other => Err(self.err(format!(
                "{what} address list is {}, not a list",
                other.variant_name()
            ))),
        }
    }

    fn address_from_sexp(&self, value: Sexp, what: &str) -> Result<Address> {
        let parts = match value {
            Sexp::List(parts) => parts,
            other => {
                return Err(self.err(format!(
                    "{what} address is {}, not a list",
                    other.variant_name()
                )))
            }
        };
        let Ok([name, source, mailbox, host]) = <[Sexp; 4]>::try_from(parts) else {
            return Err(self.err(format!("{what} address needed 4 fields")));
        };

        let mailbox = self.nil_or_string(mailbox, "address mailbox")?;
        let host = self.nil_or_string(host, "address host")?;
        let address = match (mailbox, host) {
            (Some(mailbox), Some(host)) => format!("{mailbox}@{host}"),
            _ => String::new(),
        };

        Ok(Address {
            name: self.nil_or_string(name, "address name")?.unwrap_or_default(),
            source: self
                .nil_or_string(source, "address source")?
                .unwrap_or_default(),
            address,
        })
    }

    fn expect_string(&self, value: Sexp, what: &str) -> Result<String> {
        match value {
            Sexp::String(s) => Ok(s),
            other => Err(self.err(format!(
                "{what} is {}, not a string",
                other.variant_name()
            ))),
        }
    }

    fn expect_bytes(&self, value: Sexp, what: &str) -> Result<Vec<u8>> {
        match value {
            Sexp::Bytes(bytes) => Ok(bytes),
            other => Err(self.err(format!(
                "{what} is {}, not a literal",
                other.variant_name()
            ))),
        }
    }

    fn nil_or_string(&self, value: Sexp, what: &str) -> Result<Option<String>> {
        match value {
            Sexp::Nil => Ok(None),
            Sexp::String(s) => Ok(Some(s)),
            other => Err(self.err(format!(
                "{what} is {}, not a string",
                other.variant_name()
            ))),
        }
    }
}
