//! The session engine: command issue, tag dispatch, response fan-out.
//!
//! A session owns both halves of the transport. The caller issues one
//! command at a time; a background task reads responses and routes each one
//! either into the channel of the command in flight or into the bounded
//! unsolicited queue. The terminating tagged status closes out the command
//! and clears the pending slot.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use crate::parser::{ResponseReader, ServerResponse};
use crate::types::{
    ExamineResponse, FetchResponse, ListResponse, ResponseStatus, Status, UntaggedResponse,
};
use crate::{Error, Result};

/// Mailbox wildcard matching a single hierarchy level.
pub const WILDCARD_ANY: &str = "%";
/// Mailbox wildcard matching any depth.
pub const WILDCARD_ANY_RECURSIVE: &str = "*";

/// Capacity of the unsolicited queue. When it fills, the background reader
/// parks until the caller drains; callers should drain periodically.
const UNSOLICITED_CAPACITY: usize = 100;

/// Capacity of each per-command reply channel.
const REPLY_CAPACITY: usize = 32;

/// What the background reader delivers into a per-command channel.
#[derive(Debug)]
enum Reply {
    /// An untagged response that arrived while the command was in flight.
    Data(UntaggedResponse),
    /// The terminating tagged status.
    Done(ResponseStatus),
    /// The reader died before the command completed.
    Failed(String),
}

/// One item from the streaming FETCH surface.
#[derive(Debug)]
pub enum FetchEvent {
    /// Data for one message.
    Message(FetchResponse),
    /// The terminating status. Nothing follows it.
    Done(ResponseStatus),
}

/// The at-most-one command currently awaiting its tagged status.
struct Pending {
    tag: u32,
    tx: mpsc::Sender<Reply>,
}

/// An IMAP session over a bidirectional byte stream.
///
/// At most one command may be in flight; issuing a second one before the
/// first completes returns [`Error::CommandInFlight`].
pub struct Session<R, W> {
    /// Present until [`start`](Self::start) hands it to the background task.
    reader: Option<ResponseReader<R>>,
    writer: W,
    next_tag: u32,
    pending: Arc<Mutex<Option<Pending>>>,
    unsolicited_tx: mpsc::Sender<UntaggedResponse>,
    unsolicited_rx: mpsc::Receiver<UntaggedResponse>,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    /// Creates a session over the two halves of a transport.
    pub fn new(reader: R, writer: W) -> Self {
        let (unsolicited_tx, unsolicited_rx) = mpsc::channel(UNSOLICITED_CAPACITY);
        Self {
            reader: Some(ResponseReader::new(reader)),
            writer,
            next_tag: 0,
            pending: Arc::new(Mutex::new(None)),
            unsolicited_tx,
            unsolicited_rx,
        }
    }

    /// Reads the server greeting and spawns the background reader.
    ///
    /// Returns the greeting text. The greeting must be an untagged OK;
    /// a NO or BAD greeting surfaces as [`Error::Imap`].
    pub async fn start(&mut self) -> Result<String> {
        let mut reader = self
            .reader
            .take()
            .ok_or_else(|| Error::Protocol("session already started".to_string()))?;

        let greeting = match reader.read_response().await? {
            ServerResponse::Untagged(UntaggedResponse::Status(resp)) => {
                if resp.status != Status::Ok {
                    return Err(imap_error(resp));
                }
                resp.text
            }
            other => {
                return Err(Error::Protocol(format!(
                    "expected untagged server greeting, got {other:?}"
                )))
            }
        };

        let pending = Arc::clone(&self.pending);
        let unsolicited = self.unsolicited_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = read_loop(&mut reader, &pending, &unsolicited).await {
                error!(error = %e, "imap read loop terminated");
                // Whoever is waiting learns about it; everyone else sees a
                // closed channel on their next command.
                let taken = pending.lock().await.take();
                if let Some(p) = taken {
                    let _ = p.tx.send(Reply::Failed(e.to_string())).await;
                }
            }
        });

        Ok(greeting)
    }

    /// Allocates a tag and writes `aN <command>\r\n`.
    ///
    /// When `reply` is given, the pending slot is claimed first; responses
    /// arriving from now on are routed into it. Never blocks on responses.
    async fn send(&mut self, reply: Option<mpsc::Sender<Reply>>, command: &str) -> Result<u32> {
        let tag = self.next_tag;
        self.next_tag += 1;

        if let Some(tx) = reply {
            let mut slot = self.pending.lock().await;
            if slot.is_some() {
                return Err(Error::CommandInFlight);
            }
            *slot = Some(Pending { tag, tx });
        }

        debug!(tag, verb = command.split(' ').next().unwrap_or(""), "sending command");

        let mut line = BytesMut::with_capacity(command.len() + 8);
        line.extend_from_slice(format!("a{tag} ").as_bytes());
        line.extend_from_slice(command.as_bytes());
        line.extend_from_slice(b"\r\n");

        if let Err(e) = self.write_all(&line).await {
            // Release the slot so the session stays usable for a retry.
            let mut slot = self.pending.lock().await;
            if slot.as_ref().is_some_and(|p| p.tag == tag) {
                *slot = None;
            }
            return Err(e);
        }
        Ok(tag)
    }

    async fn write_all(&mut self, line: &[u8]) -> Result<()> {
        self.writer.write_all(line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Sends a command and blocks until its tagged status arrives.
    ///
    /// Untagged responses received in the meantime end up on the returned
    /// status's `extras`, in arrival order. A NO or BAD status becomes an
    /// [`Error::Imap`] that still carries the full response.
    async fn send_sync(&mut self, command: &str) -> Result<ResponseStatus> {
        let (tx, mut rx) = mpsc::channel(REPLY_CAPACITY);
        self.send(Some(tx), command).await?;

        let mut extras = Vec::new();
        loop {
            match rx.recv().await {
                Some(Reply::Data(r)) => extras.push(r),
                Some(Reply::Done(mut status)) => {
                    status.extras = extras;
                    if status.status != Status::Ok {
                        return Err(imap_error(status));
                    }
                    return Ok(status);
                }
                Some(Reply::Failed(reason)) => return Err(Error::ConnectionLost(reason)),
                None => return Err(Error::ConnectionLost("read loop exited".to_string())),
            }
        }
    }

    /// Logs in with LOGIN.
    ///
    /// Returns the completion text and the capability words, when the
    /// server volunteers them alongside the login response.
    pub async fn login(&mut self, user: &str, pass: &str) -> Result<(String, Vec<String>)> {
        let command = format!("LOGIN {} {}", quote(user)?, quote(pass)?);
        let resp = self.send_sync(&command).await?;

        let mut caps = Vec::new();
        for extra in resp.extras {
            match extra {
                UntaggedResponse::Capabilities(c) => caps = c,
                other => self.forward_unsolicited(other).await,
            }
        }
        Ok((resp.text, caps))
    }

    /// Lists mailboxes matching `name` under `reference`.
    pub async fn list(&mut self, reference: &str, name: &str) -> Result<Vec<ListResponse>> {
        let command = format!("LIST {} {}", quote(reference)?, quote(name)?);
        let resp = self.send_sync(&command).await?;

        let mut lists = Vec::new();
        for extra in resp.extras {
            match extra {
                UntaggedResponse::List(list) => lists.push(list),
                other => self.forward_unsolicited(other).await,
            }
        }
        Ok(lists)
    }

    /// Opens `mailbox` read-only and reports its state.
    pub async fn examine(&mut self, mailbox: &str) -> Result<ExamineResponse> {
        let command = format!("EXAMINE {}", quote(mailbox)?);
        let resp = self.send_sync(&command).await?;

        let mut examine = ExamineResponse::default();
        for extra in resp.extras {
            match extra {
                UntaggedResponse::Flags(flags) => examine.flags = flags,
                UntaggedResponse::Exists(n) => examine.exists = n,
                UntaggedResponse::Recent(n) => examine.recent = n,
                UntaggedResponse::PermanentFlags(flags) => examine.permanent_flags = flags,
                UntaggedResponse::UidValidity(v) => examine.uid_validity = v,
                UntaggedResponse::UidNext(v) => examine.uid_next = v,
                other => self.forward_unsolicited(other).await,
            }
        }
        Ok(examine)
    }

    /// Fetches `fields` for the messages in `sequence`, aggregated.
    pub async fn fetch(&mut self, sequence: &str, fields: &[&str]) -> Result<Vec<FetchResponse>> {
        let resp = self.send_sync(&format_fetch(sequence, fields)).await?;

        let mut fetches = Vec::new();
        for extra in resp.extras {
            match extra {
                UntaggedResponse::Fetch(fetch) => fetches.push(fetch),
                other => self.forward_unsolicited(other).await,
            }
        }
        Ok(fetches)
    }

    /// Fetches `fields` for the messages in `sequence`, streamed.
    ///
    /// The returned channel yields each message as it arrives and then the
    /// terminating status; other untagged traffic received in the meantime
    /// goes to the unsolicited queue.
    pub async fn fetch_async(
        &mut self,
        sequence: &str,
        fields: &[&str],
    ) -> Result<mpsc::Receiver<FetchEvent>> {
        let (tx, mut rx) = mpsc::channel(REPLY_CAPACITY);
        self.send(Some(tx), &format_fetch(sequence, fields)).await?;

        let (out_tx, out_rx) = mpsc::channel(REPLY_CAPACITY);
        let unsolicited = self.unsolicited_tx.clone();
        tokio::spawn(async move {
            while let Some(reply) = rx.recv().await {
                match reply {
                    Reply::Data(UntaggedResponse::Fetch(fetch)) => {
                        if out_tx.send(FetchEvent::Message(fetch)).await.is_err() {
                            // Consumer hung up; keep draining so the read
                            // loop is never blocked on us.
                            continue;
                        }
                    }
                    Reply::Data(other) => {
                        let _ = unsolicited.send(other).await;
                    }
                    Reply::Done(status) => {
                        let _ = out_tx.send(FetchEvent::Done(status)).await;
                        return;
                    }
                    Reply::Failed(reason) => {
                        error!(%reason, "fetch stream failed");
                        return;
                    }
                }
            }
        });
        Ok(out_rx)
    }

    /// Empties the unsolicited queue without blocking.
    pub fn drain_unsolicited(&mut self) -> Vec<UntaggedResponse> {
        let mut out = Vec::new();
        while let Ok(r) = self.unsolicited_rx.try_recv() {
            out.push(r);
        }
        out
    }

    async fn forward_unsolicited(&self, response: UntaggedResponse) {
        // The session owns the receiver, so this only fails on shutdown.
        let _ = self.unsolicited_tx.send(response).await;
    }
}

/// Routes responses until the transport or the parser gives out.
async fn read_loop<R>(
    reader: &mut ResponseReader<R>,
    pending: &Mutex<Option<Pending>>,
    unsolicited: &mpsc::Sender<UntaggedResponse>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let response = reader.read_response().await?;

        // Sample the slot once per response. It can only be claimed by the
        // caller while empty, and only cleared here, so one sample is
        // coherent for the whole iteration.
        let destination = pending
            .lock()
            .await
            .as_ref()
            .map(|p| (p.tag, p.tx.clone()));

        match response {
            ServerResponse::Untagged(r) => match &destination {
                Some((_, tx)) => {
                    if let Err(mpsc::error::SendError(reply)) = tx.send(Reply::Data(r)).await {
                        // The command-side receiver went away early; treat
                        // its traffic as unsolicited instead of losing it.
                        if let Reply::Data(r) = reply {
                            if unsolicited.send(r).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
                None => {
                    if unsolicited.send(r).await.is_err() {
                        // Session dropped; nothing left to deliver to.
                        return Ok(());
                    }
                }
            },
            ServerResponse::Tagged { tag, status } => {
                let taken = {
                    let mut slot = pending.lock().await;
                    match slot.as_ref().map(|p| p.tag) {
                        Some(t) if t == tag => slot.take(),
                        Some(t) => {
                            return Err(Error::Protocol(format!(
                                "expected response tag a{t}, got a{tag}"
                            )))
                        }
                        None => {
                            return Err(Error::Protocol(format!(
                                "unexpected tagged response a{tag}"
                            )))
                        }
                    }
                };
                if let Some(p) = taken {
                    let _ = p.tx.send(Reply::Done(status)).await;
                }
            }
        }
    }
}

/// Builds a NO/BAD error that keeps the full response available.
fn imap_error(response: ResponseStatus) -> Error {
    Error::Imap {
        status: response.status,
        text: response.text.clone(),
        response: Box::new(response),
    }
}

/// Renders a FETCH command: a single field stays bare, several are
/// parenthesized.
fn format_fetch(sequence: &str, fields: &[&str]) -> String {
    if fields.len() == 1 {
        format!("FETCH {sequence} {}", fields[0])
    } else {
        format!("FETCH {sequence} ({})", fields.join(" "))
    }
}

/// Wraps a user-supplied string in DQUOTEs for the wire.
///
/// CR and LF cannot appear inside a quoted string; rejecting them here
/// fails fast instead of corrupting the command stream.
fn quote(s: &str) -> Result<String> {
    if s.contains(['\r', '\n']) {
        return Err(Error::InvalidArgument(format!("cannot quote {s:?}")));
    }
    Ok(format!("\"{s}\""))
}
