//! Session tests against a scripted server on an in-memory pipe.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use mailhaul_imap::{
    Error, FetchEvent, ResponseCode, Session, Status, UntaggedResponse, WILDCARD_ANY,
};

type TestSession = Session<tokio::io::ReadHalf<DuplexStream>, tokio::io::WriteHalf<DuplexStream>>;
type ServerReader = BufReader<tokio::io::ReadHalf<DuplexStream>>;
type ServerWriter = tokio::io::WriteHalf<DuplexStream>;

fn pipe() -> (TestSession, ServerReader, ServerWriter) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (client_r, client_w) = tokio::io::split(client);
    let (server_r, server_w) = tokio::io::split(server);
    (
        Session::new(client_r, client_w),
        BufReader::new(server_r),
        server_w,
    )
}

/// Writes the greeting and runs `start()`.
async fn started() -> (TestSession, ServerReader, ServerWriter) {
    let (mut session, server_r, mut server_w) = pipe();
    server_w
        .write_all(b"* OK Gimap ready for requests\r\n")
        .await
        .unwrap();
    let greeting = session.start().await.unwrap();
    assert_eq!(greeting, "Gimap ready for requests");
    (session, server_r, server_w)
}

/// Reads one command line as the server would see it.
async fn read_command(server: &mut ServerReader) -> String {
    let mut line = String::new();
    server.read_line(&mut line).await.unwrap();
    line
}

#[tokio::test]
async fn start_returns_greeting_text() {
    let (_session, _server_r, _server_w) = started().await;
}

#[tokio::test]
async fn start_rejects_no_greeting() {
    let (mut session, _server_r, mut server_w) = pipe();
    server_w
        .write_all(b"* NO too many connections\r\n")
        .await
        .unwrap();
    let err = session.start().await.unwrap_err();
    match err {
        Error::Imap { status, text, .. } => {
            assert_eq!(status, Status::No);
            assert_eq!(text, "too many connections");
        }
        other => panic!("expected Imap error, got {other}"),
    }
}

#[tokio::test]
async fn login_quotes_arguments_and_returns_capabilities() {
    let (mut session, mut server_r, mut server_w) = started().await;

    let client = tokio::spawn(async move {
        let result = session.login("user@example.com", "secret").await.unwrap();
        (session, result)
    });

    let line = read_command(&mut server_r).await;
    assert_eq!(line, "a0 LOGIN \"user@example.com\" \"secret\"\r\n");
    server_w
        .write_all(b"* CAPABILITY IMAP4rev1 XLIST\r\na0 OK user authenticated\r\n")
        .await
        .unwrap();

    let (_session, (text, caps)) = client.await.unwrap();
    assert_eq!(text, "user authenticated");
    assert_eq!(caps, vec!["IMAP4rev1".to_string(), "XLIST".to_string()]);
}

#[tokio::test]
async fn list_gathers_lists_in_order_and_forwards_the_rest() {
    let (mut session, mut server_r, mut server_w) = started().await;

    let client = tokio::spawn(async move {
        let lists = session.list("", WILDCARD_ANY).await.unwrap();
        let unsolicited = session.drain_unsolicited();
        (lists, unsolicited)
    });

    let line = read_command(&mut server_r).await;
    assert_eq!(line, "a0 LIST \"\" \"%\"\r\n");
    server_w
        .write_all(
            b"* LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\n\
              * 23 EXISTS\r\n\
              * LIST (\\Noselect \\HasChildren) \"/\" \"[Gmail]\"\r\n\
              a0 OK done\r\n",
        )
        .await
        .unwrap();

    let (lists, unsolicited) = client.await.unwrap();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[0].name, "INBOX");
    assert_eq!(lists[0].children, Some(false));
    assert_eq!(lists[1].name, "[Gmail]");
    assert_eq!(lists[1].selectable, Some(false));
    assert_eq!(unsolicited, vec![UntaggedResponse::Exists(23)]);
}

#[tokio::test]
async fn examine_aggregates_mailbox_state() {
    let (mut session, mut server_r, mut server_w) = started().await;

    let client = tokio::spawn(async move { session.examine("INBOX").await.unwrap() });

    let line = read_command(&mut server_r).await;
    assert_eq!(line, "a0 EXAMINE \"INBOX\"\r\n");
    server_w
        .write_all(
            b"* FLAGS (\\Answered \\Flagged \\Draft \\Deleted \\Seen)\r\n\
              * 6077 EXISTS\r\n\
              * 2 RECENT\r\n\
              * OK [PERMANENTFLAGS ()] Flags permitted.\r\n\
              * OK [UIDVALIDITY 2] UIDs valid.\r\n\
              * OK [UIDNEXT 31677] Predicted next UID.\r\n\
              a0 OK [READ-ONLY] INBOX selected. (Success)\r\n",
        )
        .await
        .unwrap();

    let examine = client.await.unwrap();
    assert_eq!(examine.flags.len(), 5);
    assert_eq!(examine.exists, 6077);
    assert_eq!(examine.recent, 2);
    assert_eq!(examine.permanent_flags, Vec::<String>::new());
    assert_eq!(examine.uid_validity, 2);
    assert_eq!(examine.uid_next, 31677);
}

#[tokio::test]
async fn fetch_aggregates_messages() {
    let (mut session, mut server_r, mut server_w) = started().await;

    let client = tokio::spawn(async move { session.fetch("1:2", &["RFC822"]).await.unwrap() });

    let line = read_command(&mut server_r).await;
    assert_eq!(line, "a0 FETCH 1:2 RFC822\r\n");
    server_w
        .write_all(
            b"* 1 FETCH (RFC822 {11}\r\nfirst\r\nbody)\r\n\
              * 2 FETCH (RFC822 {6}\r\nsecond)\r\n\
              a0 OK Success\r\n",
        )
        .await
        .unwrap();

    let fetches = client.await.unwrap();
    assert_eq!(fetches.len(), 2);
    assert_eq!(fetches[0].seq, 1);
    assert_eq!(fetches[0].rfc822.as_deref(), Some(&b"first\r\nbody"[..]));
    assert_eq!(fetches[1].seq, 2);
    assert_eq!(fetches[1].rfc822.as_deref(), Some(&b"second"[..]));
}

#[tokio::test]
async fn fetch_async_streams_messages_then_status() {
    let (mut session, mut server_r, mut server_w) = started().await;

    let mut events = session.fetch_async("1:2", &["RFC822"]).await.unwrap();

    let line = read_command(&mut server_r).await;
    assert_eq!(line, "a0 FETCH 1:2 RFC822\r\n");
    server_w
        .write_all(
            b"* 1 FETCH (RFC822 {3}\r\none)\r\n\
              * 2 FETCH (RFC822 {3}\r\ntwo)\r\n\
              a0 OK Success\r\n",
        )
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        FetchEvent::Message(fetch) => assert_eq!(fetch.rfc822.as_deref(), Some(&b"one"[..])),
        FetchEvent::Done(status) => panic!("early status: {status:?}"),
    }
    match events.recv().await.unwrap() {
        FetchEvent::Message(fetch) => assert_eq!(fetch.rfc822.as_deref(), Some(&b"two"[..])),
        FetchEvent::Done(status) => panic!("early status: {status:?}"),
    }
    match events.recv().await.unwrap() {
        FetchEvent::Done(status) => assert_eq!(status.status, Status::Ok),
        FetchEvent::Message(fetch) => panic!("extra message: {fetch:?}"),
    }
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn second_command_while_one_is_in_flight_is_refused() {
    let (mut session, mut server_r, mut server_w) = started().await;

    let _events = session.fetch_async("1:1", &["RFC822"]).await.unwrap();
    let err = session.list("", WILDCARD_ANY).await.unwrap_err();
    assert!(matches!(err, Error::CommandInFlight), "{err}");

    // Let the first command finish so the background task winds down.
    let _ = read_command(&mut server_r).await;
    server_w.write_all(b"a0 OK Success\r\n").await.unwrap();
}

#[tokio::test]
async fn no_response_carries_the_full_status() {
    let (mut session, mut server_r, mut server_w) = started().await;

    let client = tokio::spawn(async move { session.examine("Missing").await.unwrap_err() });

    let _ = read_command(&mut server_r).await;
    server_w
        .write_all(b"a0 NO [TRYCREATE] no such mailbox\r\n")
        .await
        .unwrap();

    match client.await.unwrap() {
        Error::Imap {
            status,
            text,
            response,
        } => {
            assert_eq!(status, Status::No);
            assert_eq!(text, "no such mailbox");
            assert_eq!(
                response.code,
                Some(ResponseCode::Other("TRYCREATE".to_string()))
            );
        }
        other => panic!("expected Imap error, got {other}"),
    }
}

#[tokio::test]
async fn mismatched_tag_kills_the_session() {
    let (mut session, mut server_r, mut server_w) = started().await;

    let client = tokio::spawn(async move { session.login("u", "p").await.unwrap_err() });

    let _ = read_command(&mut server_r).await;
    server_w.write_all(b"a7 OK wrong\r\n").await.unwrap();

    let err = client.await.unwrap();
    assert!(matches!(err, Error::ConnectionLost(_)), "{err}");
}

#[tokio::test]
async fn arguments_with_line_breaks_are_rejected_before_sending() {
    let (mut session, _server_r, _server_w) = started().await;
    let err = session.list("bad\r\nref", WILDCARD_ANY).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)), "{err}");
}
