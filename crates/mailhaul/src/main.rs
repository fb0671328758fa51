#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

//! Download IMAP mailboxes into local mbox files.

mod config;
mod debug;
mod mbox;
mod netmon;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncRead, WriteHalf};
use tracing_subscriber::EnvFilter;

use mailhaul_imap::stream::TlsTransport;
use mailhaul_imap::{connect_tls, FetchEvent, Session, WILDCARD_ANY};

use crate::config::ImapConfig;
use crate::debug::DumpReader;
use crate::mbox::MboxWriter;
use crate::netmon::{BandwidthGauge, NetmonReader};

#[derive(Parser)]
#[command(name = "mailhaul")]
#[command(about = "Download IMAP mailboxes into local mbox files")]
struct Args {
    /// Echo every chunk read from the server
    #[arg(long)]
    dump_protocol: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available mailboxes
    List,

    /// Download a mailbox into <mailbox>.mbox
    Fetch {
        /// Mailbox to download
        mailbox: String,
    },
}

/// The read half, possibly wrapped by the dump and bandwidth readers.
type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type ImapSession = Session<BoxReader, WriteHalf<TlsTransport>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ImapConfig::from_env()?;

    match args.command {
        Command::List => cmd_list(&config, args.dump_protocol).await,
        Command::Fetch { mailbox } => cmd_fetch(&config, args.dump_protocol, &mailbox).await,
    }
}

/// Dials, greets, and logs in.
async fn connect(
    config: &ImapConfig,
    dump: bool,
    gauge: Option<&Arc<BandwidthGauge>>,
) -> anyhow::Result<ImapSession> {
    eprintln!("connecting to {}:{}...", config.host, config.port);
    let stream = connect_tls(&config.host, config.port)
        .await
        .with_context(|| format!("connect to {}:{}", config.host, config.port))?;
    let (read, write) = tokio::io::split(stream);

    let mut reader: BoxReader = Box::new(read);
    if dump {
        reader = Box::new(DumpReader::new(reader));
    }
    if let Some(gauge) = gauge {
        reader = Box::new(NetmonReader::new(reader, Arc::clone(gauge)));
    }

    let mut session = Session::new(reader, write);
    let hello = session.start().await?;
    eprintln!("server hello: {hello}");

    eprintln!("logging in...");
    let (text, caps) = session.login(&config.username, &config.password).await?;
    eprintln!("{text}");
    if !caps.is_empty() {
        eprintln!("server capabilities: {}", caps.join(" "));
    }

    Ok(session)
}

async fn cmd_list(config: &ImapConfig, dump: bool) -> anyhow::Result<()> {
    let mut session = connect(config, dump, None).await?;

    let mailboxes = session.list("", WILDCARD_ANY).await?;
    println!("Available mailboxes:");
    for mailbox in &mailboxes {
        println!("  {}", mailbox.name);
    }

    report_unsolicited(&mut session);
    Ok(())
}

async fn cmd_fetch(config: &ImapConfig, dump: bool, mailbox: &str) -> anyhow::Result<()> {
    let gauge = Arc::new(BandwidthGauge::default());
    let mut session = connect(config, dump, Some(&gauge)).await?;

    eprintln!("opening {mailbox}...");
    let examine = session.examine(mailbox).await?;
    eprintln!(
        "mailbox status: {} messages, {} recent",
        examine.exists, examine.recent
    );
    report_unsolicited(&mut session);

    if examine.exists == 0 {
        eprintln!("{mailbox} is empty; nothing to fetch");
        return Ok(());
    }

    let path = format!("{mailbox}.mbox");
    let file = File::create(&path).with_context(|| format!("create {path}"))?;
    let mut mbox = MboxWriter::new(BufWriter::new(file));

    let envelope_date = chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string();
    let query = format!("1:{}", examine.exists);
    eprintln!("requesting messages {query}");

    let mut events = session.fetch_async(&query, &["RFC822"]).await?;
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    let total = examine.exists;
    let mut fetched = 0u32;
    let mut progress = Progress::default();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(FetchEvent::Message(fetch)) => {
                    let body = fetch.rfc822.as_deref().unwrap_or_default();
                    mbox.write_message("mailhaul@none", &envelope_date, body)
                        .with_context(|| format!("write {path}"))?;
                    fetched += 1;
                    progress.update(&format!(
                        "fetching messages [{fetched}/{total}] [{:.1}k/s]",
                        gauge.bandwidth() / 1000.0
                    ));
                }
                Some(FetchEvent::Done(status)) => {
                    progress.finish(&format!("complete: {}", status.text));
                    break;
                }
                None => anyhow::bail!("fetch stream ended before the server finished"),
            },
            _ = ticker.tick() => {
                gauge.tick();
            }
        }
    }

    mbox.into_inner()
        .flush()
        .with_context(|| format!("flush {path}"))?;
    report_unsolicited(&mut session);
    eprintln!("wrote {path}");
    Ok(())
}

fn report_unsolicited(session: &mut ImapSession) {
    for response in session.drain_unsolicited() {
        tracing::debug!(?response, "unsolicited");
    }
}

/// Status line that overwrites itself while progress is running.
#[derive(Default)]
struct Progress {
    overprinting: bool,
}

impl Progress {
    fn update(&mut self, line: &str) {
        eprint!("\r\x1B[K{line}");
        let _ = std::io::stderr().flush();
        self.overprinting = true;
    }

    fn finish(&mut self, line: &str) {
        if self.overprinting {
            eprintln!();
        }
        eprintln!("{line}");
        self.overprinting = false;
    }
}
