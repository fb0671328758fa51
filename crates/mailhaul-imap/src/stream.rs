//! TLS transport helpers.
//!
//! The session itself is transport-agnostic; this module provides the one
//! transport the tooling actually uses, implicit TLS on the IMAPS port.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::Result;

/// A TLS-wrapped TCP connection to an IMAP server.
pub type TlsTransport = TlsStream<TcpStream>;

/// Builds a TLS connector trusting the webpki root set.
#[must_use]
pub fn tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Connects to `host:port` and completes the TLS handshake.
pub async fn connect_tls(host: &str, port: u16) -> Result<TlsTransport> {
    let tcp = TcpStream::connect((host, port)).await?;
    let server_name = ServerName::try_from(host.to_string())?;
    Ok(tls_connector().connect(server_name, tcp).await?)
}
