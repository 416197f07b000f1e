//! TCP/TLS transport and the per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use grantbot_proto::IrcCodec;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_util::codec::Framed;
use tracing::{info, warn};

use crate::config::{Config, ServerAddr};
use crate::error::ConnectionError;
use crate::session::Session;

/// Pause between a connection ending and the next attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Keep one server connected forever.
pub async fn run_server(name: String, addr: ServerAddr, config: Arc<Config>) {
    loop {
        match connect(&name, &addr, Arc::clone(&config)).await {
            Ok(()) => info!(server = %name, "connection closed"),
            Err(e) => warn!(server = %name, error = %e, "connection failed"),
        }
        info!(server = %name, delay = ?RECONNECT_DELAY, "reconnecting");
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn connect(name: &str, addr: &ServerAddr, config: Arc<Config>) -> Result<(), ConnectionError> {
    info!(server = %name, addr = %addr, "connecting");
    let tcp = TcpStream::connect((addr.host.as_str(), addr.port)).await?;
    tcp.set_nodelay(true)?;

    if addr.tls {
        let tls = upgrade_to_tls(tcp, &addr.host).await?;
        drive(name, tls, config).await
    } else {
        drive(name, tcp, config).await
    }
}

/// Wrap `tcp` in TLS, verifying the server against the platform roots.
async fn upgrade_to_tls(
    tcp: TcpStream,
    hostname: &str,
) -> Result<TlsStream<TcpStream>, ConnectionError> {
    use tokio_rustls::TlsConnector;
    use tokio_rustls::rustls::pki_types::ServerName;
    use tokio_rustls::rustls::{ClientConfig, RootCertStore};

    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "failed to add root cert");
        }
    }
    for e in &certs.errors {
        warn!(error = %e, "error loading native certs");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|e| ConnectionError::ServerName(format!("{hostname}: {e}")))?;

    Ok(connector.connect(server_name, tcp).await?)
}

/// Run one session over an established stream until either side gives up.
///
/// Queued outgoing lines are written before the next inbound line is read,
/// so replies go out in the order handlers produced them.
pub async fn drive<S>(name: &str, stream: S, config: Arc<Config>) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, IrcCodec::new());
    let (mut session, mut outgoing) = Session::new(name, config);
    session.start()?;

    loop {
        tokio::select! {
            biased;

            Some(message) = outgoing.recv() => {
                framed.send(message).await?;
            }

            Some(outcome) = session.next_outcome() => {
                session.finish(outcome);
            }

            result = framed.next() => match result {
                Some(Ok(line)) => session.handle_line(line)?,
                Some(Err(e)) => return Err(e.into()),
                None => {
                    info!(server = %name, state = %session.state(), "server closed the connection");
                    return Ok(());
                }
            },
        }
    }
}
