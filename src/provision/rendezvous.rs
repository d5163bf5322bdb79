//! Attached one-off dyno sessions
//!
//! A dyno started with `attach: true` hands back a `rendezvous://host:port/secret`
//! URL. Connecting over TLS and sending the secret yields the process output
//! until the dyno exits.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use tracing::debug;

use crate::domain::CliError;

const HANDSHAKE: &str = "rendezvous";

/// Where to connect and what to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendezvousTarget {
    pub host: String,
    pub port: u16,
    pub secret: String,
}

impl RendezvousTarget {
    pub fn parse(attach_url: &str) -> Result<Self, CliError> {
        let invalid = |reason: &str| {
            CliError::remote(200, format!("Invalid attach URL '{}': {}", attach_url, reason))
        };

        let url = Url::parse(attach_url).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "rendezvous" {
            return Err(invalid("expected the rendezvous scheme"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let port = url.port().ok_or_else(|| invalid("missing port"))?;
        let secret = url.path().trim_start_matches('/');
        if secret.is_empty() {
            return Err(invalid("missing secret"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            secret: secret.to_string(),
        })
    }
}

fn tls_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> CliError {
    CliError::network(err)
}

/// TLS client settings trusting only `roots`
pub fn client_config(roots: RootCertStore) -> Result<Arc<ClientConfig>, CliError> {
    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(tls_error)?
    .with_root_certificates(roots)
    .with_no_client_auth();

    Ok(Arc::new(config))
}

/// TLS client settings trusting the Mozilla root store
pub fn webpki_config() -> Result<Arc<ClientConfig>, CliError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    client_config(roots)
}

/// Connects to an attached dyno and returns everything it printed
pub fn read_session(
    attach_url: &str,
    tls: Arc<ClientConfig>,
    read_timeout: Duration,
) -> Result<String, CliError> {
    let target = RendezvousTarget::parse(attach_url)?;
    debug!(host = %target.host, port = target.port, "attaching to dyno");

    let server_name = ServerName::try_from(target.host.clone()).map_err(tls_error)?;
    let connection = ClientConnection::new(tls, server_name).map_err(tls_error)?;

    let socket = TcpStream::connect((target.host.as_str(), target.port)).map_err(tls_error)?;
    socket
        .set_read_timeout(Some(read_timeout))
        .map_err(tls_error)?;

    let mut stream = StreamOwned::new(connection, socket);
    stream
        .write_all(format!("{}\r\n", target.secret).as_bytes())
        .and_then(|_| stream.flush())
        .map_err(tls_error)?;

    let mut buf = Vec::new();
    match stream.read_to_end(&mut buf) {
        Ok(_) => {}
        // Heroku closes without close_notify once the process exits
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {}
        Err(e) => return Err(tls_error(e)),
    }

    Ok(strip_handshake(&String::from_utf8_lossy(&buf)).to_string())
}

/// Drops the leading handshake line, if present
pub fn strip_handshake(output: &str) -> &str {
    match output.strip_prefix(HANDSHAKE) {
        Some(rest) => rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest),
        None => output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use rustls::{ServerConfig, ServerConnection};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// A one-shot TLS listener standing in for the rendezvous service
    struct FakeDyno {
        port: u16,
        tls: Arc<ClientConfig>,
        handle: JoinHandle<String>,
    }

    impl FakeDyno {
        /// Answers the first connection with `output`, then hangs up
        fn start(output: &'static str, close_notify: bool) -> Self {
            let rcgen::CertifiedKey { cert, key_pair } =
                rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
            let cert_der = cert.der().clone();
            let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

            let server = ServerConfig::builder_with_provider(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der.clone()], key_der)
            .unwrap();

            let mut roots = RootCertStore::empty();
            roots.add(cert_der).unwrap();
            let tls = client_config(roots).unwrap();

            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let port = listener.local_addr().unwrap().port();
            let handle = thread::spawn(move || {
                let (socket, _) = listener.accept().unwrap();
                let conn = ServerConnection::new(Arc::new(server)).unwrap();
                let mut stream = StreamOwned::new(conn, socket);

                let mut line = Vec::new();
                let mut byte = [0u8; 1];
                while !line.ends_with(b"\r\n") {
                    stream.read_exact(&mut byte).unwrap();
                    line.push(byte[0]);
                }

                stream.write_all(output.as_bytes()).unwrap();
                if close_notify {
                    stream.conn.send_close_notify();
                }
                stream.flush().unwrap();
                String::from_utf8(line).unwrap()
            });

            Self { port, tls, handle }
        }

        fn attach_url(&self, secret: &str) -> String {
            format!("rendezvous://localhost:{}/{}", self.port, secret)
        }
    }

    #[test]
    fn session_sends_secret_and_strips_handshake() {
        let dyno = FakeDyno::start("rendezvous\r\nToken: abc123\r\n", true);
        let output = read_session(
            &dyno.attach_url("s3cret"),
            dyno.tls.clone(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(output, "Token: abc123\r\n");
        assert_eq!(dyno.handle.join().unwrap(), "s3cret\r\n");
    }

    #[test]
    fn session_tolerates_close_without_notify() {
        let dyno = FakeDyno::start("rendezvous\r\nCreated admin user\r\n", false);
        let output = read_session(
            &dyno.attach_url("abc"),
            dyno.tls.clone(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(output, "Created admin user\r\n");
        dyno.handle.join().unwrap();
    }

    #[test]
    fn untrusted_certificate_is_a_network_error() {
        let dyno = FakeDyno::start("rendezvous\r\n", true);
        let err = read_session(
            &dyno.attach_url("abc"),
            webpki_config().unwrap(),
            Duration::from_secs(5),
        )
        .unwrap_err();

        assert!(matches!(err, CliError::Network(_)));
    }

    #[test]
    fn refused_connection_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("rendezvous://127.0.0.1:{}/abc", port);
        let err = read_session(&url, webpki_config().unwrap(), Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, CliError::Network(_)));
    }

    #[test]
    fn parses_attach_url() {
        let target = RendezvousTarget::parse("rendezvous://rendezvous.runtime.heroku.com:5000/abc123").unwrap();
        assert_eq!(target.host, "rendezvous.runtime.heroku.com");
        assert_eq!(target.port, 5000);
        assert_eq!(target.secret, "abc123");
    }

    #[test]
    fn rejects_incomplete_urls() {
        assert!(RendezvousTarget::parse("rendezvous://host.example.com/abc").is_err());
        assert!(RendezvousTarget::parse("rendezvous://host.example.com:5000/").is_err());
        assert!(RendezvousTarget::parse("https://host.example.com:5000/abc").is_err());
        assert!(RendezvousTarget::parse("not a url").is_err());
    }

    #[test]
    fn strips_handshake_line() {
        assert_eq!(strip_handshake("rendezvous\r\nToken: abc\r\n"), "Token: abc\r\n");
        assert_eq!(strip_handshake("rendezvous\nhello"), "hello");
        assert_eq!(strip_handshake("hello"), "hello");
    }
}
