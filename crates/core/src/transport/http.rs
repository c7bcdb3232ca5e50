//! Hand-rolled HTTP/1.1 exchange over tokio, with optional TLS.
//!
//! One call performs the whole conversation: resolve, connect within a
//! budget, handshake if the scheme demands it, write the request, read a
//! bounded response, shut the stream down gracefully.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use url::Url;

use crate::config::HttpMethod;

use super::error::NetworkError;
use super::response;
use super::traits::Transport;

/// Budget for TCP connect plus TLS handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(120);
/// Budget for writing the request and reading the full response; model
/// inference can take minutes.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(600);
/// Upper bound on the received response, head included.
const MAX_RESPONSE_BYTES: usize = 128_000;

/// Headers the transport always writes itself; user-supplied duplicates
/// are dropped rather than doubled.
const RESERVED_HEADERS: [&str; 4] = ["host", "user-agent", "content-length", "connection"];

/// HTTP(S) client for the chat endpoint.
pub struct HttpTransport {
    connect_timeout: Duration,
    response_timeout: Duration,
    max_response_bytes: usize,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            response_timeout: RESPONSE_TIMEOUT,
            max_response_bytes: MAX_RESPONSE_BYTES,
        }
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, budget: Duration) -> Self {
        self.connect_timeout = budget;
        self
    }

    pub fn with_response_timeout(mut self, budget: Duration) -> Self {
        self.response_timeout = budget;
        self
    }

    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    /// Runs the post-connect part of the conversation: the exchange under
    /// the response budget, then a graceful shutdown.
    async fn complete_exchange<S>(
        &self,
        mut stream: S,
        host: &str,
        request: &[u8],
    ) -> Result<String, NetworkError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let body = timeout(self.response_timeout, self.exchange(&mut stream, host, request))
            .await
            .map_err(|_| NetworkError::ResponseTimeout {
                host: host.to_string(),
                seconds: self.response_timeout.as_secs(),
            })??;
        self.close(&mut stream, host).await?;
        Ok(body)
    }

    /// Writes the request and reads the response off `stream`.
    async fn exchange<S>(
        &self,
        stream: &mut S,
        host: &str,
        request: &[u8],
    ) -> Result<String, NetworkError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream
            .write_all(request)
            .await
            .map_err(|source| NetworkError::Write {
                host: host.to_string(),
                source,
            })?;
        stream.flush().await.map_err(|source| NetworkError::Write {
            host: host.to_string(),
            source,
        })?;
        tracing::info!(host, "request sent, waiting for response");

        let mut buf: Vec<u8> = Vec::with_capacity(8 * 1024);
        let head_end = loop {
            if let Some(end) = response::find_head_end(&buf) {
                break end;
            }
            if buf.len() > self.max_response_bytes {
                return Err(NetworkError::ResponseTooLarge {
                    host: host.to_string(),
                    limit: self.max_response_bytes,
                });
            }
            let received = self.read_some(stream, &mut buf, host).await?;
            if received == 0 {
                return Err(NetworkError::MalformedResponse {
                    host: host.to_string(),
                    reason: "connection closed before the response head was complete".to_string(),
                });
            }
        };

        let head = response::parse_head(&buf[..head_end - 4]).map_err(|reason| {
            NetworkError::MalformedResponse {
                host: host.to_string(),
                reason,
            }
        })?;

        let mut body = buf.split_off(head_end);
        let budget = self.max_response_bytes.saturating_sub(head_end);

        if head.chunked {
            self.read_to_eof(stream, &mut body, budget, host).await?;
            body = response::decode_chunked(&body).map_err(|reason| {
                NetworkError::MalformedResponse {
                    host: host.to_string(),
                    reason,
                }
            })?;
        } else if let Some(length) = head.content_length {
            if length > budget {
                return Err(NetworkError::ResponseTooLarge {
                    host: host.to_string(),
                    limit: self.max_response_bytes,
                });
            }
            while body.len() < length {
                let received = self.read_some(stream, &mut body, host).await?;
                if received == 0 {
                    return Err(NetworkError::MalformedResponse {
                        host: host.to_string(),
                        reason: "connection closed before the declared body length".to_string(),
                    });
                }
            }
            body.truncate(length);
        } else {
            // No framing information: the peer signals the end by
            // closing, which Connection: close guarantees.
            self.read_to_eof(stream, &mut body, budget, host).await?;
        }

        tracing::info!(
            host,
            status = head.status,
            bytes = body.len(),
            "response received"
        );
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn read_some<S>(
        &self,
        stream: &mut S,
        buf: &mut Vec<u8>,
        host: &str,
    ) -> Result<usize, NetworkError>
    where
        S: AsyncRead + Unpin,
    {
        let mut chunk = [0u8; 4096];
        let received = stream
            .read(&mut chunk)
            .await
            .map_err(|source| NetworkError::Read {
                host: host.to_string(),
                source,
            })?;
        buf.extend_from_slice(&chunk[..received]);
        Ok(received)
    }

    async fn read_to_eof<S>(
        &self,
        stream: &mut S,
        buf: &mut Vec<u8>,
        budget: usize,
        host: &str,
    ) -> Result<(), NetworkError>
    where
        S: AsyncRead + Unpin,
    {
        loop {
            if buf.len() > budget {
                return Err(NetworkError::ResponseTooLarge {
                    host: host.to_string(),
                    limit: self.max_response_bytes,
                });
            }
            if self.read_some(stream, buf, host).await? == 0 {
                return Ok(());
            }
        }
    }

    async fn close<S>(&self, stream: &mut S, host: &str) -> Result<(), NetworkError>
    where
        S: AsyncWrite + Unpin,
    {
        tracing::debug!(host, "closing connection");
        match stream.shutdown().await {
            Ok(()) => Ok(()),
            // After Connection: close the peer often hangs up first, and
            // a TLS peer may drop the link without a close_notify; both
            // are expected shapes of "already disconnected".
            Err(error)
                if matches!(
                    error.kind(),
                    std::io::ErrorKind::NotConnected
                        | std::io::ErrorKind::UnexpectedEof
                        | std::io::ErrorKind::BrokenPipe
                ) =>
            {
                tracing::debug!(host, error = %error, "peer already closed the connection");
                Ok(())
            }
            Err(source) => Err(NetworkError::Shutdown {
                host: host.to_string(),
                source,
            }),
        }
    }
}

/// Serializes the request head and body.
///
/// The target is the URL path only and the host header carries no port,
/// matching what the summarization endpoints expect.
fn build_request(
    url: &Url,
    method: HttpMethod,
    headers: &[(String, String)],
    body: &str,
    host: &str,
) -> Vec<u8> {
    use std::fmt::Write as _;

    let mut head = String::with_capacity(256);
    let _ = write!(head, "{} {} HTTP/1.1\r\n", method.as_str(), url.path());
    let _ = write!(head, "Host: {host}\r\n");
    let _ = write!(
        head,
        "User-Agent: tube-digest/{}\r\n",
        env!("CARGO_PKG_VERSION")
    );
    let _ = write!(head, "Content-Length: {}\r\n", body.len());
    head.push_str("Connection: close\r\n");
    for (name, value) in headers {
        if RESERVED_HEADERS
            .iter()
            .any(|reserved| name.eq_ignore_ascii_case(reserved))
        {
            continue;
        }
        let _ = write!(head, "{name}: {value}\r\n");
    }
    head.push_str("\r\n");

    let mut request = head.into_bytes();
    request.extend_from_slice(body.as_bytes());
    request
}

async fn connect_any(
    addrs: &[SocketAddr],
    host: &str,
    port: u16,
) -> Result<TcpStream, NetworkError> {
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(error) => last_error = Some(error),
        }
    }
    Err(NetworkError::Connect {
        host: host.to_string(),
        port,
        source: last_error.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "no address to connect to")
        }),
    })
}

fn tls_config() -> Arc<ClientConfig> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
    Arc::clone(CONFIG.get_or_init(|| {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Arc::new(
            ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        )
    }))
}

async fn handshake(tcp: TcpStream, host: &str) -> Result<TlsStream<TcpStream>, NetworkError> {
    let server_name =
        ServerName::try_from(host.to_string()).map_err(|_| NetworkError::InvalidServerName {
            host: host.to_string(),
        })?;
    let connector = TlsConnector::from(tls_config());
    connector
        .connect(server_name, tcp)
        .await
        .map_err(|source| NetworkError::Handshake {
            host: host.to_string(),
            source,
        })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        url: &Url,
        method: HttpMethod,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<String, NetworkError> {
        let scheme = url.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(NetworkError::UnsupportedScheme { scheme });
        }
        let host = url
            .host_str()
            .ok_or(NetworkError::MissingHost)?
            .to_string();
        let port = url
            .port_or_known_default()
            .unwrap_or(if scheme == "https" { 443 } else { 80 });

        tracing::debug!(host = host.as_str(), port, "resolving chat endpoint");
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|source| NetworkError::Resolve {
                host: host.clone(),
                port,
                source,
            })?
            .collect();
        if addrs.is_empty() {
            return Err(NetworkError::NoAddresses { host, port });
        }

        let request = build_request(url, method, headers, body, &host);
        let connect_seconds = self.connect_timeout.as_secs();

        if scheme == "https" {
            let stream = timeout(self.connect_timeout, async {
                let tcp = connect_any(&addrs, &host, port).await?;
                tracing::debug!(host = host.as_str(), "connected, starting TLS handshake");
                handshake(tcp, &host).await
            })
            .await
            .map_err(|_| NetworkError::ConnectTimeout {
                host: host.clone(),
                port,
                seconds: connect_seconds,
            })??;
            tracing::debug!(host = host.as_str(), "TLS session established");
            self.complete_exchange(stream, &host, &request).await
        } else {
            let stream = timeout(self.connect_timeout, connect_any(&addrs, &host, port))
                .await
                .map_err(|_| NetworkError::ConnectTimeout {
                    host: host.clone(),
                    port,
                    seconds: connect_seconds,
                })??;
            tracing::debug!(host = host.as_str(), "connected");
            self.complete_exchange(stream, &host, &request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn post_url(addr: SocketAddr) -> Url {
        Url::parse(&format!("http://{addr}/api/chat")).unwrap()
    }

    /// Accepts one connection, reads the request until `expected_body`
    /// has arrived, answers with `response` and returns the raw request.
    async fn one_shot_server(
        listener: TcpListener,
        expected_body: &'static str,
        response: Vec<u8>,
    ) -> tokio::task::JoinHandle<Vec<u8>> {
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            loop {
                let mut chunk = [0u8; 1024];
                let received = socket.read(&mut chunk).await.unwrap();
                assert!(received > 0, "client closed before sending full request");
                request.extend_from_slice(&chunk[..received]);
                if response::find_head_end(&request).is_some()
                    && request.ends_with(expected_body.as_bytes())
                {
                    break;
                }
            }
            socket.write_all(&response).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        })
    }

    #[test]
    fn test_build_request_shape() {
        let url = Url::parse("http://127.0.0.1:11434/api/chat").unwrap();
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        let request = build_request(&url, HttpMethod::Post, &headers, "{\"p\":1}", "127.0.0.1");
        let text = String::from_utf8(request).unwrap();

        assert!(text.starts_with("POST /api/chat HTTP/1.1\r\n"));
        assert!(text.contains("Host: 127.0.0.1\r\n"));
        assert!(text.contains("User-Agent: tube-digest/"));
        assert!(text.contains("Content-Length: 7\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"p\":1}"));
    }

    #[test]
    fn test_build_request_drops_conflicting_user_headers() {
        let url = Url::parse("http://example.com/api/chat").unwrap();
        let headers = vec![
            ("Host".to_string(), "spoofed".to_string()),
            ("X-Extra".to_string(), "kept".to_string()),
        ];
        let request = build_request(&url, HttpMethod::Post, &headers, "", "example.com");
        let text = String::from_utf8(request).unwrap();

        assert!(text.contains("Host: example.com\r\n"));
        assert!(!text.contains("spoofed"));
        assert!(text.contains("X-Extra: kept\r\n"));
    }

    #[tokio::test]
    async fn test_send_round_trip_with_content_length() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let payload = r#"{"message":{"content":"Summary."}}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            payload.len(),
            payload
        );
        let server = one_shot_server(listener, "{\"p\":1}", response.into_bytes()).await;

        let transport = HttpTransport::new();
        let headers = vec![("X-Test".to_string(), "yes".to_string())];
        let body = transport
            .send(&post_url(addr), HttpMethod::Post, &headers, "{\"p\":1}")
            .await
            .unwrap();
        assert_eq!(body, payload);

        let request = String::from_utf8(server.await.unwrap()).unwrap();
        assert!(request.starts_with("POST /api/chat HTTP/1.1\r\n"));
        assert!(request.contains("Host: 127.0.0.1\r\n"));
        assert!(request.contains("X-Test: yes\r\n"));
    }

    #[tokio::test]
    async fn test_send_reads_body_until_eof_without_content_length() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = b"HTTP/1.1 200 OK\r\n\r\nplain body until close".to_vec();
        let server = one_shot_server(listener, "x", response).await;

        let transport = HttpTransport::new();
        let body = transport
            .send(&post_url(addr), HttpMethod::Post, &[], "x")
            .await
            .unwrap();
        assert_eq!(body, "plain body until close");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_decodes_chunked_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response =
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n"
                .to_vec();
        let server = one_shot_server(listener, "x", response).await;

        let transport = HttpTransport::new();
        let body = transport
            .send(&post_url(addr), HttpMethod::Post, &[], "x")
            .await
            .unwrap();
        assert_eq!(body, "hello world");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_returns_body_for_error_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 5\r\n\r\noops!".to_vec();
        let server = one_shot_server(listener, "x", response).await;

        let transport = HttpTransport::new();
        let body = transport
            .send(&post_url(addr), HttpMethod::Post, &[], "x")
            .await
            .unwrap();
        assert_eq!(body, "oops!");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_rejects_oversized_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: 4096\r\n\r\n{}",
            "a".repeat(4096)
        );
        let server = one_shot_server(listener, "x", response.into_bytes()).await;

        let transport = HttpTransport::new().with_max_response_bytes(256);
        let err = transport
            .send(&post_url(addr), HttpMethod::Post, &[], "x")
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::ResponseTooLarge { .. }));
        server.abort();
    }

    #[tokio::test]
    async fn test_send_rejects_non_http_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = b"SSH-2.0-OpenSSH_9.0\r\n\r\n".to_vec();
        let server = one_shot_server(listener, "x", response).await;

        let transport = HttpTransport::new();
        let err = transport
            .send(&post_url(addr), HttpMethod::Post, &[], "x")
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::MalformedResponse { .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_rejects_unsupported_scheme() {
        let transport = HttpTransport::new();
        let url = Url::parse("ftp://example.com/file").unwrap();
        let err = transport
            .send(&url, HttpMethod::Get, &[], "")
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::UnsupportedScheme { scheme } if scheme == "ftp"));
    }

    #[tokio::test]
    async fn test_send_reports_refused_connection() {
        // Bind to reserve a port, then drop the listener so the connect
        // is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new();
        let err = transport
            .send(&post_url(addr), HttpMethod::Post, &[], "x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Connect { .. } | NetworkError::ConnectTimeout { .. }
        ));
    }
}
