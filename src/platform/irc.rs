use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

use crate::platform::Notifier;
use crate::request::{Request, Source};

/// Upper bound on connect + registration + delivery.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Bytes of message text per PRIVMSG. Leaves room under the 512-byte IRC
/// line limit for the command, channel and the prefix servers add on relay.
const MAX_TEXT_LEN: usize = 400;

/// Replies that mean the server refused our nick or credentials.
const REGISTRATION_ERRORS: &[&str] = &["431", "432", "433", "436", "464", "465"];

/// Split text into chunks of at most `max_len` bytes, preferring to break
/// after whitespace.
fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind(' ')
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(&text[start..actual_end]);
        start = actual_end;
    }

    chunks
}

/// IRC has no multi-line messages: one PRIVMSG per non-empty line.
fn message_lines(message: &str) -> Vec<&str> {
    message
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .flat_map(|line| split_message(line, MAX_TEXT_LEN))
        .collect()
}

/// Split a raw server line into its command and the remaining parameters,
/// dropping the optional `:prefix`.
fn parse_line(line: &str) -> (&str, &str) {
    let line = match line.strip_prefix(':') {
        Some(rest) => rest.split_once(' ').map(|(_, rest)| rest).unwrap_or(""),
        None => line,
    };
    line.split_once(' ').unwrap_or((line, ""))
}

/// One client conversation with an IRC server over any byte stream.
pub struct IrcSession<S> {
    stream: BufStream<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> IrcSession<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
        }
    }

    async fn send(&mut self, line: &str) -> Result<()> {
        if line.starts_with("PASS ") {
            debug!("-> PASS <redacted>");
        } else {
            debug!("-> {}", line);
        }
        self.stream
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .context("Failed to write to IRC server")?;
        self.stream
            .flush()
            .await
            .context("Failed to write to IRC server")
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self
            .stream
            .read_line(&mut line)
            .await
            .context("Failed to read from IRC server")?;
        if n == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        debug!("<- {}", line);
        Ok(Some(line))
    }

    /// Identify to the server and wait for the welcome reply.
    pub async fn register(&mut self, source: &Source) -> Result<()> {
        self.send(&format!("PASS {}", source.password)).await?;
        self.send(&format!("NICK {}", source.user)).await?;
        self.send(&format!("USER {} 0 * :{}", source.user, source.user))
            .await?;

        while let Some(line) = self.read_line().await? {
            let (command, params) = parse_line(&line);
            match command {
                "001" => {
                    info!("Registered with {} as {}", source.server, source.user);
                    return Ok(());
                }
                "PING" => self.send(&format!("PONG {}", params)).await?,
                "ERROR" => bail!("IRC server closed the connection: {}", line),
                code if REGISTRATION_ERRORS.contains(&code) => {
                    bail!("IRC server rejected registration: {}", line)
                }
                _ => {}
            }
        }

        bail!("Connection closed before registration completed")
    }

    /// Post `message` to the channel, joining and parting around it if asked.
    pub async fn deliver(&mut self, source: &Source, message: &str) -> Result<()> {
        if source.join {
            self.send(&format!("JOIN {}", source.channel)).await?;
        }

        let lines = message_lines(message);
        if lines.is_empty() {
            warn!("Expanded message is empty, nothing sent to {}", source.channel);
        }
        for line in &lines {
            self.send(&format!("PRIVMSG {} :{}", source.channel, line))
                .await?;
        }

        if source.join {
            self.send(&format!("PART {}", source.channel)).await?;
        }
        Ok(())
    }

    pub async fn quit(mut self) -> Result<()> {
        self.send("QUIT").await?;
        self.stream
            .shutdown()
            .await
            .context("Failed to close IRC connection")
    }

    /// Register, deliver and quit.
    pub async fn run(mut self, source: &Source, message: &str) -> Result<()> {
        self.register(source).await?;
        self.deliver(source, message).await?;
        self.quit().await
    }
}

fn tls_connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Sends notifications over a fresh IRC connection per message.
#[derive(Debug, Clone, Copy, Default)]
pub struct IrcNotifier;

impl IrcNotifier {
    pub fn new() -> Self {
        Self
    }

    async fn send(&self, source: &Source, message: &str) -> Result<()> {
        info!(
            "Connecting to {}:{} (tls: {})",
            source.server, source.port, source.use_tls
        );
        let tcp = TcpStream::connect((source.server.as_str(), source.port))
            .await
            .with_context(|| format!("Failed to connect to {}:{}", source.server, source.port))?;

        if source.use_tls {
            let server_name = ServerName::try_from(source.server.clone())
                .map_err(|e| anyhow!("Invalid TLS server name '{}': {}", source.server, e))?;
            let tls = tls_connector()
                .connect(server_name, tcp)
                .await
                .with_context(|| format!("TLS handshake with {} failed", source.server))?;
            IrcSession::new(tls).run(source, message).await
        } else {
            IrcSession::new(tcp).run(source, message).await
        }
    }
}

#[async_trait]
impl Notifier for IrcNotifier {
    async fn notify(&self, request: &Request, message: &str) -> Result<()> {
        let source = &request.source;
        tokio::time::timeout(DELIVERY_TIMEOUT, self.send(source, message))
            .await
            .with_context(|| {
                format!(
                    "Timed out after {}s delivering to {}:{}",
                    DELIVERY_TIMEOUT.as_secs(),
                    source.server,
                    source.port
                )
            })??;
        info!("Message delivered to {}", source.channel);
        Ok(())
    }
}
