use serde::Deserialize;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    /// A required key was absent (or an empty string).
    #[error("No {0} was provided")]
    MissingField(&'static str),
    #[error("Failed to decode request: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Failed to read request: {0}")]
    Io(#[from] std::io::Error),
}

/// Where and as whom to post the notification.
#[derive(Clone, PartialEq, Eq)]
pub struct Source {
    pub server: String,
    pub port: u16,
    pub channel: String,
    pub user: String,
    pub password: String,
    pub use_tls: bool,
    pub join: bool,
}

// Hand-written so the password can't leak through `{:?}` in logs.
impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("channel", &self.channel)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("use_tls", &self.use_tls)
            .field("join", &self.join)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    /// Message template, expanded by [`crate::message::expand_message`].
    pub message: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub source: Source,
    pub params: Params,
}

// Wire shapes. Every field is an `Option` so that an absent key (or a JSON
// null) is distinguishable from a zero, empty or false value.

#[derive(Debug, Deserialize, Default)]
struct RawRequest {
    source: Option<RawSource>,
    params: Option<RawParams>,
}

#[derive(Debug, Deserialize, Default)]
struct RawSource {
    server: Option<String>,
    port: Option<u16>,
    channel: Option<String>,
    user: Option<String>,
    password: Option<String>,
    usetls: Option<bool>,
    join: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct RawParams {
    message: Option<String>,
    dry_run: Option<bool>,
}

fn default_use_tls() -> bool {
    true
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RequestError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(RequestError::MissingField(field))
}

/// Decode a resource request and make sure every required field is present.
///
/// Fields are checked in a fixed order (server, port, channel, user,
/// password, then message) and the first missing one is reported.
pub fn parse_and_check_request<R: Read>(mut reader: R) -> Result<Request, RequestError> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    let raw: RawRequest = serde_json::from_str(&content)?;

    let RawSource {
        server,
        port,
        channel,
        user,
        password,
        usetls,
        join,
    } = raw.source.unwrap_or_default();
    let params = raw.params.unwrap_or_default();

    let server = required(server, "server")?;
    let port = port.ok_or(RequestError::MissingField("port"))?;
    let channel = required(channel, "channel")?;
    let user = required(user, "user")?;
    let password = required(password, "password")?;
    let message = required(params.message, "message")?;

    Ok(Request {
        source: Source {
            server,
            port,
            channel,
            user,
            password,
            use_tls: usetls.unwrap_or_else(default_use_tls),
            join: join.unwrap_or(false),
        },
        params: Params {
            message,
            dry_run: params.dry_run.unwrap_or(false),
        },
    })
}
