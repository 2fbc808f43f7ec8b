use serde::{Deserialize, Serialize};

use crate::request::Request;

/// Version reported for every put; the resource has no real versions.
pub const NO_VERSION: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(rename = "ref")]
    pub reference: String,
}

impl Default for Version {
    fn default() -> Self {
        Self {
            reference: NO_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadatum {
    pub name: String,
    pub value: String,
}

impl Metadatum {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub version: Version,
    pub metadata: Vec<Metadatum>,
}

/// Summarize a put for the Concourse UI. The password is never included.
pub fn build_response(request: &Request, message: &str) -> Response {
    let source = &request.source;
    Response {
        version: Version::default(),
        metadata: vec![
            Metadatum::new("host", format!("{}:{}", source.server, source.port)),
            Metadatum::new("channel", source.channel.as_str()),
            Metadatum::new("user", source.user.as_str()),
            Metadatum::new("usetls", source.use_tls.to_string()),
            Metadatum::new("join", source.join.to_string()),
            Metadatum::new("message", message),
            Metadatum::new("dry_run", request.params.dry_run.to_string()),
        ],
    }
}
