pub mod irc;

use anyhow::Result;
use async_trait::async_trait;

use crate::request::Request;

/// Delivers an already-expanded message to the destination in `request.source`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, request: &Request, message: &str) -> Result<()>;
}
