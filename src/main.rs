mod message;
mod platform;
mod request;
mod response;

use std::io::{Read, Write};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::message::{expand_message_with, Environment, ProcessEnv};
use crate::platform::irc::IrcNotifier;
use crate::platform::Notifier;
use crate::request::parse_and_check_request;
use crate::response::{build_response, Response};

/// Run one `out` step: validate the request, expand the message, deliver it
/// unless this is a dry run, and summarize what was done.
async fn put<R, E, N>(input: R, env: &E, notifier: &N) -> Result<Response>
where
    R: Read,
    E: Environment + ?Sized,
    N: Notifier + ?Sized,
{
    let request = parse_and_check_request(input).context("Invalid resource request")?;
    let message = expand_message_with(&request, env);

    if request.params.dry_run {
        info!("Dry run, not sending message to {}", request.source.channel);
    } else {
        notifier
            .notify(&request, &message)
            .await
            .with_context(|| format!("Failed to notify {}", request.source.channel))?;
    }

    Ok(build_response(&request, &message))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging; stdout carries the resource response
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,irc_notification_resource=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let response = put(std::io::stdin().lock(), &ProcessEnv, &IrcNotifier::new()).await?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, &response).context("Failed to write response")?;
    writeln!(stdout).context("Failed to write response")?;
    Ok(())
}
