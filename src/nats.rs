//! NATS connection for the notification relay.
//!
//! Vouch only publishes; delivery workers own the consuming side. Every
//! publish is paired with a flush by the callers so a dead broker fails the
//! submission instead of surfacing minutes later.

use async_nats::{connection::State, Client, ConnectOptions};
use bytes::Bytes;
use std::time::Duration;
use tracing::info;

use crate::config::NatsArgs;
use crate::types::VouchError;

#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect with a short timeout. No retry_on_initial_connect: startup
    /// should fail fast when the broker is missing, and the dev-mode caller
    /// decides whether that is fatal. Reconnects after a successful initial
    /// connection are handled by the client as usual.
    pub async fn new(args: &NatsArgs, name: &str) -> Result<Self, VouchError> {
        info!("Connecting to NATS at {}", args.nats_url);

        let mut options = ConnectOptions::new()
            .name(name)
            .ping_interval(Duration::from_secs(120))
            .connection_timeout(Duration::from_secs(5));

        if let (Some(user), Some(pass)) = (&args.nats_user, &args.nats_password) {
            options = options.user_and_password(user.clone(), pass.clone());
        }

        let client = options
            .connect(&args.nats_url)
            .await
            .map_err(|e| VouchError::Nats(format!("Failed to connect: {}", e)))?;

        info!("NATS connection established");

        Ok(Self { client })
    }

    pub async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), VouchError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| VouchError::Nats(format!("Publish failed: {}", e)))
    }

    pub async fn flush(&self) -> Result<(), VouchError> {
        self.client
            .flush()
            .await
            .map_err(|e| VouchError::Nats(format!("Flush failed: {}", e)))
    }

    /// Current connection state, for health reporting
    pub fn is_connected(&self) -> bool {
        self.client.connection_state() == State::Connected
    }
}

#[cfg(test)]
mod tests {
    // Needs a live broker; docker-compose.dev.yml brings one up locally.
}
