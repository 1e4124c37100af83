//! Push notification channel
//!
//! Same relay arrangement as email: the service publishes a typed job,
//! workers fan out to the registered devices.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::directory::UserRecord;
use crate::nats::NatsClient;
use crate::types::{Result, VouchError};

/// Subject for push delivery jobs
pub const PUSH_SUBJECT: &str = "NOTIFY.PUSH";

/// Push delivery job published to NATS
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushJob {
    /// Recipient's user id
    pub user_id: String,

    /// Who wrote the reference
    pub actor_username: String,
    pub actor_display_name: String,

    /// True when this is the opening reference of the pair
    pub is_first: bool,
}

impl PushJob {
    pub fn new_reference(from: &UserRecord, to: &UserRecord, is_first: bool) -> Self {
        Self {
            user_id: to.id.to_hex(),
            actor_username: from.username.clone(),
            actor_display_name: from.display_name.clone(),
            is_first,
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<bytes::Bytes> {
        serde_json::to_vec(self)
            .map(Into::into)
            .map_err(|e| VouchError::Internal(format!("Failed to encode push job: {}", e)))
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| VouchError::Internal(format!("Failed to decode push job: {}", e)))
    }
}

/// Trait for the push channel - allows swapping implementations
#[async_trait::async_trait]
pub trait PushNotifier: Send + Sync {
    /// Tell the target a new reference involving them exists
    async fn new_reference(&self, from: &UserRecord, to: &UserRecord, is_first: bool)
        -> Result<()>;
}

/// NATS-relayed push channel
pub struct NatsPushNotifier {
    nats: NatsClient,
}

impl NatsPushNotifier {
    pub fn new(nats: NatsClient) -> Self {
        Self { nats }
    }
}

#[async_trait::async_trait]
impl PushNotifier for NatsPushNotifier {
    async fn new_reference(
        &self,
        from: &UserRecord,
        to: &UserRecord,
        is_first: bool,
    ) -> Result<()> {
        let job = PushJob::new_reference(from, to, is_first);
        self.nats.publish(PUSH_SUBJECT, job.to_bytes()?).await?;
        self.nats.flush().await?;
        info!("Published push job for {} to {}", job.user_id, PUSH_SUBJECT);
        Ok(())
    }
}

/// Log-only push channel for dev mode
pub struct LogPushNotifier;

#[async_trait::async_trait]
impl PushNotifier for LogPushNotifier {
    async fn new_reference(
        &self,
        from: &UserRecord,
        to: &UserRecord,
        is_first: bool,
    ) -> Result<()> {
        info!(
            "[dev] push new-reference: {} -> {} (is_first: {})",
            from.username, to.username, is_first
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    fn user(username: &str) -> UserRecord {
        UserRecord {
            id: ObjectId::new(),
            username: username.to_string(),
            display_name: format!("{} Display", username),
            email: format!("{}@example.com", username),
            public: true,
        }
    }

    #[test]
    fn test_push_job_wire_shape() {
        let from = user("ana");
        let to = user("bert");

        let value = serde_json::to_value(PushJob::new_reference(&from, &to, true)).unwrap();
        assert_eq!(value["userId"], to.id.to_hex());
        assert_eq!(value["actorUsername"], "ana");
        assert_eq!(value["isFirst"], true);
    }
}
