//! Email notification channel
//!
//! The service never renders or sends mail itself. It publishes a typed
//! job to NATS and delivery workers own templates and transport.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::schemas::ReferenceDoc;
use crate::directory::UserRecord;
use crate::nats::NatsClient;
use crate::reference::format::ReferenceResponse;
use crate::types::{Result, VouchError};

/// Subject for email delivery jobs
pub const EMAIL_SUBJECT: &str = "NOTIFY.EMAIL";

/// Which mail the delivery worker should render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailTemplate {
    /// First reference of a pair: nudge the target to reply
    ReferenceNotificationFirst,
    /// Second reference of a pair: both sides are now published
    ReferenceNotificationSecond,
}

/// Identity fields the worker needs to address and render a mail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailParty {
    pub user_id: String,
    pub username: String,
    pub display_name: String,

    /// Present only on the recipient side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl EmailParty {
    fn recipient(user: &UserRecord) -> Self {
        Self {
            user_id: user.id.to_hex(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: Some(user.email.clone()),
        }
    }

    fn actor(user: &UserRecord) -> Self {
        Self {
            user_id: user.id.to_hex(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: None,
        }
    }
}

/// Email delivery job published to NATS
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailJob {
    pub template: EmailTemplate,

    /// Who wrote the reference
    pub from: EmailParty,

    /// Who receives the mail
    pub to: EmailParty,

    /// The reply that closed the pair, for the second-variant mail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceResponse>,
}

impl EmailJob {
    /// Job for the first reference of a pair
    pub fn first(from: &UserRecord, to: &UserRecord) -> Self {
        Self {
            template: EmailTemplate::ReferenceNotificationFirst,
            from: EmailParty::actor(from),
            to: EmailParty::recipient(to),
            reference: None,
        }
    }

    /// Job for the reply that published both sides
    pub fn second(from: &UserRecord, to: &UserRecord, reference: &ReferenceDoc) -> Self {
        Self {
            template: EmailTemplate::ReferenceNotificationSecond,
            from: EmailParty::actor(from),
            to: EmailParty::recipient(to),
            reference: Some(ReferenceResponse::from_doc(reference)),
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<bytes::Bytes> {
        serde_json::to_vec(self)
            .map(Into::into)
            .map_err(|e| VouchError::Internal(format!("Failed to encode email job: {}", e)))
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| VouchError::Internal(format!("Failed to decode email job: {}", e)))
    }
}

/// Trait for the email channel - allows swapping implementations
/// (log-only for dev, NATS relay for prod)
#[async_trait::async_trait]
pub trait EmailNotifier: Send + Sync {
    /// First reference of a pair: tell the target a reference is waiting
    async fn send_first(&self, from: &UserRecord, to: &UserRecord) -> Result<()>;

    /// Second reference of a pair: tell the original submitter both are live
    async fn send_second(
        &self,
        from: &UserRecord,
        to: &UserRecord,
        reference: &ReferenceDoc,
    ) -> Result<()>;
}

/// NATS-relayed email channel
pub struct NatsEmailNotifier {
    nats: NatsClient,
}

impl NatsEmailNotifier {
    pub fn new(nats: NatsClient) -> Self {
        Self { nats }
    }

    async fn publish(&self, job: EmailJob) -> Result<()> {
        let template = job.template;
        self.nats.publish(EMAIL_SUBJECT, job.to_bytes()?).await?;
        self.nats.flush().await?;
        info!("Published email job {:?} to {}", template, EMAIL_SUBJECT);
        Ok(())
    }
}

#[async_trait::async_trait]
impl EmailNotifier for NatsEmailNotifier {
    async fn send_first(&self, from: &UserRecord, to: &UserRecord) -> Result<()> {
        self.publish(EmailJob::first(from, to)).await
    }

    async fn send_second(
        &self,
        from: &UserRecord,
        to: &UserRecord,
        reference: &ReferenceDoc,
    ) -> Result<()> {
        self.publish(EmailJob::second(from, to, reference)).await
    }
}

/// Log-only email channel for dev mode
pub struct LogEmailNotifier;

#[async_trait::async_trait]
impl EmailNotifier for LogEmailNotifier {
    async fn send_first(&self, from: &UserRecord, to: &UserRecord) -> Result<()> {
        info!(
            "[dev] email reference-notification-first: {} -> {}",
            from.username, to.username
        );
        Ok(())
    }

    async fn send_second(
        &self,
        from: &UserRecord,
        to: &UserRecord,
        _reference: &ReferenceDoc,
    ) -> Result<()> {
        info!(
            "[dev] email reference-notification-second: {} -> {}",
            from.username, to.username
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
    fn test_first_job_wire_shape() {
        let from = user("ana");
        let to = user("bert");

        let value = serde_json::to_value(EmailJob::first(&from, &to)).unwrap();
        assert_eq!(value["template"], "reference-notification-first");
        assert_eq!(value["to"]["email"], "bert@example.com");
        assert_eq!(value["to"]["userId"], to.id.to_hex());
        // Actor side carries no address, and no reference is attached yet
        assert!(value["from"].get("email").is_none());
        assert!(value.get("reference").is_none());
    }

    #[test]
    fn test_second_job_carries_reference() {
        let from = user("ana");
        let to = user("bert");
        let reference = ReferenceDoc {
            _id: Some(ObjectId::new()),
            user_from: from.id,
            user_to: to.id,
            created: bson::DateTime::now(),
            met: true,
            hosted_me: false,
            hosted_them: false,
            recommend: Some(crate::db::Recommend::Yes),
            public: true,
        };

        let job = EmailJob::second(&from, &to, &reference);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["template"], "reference-notification-second");
        assert_eq!(value["reference"]["public"], true);
        assert_eq!(value["reference"]["recommend"], "yes");

        let decoded = EmailJob::from_bytes(&job.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.template, EmailTemplate::ReferenceNotificationSecond);
    }
}
