//! Reference creation and read workflows
//!
//! Creation runs as one fallible sequence: validate, resolve the target,
//! look for the counterpart, persist, republish the counterpart if it was
//! waiting, then notify. Any failing stage stops the rest. A write that
//! already landed stays; there is no rollback.

use std::collections::HashSet;
use std::sync::Arc;

use bson::oid::ObjectId;
use serde_json::Value;
use tracing::info;

use crate::db::schemas::{Recommend, ReferenceDoc};
use crate::directory::{UserDirectory, UserRecord};
use crate::notify::{EmailNotifier, PushNotifier};
use crate::reference::format::ListedReference;
use crate::reference::store::ReferenceStore;
use crate::reference::validate::CreateReferenceRequest;
use crate::types::{Result, VouchError};

/// Detail returned when a reply to an already-public reference is not positive
const ONLY_POSITIVE_DETAIL: &str =
    "Only a positive recommendation is allowed in response to a public reference.";

/// Coordinates validation, disclosure and notification for references
///
/// All collaborators are injected; the service holds no state of its own
/// beyond the handles.
pub struct ReferenceService {
    store: Arc<dyn ReferenceStore>,
    directory: Arc<dyn UserDirectory>,
    email: Arc<dyn EmailNotifier>,
    push: Arc<dyn PushNotifier>,
}

impl ReferenceService {
    pub fn new(
        store: Arc<dyn ReferenceStore>,
        directory: Arc<dyn UserDirectory>,
        email: Arc<dyn EmailNotifier>,
        push: Arc<dyn PushNotifier>,
    ) -> Self {
        Self {
            store,
            directory,
            email,
            push,
        }
    }

    /// Create a reference from `submitter` out of a raw JSON submission
    ///
    /// The first reference of a pair is stored private. A reply is stored
    /// public and republishes the waiting counterpart, so both sides go
    /// live in the same request.
    pub async fn create(&self, submitter: &UserRecord, payload: &Value) -> Result<ReferenceDoc> {
        let request = CreateReferenceRequest::parse(&submitter.id, payload)
            .map_err(VouchError::BadRequest)?;

        // A reference may only point at a publicly discoverable member
        let target = self
            .directory
            .find_user(request.user_to)
            .await?
            .filter(|user| user.public)
            .ok_or_else(|| {
                VouchError::NotFound("User to receive the reference was not found".into())
            })?;

        // The counterpart runs in the reply direction: target -> submitter
        let counterpart = self.store.find_one(request.user_to, submitter.id).await?;

        if let Some(ref other) = counterpart {
            // Once a reference is out in the open, a reply cannot drag
            // the pair down; anything but "yes" is refused
            if other.public && request.recommend != Some(Recommend::Yes) {
                return Err(VouchError::bad_request(ONLY_POSITIVE_DETAIL));
            }
        }

        let is_first = counterpart.is_none();
        let reference = self
            .store
            .insert(request.to_doc(submitter.id, !is_first))
            .await?;

        info!(
            "Reference {} created: {} -> {} (public: {}, first: {})",
            reference._id.map(|id| id.to_hex()).unwrap_or_default(),
            submitter.username,
            target.username,
            reference.public,
            is_first
        );

        // A reply publishes the counterpart that was waiting in private
        if let Some(other) = counterpart {
            if !other.public {
                if let Some(other_id) = other._id {
                    self.store.set_public(other_id).await?;
                    info!("Counterpart reference {} republished", other_id.to_hex());
                }
            }
        }

        // Exactly one email and one push per creation. A broken relay
        // fails the request, but the stored reference stays.
        if is_first {
            self.email.send_first(submitter, &target).await?;
        } else {
            self.email.send_second(submitter, &target, &reference).await?;
        }
        self.push.new_reference(submitter, &target, is_first).await?;

        Ok(reference)
    }

    /// Public references, optionally narrowed to either side of the pair
    pub async fn list_public(
        &self,
        user_from: Option<ObjectId>,
        user_to: Option<ObjectId>,
    ) -> Result<Vec<ListedReference>> {
        let references = self.store.find_public(user_from, user_to).await?;

        let ids: Vec<ObjectId> = {
            let mut seen = HashSet::new();
            references
                .iter()
                .flat_map(|reference| [reference.user_from, reference.user_to])
                .filter(|id| seen.insert(*id))
                .collect()
        };

        let profiles = self.directory.mini_profiles(&ids).await?;

        Ok(references
            .iter()
            .map(|reference| ListedReference::from_doc(reference, &profiles))
            .collect())
    }
}
