//! The reference domain
//!
//! Validation, the disclosure workflow, persistence and response shaping.

pub mod format;
pub mod service;
pub mod store;
pub mod validate;

pub use format::{ErrorBody, ListedReference, ReferenceResponse};
pub use service::ReferenceService;
pub use store::{MemoryReferenceStore, MongoReferenceStore, ReferenceStore};
pub use validate::CreateReferenceRequest;
