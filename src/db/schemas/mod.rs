//! Database schemas for vouch
//!
//! Defines MongoDB document structures for references and users.

mod reference;
mod user;

pub use reference::{Recommend, ReferenceDoc, REFERENCE_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
