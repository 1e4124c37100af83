//! Database layer for vouch
//!
//! Provides MongoDB storage for reference records and the user directory.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{Recommend, ReferenceDoc, UserDoc};
