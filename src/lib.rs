//! Vouch - mutual reference exchange for hospitality communities
//!
//! Members vouch for people they hosted or met. A reference stays private
//! until the other member writes one back, so neither side can read the
//! other's words before committing their own. Once both halves exist, both
//! become public together.
//!
//! ## Services
//!
//! - **References**: give-and-disclose exchange pipeline with a public listing
//! - **Directory**: member lookup backing auth and profile expansion
//! - **Notify**: email and push jobs published over NATS for delivery workers
//! - **Storage**: MongoDB persistence with a unique pair index as the
//!   concurrency backstop

pub mod auth;
pub mod config;
pub mod db;
pub mod directory;
pub mod nats;
pub mod notify;
pub mod reference;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, VouchError};
