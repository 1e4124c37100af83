//! HTTP server for the reference exchange API

pub mod http;

pub use http::{run, AppState};
