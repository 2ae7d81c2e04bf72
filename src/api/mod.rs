//! Backend API gateway.
//!
//! `ApiClient` is the only component that talks HTTP. The per-resource
//! modules are thin typed wrappers that validate input, unwrap the
//! backend's response envelopes and keep the session in step with
//! profile changes.

pub mod admin;
pub mod assets;
pub mod auth;
pub mod client;
pub mod doctors;
pub mod error;
pub mod patients;
pub mod prescriptions;
pub mod stats;

pub use client::{ApiClient, Body, RequestOptions};
pub use error::ApiError;
