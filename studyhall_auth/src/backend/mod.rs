//! Backend client adapter: one trait, two implementations
//!
//! [`connect`] selects between the REST client and the mock at startup based
//! on configuration; everything upstream works against [`BackendClient`].

mod client;
mod errors;
mod mock;
mod rest;
mod types;

pub use client::{BackendClient, connect, connect_with};
pub use errors::BackendError;
pub use mock::MockBackend;
pub use types::{AuthChange, AuthEvent, AuthOutcome, AuthUser, Session};
