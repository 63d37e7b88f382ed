//! Credential storage for the session layer.
//!
//! `CredentialStore` holds the bearer token and its expiry as one atomic
//! unit. All staleness decisions (explicit calls, timer-driven checks,
//! renewal scheduling) go through it.

pub mod credentials;

pub use credentials::CredentialStore;
