//! Service API bindings for the control-plane service groups.
//!
//! Each group (Compute, Network, Identity) is a set of stateless operations
//! over a `ServiceBinding`: a resolved base URL plus the bearer token baked
//! in at construction time. The session manager replaces whole group handles
//! on every token or interface change; nothing here mutates in place.

pub mod binding;
pub mod compute;
pub mod error;
pub mod identity;
pub mod network;

pub use binding::ServiceBinding;
pub use compute::ComputeApi;
pub use error::SessionError;
pub use identity::IdentityApi;
pub use network::NetworkApi;
