//! stratus - session and endpoint-resolution engine for OpenStack-style
//! control planes.
//!
//! The crate keeps a set of service-group clients (Compute, Network,
//! Identity) continuously usable against a multi-service control plane:
//! it obtains a bearer token, tracks its expiry, renews it in the
//! background before it lapses, retries failed authentications, resolves
//! per-service base URLs from the dynamic service catalog, and atomically
//! rebinds every live group handle whenever the token or the selected
//! endpoint interface (public/internal/admin) changes. A caller never
//! issues a request against a stale token or a stale base URL.
//!
//! ```no_run
//! use stratus::{password_credentials, EndpointInterface, Session, SessionConfig};
//!
//! # async fn run() -> Result<(), stratus::SessionError> {
//! let config = SessionConfig::new(
//!     "https://keystone.example:5000/v3",
//!     password_credentials("demo", "s3cret", "Default", Some("admin")),
//! );
//! let session = Session::new(config)?;
//! session.authenticate().await?;
//!
//! let servers = session.compute().list_servers().await?;
//! println!("{} servers", servers.len());
//!
//! // Repoint every group at the internal network path; the token is kept.
//! session.switch_endpoint_interface(EndpointInterface::Internal)?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod session;

pub use api::{ComputeApi, IdentityApi, NetworkApi, SessionError};
pub use auth::CredentialStore;
pub use catalog::{resolve_endpoint, Catalog, CatalogEntry, Endpoint, EndpointInterface, ServiceType};
pub use config::{password_credentials, SessionConfig};
pub use session::Session;
