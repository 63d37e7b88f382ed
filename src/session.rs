//! Session manager: the stateful core of the session layer.
//!
//! Owns the credential store, the last resolved catalog, and the three live
//! service-group handles. Performs authentication, schedules proactive
//! renewal and failure retries, and atomically rebinds every group handle
//! whenever the token or the selected endpoint interface changes.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use reqwest::{Client, Url};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::identity::{self, AuthOutcome};
use crate::api::{ComputeApi, IdentityApi, NetworkApi, ServiceBinding, SessionError};
use crate::auth::CredentialStore;
use crate::catalog::{
    resolve_endpoint, strip_version_segment, Catalog, CatalogEntry, EndpointInterface, ServiceType,
};
use crate::config::SessionConfig;

/// How long before a known expiry the proactive renewal fires.
const RENEWAL_LEAD_MINUTES: i64 = 5;

/// Default timeout for service-group operations. The authentication request
/// uses the much shorter `SessionConfig::request_timeout` instead.
const OPERATION_TIMEOUT_SECS: u64 = 30;

/// Mutable state shared between callers and the timer tasks. Handles are
/// `Arc`s swapped whole under the lock; a reader always sees a group's
/// pre-update or fully-post-update handle, never a half-built one.
struct Shared {
    catalog: Option<Catalog>,
    interface: EndpointInterface,
    compute: Arc<ComputeApi>,
    network: Arc<NetworkApi>,
    identity: Arc<IdentityApi>,
}

/// Owned timer handles. Scheduling a new timer of a kind aborts the
/// previous one of the same kind, so at most one renewal and one retry can
/// ever be pending.
#[derive(Default)]
struct Timers {
    periodic: Option<JoinHandle<()>>,
    renewal: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
}

impl Timers {
    fn replace(slot: &mut Option<JoinHandle<()>>, handle: Option<JoinHandle<()>>) {
        if let Some(old) = std::mem::replace(slot, handle) {
            old.abort();
        }
    }
}

struct Inner {
    client: Client,
    config: SessionConfig,
    store: CredentialStore,
    shared: RwLock<Shared>,
    /// Serializes authentication attempts: concurrent triggers queue here
    /// and coalesce on the freshness fast path instead of racing the store.
    auth_gate: tokio::sync::Mutex<()>,
    timers: Mutex<Timers>,
}

/// Handle to the session. Clone is cheap; all clones share one credential
/// store, one catalog, and one set of service-group handles.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Create a session and start the periodic expiry safety-net check.
    /// Must be called within a Tokio runtime.
    ///
    /// No authentication happens here. The three group handles start out
    /// bound to the configured auth URL without a token, mirroring how the
    /// identity binding must be callable before the first authentication;
    /// they are rebound from the catalog on the first successful
    /// [`authenticate`](Session::authenticate).
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(OPERATION_TIMEOUT_SECS))
            .build()?;

        let mut seed_url = Url::parse(&config.auth_url).map_err(|e| {
            SessionError::Config(format!("Invalid auth_url {:?}: {}", config.auth_url, e))
        })?;
        strip_version_segment(&mut seed_url);

        let seed = |url: &Url| ServiceBinding::new(client.clone(), url.clone(), None);
        let shared = Shared {
            catalog: None,
            interface: config.interface,
            compute: Arc::new(ComputeApi::new(seed(&seed_url))),
            network: Arc::new(NetworkApi::new(seed(&seed_url))),
            identity: Arc::new(IdentityApi::new(seed(&seed_url))),
        };

        let session = Self {
            inner: Arc::new(Inner {
                client,
                config,
                store: CredentialStore::new(),
                shared: RwLock::new(shared),
                auth_gate: tokio::sync::Mutex::new(()),
                timers: Mutex::new(Timers::default()),
            }),
        };

        session.start_periodic_check();
        Ok(session)
    }

    /// True when no token is held or its expiry has passed.
    pub fn is_token_expired(&self) -> bool {
        self.inner.store.is_expired()
    }

    /// The current bearer token, if authenticated.
    pub fn token(&self) -> Option<String> {
        self.inner.store.token()
    }

    /// Expiry of the current token. Tokens issued without an expiry report
    /// a far-future instant.
    pub fn token_expires_at(&self) -> Option<chrono::DateTime<Utc>> {
        self.inner.store.expires_at()
    }

    /// Live compute handle for the currently selected interface.
    pub fn compute(&self) -> Arc<ComputeApi> {
        self.inner.shared.read().compute.clone()
    }

    /// Live network handle for the currently selected interface.
    pub fn network(&self) -> Arc<NetworkApi> {
        self.inner.shared.read().network.clone()
    }

    /// Live identity handle for the currently selected interface.
    pub fn identity(&self) -> Arc<IdentityApi> {
        self.inner.shared.read().identity.clone()
    }

    /// Authenticate against the identity service and rebind all service
    /// groups from the returned catalog.
    ///
    /// No-op while the held token is still valid, so concurrent triggers
    /// (callers, the periodic check, a stale timer) coalesce instead of
    /// storming the identity endpoint. On success a proactive renewal is
    /// scheduled shortly before the token expires; on a retryable failure
    /// the credential is cleared, a background retry is scheduled, and the
    /// error is still returned to the caller.
    pub async fn authenticate(&self) -> Result<(), SessionError> {
        self.authenticate_inner(false).await
    }

    async fn authenticate_inner(&self, force: bool) -> Result<(), SessionError> {
        let _guard = self.inner.auth_gate.lock().await;

        if !force && !self.inner.store.is_expired() {
            debug!("token still valid, skipping authentication");
            return Ok(());
        }

        match self.try_authenticate().await {
            Ok(()) => {
                let mut timers = self.inner.timers.lock();
                Timers::replace(&mut timers.retry, None);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "authentication failed");
                if err.is_retryable() {
                    self.inner.store.clear();
                    let mut timers = self.inner.timers.lock();
                    Timers::replace(&mut timers.renewal, None);
                    drop(timers);
                    if self.inner.config.retry_on_failure {
                        self.schedule_retry();
                    }
                }
                Err(err)
            }
        }
    }

    async fn try_authenticate(&self) -> Result<(), SessionError> {
        let AuthOutcome {
            token,
            expires_at,
            catalog,
        } = identity::authenticate_raw(
            &self.inner.client,
            &self.inner.config.auth_url,
            &self.inner.config.credentials,
            self.inner.config.request_timeout,
        )
        .await?;

        self.inner.store.set(token, expires_at);

        let interface = {
            let mut shared = self.inner.shared.write();
            shared.catalog = Some(catalog.clone());
            shared.interface
        };
        self.rebuild_all(&catalog, interface)?;

        info!(interface = %interface, expires_at = ?expires_at, "authenticated");

        // Tokens without an expiry never need proactive renewal; a stale
        // renewal timer from a previous token must not outlive it either.
        let renew_delay = expires_at.and_then(|expires_at| {
            let renew_at = expires_at - chrono::Duration::minutes(RENEWAL_LEAD_MINUTES);
            (renew_at - Utc::now()).to_std().ok()
        });
        match renew_delay {
            Some(delay) => self.schedule_renewal(delay),
            None => {
                let mut timers = self.inner.timers.lock();
                Timers::replace(&mut timers.renewal, None);
            }
        }

        Ok(())
    }

    /// Rebind every service group from the given catalog at the given
    /// interface. Each group's swap is atomic at group granularity: a
    /// resolution failure surfaces to the caller, but groups already
    /// rebuilt keep their new bindings (no rollback).
    fn rebuild_all(
        &self,
        catalog: &[CatalogEntry],
        interface: EndpointInterface,
    ) -> Result<(), SessionError> {
        let token = self.inner.store.token();

        for service in ServiceType::ALL {
            let url = resolve_endpoint(catalog, service, interface)?;
            let binding = ServiceBinding::new(self.inner.client.clone(), url.clone(), token.clone());

            let mut shared = self.inner.shared.write();
            match service {
                ServiceType::Compute => shared.compute = Arc::new(ComputeApi::new(binding)),
                ServiceType::Network => shared.network = Arc::new(NetworkApi::new(binding)),
                ServiceType::Identity => shared.identity = Arc::new(IdentityApi::new(binding)),
            }
            debug!(service = %service, url = %url, "rebound service group");
        }

        Ok(())
    }

    /// Re-resolve every service group against the stored catalog at a new
    /// interface, without re-authenticating. The interface sticks: later
    /// re-authentications rebuild for it too.
    pub fn switch_endpoint_interface(
        &self,
        interface: EndpointInterface,
    ) -> Result<(), SessionError> {
        let catalog = {
            let mut shared = self.inner.shared.write();
            let catalog = shared.catalog.clone().ok_or(SessionError::NoCatalog)?;
            shared.interface = interface;
            catalog
        };

        info!(interface = %interface, "switching endpoint interface");
        self.rebuild_all(&catalog, interface).inspect_err(|err| {
            error!(error = %err, "interface switch failed");
        })
    }

    /// Stop the periodic check and any pending renewal or retry timer.
    /// Requests already in flight run to completion.
    pub fn shutdown(&self) {
        let mut timers = self.inner.timers.lock();
        Timers::replace(&mut timers.periodic, None);
        Timers::replace(&mut timers.renewal, None);
        Timers::replace(&mut timers.retry, None);
    }

    /// Safety net: if a scheduled renewal was lost (process suspension, a
    /// dropped timer), the token still gets refreshed within one interval
    /// of expiring. Idempotent with explicit calls via the freshness check.
    fn start_periodic_check(&self) {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.expiry_check_interval;

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(session) = Session::upgrade(&weak) else {
                    break;
                };
                if session.is_token_expired() {
                    debug!("periodic check found expired token");
                    if let Err(err) = session.authenticate().await {
                        warn!(error = %err, "periodic re-authentication failed");
                    }
                }
            }
        });

        let mut timers = self.inner.timers.lock();
        Timers::replace(&mut timers.periodic, Some(handle));
    }

    /// Schedule the proactive renewal, replacing any previous one.
    fn schedule_renewal(&self, delay: Duration) {
        debug!(delay_secs = delay.as_secs(), "scheduling token renewal");
        let weak = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(session) = Session::upgrade(&weak) else {
                return;
            };
            debug!("proactive renewal firing");
            // Forced: the token is still valid at this point by design.
            if let Err(err) = session.authenticate_inner(true).await {
                warn!(error = %err, "proactive renewal failed");
            }
        });

        let mut timers = self.inner.timers.lock();
        Timers::replace(&mut timers.renewal, Some(handle));
    }

    /// Schedule the reactive retry, replacing any previous one.
    fn schedule_retry(&self) {
        let delay = self.inner.config.retry_interval;
        debug!(delay_ms = delay.as_millis() as u64, "scheduling authentication retry");
        let weak = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(session) = Session::upgrade(&weak) else {
                return;
            };
            // A failure here schedules the next retry itself; attempts are
            // unbounded at a bounded rate.
            if let Err(err) = session.authenticate().await {
                warn!(error = %err, "authentication retry failed");
            }
        });

        let mut timers = self.inner.timers.lock();
        Timers::replace(&mut timers.retry, Some(handle));
    }

    /// Timer tasks hold only a weak reference so a dropped session does not
    /// keep itself alive through its own timers.
    fn upgrade(weak: &Weak<Inner>) -> Option<Session> {
        weak.upgrade().map(|inner| Session { inner })
    }
}
