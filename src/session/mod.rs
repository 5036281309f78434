pub mod identity;
pub mod logout;
pub mod token_store;
pub mod watcher;

pub use identity::Identity;
pub use logout::LogoutReason;
pub use token_store::TokenStore;
pub use watcher::spawn_logout_watcher;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::hooks::{CartSync, DeactivationNotice, LogoutConfirm};
use crate::signal::{InProcessChannel, SignalChannel};
use crate::storage::{CookieMirror, DurableStore};

/// Session lifecycle notifications, consumed by UI collaborators
/// (nav rendering, cart hydration, the shell's router).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session was validated or created and the identity is fresh.
    Restored { user: Identity },
    /// The session ended. `redirect: true` asks the shell to replace
    /// navigation with the site root, so back-navigation cannot return
    /// to an authenticated view.
    LoggedOut { reason: LogoutReason, redirect: bool },
}

pub(crate) struct SessionInner {
    pub(crate) id: Uuid,
    pub(crate) config: ClientConfig,
    pub(crate) store: TokenStore,
    pub(crate) durable: Arc<DurableStore>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
    pub(crate) signals: Arc<dyn SignalChannel>,
    pub(crate) cart: Option<Arc<dyn CartSync>>,
    pub(crate) notice: Option<Arc<dyn DeactivationNotice>>,
    pub(crate) confirm: Option<Arc<dyn LogoutConfirm>>,
    pub(crate) http: reqwest::Client,
    pub(crate) watcher_installed: AtomicBool,
}

/// One authenticated surface of the storefront: token store, event
/// bus, peer signal channel and UI hooks behind a cheap-to-clone
/// handle. Constructed once per shell by [`SessionBuilder`]; tests
/// build as many as they need.
#[derive(Clone)]
pub struct SessionContext {
    pub(crate) inner: Arc<SessionInner>,
}

impl SessionContext {
    pub fn builder(config: ClientConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Identifier of this context as a logout-signal origin.
    pub fn context_id(&self) -> Uuid {
        self.inner.id
    }

    /// Whether a session token is present in any mirror. Presence is
    /// not validity; the server has the last word via
    /// [`restore_session`](crate::client::ApiClient::restore_session).
    pub async fn is_authenticated(&self) -> bool {
        self.inner.store.get().await.is_some()
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.store.get().await
    }

    /// Install a token in all mirrors (login happened elsewhere, e.g.
    /// an external flow handing the token over).
    pub async fn set_token(&self, token: &str) -> Result<()> {
        self.inner.store.set(token).await
    }

    /// Last cached identity snapshot.
    pub fn identity(&self) -> Option<Identity> {
        self.inner.durable.identity()
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // Ignore if no receivers.
        let _ = self.inner.events.send(event);
    }

    /// Clear token mirrors and the identity snapshot. In-memory state
    /// always clears; file-write failures are logged and swallowed.
    pub(crate) async fn wipe(&self) {
        if let Err(e) = self.inner.store.clear().await {
            warn!(
                error = %e,
                "failed to persist session wipe; in-memory state is cleared"
            );
        }
    }

    /// Persist the identity snapshot and notify collaborators that the
    /// session is live.
    pub(crate) fn announce_restored(&self, user: &Identity) {
        if let Err(e) = self.inner.durable.set_identity(user) {
            warn!(error = %e, "failed to cache identity snapshot");
        }
        debug!(user_id = user.id, email = %user.email, "session restored");
        self.emit(SessionEvent::Restored { user: user.clone() });
    }

    /// Deactivated-account handoff: wait for the notice collaborator
    /// to be acknowledged, then force logout. Runs on its own task so
    /// the request that discovered the deactivation can return.
    pub(crate) fn begin_deactivation(&self) {
        let ctx = self.clone();
        tokio::spawn(async move {
            if let Some(notice) = ctx.inner.notice.clone() {
                notice.acknowledged().await;
            } else {
                warn!("no deactivation notice registered; forcing logout immediately");
            }
            ctx.force_logout_with(LogoutReason::Deactivated).await;
        });
    }
}

/// Builder for [`SessionContext`]. Hooks and the signal channel are
/// optional; everything else comes from the [`ClientConfig`].
pub struct SessionBuilder {
    config: ClientConfig,
    signals: Option<Arc<dyn SignalChannel>>,
    cart: Option<Arc<dyn CartSync>>,
    notice: Option<Arc<dyn DeactivationNotice>>,
    confirm: Option<Arc<dyn LogoutConfirm>>,
}

impl SessionBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            signals: None,
            cart: None,
            notice: None,
            confirm: None,
        }
    }

    /// Share a signal channel between contexts (peer logout sync). A
    /// context without one gets a private in-process channel and hears
    /// no peers.
    #[must_use]
    pub fn with_signal_channel(mut self, channel: Arc<dyn SignalChannel>) -> Self {
        self.signals = Some(channel);
        self
    }

    #[must_use]
    pub fn with_cart_sync(mut self, cart: Arc<dyn CartSync>) -> Self {
        self.cart = Some(cart);
        self
    }

    #[must_use]
    pub fn with_deactivation_notice(mut self, notice: Arc<dyn DeactivationNotice>) -> Self {
        self.notice = Some(notice);
        self
    }

    #[must_use]
    pub fn with_logout_confirm(mut self, confirm: Arc<dyn LogoutConfirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn build(self) -> Result<SessionContext> {
        let durable = Arc::new(DurableStore::open(&self.config.state_dir)?);
        let cookie = Arc::new(CookieMirror::open(&self.config.state_dir)?);
        let store = TokenStore::new(Arc::clone(&durable), cookie);

        let http = reqwest::Client::builder()
            .timeout(self.config.request_timeout)
            .build()?;

        let (events, _) = broadcast::channel(32);
        let signals = self
            .signals
            .unwrap_or_else(|| Arc::new(InProcessChannel::new()));

        let id = Uuid::new_v4();
        debug!(context_id = %id, realm = ?self.config.realm, "session context created");

        Ok(SessionContext {
            inner: Arc::new(SessionInner {
                id,
                config: self.config,
                store,
                durable,
                events,
                signals,
                cart: self.cart,
                notice: self.notice,
                confirm: self.confirm,
                http,
                watcher_installed: AtomicBool::new(false),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn test_config(dir: &Path) -> ClientConfig {
        ClientConfig::new("http://127.0.0.1:5000".parse().unwrap())
            .with_state_dir(dir)
            .with_logout_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_set_token_authenticates() {
        let dir = tempdir().unwrap();
        let ctx = SessionContext::builder(test_config(dir.path()))
            .build()
            .unwrap();

        assert!(!ctx.is_authenticated().await);
        ctx.set_token("tok-1").await.unwrap();
        assert!(ctx.is_authenticated().await);
        assert_eq!(ctx.token().await.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_contexts_share_state_via_dir() {
        let dir = tempdir().unwrap();
        let first = SessionContext::builder(test_config(dir.path()))
            .build()
            .unwrap();
        first.set_token("tok-shared").await.unwrap();

        let second = SessionContext::builder(test_config(dir.path()))
            .build()
            .unwrap();
        assert!(second.is_authenticated().await);
        assert_ne!(first.context_id(), second.context_id());
    }

    #[tokio::test]
    async fn test_restored_event_reaches_subscriber() {
        let dir = tempdir().unwrap();
        let ctx = SessionContext::builder(test_config(dir.path()))
            .build()
            .unwrap();
        let mut events = ctx.subscribe();

        let user = Identity {
            id: 9,
            email: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            role: None,
        };
        ctx.announce_restored(&user);

        match events.recv().await.unwrap() {
            SessionEvent::Restored { user: restored } => assert_eq!(restored, user),
            other => panic!("unexpected event: {other:?}"),
        }
        // Snapshot cached for later reads
        assert_eq!(ctx.identity().unwrap().id, 9);
    }

    #[tokio::test]
    async fn test_wipe_clears_token_and_identity() {
        let dir = tempdir().unwrap();
        let ctx = SessionContext::builder(test_config(dir.path()))
            .build()
            .unwrap();
        ctx.set_token("tok-1").await.unwrap();
        ctx.announce_restored(&Identity {
            id: 1,
            email: "x@example.com".to_string(),
            name: "X".to_string(),
            role: None,
        });

        ctx.wipe().await;
        assert!(!ctx.is_authenticated().await);
        assert!(ctx.identity().is_none());
    }
}
