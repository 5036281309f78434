use chrono::Utc;
use tracing::{debug, warn};

use crate::session::{SessionContext, SessionEvent};
use crate::signal::LogoutSignal;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to sign out.
    UserRequested,
    /// The server rejected the token on a guarded request.
    Expired,
    /// The server reported the account deactivated.
    Deactivated,
    /// Another context logged out and this one converged.
    PeerSignal,
}

impl SessionContext {
    /// Safe logout: asks the confirmation collaborator first and
    /// returns whether the logout ran. Without a registered dialog the
    /// logout proceeds.
    pub async fn logout(&self) -> bool {
        if let Some(confirm) = self.inner.confirm.clone() {
            if !confirm.confirm_logout().await {
                debug!("logout cancelled at confirmation");
                return false;
            }
        } else {
            debug!("no logout confirmation registered; proceeding");
        }
        self.force_logout().await;
        true
    }

    /// Forced logout: unconditional client cleanup, best-effort server
    /// notification, then the redirect event. Client state is cleared
    /// whatever the server or the hooks do.
    pub async fn force_logout(&self) {
        self.force_logout_with(LogoutReason::UserRequested).await;
    }

    pub(crate) async fn force_logout_with(&self, reason: LogoutReason) {
        debug!(reason = ?reason, "logout started");

        // Dependent client state (cart) first, best-effort.
        match self.inner.cart.as_ref() {
            Some(cart) => {
                if let Err(e) = cart.clear().await {
                    warn!(error = %e, "cart clear failed during logout");
                }
            }
            None => debug!("no cart collaborator registered"),
        }

        // Snapshot the token for the server call, then clear every
        // mirror and the identity snapshot.
        let token = self.inner.store.get().await;
        self.wipe().await;

        // Durable logout timestamp plus the peer broadcast.
        let at = Utc::now();
        if let Err(e) = self.inner.durable.record_logout(at) {
            warn!(error = %e, "failed to record logout timestamp");
        }
        self.inner.signals.publish(LogoutSignal {
            at,
            origin: self.inner.id,
        });

        // Fire-and-forget server notification. Cleanup already
        // happened; an unreachable server changes nothing.
        match self.inner.config.base_url.join("/auth/logout") {
            Ok(url) => {
                let http = self.inner.http.clone();
                tokio::spawn(async move {
                    let mut request = http.post(url);
                    if let Some(token) = token {
                        request = request.bearer_auth(token);
                    }
                    if let Err(e) = request.send().await {
                        warn!(error = %e, "logout notification failed");
                    }
                });
            }
            Err(e) => warn!(error = %e, "could not build logout URL"),
        }

        // Leave the "logging out" state visible for a beat, then tell
        // the shell to replace navigation with the site root.
        tokio::time::sleep(self.inner.config.logout_delay).await;
        self.emit(SessionEvent::LoggedOut {
            reason,
            redirect: true,
        });
        debug!(reason = ?reason, "logout complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::hooks::LogoutConfirm;
    use crate::signal::{InProcessChannel, SignalChannel};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::time::timeout;

    fn test_config(dir: &std::path::Path) -> ClientConfig {
        // Nothing listens on this port; the notification task gets to fail
        ClientConfig::new("http://127.0.0.1:9".parse().unwrap())
            .with_state_dir(dir)
            .with_logout_delay(Duration::from_millis(10))
    }

    struct Decline;

    #[async_trait::async_trait]
    impl LogoutConfirm for Decline {
        async fn confirm_logout(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_force_logout_clears_even_with_dead_server() {
        let dir = tempdir().unwrap();
        let channel = Arc::new(InProcessChannel::new());
        let mut signals = channel.subscribe();

        let ctx = SessionContext::builder(test_config(dir.path()))
            .with_signal_channel(channel)
            .build()
            .unwrap();
        ctx.set_token("tok-1").await.unwrap();
        let mut events = ctx.subscribe();

        ctx.force_logout().await;

        assert!(!ctx.is_authenticated().await);
        assert!(ctx.identity().is_none());

        let event = timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            SessionEvent::LoggedOut { reason, redirect } => {
                assert_eq!(reason, LogoutReason::UserRequested);
                assert!(redirect);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let signal = timeout(Duration::from_secs(1), signals.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal.origin, ctx.context_id());
    }

    #[tokio::test]
    async fn test_logout_without_confirm_proceeds() {
        let dir = tempdir().unwrap();
        let ctx = SessionContext::builder(test_config(dir.path()))
            .build()
            .unwrap();
        ctx.set_token("tok-1").await.unwrap();

        assert!(ctx.logout().await);
        assert!(!ctx.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_logout_cancelled_keeps_session() {
        let dir = tempdir().unwrap();
        let ctx = SessionContext::builder(test_config(dir.path()))
            .with_logout_confirm(Arc::new(Decline))
            .build()
            .unwrap();
        ctx.set_token("tok-1").await.unwrap();

        assert!(!ctx.logout().await);
        assert!(ctx.is_authenticated().await);
    }
}
