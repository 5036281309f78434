use std::sync::atomic::Ordering;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::{LogoutReason, SessionContext, SessionEvent};

/// Background task that converges this context when a peer logs out.
///
/// Subscribes to the context's signal channel. Signals from this
/// context itself are skipped (the writer never observes its own
/// broadcast); the first foreign signal clears local state and emits
/// the redirect event, after which the task ends: the context is
/// logged out and there is nothing left to watch. No server call is
/// made: the originator already sent the notification.
///
/// Installs at most once per context; a second call returns `None`.
pub fn spawn_logout_watcher(ctx: &SessionContext) -> Option<JoinHandle<()>> {
    if ctx.inner.watcher_installed.swap(true, Ordering::SeqCst) {
        debug!("logout watcher already installed for this context");
        return None;
    }

    let mut rx = ctx.inner.signals.subscribe();
    let ctx = ctx.clone();
    Some(tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(signal) if signal.origin == ctx.inner.id => {
                    // Own broadcast; peers handle it.
                    continue;
                }
                Ok(signal) => {
                    info!(
                        origin = %signal.origin,
                        at = %signal.at,
                        "peer logout observed; clearing local session"
                    );
                    ctx.wipe().await;
                    ctx.emit(SessionEvent::LoggedOut {
                        reason: LogoutReason::PeerSignal,
                        redirect: true,
                    });
                    break;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "logout watcher lagged behind signal channel");
                    continue;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }))
}
