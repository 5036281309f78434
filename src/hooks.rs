use async_trait::async_trait;

use crate::session::Identity;

/// Error type hook implementations may surface. Hook failures are
/// logged by the session layer and never block it.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Cart collaborator, called around session boundaries.
///
/// Registered by the embedding shell when a cart feature is present;
/// both calls are best-effort from the session layer's point of view.
#[async_trait]
pub trait CartSync: Send + Sync {
    /// Rebuild cart state for the restored user.
    async fn hydrate(&self, user: &Identity) -> Result<(), HookError>;

    /// Drop cart state tied to the session being torn down.
    async fn clear(&self) -> Result<(), HookError>;
}

/// Blocking notice shown when the server reports the account
/// deactivated. The session layer waits for [`acknowledged`] before
/// forcing logout, so the user sees why they are being signed out.
/// Without a registered notice the forced logout runs immediately.
///
/// [`acknowledged`]: DeactivationNotice::acknowledged
#[async_trait]
pub trait DeactivationNotice: Send + Sync {
    /// Resolves once the user has dismissed the notice.
    async fn acknowledged(&self);
}

/// Confirmation dialog for user-requested logout.
#[async_trait]
pub trait LogoutConfirm: Send + Sync {
    /// `true` to proceed with the logout.
    async fn confirm_logout(&self) -> bool;
}
