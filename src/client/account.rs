use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::client::{ApiClient, ApiResponse};
use crate::error::{Error, Result};
use crate::session::Identity;

/// Envelope of the session-validation endpoint.
#[derive(Debug, Deserialize)]
struct MeResponse {
    usuario: Identity,
}

/// Envelope of a successful login.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    usuario: Identity,
}

impl ApiClient {
    /// Log in against the realm's login endpoint. The path is exempt
    /// from the auth policy, so rejected credentials come back here
    /// (as [`Error::Credentials`]) instead of tripping the 401
    /// handling. On success the token lands in every mirror and a
    /// `Restored` event fires.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let path = self.session().config().realm.login_path();
        let response = self
            .post_json(path, &json!({ "email": email, "password": password }))
            .await?;

        if !response.is_success() {
            let failure = response.auth_failure();
            let detail = failure
                .msg
                .unwrap_or_else(|| format!("HTTP {}", response.status()));
            debug!(status = %response.status(), "login rejected");
            return Err(Error::Credentials(detail));
        }

        let login: LoginResponse = response.json()?;
        self.session().set_token(&login.token).await?;
        self.session().announce_restored(&login.usuario);
        info!(email = %login.usuario.email, "login succeeded");
        Ok(login.usuario)
    }

    /// Validate the stored session against the realm's `me` endpoint
    /// and rehydrate the identity snapshot. Run once at shell startup.
    ///
    /// Skipped without network traffic when no token is stored or the
    /// cookie mirror is dead: a durable token surviving a cookie
    /// clear is a leftover from a logout elsewhere, not a session.
    ///
    /// A rejected token is cleared quietly (no redirect, this runs on
    /// arbitrary pages); a transport failure leaves state untouched.
    pub async fn restore_session(&self) -> Result<Option<Identity>> {
        let Some(token) = self.session().token().await else {
            debug!("no stored token; skipping session restore");
            return Ok(None);
        };
        if self.session().inner.store.cookie_value().is_none() {
            debug!("cookie mirror is dead; skipping session restore");
            return Ok(None);
        }

        let config = self.session().config();
        let url = config.base_url.join(config.realm.me_path())?;

        // Straight through the inner client: the restorer must not
        // trip the 401 policy it exists to probe for.
        let response = match self
            .session()
            .inner
            .http
            .get(url)
            .bearer_auth(&token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "session validation unreachable");
                return Err(e.into());
            }
        };
        let response = ApiResponse::read(response).await?;

        if response.is_success() {
            let me: MeResponse = response.json()?;
            self.session().announce_restored(&me.usuario);
            if let Some(cart) = self.session().inner.cart.clone() {
                if let Err(e) = cart.hydrate(&me.usuario).await {
                    warn!(error = %e, "cart hydration failed after restore");
                }
            }
            info!(user_id = me.usuario.id, "session restored");
            return Ok(Some(me.usuario));
        }

        if response.status() == StatusCode::FORBIDDEN
            && response.auth_failure().is_account_inactive()
        {
            warn!("account deactivation discovered during restore");
            self.session().begin_deactivation();
            return Err(Error::AccountInactive);
        }

        debug!(status = %response.status(), "stored session rejected; clearing");
        self.session().wipe().await;
        Ok(None)
    }
}
