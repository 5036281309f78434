use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::storage::{CookieMirror, DurableStore};

/// Session token mirrored across three storage scopes: a volatile
/// in-process slot, the durable state file, and the `token` cookie.
///
/// `set` and `clear` keep the mirrors consistent. Clearing also drops
/// the cached identity snapshot; no flow clears the token and keeps
/// the identity. An external clear of a single mirror (a cookie wiped
/// by another context's logout) is caught by the restore precondition,
/// not here.
#[derive(Debug, Clone)]
pub struct TokenStore {
    volatile: Arc<RwLock<Option<String>>>,
    durable: Arc<DurableStore>,
    cookie: Arc<CookieMirror>,
}

impl TokenStore {
    /// Wrap the two persistent mirrors. The volatile slot starts from
    /// the durable value so a fresh context joins an existing session.
    pub fn new(durable: Arc<DurableStore>, cookie: Arc<CookieMirror>) -> Self {
        let initial = durable.token();
        Self {
            volatile: Arc::new(RwLock::new(initial)),
            durable,
            cookie,
        }
    }

    /// Current token: the volatile slot, falling back to the durable
    /// mirror.
    pub async fn get(&self) -> Option<String> {
        if let Some(token) = self.volatile.read().await.clone() {
            return Some(token);
        }
        self.durable.token()
    }

    /// Install a token in all three mirrors.
    pub async fn set(&self, token: &str) -> Result<()> {
        {
            let mut volatile = self.volatile.write().await;
            *volatile = Some(token.to_string());
        }
        self.durable.set_token(token)?;
        self.cookie.set(token)?;
        debug!("session token installed in all mirrors");
        Ok(())
    }

    /// Clear every mirror and the identity snapshot. All mirrors are
    /// attempted even when one fails; the first failure is returned.
    pub async fn clear(&self) -> Result<()> {
        {
            let mut volatile = self.volatile.write().await;
            *volatile = None;
        }
        let durable_res = self.durable.clear_session();
        let cookie_res = self.cookie.clear();
        debug!("session token cleared from all mirrors");
        durable_res.and(cookie_res)
    }

    /// Live value of the cookie mirror. The restore precondition and
    /// the request `Cookie` header read this directly.
    pub fn cookie_value(&self) -> Option<String> {
        self.cookie.value()
    }
}
