pub mod account;
pub mod response;

pub use response::ApiResponse;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::identity::EXPIRED_MSG;
use crate::session::{LogoutReason, SessionContext, SessionEvent};

/// Path prefixes whose requests get the session treatment.
const GUARDED_PREFIXES: [&str; 3] = ["/api/", "/auth/", "/admin/"];

/// Auth endpoints passed through untouched, so caller-side error
/// handling (login forms, registration) sees the raw response.
const EXEMPT_PATHS: [&str; 4] = [
    "/auth/login",
    "/auth/register",
    "/auth/password-reset",
    "/admin/login",
];

fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

fn is_guarded(path: &str) -> bool {
    !is_exempt(path) && GUARDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Per-request options for [`ApiClient::send`].
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Typed HTTP client for the storefront API.
///
/// Every feature module sends through here, so bearer attachment and
/// the auth-failure policy live in exactly one place instead of being
/// repeated per call site. Requests to guarded paths are augmented
/// (bearer, cookie, request id, default JSON content type) and their
/// responses inspected; everything else passes through untouched.
#[derive(Clone)]
pub struct ApiClient {
    session: SessionContext,
}

impl ApiClient {
    pub fn new(session: &SessionContext) -> Self {
        Self {
            session: session.clone(),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::GET, path, RequestOptions::default())
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::DELETE, path, RequestOptions::default())
            .await
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<ApiResponse> {
        self.send_json(Method::POST, path, payload).await
    }

    pub async fn put_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<ApiResponse> {
        self.send_json(Method::PUT, path, payload).await
    }

    async fn send_json<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
    ) -> Result<ApiResponse> {
        let body = serde_json::to_vec(payload)?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.send(
            method,
            path,
            RequestOptions {
                headers,
                body: Some(body),
            },
        )
        .await
    }

    /// Send a request against the configured API origin.
    ///
    /// Guarded paths get the auth augmentation and response policy;
    /// exempt auth endpoints and paths outside the API namespace pass
    /// through both ways, including their 401s.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let url = self.session.config().base_url.join(path)?;
        let guarded = is_guarded(path);

        let mut headers = options.headers;
        if guarded {
            self.augment_headers(&mut headers, &method, options.body.is_some())
                .await?;
        }

        let mut request = self.session.inner.http.request(method.clone(), url.clone());
        request = request.headers(headers);
        if let Some(body) = options.body {
            request = request.body(body);
        }

        debug!(method = %method, url = %url, guarded, "dispatching API request");
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(method = %method, url = %url, error = %e, "transport failure");
                return Err(e.into());
            }
        };
        let response = ApiResponse::read(response).await?;

        if !guarded {
            return Ok(response);
        }
        self.inspect(path, response).await
    }

    async fn augment_headers(
        &self,
        headers: &mut HeaderMap,
        method: &Method,
        has_body: bool,
    ) -> Result<()> {
        // Bearer only when the caller has not set one
        if !headers.contains_key(AUTHORIZATION) {
            if let Some(token) = self.session.token().await {
                let bearer = format!("Bearer {}", token);
                headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer)?);
            }
        }

        // Same-origin credentials: the token cookie rides along while live
        if let Some(value) = self.session.inner.store.cookie_value() {
            let cookie = format!("token={}", value);
            headers.insert(COOKIE, HeaderValue::from_str(&cookie)?);
        }

        if has_body
            && matches!(*method, Method::POST | Method::PUT)
            && !headers.contains_key(CONTENT_TYPE)
        {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let request_id = Uuid::new_v4().to_string();
        headers.insert("X-Request-Id", HeaderValue::from_str(&request_id)?);
        Ok(())
    }

    /// Auth policy over guarded responses. 401 and the deactivation
    /// 403 never reach the caller as plain responses.
    async fn inspect(&self, path: &str, response: ApiResponse) -> Result<ApiResponse> {
        match response.status() {
            StatusCode::UNAUTHORIZED => {
                let failure = response.auth_failure();
                if failure.msg.as_deref() == Some(EXPIRED_MSG) {
                    debug!(path, "session expired on guarded path");
                } else {
                    warn!(
                        path,
                        detail = failure.msg.as_deref().unwrap_or("<none>"),
                        "unhandled 401 on guarded path; treating as expired session"
                    );
                }

                self.session.wipe().await;
                self.session.emit(SessionEvent::LoggedOut {
                    reason: LogoutReason::Expired,
                    redirect: true,
                });

                let detail = failure
                    .msg
                    .unwrap_or_else(|| "HTTP 401 on guarded path".to_string());
                Err(Error::SessionExpired { detail })
            }
            StatusCode::FORBIDDEN if response.auth_failure().is_account_inactive() => {
                warn!(path, "account deactivated; starting notice flow");
                self.session.begin_deactivation();
                Err(Error::AccountInactive)
            }
            _ => Ok(response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use mockito::{Matcher, Server};
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_guarded_paths() {
        assert!(is_guarded("/api/productos"));
        assert!(is_guarded("/api/carrito/items"));
        assert!(is_guarded("/auth/me"));
        assert!(is_guarded("/auth/logout"));
        assert!(is_guarded("/admin/orders"));
    }

    #[test]
    fn test_exempt_paths_not_guarded() {
        assert!(is_exempt("/auth/login"));
        assert!(is_exempt("/auth/register"));
        assert!(is_exempt("/auth/register/confirm"));
        assert!(is_exempt("/auth/password-reset"));
        assert!(is_exempt("/admin/login"));

        assert!(!is_guarded("/auth/login"));
        assert!(!is_guarded("/admin/login"));
    }

    #[test]
    fn test_lookalike_paths_stay_guarded() {
        // Prefix match must respect path segments
        assert!(!is_exempt("/auth/login-history"));
        assert!(is_guarded("/auth/login-history"));
    }

    #[test]
    fn test_outside_namespace_untouched() {
        assert!(!is_guarded("/static/img/banner.png"));
        assert!(!is_guarded("/"));
        assert!(!is_guarded("/productos"));
    }

    #[tokio::test]
    async fn test_guarded_request_carries_request_id_and_cookie() {
        let mut server = Server::new_async().await;
        let dir = tempdir().unwrap();

        let config = ClientConfig::new(server.url().parse().unwrap())
            .with_state_dir(dir.path())
            .with_logout_delay(Duration::from_millis(10));
        let ctx = SessionContext::builder(config).build().unwrap();
        ctx.set_token("tok-9").await.unwrap();

        let mock = server
            .mock("GET", "/api/perfil")
            .match_header("Authorization", Matcher::Exact("Bearer tok-9".into()))
            .match_header("Cookie", Matcher::Exact("token=tok-9".into()))
            .match_header("X-Request-Id", Matcher::Regex("[0-9a-f-]{36}".into()))
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&ctx);
        let response = client.get("/api/perfil").await.unwrap();
        assert!(response.is_success());
        mock.assert_async().await;
    }
}
