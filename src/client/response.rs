use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::Result;
use crate::session::identity::INACTIVE_CODE;

/// Response envelope of the typed client: the status-checked outcome
/// plus the raw body, read off the wire once and parseable as many
/// times as callers need.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as text (lossy on invalid UTF-8).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Into::into)
    }

    /// Lenient view of an auth-failure body. Malformed or non-JSON
    /// bodies read as an empty failure, standing in for the enclosing
    /// status code.
    pub(crate) fn auth_failure(&self) -> ApiFailure {
        serde_json::from_slice(&self.body).unwrap_or_default()
    }
}

/// Auth-failure body shape: `{"msg": ...}` from the JWT layer on 401,
/// `{"code": ...}` from the account layer on 403.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiFailure {
    #[serde(default)]
    pub(crate) msg: Option<String>,
    #[serde(default)]
    pub(crate) code: Option<String>,
}

impl ApiFailure {
    pub(crate) fn is_account_inactive(&self) -> bool {
        self.code.as_deref() == Some(INACTIVE_CODE)
    }
}
