use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::error::{Error, Result};

const COOKIE_NAME: &str = "token";
const COOKIE_FILE: &str = "cookie.txt";
const COOKIE_TTL_DAYS: i64 = 7;

/// The `token` cookie mirror, kept in Set-Cookie notation on disk so the
/// attributes (`Path=/`, `SameSite=Lax`, 7-day expiry) travel with the
/// value. Clearing writes a removal cookie the way a browser would see
/// an immediate expiry.
#[derive(Debug)]
pub struct CookieMirror {
    path: PathBuf,
    current: RwLock<Option<Cookie<'static>>>,
}

impl CookieMirror {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| Error::storage(dir, e))?;
        let path = dir.join(COOKIE_FILE);
        let current = Self::load(&path);
        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    fn load(path: &Path) -> Option<Cookie<'static>> {
        let raw = fs::read_to_string(path).ok()?;
        let parsed = Cookie::parse(raw.trim().to_string()).ok()?;
        if parsed.name() != COOKIE_NAME {
            return None;
        }
        Some(parsed)
    }

    /// Set the token cookie with the storefront's standard attributes.
    pub fn set(&self, value: &str) -> Result<()> {
        let cookie = Cookie::build((COOKIE_NAME, value.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .max_age(Duration::days(COOKIE_TTL_DAYS))
            .expires(OffsetDateTime::now_utc() + Duration::days(COOKIE_TTL_DAYS))
            .build();
        self.store(cookie)
    }

    /// Replace the cookie with a removal cookie (immediate expiry).
    pub fn clear(&self) -> Result<()> {
        let removal = Cookie::build((COOKIE_NAME, ""))
            .path("/")
            .same_site(SameSite::Lax)
            .max_age(Duration::ZERO)
            .build();
        self.store(removal)
    }

    /// Current cookie value, or `None` when the mirror holds no live
    /// cookie (absent, cleared, or past its expiry).
    pub fn value(&self) -> Option<String> {
        let guard = match self.current.read() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        guard
            .as_ref()
            .filter(|c| is_live(c))
            .map(|c| c.value().to_string())
    }

    fn store(&self, cookie: Cookie<'static>) -> Result<()> {
        fs::write(&self.path, cookie.to_string()).map_err(|e| Error::storage(&self.path, e))?;
        debug!(path = %self.path.display(), "token cookie persisted");
        let mut guard = match self.current.write() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        *guard = Some(cookie);
        Ok(())
    }
}

fn is_live(cookie: &Cookie<'_>) -> bool {
    if cookie.value().is_empty() {
        return false;
    }
    if let Some(age) = cookie.max_age() {
        if age <= Duration::ZERO {
            return false;
        }
    }
    match cookie.expires_datetime() {
        Some(at) => at > OffsetDateTime::now_utc(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_then_value() {
        let dir = tempdir().unwrap();
        let mirror = CookieMirror::open(dir.path()).unwrap();

        mirror.set("tok-123").unwrap();
        assert_eq!(mirror.value().as_deref(), Some("tok-123"));

        let raw = fs::read_to_string(dir.path().join(COOKIE_FILE)).unwrap();
        assert!(raw.starts_with("token=tok-123"));
        assert!(raw.contains("SameSite=Lax"));
        assert!(raw.contains("Path=/"));
        assert!(raw.contains("Max-Age=604800"));
    }

    #[test]
    fn test_clear_writes_removal_cookie() {
        let dir = tempdir().unwrap();
        let mirror = CookieMirror::open(dir.path()).unwrap();

        mirror.set("tok-123").unwrap();
        mirror.clear().unwrap();
        assert!(mirror.value().is_none());

        let raw = fs::read_to_string(dir.path().join(COOKIE_FILE)).unwrap();
        assert!(raw.contains("Max-Age=0"));
    }

    #[test]
    fn test_reload_from_disk() {
        let dir = tempdir().unwrap();
        {
            let mirror = CookieMirror::open(dir.path()).unwrap();
            mirror.set("tok-456").unwrap();
        }
        let reopened = CookieMirror::open(dir.path()).unwrap();
        assert_eq!(reopened.value().as_deref(), Some("tok-456"));
    }

    #[test]
    fn test_reload_after_clear_is_dead() {
        let dir = tempdir().unwrap();
        {
            let mirror = CookieMirror::open(dir.path()).unwrap();
            mirror.set("tok-456").unwrap();
            mirror.clear().unwrap();
        }
        let reopened = CookieMirror::open(dir.path()).unwrap();
        assert!(reopened.value().is_none());
    }

    #[test]
    fn test_expired_cookie_is_dead() {
        let dir = tempdir().unwrap();
        let expired = Cookie::build((COOKIE_NAME, "stale"))
            .path("/")
            .expires(OffsetDateTime::now_utc() - Duration::days(1))
            .build();
        fs::write(dir.path().join(COOKIE_FILE), expired.to_string()).unwrap();

        let mirror = CookieMirror::open(dir.path()).unwrap();
        assert!(mirror.value().is_none());
    }

    #[test]
    fn test_foreign_cookie_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(COOKIE_FILE), "other=value; Path=/").unwrap();

        let mirror = CookieMirror::open(dir.path()).unwrap();
        assert!(mirror.value().is_none());
    }
}
