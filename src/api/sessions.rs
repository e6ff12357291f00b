use crate::models::now_ms;
use crate::view::{SessionFactory, SessionHandle};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "bitrate_session";

/// Sessions untouched for this long are unmounted.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct Entry {
    handle: Arc<SessionHandle>,
    last_seen: AtomicI64,
}

/// One page session per browser, keyed by the session cookie.
pub struct SessionRegistry {
    factory: SessionFactory,
    sessions: DashMap<String, Entry>,
    idle_timeout_ms: i64,
}

impl SessionRegistry {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            sessions: DashMap::new(),
            idle_timeout_ms: IDLE_TIMEOUT.as_millis() as i64,
        }
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = timeout.as_millis() as i64;
        self
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Finds the caller's session from its cookie. Unknown or missing ids
    /// get a freshly mounted session and a new cookie.
    pub fn resolve(&self, jar: CookieJar) -> (CookieJar, Arc<SessionHandle>) {
        let now = now_ms();

        if let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
            if let Some(entry) = self.sessions.get(&id) {
                entry.last_seen.store(now, Ordering::Relaxed);
                let handle = Arc::clone(&entry.handle);
                return (jar, handle);
            }
        }

        self.evict_idle(now);

        let id = Uuid::new_v4().to_string();
        let handle = Arc::new(self.factory.mount());
        self.sessions.insert(
            id.clone(),
            Entry {
                handle: Arc::clone(&handle),
                last_seen: AtomicI64::new(now),
            },
        );
        tracing::debug!(session = %id, active = self.sessions.len(), "session mounted for new client");

        let mut cookie = Cookie::new(SESSION_COOKIE, id);
        cookie.set_path("/");
        cookie.set_http_only(true);
        (jar.add(cookie), handle)
    }

    /// Unmounts every session, cancelling whatever they still run.
    pub fn close_all(&self) {
        for entry in self.sessions.iter() {
            entry.handle.close();
        }
        self.sessions.clear();
    }

    fn evict_idle(&self, now: i64) {
        self.sessions.retain(|id, entry| {
            let keep = now - entry.last_seen.load(Ordering::Relaxed) < self.idle_timeout_ms;
            if !keep {
                tracing::debug!(session = %id, "unmounting idle session");
                entry.handle.close();
            }
            keep
        });
    }
}
