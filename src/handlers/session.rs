use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::PendingVoter;

pub const SESSION_COOKIE: &str = "poll_session";
const SESSION_TTL_HOURS: i64 = 12;
const MAX_SESSIONS: usize = 10_000;

lazy_static! {
    static ref SESSION_ID: Regex =
        Regex::new(r"(?:^|;)\s*poll_session=([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\s*(?:;|$)")
            .expect("session cookie pattern");
}

// Per-client state kept between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub voter: Option<PendingVoter>,
    pub is_admin: bool,
}

impl Session {
    fn is_empty(&self) -> bool {
        self.voter.is_none() && !self.is_admin
    }
}

struct Entry {
    session: Session,
    touched_at: DateTime<Utc>,
}

// In-memory sessions keyed by the id in the poll_session cookie. Only ids the
// server minted are honoured; entries expire after `ttl` and the map never
// holds more than `capacity` of them.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(Duration::hours(SESSION_TTL_HOURS), MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookies| SESSION_ID.captures(cookies))
            .and_then(|captures| Uuid::parse_str(&captures[1]).ok())
    }

    // A missing, unknown or expired id gets a fresh one.
    pub async fn load(&self, headers: &HeaderMap) -> (Uuid, Session) {
        let now = Utc::now();
        if let Some(id) = Self::session_id(headers) {
            let sessions = self.sessions.read().await;
            if let Some(entry) = sessions.get(&id).filter(|entry| !self.expired(entry, now)) {
                return (id, entry.session.clone());
            }
        }
        (Uuid::new_v4(), Session::default())
    }

    // Drops the old id and returns a new one. Called whenever the session
    // gains privileges.
    pub async fn renew(&self, id: Uuid) -> Uuid {
        self.sessions.write().await.remove(&id);
        Uuid::new_v4()
    }

    pub async fn store(&self, id: Uuid, session: Session) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| !self.expired(entry, now));
        if sessions.len() < before {
            debug!("Evicted {} expired sessions", before - sessions.len());
        }

        if session.is_empty() {
            sessions.remove(&id);
            return;
        }

        if !sessions.contains_key(&id) && sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.touched_at)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
            }
        }

        sessions.insert(id, Entry { session, touched_at: now });
    }

    fn expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        entry.touched_at + self.ttl <= now
    }

    pub fn cookie(id: Uuid) -> HeaderValue {
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("poll_session=; Path=/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identifier;

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn voter(name: &str) -> Session {
        Session {
            voter: Some(PendingVoter {
                name: name.to_string(),
                identifier: Identifier::new("0123456789abcdef"),
            }),
            is_admin: false,
        }
    }

    #[test]
    fn finds_session_among_other_cookies() {
        let id = Uuid::new_v4();
        let headers = headers_with(&format!("theme=dark; poll_session={id}; lang=cs"));
        assert_eq!(SessionStore::session_id(&headers), Some(id));
    }

    #[test]
    fn ignores_garbage_and_lookalike_cookies() {
        assert_eq!(SessionStore::session_id(&headers_with("poll_session=nope")), None);
        let id = Uuid::new_v4();
        assert_eq!(
            SessionStore::session_id(&headers_with(&format!("old_poll_session={id}"))),
            None
        );
        assert_eq!(SessionStore::session_id(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn stored_session_round_trips_and_empty_session_is_dropped() {
        let store = SessionStore::new();
        let (id, session) = store.load(&HeaderMap::new()).await;
        assert_eq!(session, Session::default());

        let session = voter("Jana");
        store.store(id, session.clone()).await;

        let headers = headers_with(&format!("poll_session={id}"));
        assert_eq!(store.load(&headers).await, (id, session));

        store.store(id, Session::default()).await;
        assert!(store.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_cookie_id_is_replaced() {
        let store = SessionStore::new();
        let planted = Uuid::new_v4();
        let (id, session) = store.load(&headers_with(&format!("poll_session={planted}"))).await;
        assert_ne!(id, planted);
        assert_eq!(session, Session::default());
    }

    #[tokio::test]
    async fn renew_forgets_the_old_id() {
        let store = SessionStore::new();
        let (old, _) = store.load(&HeaderMap::new()).await;
        store.store(old, voter("Jana")).await;

        let new = store.renew(old).await;
        assert_ne!(new, old);
        let (id, session) = store.load(&headers_with(&format!("poll_session={old}"))).await;
        assert_ne!(id, old);
        assert_eq!(session, Session::default());
    }

    #[tokio::test]
    async fn expired_sessions_are_ignored_and_evicted() {
        let store = SessionStore::with_limits(Duration::hours(1), 100);
        let stale = Uuid::new_v4();
        store.sessions.write().await.insert(
            stale,
            Entry {
                session: voter("Jana"),
                touched_at: Utc::now() - Duration::hours(2),
            },
        );

        let (id, session) = store.load(&headers_with(&format!("poll_session={stale}"))).await;
        assert_ne!(id, stale);
        assert_eq!(session, Session::default());

        store.store(Uuid::new_v4(), voter("Eva")).await;
        let sessions = store.sessions.read().await;
        assert_eq!(sessions.len(), 1);
        assert!(!sessions.contains_key(&stale));
    }

    #[tokio::test]
    async fn abandoned_logins_stay_bounded() {
        let store = SessionStore::with_limits(Duration::hours(1), 3);
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            store.store(*id, voter("Jana")).await;
        }

        let sessions = store.sessions.read().await;
        assert_eq!(sessions.len(), 3);
        assert!(sessions.contains_key(&ids[4]));
    }

    #[test]
    fn cookie_is_http_only() {
        let id = Uuid::new_v4();
        let cookie = SessionStore::cookie(id);
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("poll_session={id}")));
        assert!(cookie.contains("HttpOnly"));
    }
}
