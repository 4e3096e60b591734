//! Live tracking sessions for in-flight deliveries.
//!
//! Sessions live in memory only; positions here are the high-frequency feed
//! for watchers, while the drivers table keeps the durable last-known
//! location. A session is owned by whoever holds its token.

use chrono::{DateTime, Utc};
use courier_core::geo::GeoPoint;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

/// One active tracking session.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingSession {
    pub delivery_id: String,
    /// Bearer-style token required to push updates or stop the session.
    pub token: String,
    pub last_position: Option<GeoPoint>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registry of live sessions, keyed by delivery id. Owned by the app state;
/// there is exactly one per process but nothing enforces or assumes that.
#[derive(Default)]
pub struct TrackingRegistry {
    sessions: DashMap<String, TrackingSession>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TrackingError {
    SessionExists,
    SessionNotFound,
    BadToken,
}

impl TrackingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session and hand back its token. Fails when the delivery is
    /// already being tracked; the existing session must be stopped first.
    pub fn start(&self, delivery_id: &str) -> Result<TrackingSession, TrackingError> {
        if self.sessions.contains_key(delivery_id) {
            return Err(TrackingError::SessionExists);
        }
        let now = Utc::now();
        let session = TrackingSession {
            delivery_id: delivery_id.to_string(),
            token: Uuid::new_v4().to_string(),
            last_position: None,
            started_at: now,
            updated_at: now,
        };
        self.sessions
            .insert(delivery_id.to_string(), session.clone());
        Ok(session)
    }

    /// Push a position update. The caller must present the session token.
    pub fn update(
        &self,
        delivery_id: &str,
        token: &str,
        position: GeoPoint,
    ) -> Result<TrackingSession, TrackingError> {
        let mut entry = self
            .sessions
            .get_mut(delivery_id)
            .ok_or(TrackingError::SessionNotFound)?;
        if entry.token != token {
            return Err(TrackingError::BadToken);
        }
        entry.last_position = Some(position);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    /// End a session. Token-gated like updates.
    pub fn stop(&self, delivery_id: &str, token: &str) -> Result<(), TrackingError> {
        let matches = {
            let entry = self
                .sessions
                .get(delivery_id)
                .ok_or(TrackingError::SessionNotFound)?;
            entry.token == token
        };
        if !matches {
            return Err(TrackingError::BadToken);
        }
        self.sessions.remove(delivery_id);
        Ok(())
    }

    /// Read a session without its token, for watchers.
    pub fn get(&self, delivery_id: &str) -> Option<TrackingSession> {
        self.sessions.get(delivery_id).map(|s| {
            let mut session = s.clone();
            session.token = String::new();
            session
        })
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_update_stop_lifecycle() {
        let registry = TrackingRegistry::new();
        let session = registry.start("del-1").unwrap();
        assert_eq!(registry.active_count(), 1);

        let updated = registry
            .update("del-1", &session.token, GeoPoint::new(37.77, -122.41))
            .unwrap();
        assert!(updated.last_position.is_some());

        registry.stop("del-1", &session.token).unwrap();
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let registry = TrackingRegistry::new();
        registry.start("del-1").unwrap();
        assert_eq!(registry.start("del-1").unwrap_err(), TrackingError::SessionExists);
    }

    #[test]
    fn wrong_token_cannot_update_or_stop() {
        let registry = TrackingRegistry::new();
        registry.start("del-1").unwrap();

        let err = registry
            .update("del-1", "bogus", GeoPoint::new(0.0, 0.0))
            .unwrap_err();
        assert_eq!(err, TrackingError::BadToken);
        assert_eq!(registry.stop("del-1", "bogus").unwrap_err(), TrackingError::BadToken);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn watcher_view_hides_the_token() {
        let registry = TrackingRegistry::new();
        registry.start("del-1").unwrap();
        let view = registry.get("del-1").unwrap();
        assert!(view.token.is_empty());
    }
}
