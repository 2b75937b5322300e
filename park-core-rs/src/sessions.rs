//! Session ledger
//!
//! One entry per registration currently in the lot. A session is opened at
//! registration, closed (phase `Billed`) when the bill is generated and ended
//! when the bill is paid.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ParkingError;
use crate::types::{SessionPhase, VehicleSession};

#[derive(Debug, Default, Clone)]
pub struct SessionLedger {
    sessions: BTreeMap<String, VehicleSession>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from previously persisted sessions
    pub fn from_sessions(sessions: impl IntoIterator<Item = VehicleSession>) -> Self {
        Self {
            sessions: sessions
                .into_iter()
                .map(|s| (s.registration.clone(), s))
                .collect(),
        }
    }

    /// Record a new session. Fails if the registration already has one, billed or not.
    pub fn open(&mut self, session: VehicleSession) -> Result<(), ParkingError> {
        if self.sessions.contains_key(&session.registration) {
            return Err(ParkingError::AlreadyActive(session.registration));
        }

        debug!(
            "Sessions: Opened {} ({}) at {}",
            session.registration, session.category, session.entry_time
        );
        self.sessions.insert(session.registration.clone(), session);
        Ok(())
    }

    pub fn get(&self, registration: &str) -> Option<&VehicleSession> {
        self.sessions.get(registration)
    }

    /// The session for `registration` if it has not been billed yet
    pub fn get_active(&self, registration: &str) -> Result<&VehicleSession, ParkingError> {
        self.sessions
            .get(registration)
            .filter(|s| s.is_active())
            .ok_or_else(|| ParkingError::SessionNotFound(registration.to_string()))
    }

    pub fn contains(&self, registration: &str) -> bool {
        self.sessions.contains_key(registration)
    }

    /// Active -> Billed
    pub fn close(&mut self, registration: &str) -> Result<(), ParkingError> {
        let session = self
            .sessions
            .get_mut(registration)
            .filter(|s| s.is_active())
            .ok_or_else(|| ParkingError::SessionNotFound(registration.to_string()))?;

        session.phase = SessionPhase::Billed;
        debug!("Sessions: Closed {} for billing", registration);
        Ok(())
    }

    /// Drop the session entirely once the stay is settled
    pub fn end(&mut self, registration: &str) -> Result<VehicleSession, ParkingError> {
        let session = self
            .sessions
            .remove(registration)
            .ok_or_else(|| ParkingError::SessionNotFound(registration.to_string()))?;

        debug!("Sessions: Ended {}", registration);
        Ok(session)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleSession> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VehicleInfo;
    use chrono::{TimeZone, Utc};

    fn session(reg: &str) -> VehicleSession {
        let vehicle = VehicleInfo::new(reg, "Ravi", "9000000000", "car").unwrap();
        VehicleSession::open(vehicle, Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_open_rejects_duplicate() {
        let mut ledger = SessionLedger::new();
        ledger.open(session("KA01AB1234")).unwrap();

        assert!(matches!(
            ledger.open(session("KA01AB1234")),
            Err(ParkingError::AlreadyActive(r)) if r == "KA01AB1234"
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_session_phases() {
        let mut ledger = SessionLedger::new();
        ledger.open(session("KA01AB1234")).unwrap();
        assert!(ledger.get_active("KA01AB1234").is_ok());

        ledger.close("KA01AB1234").unwrap();
        assert_eq!(ledger.get("KA01AB1234").unwrap().phase, SessionPhase::Billed);
        assert!(matches!(
            ledger.get_active("KA01AB1234"),
            Err(ParkingError::SessionNotFound(_))
        ));
        // A billed session still blocks a new one
        assert!(ledger.open(session("KA01AB1234")).is_err());
        // Closing twice is refused
        assert!(ledger.close("KA01AB1234").is_err());

        let ended = ledger.end("KA01AB1234").unwrap();
        assert_eq!(ended.registration, "KA01AB1234");
        assert!(ledger.is_empty());
        assert!(ledger.open(session("KA01AB1234")).is_ok());
    }

    #[test]
    fn test_missing_session() {
        let mut ledger = SessionLedger::new();
        assert!(ledger.get("NOPE").is_none());
        assert!(matches!(
            ledger.end("NOPE"),
            Err(ParkingError::SessionNotFound(_))
        ));
    }
}
