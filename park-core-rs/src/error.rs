//! Error types for the parking engine

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{Registration, SlotId};

/// How a failure should be treated by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or conflicting input; nothing was changed
    Validation,
    /// The requested record does not exist
    NotFound,
    /// Stored state contradicts itself; indicates a bug or corruption
    Consistency,
    /// The storage collaborator failed
    Storage,
}

/// Errors from the storage collaborator
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Journal not open")]
    NotOpen,
}

/// Errors returned by lifecycle operations
#[derive(Debug, Error)]
pub enum ParkingError {
    #[error("Parking lot is already initialized.")]
    AlreadyInitialized,

    #[error("Vehicle with registration number {0} is already registered.")]
    DuplicateRegistration(Registration),

    #[error("Parking slot {slot} in zone {zone} does not exist or is already occupied.")]
    SlotUnavailable { zone: String, slot: String },

    #[error("No active parking session for registration number {0}")]
    SessionNotFound(Registration),

    #[error("No occupied parking slot bound to registration number {0}")]
    SlotNotFound(Registration),

    #[error("Unknown vehicle type: {0}")]
    UnknownVehicleCategory(String),

    #[error("Exit time {exit} is before entry time {entry}")]
    InvalidInterval {
        entry: DateTime<Utc>,
        exit: DateTime<Utc>,
    },

    #[error("No unpaid bill found for registration number {0}")]
    NoUnpaidBill(Registration),

    #[error("Receipt not found for registration number: {0}")]
    ReceiptNotFound(Registration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Session already active for registration number {0}")]
    AlreadyActive(Registration),

    #[error("Slot {0} is not available")]
    SlotOccupied(SlotId),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ParkingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParkingError::AlreadyInitialized
            | ParkingError::DuplicateRegistration(_)
            | ParkingError::SlotUnavailable { .. }
            | ParkingError::UnknownVehicleCategory(_)
            | ParkingError::InvalidInterval { .. }
            | ParkingError::MissingField(_)
            | ParkingError::AlreadyActive(_) => ErrorKind::Validation,

            ParkingError::SessionNotFound(_)
            | ParkingError::NoUnpaidBill(_)
            | ParkingError::ReceiptNotFound(_)
            | ParkingError::NotFound(_) => ErrorKind::NotFound,

            ParkingError::SlotNotFound(_)
            | ParkingError::SlotOccupied(_)
            | ParkingError::InvariantViolation(_) => ErrorKind::Consistency,

            ParkingError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn is_consistency(&self) -> bool {
        self.kind() == ErrorKind::Consistency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ParkingError::AlreadyInitialized.kind(), ErrorKind::Validation);
        assert_eq!(
            ParkingError::SessionNotFound("X".into()).kind(),
            ErrorKind::NotFound
        );
        assert!(ParkingError::SlotNotFound("X".into()).is_consistency());
        assert_eq!(
            ParkingError::from(StorageError::NotOpen).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(
            ParkingError::AlreadyInitialized.to_string(),
            "Parking lot is already initialized."
        );
        assert_eq!(
            ParkingError::DuplicateRegistration("KA01AB1234".into()).to_string(),
            "Vehicle with registration number KA01AB1234 is already registered."
        );
    }
}
