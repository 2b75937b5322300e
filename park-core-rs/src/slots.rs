//! Slot registry
//!
//! Owns the fixed grid of slots (zones A-E, ten slots each) and their
//! occupancy. Every mutation goes through [`Slot::occupy`] / [`Slot::vacate`],
//! so a slot's status and occupant never disagree.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ParkingError;
use crate::types::{Slot, SlotId, Zone};

/// The grid of slots, ordered zone-major
#[derive(Debug, Default, Clone)]
pub struct SlotRegistry {
    slots: BTreeMap<SlotId, Slot>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from previously persisted slots
    pub fn from_slots(slots: impl IntoIterator<Item = Slot>) -> Self {
        Self {
            slots: slots.into_iter().map(|s| (s.id(), s)).collect(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Create the whole grid, all Available. One-time bootstrap, not a reset.
    pub fn initialize(&mut self) -> Result<(), ParkingError> {
        if self.is_initialized() {
            return Err(ParkingError::AlreadyInitialized);
        }

        self.slots = SlotId::grid().map(|id| (id, Slot::available(id))).collect();
        debug!("Slots: Initialized {} slots", self.slots.len());
        Ok(())
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    /// Exact match on zone, label and Available status
    pub fn find_available(&self, zone: &str, label: &str) -> Result<&Slot, ParkingError> {
        let not_found = || {
            ParkingError::NotFound(format!(
                "available slot {} in zone {}",
                label.trim(),
                zone.trim()
            ))
        };

        let zone: Zone = zone.parse().map_err(|_| not_found())?;
        let id = SlotId::parse(label)
            .filter(|id| id.zone == zone)
            .ok_or_else(not_found)?;

        self.slots
            .get(&id)
            .filter(|slot| slot.is_available())
            .ok_or_else(not_found)
    }

    /// Available -> Occupied. The caller must have checked availability.
    pub fn occupy(&mut self, id: SlotId, registration: &str) -> Result<(), ParkingError> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| ParkingError::NotFound(format!("slot {}", id)))?;

        if !slot.occupy(registration) {
            return Err(ParkingError::SlotOccupied(id));
        }

        debug!("Slots: {} occupied by {}", id, registration);
        Ok(())
    }

    /// Occupied -> Available for the slot held by `registration`
    pub fn release(&mut self, registration: &str) -> Result<SlotId, ParkingError> {
        let slot = self
            .slots
            .values_mut()
            .find(|s| s.occupant() == Some(registration))
            .ok_or_else(|| ParkingError::SlotNotFound(registration.to_string()))?;

        slot.vacate();
        debug!("Slots: {} released by {}", slot.id(), registration);
        Ok(slot.id())
    }

    /// The slot currently held by `registration`, if any
    pub fn slot_of(&self, registration: &str) -> Option<&Slot> {
        self.slots.values().find(|s| s.occupant() == Some(registration))
    }

    pub fn list_all(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    pub fn list_occupied(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values().filter(|s| !s.is_available())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SlotStatus;

    fn id(label: &str) -> SlotId {
        SlotId::parse(label).unwrap()
    }

    #[test]
    fn test_initialize_once() {
        let mut registry = SlotRegistry::new();
        assert!(!registry.is_initialized());

        registry.initialize().unwrap();
        assert_eq!(registry.len(), 50);
        assert!(registry.list_all().all(|s| s.status() == SlotStatus::Available));

        registry.occupy(id("A1"), "KA01AB1234").unwrap();
        assert!(matches!(
            registry.initialize(),
            Err(ParkingError::AlreadyInitialized)
        ));
        // Not a reset
        assert_eq!(registry.get(id("A1")).unwrap().occupant(), Some("KA01AB1234"));
    }

    #[test]
    fn test_find_available() {
        let mut registry = SlotRegistry::new();
        registry.initialize().unwrap();

        let slot = registry.find_available("A", "A1").unwrap();
        assert_eq!(slot.id(), id("A1"));
        assert!(registry.find_available("b", "b10").is_ok());

        // Label outside the zone, unknown zone, out of range
        assert!(registry.find_available("A", "B1").is_err());
        assert!(registry.find_available("F", "F1").is_err());
        assert!(registry.find_available("A", "A11").is_err());

        registry.occupy(id("A1"), "KA01AB1234").unwrap();
        assert!(matches!(
            registry.find_available("A", "A1"),
            Err(ParkingError::NotFound(_))
        ));
    }

    #[test]
    fn test_find_available_before_initialize() {
        let registry = SlotRegistry::new();
        assert!(registry.find_available("A", "A1").is_err());
    }

    #[test]
    fn test_occupy_and_release() {
        let mut registry = SlotRegistry::new();
        registry.initialize().unwrap();

        registry.occupy(id("C5"), "KA01AB1234").unwrap();
        assert_eq!(registry.list_occupied().count(), 1);
        assert_eq!(registry.slot_of("KA01AB1234").unwrap().id(), id("C5"));

        assert!(matches!(
            registry.occupy(id("C5"), "MH12XY0001"),
            Err(ParkingError::SlotOccupied(_))
        ));

        assert_eq!(registry.release("KA01AB1234").unwrap(), id("C5"));
        let slot = registry.get(id("C5")).unwrap();
        assert_eq!(slot.status(), SlotStatus::Available);
        assert_eq!(slot.occupant(), None);
        assert_eq!(registry.list_occupied().count(), 0);
    }

    #[test]
    fn test_release_without_slot() {
        let mut registry = SlotRegistry::new();
        registry.initialize().unwrap();
        assert!(matches!(
            registry.release("KA01AB1234"),
            Err(ParkingError::SlotNotFound(_))
        ));
    }
}
