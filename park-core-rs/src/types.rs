//! Core types for the parking lot

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParkingError;

/// Vehicle registration number (plate)
pub type Registration = String;

/// Number of slots in every zone
pub const SLOTS_PER_ZONE: u8 = 10;

/// One of the five fixed letter groups of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Zone {
    A,
    B,
    C,
    D,
    E,
}

impl Zone {
    pub const ALL: [Zone; 5] = [Zone::A, Zone::B, Zone::C, Zone::D, Zone::E];

    pub fn letter(self) -> char {
        match self {
            Zone::A => 'A',
            Zone::B => 'B',
            Zone::C => 'C',
            Zone::D => 'D',
            Zone::E => 'E',
        }
    }

    pub fn from_letter(c: char) -> Option<Zone> {
        match c.to_ascii_uppercase() {
            'A' => Some(Zone::A),
            'B' => Some(Zone::B),
            'C' => Some(Zone::C),
            'D' => Some(Zone::D),
            'E' => Some(Zone::E),
            _ => None,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Zone {
    type Err = ParkingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Zone::from_letter(c),
            _ => None,
        }
        .ok_or_else(|| ParkingError::NotFound(format!("zone {}", s.trim())))
    }
}

/// Address of a single slot: zone letter plus 1-based number ("A1".."E10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotId {
    pub zone: Zone,
    pub number: u8,
}

impl SlotId {
    pub fn new(zone: Zone, number: u8) -> Option<Self> {
        (1..=SLOTS_PER_ZONE)
            .contains(&number)
            .then_some(SlotId { zone, number })
    }

    /// Parse a label such as "A7" (case-insensitive)
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        let mut chars = label.chars();
        let zone = Zone::from_letter(chars.next()?)?;
        let number = chars.as_str().parse::<u8>().ok()?;
        SlotId::new(zone, number)
    }

    /// Every slot of the grid, zone-major
    pub fn grid() -> impl Iterator<Item = SlotId> {
        Zone::ALL
            .into_iter()
            .flat_map(|zone| (1..=SLOTS_PER_ZONE).map(move |number| SlotId { zone, number }))
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.zone, self.number)
    }
}

impl TryFrom<String> for SlotId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SlotId::parse(&value).ok_or_else(|| format!("invalid slot label: {}", value))
    }
}

impl From<SlotId> for String {
    fn from(id: SlotId) -> Self {
        id.to_string()
    }
}

/// Occupancy state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Available,
    Occupied,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "Available"),
            SlotStatus::Occupied => write!(f, "Occupied"),
        }
    }
}

/// A parking slot.
///
/// `status == Occupied` exactly when `occupant` is set; the fields are private
/// so the pair can only change through [`Slot::occupy`] and [`Slot::vacate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    id: SlotId,
    status: SlotStatus,
    occupant: Option<Registration>,
}

impl Slot {
    pub fn available(id: SlotId) -> Self {
        Self {
            id,
            status: SlotStatus::Available,
            occupant: None,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn zone(&self) -> Zone {
        self.id.zone
    }

    pub fn status(&self) -> SlotStatus {
        self.status
    }

    pub fn occupant(&self) -> Option<&str> {
        self.occupant.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }

    /// Available -> Occupied. Returns false (and changes nothing) if already occupied.
    pub fn occupy(&mut self, registration: &str) -> bool {
        if !self.is_available() {
            return false;
        }
        self.status = SlotStatus::Occupied;
        self.occupant = Some(registration.to_string());
        true
    }

    /// Occupied -> Available, returning the previous occupant
    pub fn vacate(&mut self) -> Option<Registration> {
        self.status = SlotStatus::Available;
        self.occupant.take()
    }
}

/// Vehicle category, the only input to the rate table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleCategory {
    Car,
    Motorcycle,
    Scooter,
    Van,
    Bus,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 5] = [
        VehicleCategory::Car,
        VehicleCategory::Motorcycle,
        VehicleCategory::Scooter,
        VehicleCategory::Van,
        VehicleCategory::Bus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleCategory::Car => "car",
            VehicleCategory::Motorcycle => "motorcycle",
            VehicleCategory::Scooter => "scooter",
            VehicleCategory::Van => "van",
            VehicleCategory::Bus => "bus",
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleCategory {
    type Err = ParkingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        VehicleCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ParkingError::UnknownVehicleCategory(s.to_string()))
    }
}

/// Vehicle details supplied at registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub registration: Registration,
    pub owner_name: String,
    pub phone_number: String,
    pub category: VehicleCategory,
    /// Category as the caller spelled it, echoed back in bill messages
    pub vehicle_type: String,
}

impl VehicleInfo {
    /// Build from raw caller input, rejecting blank registrations and unknown categories
    pub fn new(
        registration: impl Into<String>,
        owner_name: impl Into<String>,
        phone_number: impl Into<String>,
        category: &str,
    ) -> Result<Self, ParkingError> {
        let registration = registration.into().trim().to_string();
        if registration.is_empty() {
            return Err(ParkingError::MissingField("registration_number"));
        }

        Ok(Self {
            registration,
            owner_name: owner_name.into(),
            phone_number: phone_number.into(),
            category: category.parse()?,
            vehicle_type: category.trim().to_string(),
        })
    }
}

/// Where a session is in the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Parked, not yet billed
    Active,
    /// Bill generated, waiting for payment
    Billed,
}

/// A vehicle's stay in the lot, keyed by registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSession {
    pub registration: Registration,
    pub owner_name: String,
    pub phone_number: String,
    pub category: VehicleCategory,
    #[serde(default)]
    pub vehicle_type: String,
    pub entry_time: DateTime<Utc>,
    pub phase: SessionPhase,
}

impl VehicleSession {
    pub fn open(vehicle: VehicleInfo, entry_time: DateTime<Utc>) -> Self {
        Self {
            registration: vehicle.registration,
            owner_name: vehicle.owner_name,
            phone_number: vehicle.phone_number,
            category: vehicle.category,
            vehicle_type: vehicle.vehicle_type,
            entry_time,
            phase: SessionPhase::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }
}

/// Settlement state shared by billing records and receipts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillStatus {
    Unpaid,
    Paid,
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillStatus::Unpaid => write!(f, "UNPAID"),
            BillStatus::Paid => write!(f, "PAID"),
        }
    }
}

/// Snapshot of a completed stay, taken when the bill is generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    pub id: u64,
    pub registration: Registration,
    pub owner_name: String,
    pub phone_number: String,
    pub category: VehicleCategory,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub duration_minutes: u64,
    pub amount: f64,
    pub zone: Zone,
    pub slot: SlotId,
    pub status: BillStatus,
}

/// Customer-facing copy of a billing record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub bill_id: u64,
    pub registration: Registration,
    pub owner_name: String,
    pub phone_number: String,
    pub category: VehicleCategory,
    pub duration_minutes: u64,
    pub amount: f64,
    pub receipt_date: DateTime<Utc>,
    pub status: BillStatus,
}

/// Joined view of a parked vehicle and the slot it holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub registration: Registration,
    pub owner_name: String,
    pub phone_number: String,
    pub category: VehicleCategory,
    pub zone: Zone,
    pub slot: SlotId,
    pub status: SlotStatus,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(session: &VehicleSession, slot: &Slot) -> Self {
        Self {
            registration: session.registration.clone(),
            owner_name: session.owner_name.clone(),
            phone_number: session.phone_number.clone(),
            category: session.category,
            zone: slot.zone(),
            slot: slot.id(),
            status: slot.status(),
            entry_time: session.entry_time,
            exit_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_label_parsing() {
        assert_eq!(SlotId::parse("A1"), Some(SlotId { zone: Zone::A, number: 1 }));
        assert_eq!(SlotId::parse(" e10 "), Some(SlotId { zone: Zone::E, number: 10 }));
        assert_eq!(SlotId::parse("A0"), None);
        assert_eq!(SlotId::parse("A11"), None);
        assert_eq!(SlotId::parse("F1"), None);
        assert_eq!(SlotId::parse(""), None);

        assert_eq!(SlotId::parse("C7").unwrap().to_string(), "C7");
    }

    #[test]
    fn test_grid_order() {
        let grid: Vec<SlotId> = SlotId::grid().collect();
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0].label(), "A1");
        assert_eq!(grid[9].label(), "A10");
        assert_eq!(grid[10].label(), "B1");
        assert_eq!(grid[49].label(), "E10");

        let mut sorted = grid.clone();
        sorted.sort();
        assert_eq!(sorted, grid);
    }

    #[test]
    fn test_slot_occupancy() {
        let mut slot = Slot::available(SlotId::parse("B3").unwrap());
        assert!(slot.occupy("KA01AB1234"));
        assert_eq!(slot.status(), SlotStatus::Occupied);
        assert_eq!(slot.occupant(), Some("KA01AB1234"));

        // Second occupy is refused and leaves the slot untouched
        assert!(!slot.occupy("MH12XY0001"));
        assert_eq!(slot.occupant(), Some("KA01AB1234"));

        assert_eq!(slot.vacate().as_deref(), Some("KA01AB1234"));
        assert_eq!(slot.status(), SlotStatus::Available);
        assert_eq!(slot.occupant(), None);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Car".parse::<VehicleCategory>().unwrap(), VehicleCategory::Car);
        assert_eq!(" SCOOTER ".parse::<VehicleCategory>().unwrap(), VehicleCategory::Scooter);
        assert!(matches!(
            "truck".parse::<VehicleCategory>(),
            Err(ParkingError::UnknownVehicleCategory(c)) if c == "truck"
        ));
    }

    #[test]
    fn test_vehicle_info_validation() {
        assert!(matches!(
            VehicleInfo::new("  ", "Asha", "9800000000", "car"),
            Err(ParkingError::MissingField("registration_number"))
        ));

        let v = VehicleInfo::new(" KA01AB1234 ", "Asha", "9800000000", "Van").unwrap();
        assert_eq!(v.registration, "KA01AB1234");
        assert_eq!(v.category, VehicleCategory::Van);
        assert_eq!(v.vehicle_type, "Van");
    }

    #[test]
    fn test_record_serialization() {
        let slot = Slot::available(SlotId::parse("D4").unwrap());
        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["id"], "D4");
        assert_eq!(json["status"], "Available");

        let parsed: Slot = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, slot);

        assert_eq!(serde_json::to_value(BillStatus::Unpaid).unwrap(), "UNPAID");
    }
}
