//! Lifecycle coordinator
//!
//! The only entry point for callers. Per registration the lifecycle is
//!
//! ```text
//! Unregistered --register--> Active --generate_bill--> Billed --pay_bill--> Settled
//! ```
//!
//! Every mutating operation holds the state write lock from its first check
//! to its last write: validate, build one batch of [`Change`]s, commit the
//! batch to storage, then apply it in memory. A failed commit changes nothing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::billing::Bill;
use crate::clock::{Clock, SystemClock};
use crate::config::ParkingConfig;
use crate::error::ParkingError;
use crate::records::{ReceiptRenderer, RecordBook};
use crate::sessions::SessionLedger;
use crate::slots::SlotRegistry;
use crate::storage::{Change, LotSnapshot, MemoryStorage, Storage};
use crate::types::{
    BillStatus, BillingRecord, Booking, Receipt, SessionPhase, Slot, SlotId, SlotStatus,
    VehicleInfo, VehicleSession,
};

const INITIALIZED: &str = "Parking lot initialized successfully.";
const PAID: &str = "Payment received. Vehicle released and parking slot is available.";

/// Slots, sessions and records, always read and written together
#[derive(Debug, Default, Clone)]
pub struct LotState {
    slots: SlotRegistry,
    sessions: SessionLedger,
    records: RecordBook,
}

impl LotState {
    fn from_snapshot(snapshot: LotSnapshot) -> Self {
        Self {
            slots: SlotRegistry::from_slots(snapshot.slots),
            sessions: SessionLedger::from_sessions(snapshot.sessions),
            records: RecordBook::from_records(snapshot.bills, snapshot.receipts),
        }
    }

    fn snapshot(&self, seq: u64) -> LotSnapshot {
        LotSnapshot {
            seq,
            slots: self.slots.list_all().cloned().collect(),
            sessions: self.sessions.iter().cloned().collect(),
            bills: self.records.history().cloned().collect(),
            receipts: self.records.receipts().to_vec(),
        }
    }

    /// Apply one committed change
    fn apply(&mut self, change: &Change) -> Result<(), ParkingError> {
        match change {
            Change::Initialize => self.slots.initialize(),
            Change::Occupy { slot, registration } => self.slots.occupy(*slot, registration),
            Change::Release { registration } => self.slots.release(registration).map(|_| ()),
            Change::OpenSession(session) => self.sessions.open(session.clone()),
            Change::CloseSession { registration } => self.sessions.close(registration),
            Change::EndSession { registration } => self.sessions.end(registration).map(|_| ()),
            Change::RecordBill(record) => self.records.record_bill(record.clone()),
            Change::RecordReceipt(receipt) => {
                self.records.record_receipt(receipt.clone());
                Ok(())
            }
            Change::SettleBill { bill_id } => self.records.settle_bill(*bill_id),
            Change::SettleReceipt { receipt_id } => self.records.settle_receipt(*receipt_id),
        }
    }

    /// Every invariant violation present in this state
    pub fn audit(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut occupants: HashMap<&str, Vec<SlotId>> = HashMap::new();

        for slot in self.slots.list_all() {
            let occupied = slot.status() == SlotStatus::Occupied;
            if occupied != slot.occupant().is_some() {
                violations.push(format!(
                    "slot {} is {} with occupant {:?}",
                    slot.id(),
                    slot.status(),
                    slot.occupant()
                ));
            }
            if let Some(registration) = slot.occupant() {
                occupants.entry(registration).or_default().push(slot.id());
            }
        }

        for (registration, slots) in &occupants {
            if slots.len() > 1 {
                violations.push(format!("{} occupies {} slots", registration, slots.len()));
            }
            if !self.sessions.contains(registration) {
                violations.push(format!("{} occupies a slot without a session", registration));
            }
        }

        for session in self.sessions.iter() {
            let registration = session.registration.as_str();
            if !occupants.contains_key(registration) {
                violations.push(format!("{} has a session but no slot", registration));
            }

            let unpaid = self.records.unpaid_for(registration).count();
            let expected = match session.phase {
                SessionPhase::Active => 0,
                SessionPhase::Billed => 1,
            };
            if unpaid != expected {
                violations.push(format!(
                    "{} is {:?} with {} unpaid bills",
                    registration, session.phase, unpaid
                ));
            }
        }

        let mut unpaid: HashMap<&str, usize> = HashMap::new();
        for bill in self.records.history() {
            if bill.status == BillStatus::Unpaid {
                *unpaid.entry(bill.registration.as_str()).or_default() += 1;
            }
        }
        for (registration, count) in unpaid {
            if count > 1 {
                violations.push(format!("{} has {} unpaid bills", registration, count));
            }
        }

        violations
    }
}

/// The parking lot: registry, ledger and records behind one lock
pub struct ParkingLot {
    state: RwLock<LotState>,
    storage: Mutex<Box<dyn Storage>>,
    clock: Arc<dyn Clock>,
}

impl ParkingLot {
    /// Open with the configured storage and the wall clock
    pub fn open(config: &ParkingConfig) -> Result<Self, ParkingError> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        config: &ParkingConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ParkingError> {
        Self::with_storage(config.open_storage()?, clock)
    }

    /// Empty in-memory lot
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(LotState::default()),
            storage: Mutex::new(Box::new(MemoryStorage::new())),
            clock,
        }
    }

    /// Recover state from `storage` and serve from it
    pub fn with_storage(
        mut storage: Box<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ParkingError> {
        let recovered = storage.recover()?;

        let mut state = recovered
            .snapshot
            .map(LotState::from_snapshot)
            .unwrap_or_default();

        // A batch lands whole or not at all
        for batch in &recovered.batches {
            let mut next = state.clone();
            match batch.changes.iter().try_for_each(|change| next.apply(change)) {
                Ok(()) => state = next,
                Err(e) => error!("Lot: Skipping batch {} during recovery: {}", batch.seq, e),
            }
        }

        info!(
            "Lot: Recovered {} slots, {} sessions, {} bills",
            state.slots.len(),
            state.sessions.len(),
            state.records.history().count()
        );

        Ok(Self {
            state: RwLock::new(state),
            storage: Mutex::new(storage),
            clock,
        })
    }

    /// Persist `changes` as one batch, then apply them
    fn commit(&self, state: &mut LotState, changes: Vec<Change>) -> Result<(), ParkingError> {
        let mut storage = self.storage.lock();
        storage.commit(&changes)?;

        for change in &changes {
            state.apply(change).map_err(|e| {
                error!("Lot: Committed change {:?} could not be applied: {}", change, e);
                ParkingError::InvariantViolation(e.to_string())
            })?;
        }

        if storage.should_snapshot() {
            let snapshot = state.snapshot(storage.last_seq());
            if let Err(e) = storage.save_snapshot(&snapshot) {
                warn!("Lot: Snapshot at seq {} failed: {}", snapshot.seq, e);
            }
        }

        Ok(())
    }

    /// Create the 50-slot grid. Succeeds exactly once.
    pub fn initialize_parking(&self) -> Result<String, ParkingError> {
        let mut state = self.state.write();

        if state.slots.is_initialized() {
            warn!("Lot: Initialize requested but grid already exists");
            return Err(ParkingError::AlreadyInitialized);
        }

        self.commit(&mut state, vec![Change::Initialize])?;
        info!("Lot: Initialized {} slots", state.slots.len());
        Ok(INITIALIZED.to_string())
    }

    /// Open a session for `vehicle` and occupy the requested slot
    pub fn register_vehicle(
        &self,
        vehicle: VehicleInfo,
        zone: &str,
        slot: &str,
    ) -> Result<String, ParkingError> {
        let mut state = self.state.write();
        let registration = vehicle.registration.clone();

        // A billed-but-unpaid vehicle still holds its slot
        if state.sessions.contains(&registration) || state.slots.slot_of(&registration).is_some() {
            warn!("Lot: {} is already registered", registration);
            return Err(ParkingError::DuplicateRegistration(registration));
        }

        let slot_id = match state.slots.find_available(zone, slot) {
            Ok(found) => found.id(),
            Err(_) => {
                warn!("Lot: Slot {}/{} unavailable for {}", zone, slot, registration);
                return Err(ParkingError::SlotUnavailable {
                    zone: zone.trim().to_string(),
                    slot: slot.trim().to_string(),
                });
            }
        };

        let session = VehicleSession::open(vehicle, self.clock.now());
        let changes = vec![
            Change::OpenSession(session),
            Change::Occupy {
                slot: slot_id,
                registration: registration.clone(),
            },
        ];
        self.commit(&mut state, changes)?;

        info!("Lot: {} registered at {}", registration, slot_id);
        Ok(format!(
            "Vehicle registered and assigned to Zone: {} and slot {}",
            slot_id.zone, slot_id
        ))
    }

    /// Price the stay up to now and record an Unpaid bill and receipt
    pub fn generate_bill(&self, registration: &str) -> Result<String, ParkingError> {
        let mut state = self.state.write();

        let session = state.sessions.get_active(registration).cloned().map_err(|e| {
            warn!("Lot: No active session for {}", registration);
            e
        })?;

        let slot = state.slots.slot_of(registration).cloned().ok_or_else(|| {
            error!("Lot: {} has an active session but holds no slot", registration);
            ParkingError::SlotNotFound(registration.to_string())
        })?;

        let bill = Bill::new(
            state.records.next_bill_id(),
            &session,
            &slot,
            self.clock.now(),
        )
        .map_err(|e| {
            warn!("Lot: Cannot bill {}: {}", registration, e);
            e
        })?;

        let message = bill.message();
        let changes = vec![
            Change::RecordBill(bill.record.clone()),
            Change::RecordReceipt(bill.receipt.clone()),
            Change::CloseSession {
                registration: registration.to_string(),
            },
        ];
        self.commit(&mut state, changes)?;

        info!(
            "Lot: Bill {} for {}: {} min, Rs {}",
            bill.record.id, registration, bill.quote.duration_minutes, bill.quote.amount
        );
        Ok(message)
    }

    /// Settle the outstanding bill and free the slot
    pub fn pay_bill(&self, registration: &str) -> Result<String, ParkingError> {
        let mut state = self.state.write();

        let bill_id = {
            let unpaid: Vec<&BillingRecord> = state.records.unpaid_for(registration).collect();
            match unpaid.as_slice() {
                [bill] => bill.id,
                [] => {
                    warn!("Lot: No unpaid bill for {}", registration);
                    return Err(ParkingError::NoUnpaidBill(registration.to_string()));
                }
                many => {
                    error!(
                        "Lot: {} has {} unpaid bills, refusing to pick one",
                        registration,
                        many.len()
                    );
                    return Err(ParkingError::NoUnpaidBill(registration.to_string()));
                }
            }
        };

        if state.slots.slot_of(registration).is_none() {
            error!("Lot: {} has an unpaid bill but holds no slot", registration);
            return Err(ParkingError::SlotNotFound(registration.to_string()));
        }

        let mut changes = vec![Change::SettleBill { bill_id }];
        match state.records.receipt_for_bill(bill_id) {
            Some(receipt) => changes.push(Change::SettleReceipt {
                receipt_id: receipt.id,
            }),
            None => warn!("Lot: Bill {} has no receipt to settle", bill_id),
        }
        changes.push(Change::Release {
            registration: registration.to_string(),
        });
        if state.sessions.contains(registration) {
            changes.push(Change::EndSession {
                registration: registration.to_string(),
            });
        }
        self.commit(&mut state, changes)?;

        info!("Lot: Bill {} paid, {} released", bill_id, registration);
        Ok(PAID.to_string())
    }

    /// All billing records, oldest first
    pub fn history(&self) -> Vec<BillingRecord> {
        self.state.read().records.history().cloned().collect()
    }

    /// Every slot in grid order, whatever its status
    pub fn available_slots(&self) -> Vec<Slot> {
        self.state.read().slots.list_all().cloned().collect()
    }

    /// Sessions of vehicles currently holding a slot, in slot order
    pub fn occupied_vehicles(&self) -> Vec<VehicleSession> {
        let state = self.state.read();
        state
            .slots
            .list_occupied()
            .filter_map(|slot| slot.occupant())
            .filter_map(|registration| state.sessions.get(registration))
            .cloned()
            .collect()
    }

    /// Vehicle and slot joined, for occupied slots only
    pub fn bookings(&self) -> Vec<Booking> {
        let state = self.state.read();
        state
            .slots
            .list_occupied()
            .filter_map(|slot| {
                let session = state.sessions.get(slot.occupant()?)?;
                Some(Booking::new(session, slot))
            })
            .collect()
    }

    /// Most recent receipt for `registration`
    pub fn receipt(&self, registration: &str) -> Result<Receipt, ParkingError> {
        self.state
            .read()
            .records
            .latest_receipt(registration)
            .cloned()
            .ok_or_else(|| ParkingError::ReceiptNotFound(registration.to_string()))
    }

    /// Hand the latest receipt to a rendering collaborator
    pub fn render_receipt(
        &self,
        registration: &str,
        renderer: &dyn ReceiptRenderer,
    ) -> Result<String, ParkingError> {
        let receipt = self.receipt(registration)?;
        Ok(renderer.render(&receipt))
    }

    pub fn slot(&self, id: SlotId) -> Option<Slot> {
        self.state.read().slots.get(id).cloned()
    }

    pub fn session(&self, registration: &str) -> Option<VehicleSession> {
        self.state.read().sessions.get(registration).cloned()
    }

    /// Invariant violations in the current state (empty when healthy)
    pub fn audit(&self) -> Vec<String> {
        let violations = self.state.read().audit();
        for v in &violations {
            error!("Lot: Invariant violated: {}", v);
        }
        violations
    }
}
