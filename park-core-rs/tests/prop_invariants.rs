//! Property tests for the parking lifecycle
//!
//! Tests invariants under arbitrary operation sequences:
//! - Occupancy: a slot is Occupied exactly when it has an occupant
//! - Uniqueness: one slot per vehicle, one unpaid bill per vehicle
//! - Billing: amount = minutes / 60 * hourly rate, never negative
//! - Atomicity: a rejected operation changes nothing

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use park_core::rates::hourly_rate;
use park_core::{ManualClock, ParkingLot, SlotId, VehicleCategory, VehicleInfo};
use proptest::prelude::*;

const REGISTRATIONS: [&str; 6] = ["KA01", "KA02", "MH12", "DL03", "TN09", "GJ05"];

#[derive(Debug, Clone)]
enum Op {
    Register { reg: usize, slot: usize, category: usize },
    Advance { minutes: i64 },
    Bill { reg: usize },
    Pay { reg: usize },
}

// ============================================================================
// Strategies
// ============================================================================

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..REGISTRATIONS.len(), 0usize..50, 0..VehicleCategory::ALL.len())
            .prop_map(|(reg, slot, category)| Op::Register { reg, slot, category }),
        2 => (-10i64..600).prop_map(|minutes| Op::Advance { minutes }),
        2 => (0..REGISTRATIONS.len()).prop_map(|reg| Op::Bill { reg }),
        2 => (0..REGISTRATIONS.len()).prop_map(|reg| Op::Pay { reg }),
    ]
}

fn new_lot() -> (ParkingLot, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let lot = ParkingLot::in_memory(clock.clone());
    lot.initialize_parking().unwrap();
    (lot, clock)
}

/// Everything observable about the lot, for before/after comparison
fn observe(lot: &ParkingLot) -> String {
    format!(
        "{:?}|{:?}|{:?}",
        lot.available_slots(),
        lot.bookings(),
        lot.history()
    )
}

fn apply(lot: &ParkingLot, clock: &ManualClock, op: &Op) -> bool {
    match *op {
        Op::Register { reg, slot, category } => {
            let id = SlotId::grid().nth(slot).unwrap();
            let vehicle = VehicleInfo::new(
                REGISTRATIONS[reg],
                "Owner",
                "9000000000",
                VehicleCategory::ALL[category].as_str(),
            )
            .unwrap();
            lot.register_vehicle(vehicle, &id.zone.to_string(), &id.label())
                .is_ok()
        }
        Op::Advance { minutes } => {
            clock.advance(Duration::minutes(minutes));
            true
        }
        Op::Bill { reg } => lot.generate_bill(REGISTRATIONS[reg]).is_ok(),
        Op::Pay { reg } => lot.pay_bill(REGISTRATIONS[reg]).is_ok(),
    }
}

proptest! {
    /// CORE INVARIANT: audit finds nothing after any sequence
    #[test]
    fn audit_always_clean(ops in prop::collection::vec(op(), 1..60)) {
        let (lot, clock) = new_lot();

        for op in &ops {
            apply(&lot, &clock, op);
            let violations = lot.audit();
            prop_assert!(violations.is_empty(), "after {:?}: {:?}", op, violations);
        }
    }

    /// Occupied slots, occupied vehicles and bookings always agree
    #[test]
    fn occupancy_views_agree(ops in prop::collection::vec(op(), 1..60)) {
        let (lot, clock) = new_lot();

        for op in &ops {
            apply(&lot, &clock, op);
        }

        let slots = lot.available_slots();
        prop_assert_eq!(slots.len(), 50);

        let occupied = slots.iter().filter(|s| !s.is_available()).count();
        prop_assert_eq!(lot.occupied_vehicles().len(), occupied);
        prop_assert_eq!(lot.bookings().len(), occupied);
    }

    /// Rejected operations leave no trace
    #[test]
    fn failed_ops_change_nothing(ops in prop::collection::vec(op(), 1..60)) {
        let (lot, clock) = new_lot();

        for op in &ops {
            let before = observe(&lot);
            if !apply(&lot, &clock, op) {
                prop_assert_eq!(before, observe(&lot), "rejected {:?} mutated state", op);
            }
        }
    }

    /// Every bill matches the fee formula
    #[test]
    fn bills_follow_rate_table(ops in prop::collection::vec(op(), 1..60)) {
        let (lot, clock) = new_lot();

        for op in &ops {
            apply(&lot, &clock, op);
        }

        for bill in lot.history() {
            prop_assert!(bill.amount >= 0.0);
            prop_assert!(bill.exit_time >= bill.entry_time);

            let minutes = (bill.exit_time - bill.entry_time).num_minutes() as u64;
            prop_assert_eq!(bill.duration_minutes, minutes);

            let expected = minutes as f64 / 60.0 * hourly_rate(bill.category);
            prop_assert!((bill.amount - expected).abs() < 1e-9);
        }
    }
}
