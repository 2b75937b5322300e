//! Command set shared by the one-shot CLI and the shell

use clap::Subcommand;
use park_core::{ParkingError, ParkingLot, VehicleInfo};
use serde::Serialize;
use thiserror::Error;

use crate::receipt::TextReceipt;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create the 50-slot grid (once)
    Init,

    /// Register a vehicle into a specific slot
    Register {
        /// Registration number
        #[arg(long)]
        reg: String,

        /// Owner name
        #[arg(long)]
        owner: String,

        /// Owner phone number
        #[arg(long)]
        phone: String,

        /// car, motorcycle, scooter, van or bus
        #[arg(long)]
        category: String,

        /// Zone letter (A-E)
        #[arg(long)]
        zone: String,

        /// Slot label within the zone, e.g. A1
        #[arg(long)]
        slot: String,
    },

    /// Generate the exit bill for a parked vehicle
    Exit {
        #[arg(long)]
        reg: String,
    },

    /// Pay the outstanding bill and release the slot
    Pay {
        #[arg(long)]
        reg: String,
    },

    /// All billing records
    History,

    /// Every slot with its status
    Slots,

    /// Vehicles currently holding a slot
    Vehicles,

    /// Vehicle and slot details for occupied slots
    Bookings,

    /// Latest receipt for a vehicle
    Receipt {
        #[arg(long)]
        reg: String,

        /// Print as text instead of JSON
        #[arg(long)]
        print: bool,
    },

    /// Check lot invariants
    Audit,

    /// Interactive shell
    Shell,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Init => "init",
            Command::Register { .. } => "register",
            Command::Exit { .. } => "exit",
            Command::Pay { .. } => "pay",
            Command::History => "history",
            Command::Slots => "slots",
            Command::Vehicles => "vehicles",
            Command::Bookings => "bookings",
            Command::Receipt { .. } => "receipt",
            Command::Audit => "audit",
            Command::Shell => "shell",
        }
    }
}

/// Errors from running a command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Parking(#[from] ParkingError),

    #[error("Cannot render output: {0}")]
    Render(#[from] serde_json::Error),
}

fn json<T: Serialize>(value: &T) -> Result<String, CommandError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Run one command against the lot, returning what to print
pub fn execute(lot: &ParkingLot, command: &Command) -> Result<String, CommandError> {
    let output = match command {
        Command::Init => lot.initialize_parking()?,
        Command::Register {
            reg,
            owner,
            phone,
            category,
            zone,
            slot,
        } => {
            let vehicle = VehicleInfo::new(reg.as_str(), owner.as_str(), phone.as_str(), category)?;
            lot.register_vehicle(vehicle, zone, slot)?
        }
        Command::Exit { reg } => lot.generate_bill(reg)?,
        Command::Pay { reg } => lot.pay_bill(reg)?,
        Command::History => json(&lot.history())?,
        Command::Slots => json(&lot.available_slots())?,
        Command::Vehicles => json(&lot.occupied_vehicles())?,
        Command::Bookings => json(&lot.bookings())?,
        Command::Receipt { reg, print: true } => lot.render_receipt(reg, &TextReceipt)?,
        Command::Receipt { reg, print: false } => json(&lot.receipt(reg)?)?,
        Command::Audit => {
            let violations = lot.audit();
            if violations.is_empty() {
                "OK".to_string()
            } else {
                json(&violations)?
            }
        }
        Command::Shell => "Already in a shell.".to_string(),
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use park_core::ManualClock;
    use std::sync::Arc;

    fn lot() -> ParkingLot {
        let lot = ParkingLot::in_memory(Arc::new(ManualClock::new(chrono::Utc::now())));
        execute(&lot, &Command::Init).unwrap();
        lot
    }

    fn register(reg: &str, slot: &str) -> Command {
        Command::Register {
            reg: reg.into(),
            owner: "Asha".into(),
            phone: "9800000000".into(),
            category: "car".into(),
            zone: slot[..1].into(),
            slot: slot.into(),
        }
    }

    #[test]
    fn test_lifecycle_commands() {
        let lot = lot();

        let out = execute(&lot, &register("KA01AB1234", "B4")).unwrap();
        assert_eq!(out, "Vehicle registered and assigned to Zone: B and slot B4");

        let out = execute(&lot, &Command::Exit { reg: "KA01AB1234".into() }).unwrap();
        assert!(out.starts_with("Bill generated for car: Rs 0.0. "));

        let out = execute(&lot, &Command::Pay { reg: "KA01AB1234".into() }).unwrap();
        assert!(out.starts_with("Payment received."));

        assert_eq!(execute(&lot, &Command::Audit).unwrap(), "OK");
    }

    #[test]
    fn test_query_output_is_json() {
        let lot = lot();
        execute(&lot, &register("KA01AB1234", "C2")).unwrap();

        let out = execute(&lot, &Command::Bookings).unwrap();
        let bookings: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(bookings[0]["registration"], "KA01AB1234");
        assert_eq!(bookings[0]["slot"], "C2");

        let out = execute(&lot, &Command::Slots).unwrap();
        let slots: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(slots.as_array().unwrap().len(), 50);
    }

    #[test]
    fn test_errors_pass_through() {
        let lot = lot();
        assert!(matches!(
            execute(&lot, &Command::Init),
            Err(CommandError::Parking(ParkingError::AlreadyInitialized))
        ));

        let bad = Command::Register {
            reg: "KA01AB1234".into(),
            owner: "Asha".into(),
            phone: "9800000000".into(),
            category: "tractor".into(),
            zone: "A".into(),
            slot: "A1".into(),
        };
        assert!(matches!(
            execute(&lot, &bad),
            Err(CommandError::Parking(ParkingError::UnknownVehicleCategory(_)))
        ));
        assert!(matches!(
            execute(&lot, &Command::Receipt { reg: "NONE".into(), print: true }),
            Err(CommandError::Parking(ParkingError::ReceiptNotFound(_)))
        ));
    }

    #[test]
    fn test_render_failure_is_not_a_lot_error() {
        // JSON object keys must be strings
        let mut by_slot = std::collections::HashMap::new();
        by_slot.insert(('A', 1u8), "KA01AB1234");

        let err = json(&by_slot).unwrap_err();
        assert!(matches!(err, CommandError::Render(_)));
        assert!(err.to_string().starts_with("Cannot render output"));
    }
}
