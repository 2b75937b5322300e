//! Fee computation
//!
//! Pure functions: nothing here touches the registry, the ledger or storage.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ParkingError;
use crate::rates::hourly_rate;
use crate::types::{BillStatus, BillingRecord, Receipt, Slot, VehicleCategory, VehicleSession};

/// Duration and amount for one stay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeQuote {
    pub duration_minutes: u64,
    pub hourly_rate: f64,
    /// Unrounded; round only for display
    pub amount: f64,
}

/// Whole minutes between entry and exit (floored) priced at the category's hourly rate
pub fn compute_fee(
    entry: DateTime<Utc>,
    exit: DateTime<Utc>,
    category: VehicleCategory,
) -> Result<FeeQuote, ParkingError> {
    let elapsed = exit.signed_duration_since(entry);
    if elapsed < chrono::Duration::zero() {
        return Err(ParkingError::InvalidInterval { entry, exit });
    }

    let duration_minutes = elapsed.num_minutes() as u64;
    let hourly_rate = hourly_rate(category);

    Ok(FeeQuote {
        duration_minutes,
        hourly_rate,
        amount: (duration_minutes as f64 / 60.0) * hourly_rate,
    })
}

/// Round a monetary amount to paise for display
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Message returned to the driver when a bill is generated.
///
/// The amount is rounded to paise and printed in shortest form ("15.0", "22.5", "0.83").
pub fn bill_message(vehicle_type: &str, amount: f64) -> String {
    format!(
        "Bill generated for {}: Rs {:?}. Please pay to release your vehicle.",
        vehicle_type,
        round_currency(amount)
    )
}

/// Billing record and receipt for a session leaving `slot` at `exit`
#[derive(Debug, Clone)]
pub struct Bill {
    pub quote: FeeQuote,
    pub record: BillingRecord,
    pub receipt: Receipt,
    vehicle_type: String,
}

impl Bill {
    pub fn new(
        bill_id: u64,
        session: &VehicleSession,
        slot: &Slot,
        exit: DateTime<Utc>,
    ) -> Result<Self, ParkingError> {
        let quote = compute_fee(session.entry_time, exit, session.category)?;

        let record = BillingRecord {
            id: bill_id,
            registration: session.registration.clone(),
            owner_name: session.owner_name.clone(),
            phone_number: session.phone_number.clone(),
            category: session.category,
            entry_time: session.entry_time,
            exit_time: exit,
            duration_minutes: quote.duration_minutes,
            amount: quote.amount,
            zone: slot.zone(),
            slot: slot.id(),
            status: BillStatus::Unpaid,
        };

        let receipt = Receipt {
            id: Uuid::new_v4(),
            bill_id,
            registration: session.registration.clone(),
            owner_name: session.owner_name.clone(),
            phone_number: session.phone_number.clone(),
            category: session.category,
            duration_minutes: quote.duration_minutes,
            amount: quote.amount,
            receipt_date: exit,
            status: BillStatus::Unpaid,
        };

        let vehicle_type = if session.vehicle_type.is_empty() {
            session.category.as_str().to_string()
        } else {
            session.vehicle_type.clone()
        };

        Ok(Self {
            quote,
            record,
            receipt,
            vehicle_type,
        })
    }

    pub fn message(&self) -> String {
        bill_message(&self.vehicle_type, self.quote.amount)
    }
}
