//! Billing history and receipts
//!
//! Records are append-only; the only mutation is the Unpaid -> Paid flip.

use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use crate::error::ParkingError;
use crate::types::{BillStatus, BillingRecord, Receipt};

/// Turns a receipt into something a customer can read or print
pub trait ReceiptRenderer {
    fn render(&self, receipt: &Receipt) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct RecordBook {
    bills: BTreeMap<u64, BillingRecord>,
    receipts: Vec<Receipt>,
}

impl RecordBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from previously persisted records
    pub fn from_records(bills: Vec<BillingRecord>, receipts: Vec<Receipt>) -> Self {
        Self {
            bills: bills.into_iter().map(|b| (b.id, b)).collect(),
            receipts,
        }
    }

    /// Id for the next billing record
    pub fn next_bill_id(&self) -> u64 {
        self.bills.keys().next_back().map_or(1, |id| id + 1)
    }

    pub fn record_bill(&mut self, record: BillingRecord) -> Result<(), ParkingError> {
        if self.bills.contains_key(&record.id) {
            return Err(ParkingError::InvariantViolation(format!(
                "billing record {} already exists",
                record.id
            )));
        }
        debug!("Records: Bill {} for {}", record.id, record.registration);
        self.bills.insert(record.id, record);
        Ok(())
    }

    pub fn record_receipt(&mut self, receipt: Receipt) {
        debug!("Records: Receipt {} for {}", receipt.id, receipt.registration);
        self.receipts.push(receipt);
    }

    /// Every Unpaid record for `registration`, oldest first
    pub fn unpaid_for<'a>(
        &'a self,
        registration: &'a str,
    ) -> impl Iterator<Item = &'a BillingRecord> + 'a {
        self.bills
            .values()
            .filter(move |b| b.registration == registration && b.status == BillStatus::Unpaid)
    }

    /// Unpaid -> Paid for a billing record
    pub fn settle_bill(&mut self, id: u64) -> Result<(), ParkingError> {
        let bill = self
            .bills
            .get_mut(&id)
            .filter(|b| b.status == BillStatus::Unpaid)
            .ok_or_else(|| ParkingError::InvariantViolation(format!("bill {} is not unpaid", id)))?;

        bill.status = BillStatus::Paid;
        debug!("Records: Bill {} paid", id);
        Ok(())
    }

    /// The receipt issued together with a billing record
    pub fn receipt_for_bill(&self, bill_id: u64) -> Option<&Receipt> {
        self.receipts.iter().find(|r| r.bill_id == bill_id)
    }

    /// Unpaid -> Paid for a receipt, in place
    pub fn settle_receipt(&mut self, id: Uuid) -> Result<(), ParkingError> {
        let receipt = self
            .receipts
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ParkingError::InvariantViolation(format!("receipt {} not found", id)))?;

        receipt.status = BillStatus::Paid;
        debug!("Records: Receipt {} paid", id);
        Ok(())
    }

    /// Most recent receipt for `registration`
    pub fn latest_receipt(&self, registration: &str) -> Option<&Receipt> {
        self.receipts
            .iter()
            .rev()
            .find(|r| r.registration == registration)
    }

    pub fn history(&self) -> impl Iterator<Item = &BillingRecord> {
        self.bills.values()
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }
}
