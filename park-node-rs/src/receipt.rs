//! Printable receipts

use park_core::billing::round_currency;
use park_core::{Receipt, ReceiptRenderer};

const WIDTH: usize = 40;

/// Plain-text receipt, one field per line
pub struct TextReceipt;

impl TextReceipt {
    fn line(label: &str, value: impl std::fmt::Display) -> String {
        format!("{:<14}{}\n", label, value)
    }
}

impl ReceiptRenderer for TextReceipt {
    fn render(&self, receipt: &Receipt) -> String {
        let rule = "=".repeat(WIDTH);
        let mut out = String::new();

        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!("{:^width$}\n", "PARKING RECEIPT", width = WIDTH));
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&Self::line("Receipt:", receipt.id));
        out.push_str(&Self::line("Bill:", receipt.bill_id));
        out.push_str(&Self::line(
            "Date:",
            receipt.receipt_date.format("%d/%m/%Y %H:%M:%S"),
        ));
        out.push_str(&Self::line("Vehicle:", &receipt.registration));
        out.push_str(&Self::line("Category:", receipt.category));
        out.push_str(&Self::line("Owner:", &receipt.owner_name));
        out.push_str(&Self::line("Phone:", &receipt.phone_number));
        out.push_str(&Self::line(
            "Duration:",
            format!("{} min", receipt.duration_minutes),
        ));
        out.push_str(&Self::line(
            "Amount:",
            format!("Rs {:.2}", round_currency(receipt.amount)),
        ));
        out.push_str(&Self::line("Status:", receipt.status));
        out.push_str(&rule);
        out.push('\n');
        out
    }
}
