//! Park Core Library
//!
//! Parking lot lifecycle and billing engine: a fixed grid of 50 slots
//! (zones A-E, ten slots each), vehicle sessions, hourly billing by vehicle
//! category, and payment that releases the slot.
//! Every lifecycle operation is one atomic batch, journaled before it is applied.

pub mod types;
pub mod error;
pub mod rates;
pub mod clock;
pub mod slots;
pub mod sessions;
pub mod billing;
pub mod records;
pub mod storage;
pub mod config;
pub mod lot;

pub use types::*;
pub use error::{ErrorKind, ParkingError, StorageError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ParkingConfig;
pub use records::ReceiptRenderer;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageConfig};
pub use lot::ParkingLot;
