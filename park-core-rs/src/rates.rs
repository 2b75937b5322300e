//! Static hourly rate table

use crate::error::ParkingError;
use crate::types::VehicleCategory;

/// Hourly rate in rupees for a known category
pub fn hourly_rate(category: VehicleCategory) -> f64 {
    match category {
        VehicleCategory::Car => 30.0,
        VehicleCategory::Motorcycle | VehicleCategory::Scooter => 10.0,
        VehicleCategory::Van | VehicleCategory::Bus => 50.0,
    }
}

/// Hourly rate for a raw category name (case-insensitive)
pub fn rate(category: &str) -> Result<f64, ParkingError> {
    category.parse::<VehicleCategory>().map(hourly_rate)
}
