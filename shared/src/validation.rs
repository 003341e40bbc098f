//! Validation helpers shared by service inputs

use rust_decimal::Decimal;

/// Validate a transaction or reservation quantity magnitude
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a unit cost
pub fn validate_unit_cost(cost: Decimal) -> Result<(), &'static str> {
    if cost < Decimal::ZERO {
        return Err("Unit cost cannot be negative");
    }
    Ok(())
}

/// Validate an ISO 4217-style currency code
pub fn validate_currency(currency: &str) -> Result<(), &'static str> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err("Currency must be a 3-letter uppercase code");
    }
    Ok(())
}

/// Validate a forecast horizon in days
pub fn validate_horizon_days(days: u32) -> Result<(), &'static str> {
    if days == 0 {
        return Err("Forecast horizon must be at least 1 day");
    }
    if days > 365 {
        return Err("Forecast horizon cannot exceed 365 days");
    }
    Ok(())
}

/// Validate that source and destination of a transfer differ
pub fn validate_distinct_locations(from: &str, to: &str) -> Result<(), &'static str> {
    if from.trim() == to.trim() {
        return Err("Source and destination locations must differ");
    }
    Ok(())
}
