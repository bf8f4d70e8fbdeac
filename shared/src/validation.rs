//! Validation utilities for the Hospital Waste Tracking system

use rust_decimal::Decimal;

/// Largest lot a single request may issue; printing more than this in one
/// go has always meant a typo in the quantity field.
pub const MAX_LOT_QUANTITY: i32 = 1000;

/// Heaviest plausible single bag in pounds; the scale itself tops out well
/// below this.
pub const MAX_BAG_WEIGHT_LB: i64 = 500;

/// Validate a lot issuance quantity / per-sheet pair
pub fn validate_lot_quantity(quantity: i32, per_sheet: i32) -> Result<(), &'static str> {
    if per_sheet < 1 {
        return Err("Per-sheet count must be at least 1");
    }
    if quantity < 1 {
        return Err("Quantity must be at least 1");
    }
    if quantity > MAX_LOT_QUANTITY {
        return Err("Quantity exceeds the per-lot maximum");
    }
    Ok(())
}

/// Validate a weighed-in bag weight (canonical pounds)
pub fn validate_weight_lb(weight: Decimal) -> Result<(), &'static str> {
    if weight <= Decimal::ZERO {
        return Err("Weight must be greater than zero");
    }
    if weight > Decimal::from(MAX_BAG_WEIGHT_LB) {
        return Err("Weight exceeds the plausible bag maximum");
    }
    Ok(())
}

/// A registro needs at least one línea before it can be settled
pub fn validate_close(linea_count: i64) -> Result<(), &'static str> {
    if linea_count < 1 {
        return Err("Cannot close an empty registro");
    }
    Ok(())
}

/// A lot may only be deleted while none of its labels has been consumed;
/// consumed labels anchor ledger audit trails.
pub fn validate_lot_deletion(used_count: i64) -> Result<(), &'static str> {
    if used_count > 0 {
        return Err("Lot has used labels and cannot be deleted");
    }
    Ok(())
}
