//! Validation utilities for the Warehouse Inventory Management Platform

/// Validate a unit quantity (movements, transfer lines)
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a cancellation reason
pub fn validate_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("A reason is required");
    }
    if reason.len() > 500 {
        return Err("Reason must be at most 500 characters");
    }
    Ok(())
}

/// Validate a scanned barcode (EAN-8 through Code 128 lengths)
pub fn validate_barcode(barcode: &str) -> Result<(), &'static str> {
    let trimmed = barcode.trim();
    if trimmed.is_empty() {
        return Err("Barcode cannot be empty");
    }
    if trimmed.len() > 64 {
        return Err("Barcode must be at most 64 characters");
    }
    if !trimmed.chars().all(|c| c.is_ascii_graphic()) {
        return Err("Barcode must be printable ASCII");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn reason_must_be_present() {
        assert!(validate_reason("damaged pallet").is_ok());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(501)).is_err());
    }

    #[test]
    fn barcode_shape() {
        assert!(validate_barcode("7891000315507").is_ok());
        assert!(validate_barcode("  7891000315507  ").is_ok());
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("codigo com espaço").is_err());
        assert!(validate_barcode(&"9".repeat(65)).is_err());
    }
}
