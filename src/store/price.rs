//! Display-price parsing adapter.
//!
//! Product documents store prices as display-formatted strings
//! ("₹1,599", "1,599.00"). Every read path converts through this one
//! function; no other module touches the raw representation.

use crate::errors::ServiceError;

/// Parses a display-formatted price string into whole rupees.
///
/// Strips currency symbols and grouping separators, keeps digits and the
/// first decimal point, and truncates any fractional part. Fails when no
/// digits remain or the integer part overflows.
pub fn parse_display_price(raw: &str) -> Result<i64, ServiceError> {
    let mut integer_part = String::new();
    let mut seen_decimal = false;

    for c in raw.chars() {
        match c {
            '0'..='9' => {
                if !seen_decimal {
                    integer_part.push(c);
                }
            }
            '.' => seen_decimal = true,
            _ => {}
        }
    }

    if integer_part.is_empty() {
        return Err(ServiceError::StoreError(format!(
            "unparseable product price: {raw:?}"
        )));
    }

    integer_part.parse::<i64>().map_err(|_| {
        ServiceError::StoreError(format!("product price out of range: {raw:?}"))
    })
}
