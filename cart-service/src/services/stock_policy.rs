//! Stock policy: pure quantity checks consulted before any cart write.
//!
//! These functions never fail. The invoice store turns a `false` into a
//! validation error and skips the write.

use crate::models::CartLine;

/// Quantity every new cart line starts at.
pub const INITIAL_LINE_QUANTITY: u32 = 1;

/// True iff one more unit fits under the purchase ceiling.
pub fn can_increment(current_quantity: u32, purchase_ceiling: u32) -> bool {
    current_quantity < purchase_ceiling
}

/// True iff the quantity can drop by one.
///
/// Decrementing from 1 removes the line rather than writing a zero quantity.
pub fn can_decrement(current_quantity: u32) -> bool {
    current_quantity > 0
}

/// Starting quantity for a newly created line, whatever the caller asked for.
pub fn initial_quantity_for(_new_line: &CartLine) -> u32 {
    INITIAL_LINE_QUANTITY
}

/// True iff `quantity` is a storable line quantity under `purchase_ceiling`.
pub fn within_ceiling(quantity: u32, purchase_ceiling: u32) -> bool {
    quantity >= 1 && quantity <= purchase_ceiling
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_allowed_below_ceiling_only() {
        assert!(can_increment(0, 5));
        assert!(can_increment(4, 5));
        assert!(!can_increment(5, 5));
        assert!(!can_increment(6, 5));
        assert!(!can_increment(0, 0));
    }

    #[test]
    fn increment_never_allowed_at_or_above_ceiling() {
        for ceiling in 0..20u32 {
            for q in ceiling..ceiling + 20 {
                assert!(!can_increment(q, ceiling), "q={} ceiling={}", q, ceiling);
            }
        }
    }

    #[test]
    fn decrement_requires_positive_quantity() {
        assert!(!can_decrement(0));
        assert!(can_decrement(1));
        assert!(can_decrement(42));
    }

    #[test]
    fn new_lines_start_at_one() {
        let line = CartLine::new("p1".into(), 7, "S".into(), "green".into());
        assert_eq!(initial_quantity_for(&line), 1);
    }

    #[test]
    fn within_ceiling_bounds() {
        assert!(!within_ceiling(0, 5));
        assert!(within_ceiling(1, 5));
        assert!(within_ceiling(5, 5));
        assert!(!within_ceiling(6, 5));
        assert!(!within_ceiling(1, 0));
    }
}
