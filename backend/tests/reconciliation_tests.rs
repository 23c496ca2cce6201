//! Validation and reconciliation tests
//!
//! Tests for the scan protocol and discrepancy reporting including:
//! - One unit per scan, capped at quantity_sent per line
//! - First-open-line matching in position order
//! - Shortage/overage classification

use proptest::prelude::*;
use uuid::Uuid;

use shared::reconciliation::{
    carries_product, classify_discrepancy, match_open_item, DiscrepancyEntry, DiscrepancyType,
    ScanCandidate,
};

fn line(product_id: Uuid, sent: i32, received: i32) -> ScanCandidate {
    ScanCandidate {
        product_id,
        quantity_sent: sent,
        quantity_received: received,
    }
}

/// Apply one scan of `product_id` the way the reconciler does: find the
/// first open line and credit it one unit.
fn apply_scan(items: &mut [ScanCandidate], product_id: Uuid) -> bool {
    match match_open_item(items, product_id) {
        Some(index) => {
            items[index].quantity_received += 1;
            true
        }
        None => false,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Each scan lands on the earliest line with room
    #[test]
    fn test_scans_fill_lines_in_position_order() {
        let product = Uuid::new_v4();
        let mut items = vec![line(product, 2, 0), line(product, 1, 0)];

        assert!(apply_scan(&mut items, product));
        assert!(apply_scan(&mut items, product));
        assert_eq!(items[0].quantity_received, 2);
        assert_eq!(items[1].quantity_received, 0);

        assert!(apply_scan(&mut items, product));
        assert_eq!(items[1].quantity_received, 1);
    }

    /// A fully received line rejects further scans of its product
    #[test]
    fn test_scans_capped_at_quantity_sent() {
        let product = Uuid::new_v4();
        let mut items = vec![line(product, 2, 0)];

        assert!(apply_scan(&mut items, product));
        assert!(apply_scan(&mut items, product));
        assert!(!apply_scan(&mut items, product));
        assert_eq!(items[0].quantity_received, 2);
    }

    /// Cap rejection and foreign-product rejection are distinguishable
    #[test]
    fn test_rejection_reasons() {
        let product = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let items = vec![line(product, 1, 1)];

        assert_eq!(match_open_item(&items, product), None);
        assert!(carries_product(&items, product));

        assert_eq!(match_open_item(&items, stranger), None);
        assert!(!carries_product(&items, stranger));
    }

    /// 10 sent, 7 scanned: shortage of 3
    #[test]
    fn test_shortage_report() {
        let entry = DiscrepancyEntry::for_item(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Café Torrado 500g".to_string(),
            10,
            7,
        )
        .unwrap();

        assert_eq!(entry.discrepancy_type, DiscrepancyType::Shortage);
        assert_eq!(entry.difference, 3);
    }

    /// Lines never scanned count as zero received
    #[test]
    fn test_unscanned_line_is_full_shortage() {
        let entry = DiscrepancyEntry::for_item(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Filtro de Papel".to_string(),
            4,
            0,
        )
        .unwrap();

        assert_eq!(entry.discrepancy_type, DiscrepancyType::Shortage);
        assert_eq!(entry.difference, 4);
    }

    /// Matching lines produce no report entry
    #[test]
    fn test_exact_match_is_clean() {
        assert!(classify_discrepancy(5, 5).is_none());
        assert!(DiscrepancyEntry::for_item(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Açúcar Cristal".to_string(),
            5,
            5
        )
        .is_none());
    }

    /// Overage is classified and surfaced, not dropped
    #[test]
    fn test_overage_is_surfaced() {
        let entry = DiscrepancyEntry::for_item(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Leite Integral".to_string(),
            3,
            5,
        )
        .unwrap();

        assert_eq!(entry.discrepancy_type, DiscrepancyType::Overage);
        assert_eq!(entry.difference, 2);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Up to 4 distinct products spread over up to 6 lines
    fn arb_transfer() -> impl Strategy<Value = (Vec<Uuid>, Vec<ScanCandidate>)> {
        (1usize..=4).prop_flat_map(|n_products| {
            let products: Vec<Uuid> = (0..n_products).map(|_| Uuid::new_v4()).collect();
            prop::collection::vec((0..n_products, 1..8i32), 1..6).prop_map(move |specs| {
                let items = specs
                    .into_iter()
                    .map(|(p, sent)| line(products[p], sent, 0))
                    .collect();
                (products.clone(), items)
            })
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Scanning every sent unit of every product yields a clean report
        #[test]
        fn prop_full_scan_round_trip((products, mut items) in arb_transfer()) {
            let _ = &products;
            let scans: Vec<Uuid> = items
                .iter()
                .flat_map(|i| std::iter::repeat(i.product_id).take(i.quantity_sent as usize))
                .collect();

            for product in scans {
                prop_assert!(apply_scan(&mut items, product));
            }

            for item in &items {
                prop_assert_eq!(item.quantity_received, item.quantity_sent);
                prop_assert!(
                    classify_discrepancy(item.quantity_sent, item.quantity_received).is_none()
                );
            }
        }

        /// However many scans arrive, no line ever exceeds its cap
        #[test]
        fn prop_cap_never_exceeded(
            (products, mut items) in arb_transfer(),
            scan_picks in prop::collection::vec(0usize..4, 0..64),
        ) {
            for pick in scan_picks {
                if pick < products.len() {
                    let _ = apply_scan(&mut items, products[pick]);
                }
            }

            for item in &items {
                prop_assert!(item.quantity_received <= item.quantity_sent);
                prop_assert!(item.quantity_received >= 0);
            }
        }

        /// Accepted scans equal the total credited across lines
        #[test]
        fn prop_accepted_scans_are_conserved(
            (products, mut items) in arb_transfer(),
            scan_picks in prop::collection::vec(0usize..4, 0..64),
        ) {
            let mut accepted = 0i32;
            for pick in scan_picks {
                if pick < products.len() && apply_scan(&mut items, products[pick]) {
                    accepted += 1;
                }
            }

            let credited: i32 = items.iter().map(|i| i.quantity_received).sum();
            prop_assert_eq!(accepted, credited);
        }

        /// Under the scan protocol a report can only contain shortages
        #[test]
        fn prop_scan_protocol_never_produces_overage(
            (products, mut items) in arb_transfer(),
            scan_picks in prop::collection::vec(0usize..4, 0..64),
        ) {
            for pick in scan_picks {
                if pick < products.len() {
                    let _ = apply_scan(&mut items, products[pick]);
                }
            }

            for item in &items {
                let class = classify_discrepancy(item.quantity_sent, item.quantity_received);
                prop_assert_ne!(class, Some(DiscrepancyType::Overage));
            }
        }

        /// difference is always the absolute sent/received gap
        #[test]
        fn prop_difference_is_absolute_gap(sent in 1..100i32, received in 0..200i32) {
            match DiscrepancyEntry::for_item(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "Produto".to_string(),
                sent,
                received,
            ) {
                Some(entry) => {
                    prop_assert_eq!(entry.difference, (sent - received).abs());
                    prop_assert!(entry.difference > 0);
                }
                None => prop_assert_eq!(sent, received),
            }
        }
    }
}
