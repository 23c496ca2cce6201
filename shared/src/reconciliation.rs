//! Scan matching and discrepancy classification
//!
//! The reconciliation rules of transfer validation: each scan represents
//! exactly one physical unit and is matched against the first transfer
//! line (in line order) that carries the scanned product and still has
//! room under its `quantity_sent` cap. Reports compare sent against
//! received per line.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A transfer line as seen by the scan matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCandidate {
    pub product_id: Uuid,
    pub quantity_sent: i32,
    pub quantity_received: i32,
}

/// Index of the first line carrying `product_id` with room left
///
/// Lines must be given in transfer-line order; the order is the contract,
/// not an implementation detail.
pub fn match_open_item(items: &[ScanCandidate], product_id: Uuid) -> Option<usize> {
    items
        .iter()
        .position(|i| i.product_id == product_id && i.quantity_received < i.quantity_sent)
}

/// Whether any line carries this product at all, regardless of room
///
/// Distinguishes "not part of this transfer" from "already fully
/// received" in the operator-facing scan message.
pub fn carries_product(items: &[ScanCandidate], product_id: Uuid) -> bool {
    items.iter().any(|i| i.product_id == product_id)
}

/// Per-line mismatch between sent and received quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyType {
    Shortage,
    /// The scan cap makes this unreachable through the scan protocol; a
    /// report-time overage signals corrupted data and is surfaced, never
    /// dropped.
    Overage,
}

impl DiscrepancyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyType::Shortage => "shortage",
            DiscrepancyType::Overage => "overage",
        }
    }
}

/// Classify one line; `None` means sent and received agree
pub fn classify_discrepancy(quantity_sent: i32, quantity_received: i32) -> Option<DiscrepancyType> {
    match quantity_received.cmp(&quantity_sent) {
        std::cmp::Ordering::Less => Some(DiscrepancyType::Shortage),
        std::cmp::Ordering::Greater => Some(DiscrepancyType::Overage),
        std::cmp::Ordering::Equal => None,
    }
}

/// One line of the discrepancy report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscrepancyEntry {
    pub transfer_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_sent: i32,
    pub quantity_received: i32,
    pub discrepancy_type: DiscrepancyType,
    pub difference: i32,
}

impl DiscrepancyEntry {
    /// Build the report entry for a line, if its quantities disagree
    pub fn for_item(
        transfer_item_id: Uuid,
        product_id: Uuid,
        product_name: String,
        quantity_sent: i32,
        quantity_received: i32,
    ) -> Option<Self> {
        classify_discrepancy(quantity_sent, quantity_received).map(|discrepancy_type| Self {
            transfer_item_id,
            product_id,
            product_name,
            quantity_sent,
            quantity_received,
            discrepancy_type,
            difference: (quantity_sent - quantity_received).abs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(product_id: Uuid, sent: i32, received: i32) -> ScanCandidate {
        ScanCandidate {
            product_id,
            quantity_sent: sent,
            quantity_received: received,
        }
    }

    #[test]
    fn matches_first_open_line_in_order() {
        let product = Uuid::new_v4();
        let other = Uuid::new_v4();
        let items = vec![
            candidate(other, 5, 0),
            candidate(product, 3, 3),
            candidate(product, 4, 1),
        ];
        assert_eq!(match_open_item(&items, product), Some(2));
    }

    #[test]
    fn full_lines_do_not_match() {
        let product = Uuid::new_v4();
        let items = vec![candidate(product, 2, 2)];
        assert_eq!(match_open_item(&items, product), None);
        assert!(carries_product(&items, product));
    }

    #[test]
    fn unknown_product_neither_matches_nor_carries() {
        let items = vec![candidate(Uuid::new_v4(), 2, 0)];
        let stranger = Uuid::new_v4();
        assert_eq!(match_open_item(&items, stranger), None);
        assert!(!carries_product(&items, stranger));
    }

    #[test]
    fn classification_covers_all_cases() {
        assert_eq!(classify_discrepancy(10, 7), Some(DiscrepancyType::Shortage));
        assert_eq!(classify_discrepancy(10, 12), Some(DiscrepancyType::Overage));
        assert_eq!(classify_discrepancy(10, 10), None);
    }

    #[test]
    fn report_entry_carries_absolute_difference() {
        let entry = DiscrepancyEntry::for_item(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Arabica 500g".to_string(),
            10,
            7,
        )
        .unwrap();
        assert_eq!(entry.discrepancy_type, DiscrepancyType::Shortage);
        assert_eq!(entry.difference, 3);

        assert!(DiscrepancyEntry::for_item(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Arabica 500g".to_string(),
            10,
            10
        )
        .is_none());
    }
}
