//! Deterministic batch sourcing for undirected stock exits
//!
//! When a caller removes a quantity of a product from a warehouse without
//! naming a batch, oldest-expiring stock is consumed first. Batches with
//! no expiration date sort after every dated batch; ties break on
//! creation time, oldest first. Planning is all-or-nothing: if the
//! cumulative availability cannot satisfy the request, no batch is
//! touched.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Snapshot of a batch eligible for sourcing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableBatch {
    pub batch_id: Uuid,
    pub quantity: i32,
    pub expiration_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// A planned deduction against a single batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDraw {
    pub batch_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourcingError {
    #[error("requested {requested} units but only {available} available")]
    Insufficient { requested: i32, available: i64 },

    #[error("requested quantity must be positive")]
    NonPositiveRequest,
}

/// Consumption order: earliest expiration first, undated batches last,
/// ties broken by creation time
pub fn consumption_order(a: &AvailableBatch, b: &AvailableBatch) -> Ordering {
    match (a.expiration_date, b.expiration_date) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.created_at.cmp(&b.created_at)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.created_at.cmp(&b.created_at),
    }
}

/// Plan which batches supply `requested` units
///
/// Walks the batches in consumption order, drawing up to each batch's
/// available quantity until the request is satisfied. Zero-quantity
/// batches are skipped. Fails without partial results when the total
/// available is short of the request.
pub fn plan_draws(
    batches: &[AvailableBatch],
    requested: i32,
) -> Result<Vec<BatchDraw>, SourcingError> {
    if requested <= 0 {
        return Err(SourcingError::NonPositiveRequest);
    }

    let available: i64 = batches.iter().map(|b| b.quantity.max(0) as i64).sum();
    if available < requested as i64 {
        return Err(SourcingError::Insufficient {
            requested,
            available,
        });
    }

    let mut ordered: Vec<&AvailableBatch> = batches.iter().filter(|b| b.quantity > 0).collect();
    ordered.sort_by(|a, b| consumption_order(a, b));

    let mut draws = Vec::new();
    let mut remaining = requested;
    for batch in ordered {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(batch.quantity);
        draws.push(BatchDraw {
            batch_id: batch.batch_id,
            quantity: take,
        });
        remaining -= take;
    }

    Ok(draws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn batch(qty: i32, exp: Option<&str>, created_secs: i64) -> AvailableBatch {
        AvailableBatch {
            batch_id: Uuid::new_v4(),
            quantity: qty,
            expiration_date: exp.map(|d| d.parse().unwrap()),
            created_at: Utc.timestamp_opt(1_700_000_000 + created_secs, 0).unwrap(),
        }
    }

    #[test]
    fn draws_earliest_expiration_first() {
        let b1 = batch(5, Some("2026-01-10"), 10);
        let b2 = batch(5, Some("2026-02-01"), 0);
        let draws = plan_draws(&[b2.clone(), b1.clone()], 7).unwrap();

        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].batch_id, b1.batch_id);
        assert_eq!(draws[0].quantity, 5);
        assert_eq!(draws[1].batch_id, b2.batch_id);
        assert_eq!(draws[1].quantity, 2);
    }

    #[test]
    fn insufficient_stock_plans_nothing() {
        let b1 = batch(5, Some("2026-01-10"), 0);
        let b2 = batch(5, Some("2026-02-01"), 1);
        let err = plan_draws(&[b1, b2], 11).unwrap_err();
        assert_eq!(
            err,
            SourcingError::Insufficient {
                requested: 11,
                available: 10
            }
        );
    }

    #[test]
    fn undated_batches_sort_last() {
        let undated = batch(10, None, 0);
        let dated = batch(3, Some("2030-12-31"), 100);
        let draws = plan_draws(&[undated.clone(), dated.clone()], 5).unwrap();

        assert_eq!(draws[0].batch_id, dated.batch_id);
        assert_eq!(draws[0].quantity, 3);
        assert_eq!(draws[1].batch_id, undated.batch_id);
        assert_eq!(draws[1].quantity, 2);
    }

    #[test]
    fn expiration_tie_breaks_on_creation_time() {
        let newer = batch(5, Some("2026-06-01"), 50);
        let older = batch(5, Some("2026-06-01"), 5);
        let draws = plan_draws(&[newer.clone(), older.clone()], 6).unwrap();

        assert_eq!(draws[0].batch_id, older.batch_id);
        assert_eq!(draws[1].batch_id, newer.batch_id);
    }

    #[test]
    fn zero_quantity_batches_are_skipped() {
        let empty = batch(0, Some("2025-01-01"), 0);
        let full = batch(4, Some("2026-01-01"), 1);
        let draws = plan_draws(&[empty, full.clone()], 4).unwrap();

        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].batch_id, full.batch_id);
    }

    #[test]
    fn non_positive_request_is_rejected() {
        let b = batch(5, None, 0);
        assert_eq!(
            plan_draws(&[b.clone()], 0),
            Err(SourcingError::NonPositiveRequest)
        );
        assert_eq!(
            plan_draws(&[b], -3),
            Err(SourcingError::NonPositiveRequest)
        );
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn arb_batches() -> impl Strategy<Value = Vec<AvailableBatch>> {
        prop::collection::vec(
            (0..100i32, prop::option::of(0u32..1000), 0i64..10_000),
            1..10,
        )
        .prop_map(|specs| {
            specs
                .into_iter()
                .map(|(quantity, exp_offset, created)| AvailableBatch {
                    batch_id: Uuid::new_v4(),
                    quantity,
                    expiration_date: exp_offset.map(|d| {
                        NaiveDate::from_ymd_opt(2026, 1, 1)
                            .unwrap()
                            .checked_add_days(chrono::Days::new(d as u64))
                            .unwrap()
                    }),
                    created_at: Utc.timestamp_opt(1_700_000_000 + created, 0).unwrap(),
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Planning succeeds exactly when availability covers the request
        #[test]
        fn all_or_nothing(batches in arb_batches(), requested in 1..300i32) {
            let available: i64 = batches.iter().map(|b| b.quantity.max(0) as i64).sum();
            match plan_draws(&batches, requested) {
                Ok(_) => prop_assert!(available >= requested as i64),
                Err(SourcingError::Insufficient { requested: r, available: a }) => {
                    prop_assert_eq!(r, requested);
                    prop_assert_eq!(a, available);
                    prop_assert!(available < requested as i64);
                }
                Err(SourcingError::NonPositiveRequest) => prop_assert!(false),
            }
        }

        /// A successful plan draws exactly the requested total, within
        /// each batch's availability
        #[test]
        fn draws_conserve_and_never_overdraw(batches in arb_batches(), requested in 1..300i32) {
            if let Ok(draws) = plan_draws(&batches, requested) {
                let total: i32 = draws.iter().map(|d| d.quantity).sum();
                prop_assert_eq!(total, requested);
                for draw in &draws {
                    let source = batches.iter().find(|b| b.batch_id == draw.batch_id);
                    prop_assert!(draw.quantity > 0);
                    prop_assert!(draw.quantity <= source.map(|b| b.quantity).unwrap_or(0));
                }
            }
        }
    }
}
