//! Inter-warehouse transfer models
//!
//! A transfer relocates explicitly chosen batch quantities from a source
//! to a destination warehouse and requires physical confirmation (barcode
//! scanning) at the destination before stock is credited there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transfer lifecycle
///
/// draft -> in_transit -> in_validation -> completed, with cancellation
/// possible from draft and in_transit only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Draft,
    InTransit,
    InValidation,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Draft => "draft",
            TransferStatus::InTransit => "in_transit",
            TransferStatus::InValidation => "in_validation",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TransferStatus::Draft),
            "in_transit" => Some(TransferStatus::InTransit),
            "in_validation" => Some(TransferStatus::InValidation),
            "completed" => Some(TransferStatus::Completed),
            "cancelled" => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a transition from `self` to `to` is legal
    pub fn can_transition(&self, to: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (self, to),
            (Draft, InTransit)
                | (Draft, Cancelled)
                | (InTransit, InValidation)
                | (InTransit, Cancelled)
                | (InValidation, Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Cancelled)
    }

    /// Items may only be added or removed while the transfer is a draft
    pub fn is_editable(&self) -> bool {
        matches!(self, TransferStatus::Draft)
    }
}

/// A directed relocation of batch quantities between two warehouses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    /// Human-readable code, e.g. "TRF-2026-SP01-0042"
    pub code: String,
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Uuid,
    pub status: TransferStatus,
    pub notes: Option<String>,
    pub notes_pt: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_by: Uuid,
    pub executed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a transfer, pinned to an explicit source batch
///
/// `quantity_received` stays null until the destination scans the first
/// unit of the line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferItem {
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub source_batch_id: Uuid,
    /// Fixes the order scans are matched against the lines
    pub position: i32,
    pub quantity_sent: i32,
    pub quantity_received: Option<i32>,
    pub product_id: Uuid,
    pub product_name: String,
    pub created_at: DateTime<Utc>,
}

/// A transfer together with its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferWithItems {
    #[serde(flatten)]
    pub transfer: Transfer,
    pub items: Vec<TransferItem>,
}

/// Append-only record of one scan attempt during validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationLogEntry {
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub barcode: String,
    pub product_id: Option<Uuid>,
    pub is_valid: bool,
    pub message: String,
    pub message_pt: String,
    pub scanned_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Result returned to the operator after each scan
///
/// Invalid scans are soft failures: they are logged and reported but never
/// raise an error, so the operator can keep scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub valid: bool,
    pub product_name: Option<String>,
    pub quantity_sent: Option<i32>,
    pub quantity_received: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_pt: Option<String>,
}

impl ScanResult {
    pub fn matched(product_name: String, quantity_sent: i32, quantity_received: i32) -> Self {
        Self {
            valid: true,
            product_name: Some(product_name),
            quantity_sent: Some(quantity_sent),
            quantity_received: Some(quantity_received),
            message: None,
            message_pt: None,
        }
    }

    pub fn rejected(
        product_name: Option<String>,
        message: impl Into<String>,
        message_pt: impl Into<String>,
    ) -> Self {
        Self {
            valid: false,
            product_name,
            quantity_sent: None,
            quantity_received: None,
            message: Some(message.into()),
            message_pt: Some(message_pt.into()),
        }
    }
}
