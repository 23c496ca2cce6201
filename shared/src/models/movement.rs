//! Stock movement models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BatchAttributes;

/// Types of quantity-affecting stock movements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Entry,
    Exit,
    AdjustmentIn,
    AdjustmentOut,
    /// Audit record written when a transfer leaves the source warehouse
    TransferExecute,
    /// Audit record written when a transfer is received at the destination
    TransferReceive,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "entry",
            MovementType::Exit => "exit",
            MovementType::AdjustmentIn => "adjustment_in",
            MovementType::AdjustmentOut => "adjustment_out",
            MovementType::TransferExecute => "transfer_execute",
            MovementType::TransferReceive => "transfer_receive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(MovementType::Entry),
            "exit" => Some(MovementType::Exit),
            "adjustment_in" => Some(MovementType::AdjustmentIn),
            "adjustment_out" => Some(MovementType::AdjustmentOut),
            "transfer_execute" => Some(MovementType::TransferExecute),
            "transfer_receive" => Some(MovementType::TransferReceive),
            _ => None,
        }
    }

    /// Whether executing this movement grows batch quantities
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            MovementType::Entry | MovementType::AdjustmentIn | MovementType::TransferReceive
        )
    }

    pub fn is_outbound(&self) -> bool {
        !self.is_inbound()
    }

    /// Transfer audit movements are created already completed and can only
    /// be created by the transfer engine itself.
    pub fn is_transfer_audit(&self) -> bool {
        matches!(
            self,
            MovementType::TransferExecute | MovementType::TransferReceive
        )
    }
}

/// Lifecycle of a movement: pending until executed or cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Pending,
    Completed,
    Cancelled,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Pending => "pending",
            MovementStatus::Completed => "completed",
            MovementStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MovementStatus::Pending),
            "completed" => Some(MovementStatus::Completed),
            "cancelled" => Some(MovementStatus::Cancelled),
            _ => None,
        }
    }

    /// Only pending movements may be executed
    pub fn can_execute(&self) -> bool {
        matches!(self, MovementStatus::Pending)
    }

    /// Only pending movements may be cancelled
    pub fn can_cancel(&self) -> bool {
        matches!(self, MovementStatus::Pending)
    }

    /// Completed and cancelled movements are immutable
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MovementStatus::Pending)
    }
}

/// A stock movement within a single warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub movement_type: MovementType,
    pub status: MovementStatus,
    pub warehouse_id: Uuid,
    pub notes: Option<String>,
    pub notes_pt: Option<String>,
    pub created_by: Uuid,
    pub executed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

/// One line of a movement
///
/// Outbound lines may name an explicit batch; without one the sourcing
/// policy decides at execution time. Inbound lines carry the attributes of
/// the batch being received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementItem {
    pub id: Uuid,
    pub movement_id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub quantity: i32,
    pub reason: Option<String>,
    #[serde(flatten)]
    pub attributes: BatchAttributes,
}

/// A movement together with its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementWithItems {
    #[serde(flatten)]
    pub movement: Movement,
    pub items: Vec<MovementItem>,
}
