pub mod batch;
pub mod movement;
pub mod reconciliation;
pub mod sourcing;
pub mod transfer;

pub use batch::BatchService;
pub use movement::MovementService;
pub use reconciliation::ReconciliationService;
pub use transfer::TransferService;
