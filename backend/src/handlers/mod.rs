pub mod batches;
pub mod health;
pub mod movements;
pub mod transfers;

pub use batches::*;
pub use health::*;
pub use movements::*;
pub use transfers::*;
