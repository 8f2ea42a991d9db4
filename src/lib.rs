pub mod config;
pub mod error;
pub mod harness;
pub mod payload;
pub mod sim;
pub mod socket;

pub use error::{BridgeError, BridgeResult};
pub use payload::{Phase, SyncStatus, Transaction};
pub use sim::{SimHandle, Simulation};
pub use socket::{SimpleTargetSocket, TaggedTargetSocket, TargetSocket};
