//! Shard ownership: the engine contract, the ownership table, and the
//! lifecycle controller that keeps the table in line with membership.

pub mod controller;
pub mod engine;
pub mod table;

pub use controller::{ControllerDescription, ControllerError, ControllerStatus, ShardController};
pub use engine::{Engine, EngineError, EngineFactory, EngineResult, ShardContext};
pub use table::ShardOwnershipTable;
