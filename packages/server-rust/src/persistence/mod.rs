//! Persistence collaborators: fault types reported by durable storage and the
//! manager handles the service closes on shutdown.

pub mod errors;
pub mod manager;

pub use errors::PersistenceError;
pub use manager::{PersistenceManager, PersistenceManagers};
