//! In-memory entity stores with write-through persistence.

pub mod tickets;
pub mod todos;

pub use tickets::{TicketStore, TicketUpdate, UpdateOutcome};
pub use todos::TodoStore;
