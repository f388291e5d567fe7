//! Domain records: tickets with their comments, todos, and actors.

pub mod ticket;
pub mod todo;
pub mod user;

use std::fmt;

pub use ticket::{Category, NewTicket, Status, Ticket, TicketComment, TicketPriority};
pub use todo::{Todo, TodoPriority};
pub use user::{Role, User};

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

/// Lowercase, trim, and fold `_`/space separators to `-`.
pub(crate) fn normalize(input: &str) -> String {
    input
        .trim()
        .to_ascii_lowercase()
        .replace(['_', ' '], "-")
}
