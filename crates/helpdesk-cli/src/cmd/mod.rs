pub mod auth;
pub mod completions;
pub mod ticket;
pub mod todo;
