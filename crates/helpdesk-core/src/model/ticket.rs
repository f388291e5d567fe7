use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, normalize};

/// What part of the IT estate a ticket is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Hardware,
    Software,
    Network,
    Access,
    Email,
    Other,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Hardware,
        Self::Software,
        Self::Network,
        Self::Access,
        Self::Email,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hardware => "hardware",
            Self::Software => "software",
            Self::Network => "network",
            Self::Access => "access",
            Self::Email => "email",
            Self::Other => "other",
        }
    }

    /// Long label shown next to the category picker.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hardware => "Hardware Issues",
            Self::Software => "Software Problems",
            Self::Network => "Network & Connectivity",
            Self::Access => "Access & Permissions",
            Self::Email => "Email Issues",
            Self::Other => "Other",
        }
    }
}

/// How urgently a ticket needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TicketPriority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl Default for TicketPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// The five lifecycle states of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Open,
    InProgress,
    Pending,
    Resolved,
    Closed,
}

impl Status {
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::InProgress,
        Self::Pending,
        Self::Resolved,
        Self::Closed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Validate whether a transition from self to `target` is allowed.
    ///
    /// Any status may move to any other, except that `closed` is only
    /// reachable from `resolved` (or is a no-op when already closed).
    pub fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        match (self, target) {
            (Self::Resolved | Self::Closed, Self::Closed) => Ok(()),
            (from, Self::Closed) => Err(InvalidTransition {
                from,
                to: target,
                reason: "a ticket must be resolved before it can be closed",
            }),
            _ => Ok(()),
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Open
    }
}

/// Error returned when a status transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: Status,
    pub to: Status,
    pub reason: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move {} -> {}: {}", self.from, self.to, self.reason)
    }
}

impl std::error::Error for InvalidTransition {}

/// A service-desk ticket with its comment thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: TicketPriority,
    pub status: Status,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub comments: Vec<TicketComment>,
}

/// One entry in a ticket's append-only comment thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketComment {
    pub id: String,
    pub ticket_id: String,
    pub user_id: String,
    /// Author's display name at the time of posting.
    pub user_name: String,
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new ticket. The store fills in the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: TicketPriority,
    pub status: Status,
    pub assigned_to: Option<String>,
}

impl NewTicket {
    /// A new `open`, unassigned ticket.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: Category,
        priority: TicketPriority,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category,
            priority,
            status: Status::Open,
            assigned_to: None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "category",
                got: s.to_string(),
            })
    }
}

impl FromStr for TicketPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            })
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "status",
                got: s.to_string(),
            })
    }
}
