use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for scripting against the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    NotLoggedIn,
    AuthRejected,
    EmailTaken,
    TicketNotFound,
    TodoNotFound,
    UserNotFound,
    Forbidden,
    InvalidStateTransition,
    InvalidEnumValue,
    InvalidText,
    StorageWriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    pub const ALL: [Self; 14] = [
        Self::ConfigParseError,
        Self::NotLoggedIn,
        Self::AuthRejected,
        Self::EmailTaken,
        Self::TicketNotFound,
        Self::TodoNotFound,
        Self::UserNotFound,
        Self::Forbidden,
        Self::InvalidStateTransition,
        Self::InvalidEnumValue,
        Self::InvalidText,
        Self::StorageWriteFailed,
        Self::LockContention,
        Self::InternalUnexpected,
    ];

    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::NotLoggedIn => "E1101",
            Self::AuthRejected => "E1102",
            Self::EmailTaken => "E1103",
            Self::TicketNotFound => "E2001",
            Self::TodoNotFound => "E2002",
            Self::UserNotFound => "E2007",
            Self::Forbidden => "E2003",
            Self::InvalidStateTransition => "E2004",
            Self::InvalidEnumValue => "E2005",
            Self::InvalidText => "E2006",
            Self::StorageWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::NotLoggedIn => "No active session",
            Self::AuthRejected => "Invalid email or password",
            Self::EmailTaken => "Email already registered",
            Self::TicketNotFound => "Ticket not found",
            Self::TodoNotFound => "Todo not found",
            Self::UserNotFound => "User not found",
            Self::Forbidden => "Not permitted for this account",
            Self::InvalidStateTransition => "Invalid status transition",
            Self::InvalidEnumValue => "Invalid category/priority/status value",
            Self::InvalidText => "Invalid text",
            Self::StorageWriteFailed => "Storage write failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to the operator.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in config.toml and retry."),
            Self::NotLoggedIn => Some("Run `hd login <email> --password <password>` first."),
            Self::AuthRejected => Some("Check the email and password and retry."),
            Self::EmailTaken => Some("Log in with that email instead, or pick another one."),
            Self::TicketNotFound => Some("Run `hd ticket list` to see visible ticket IDs."),
            Self::TodoNotFound => Some("Run `hd todo list` to see todo IDs."),
            Self::UserNotFound => Some("Use a user id or the email of a registered account."),
            Self::Forbidden => Some("Ask an admin to make this change."),
            Self::InvalidStateTransition => {
                Some("A ticket can only be closed once it has been resolved.")
            }
            Self::InvalidEnumValue => Some("Use one of the documented values."),
            Self::InvalidText => None,
            Self::StorageWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `hd` process finishes."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures from a key-value backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{}: lock timed out after {waited_ms}ms at {}", ErrorCode::LockContention, .path.display())]
    LockTimeout { path: PathBuf, waited_ms: u128 },

    #[error("{}: {action} {}: {source}", ErrorCode::StorageWriteFailed, .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid key '{0}'", ErrorCode::InternalUnexpected)]
    InvalidKey(String),
}

impl StorageError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::LockTimeout { .. } => ErrorCode::LockContention,
            Self::Io { .. } => ErrorCode::StorageWriteFailed,
            Self::InvalidKey(_) => ErrorCode::InternalUnexpected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ErrorCode::ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn every_code_has_a_summary() {
        for code in ErrorCode::ALL {
            assert!(!code.message().is_empty(), "{code} has no message");
        }
        assert_eq!(ErrorCode::UserNotFound.message(), "User not found");
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::InvalidStateTransition.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }
}
