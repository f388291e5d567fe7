use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, normalize};

/// Three-level importance of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    Low,
    Medium,
    High,
}

impl TodoPriority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Sort rank: high 3, medium 2, low 1.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl Default for TodoPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for TodoPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseEnumError {
                expected: "todo priority",
                got: s.to_string(),
            }),
        }
    }
}

/// A personal task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub priority: TodoPriority,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_orders_high_over_low() {
        assert!(TodoPriority::High.rank() > TodoPriority::Medium.rank());
        assert!(TodoPriority::Medium.rank() > TodoPriority::Low.rank());
    }

    #[test]
    fn parse_and_display_agree() {
        for value in TodoPriority::ALL {
            assert_eq!(value.to_string().parse::<TodoPriority>().unwrap(), value);
        }
        assert!("critical".parse::<TodoPriority>().is_err());
    }

    #[test]
    fn todo_decodes_stored_shape() {
        let raw = r#"{"id":"a1","text":"Buy milk","completed":true,
                     "createdAt":"2024-03-02T08:00:00.000Z","priority":"high"}"#;
        let todo: Todo = serde_json::from_str(raw).unwrap();
        assert!(todo.completed);
        assert_eq!(todo.priority, TodoPriority::High);
        assert_eq!(todo.text, "Buy milk");
    }
}
