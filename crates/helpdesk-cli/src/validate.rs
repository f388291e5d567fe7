use crate::output::CliError;
use helpdesk_core::error::ErrorCode;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_TODO_LEN: usize = 200;
pub const MAX_COMMENT_LEN: usize = 8_192;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
    pub suggestion: String,
    pub code: ErrorCode,
}

impl ValidationError {
    pub fn new(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
        code: ErrorCode,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
            suggestion: suggestion.into(),
            code,
        }
    }

    pub fn to_cli_error(&self) -> CliError {
        CliError::with_details(
            format!("invalid {} '{}': {}", self.field, preview(&self.value), self.reason),
            self.suggestion.clone(),
            self.code.code(),
        )
    }
}

/// First 40 chars of a rejected value, for error messages.
fn preview(value: &str) -> String {
    let mut chars = value.chars();
    let head: String = chars.by_ref().take(40).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

fn bounded_text(
    field: &'static str,
    flag: &str,
    s: &str,
    max: usize,
    allow_newlines: bool,
) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::new(
            field,
            s,
            "must not be empty",
            format!("provide a non-empty {flag}"),
            ErrorCode::InvalidText,
        ));
    }
    let len = s.trim().chars().count();
    if len > max {
        return Err(ValidationError::new(
            field,
            s,
            format!("must be <= {max} characters (got {len})"),
            format!("shorten the {field}"),
            ErrorCode::InvalidText,
        ));
    }
    if s
        .chars()
        .any(|c| c.is_control() && !(allow_newlines && (c == '\n' || c == '\t')))
    {
        return Err(ValidationError::new(
            field,
            s,
            "must not contain control characters",
            format!("remove control characters from the {field}"),
            ErrorCode::InvalidText,
        ));
    }
    Ok(())
}

pub fn validate_title(s: &str) -> Result<(), ValidationError> {
    bounded_text("title", "--title", s, MAX_TITLE_LEN, false)
}

pub fn validate_description(s: &str) -> Result<(), ValidationError> {
    bounded_text("description", "--description", s, MAX_DESCRIPTION_LEN, true)
}

pub fn validate_todo_text(s: &str) -> Result<(), ValidationError> {
    bounded_text("todo", "todo text", s, MAX_TODO_LEN, false)
}

pub fn validate_comment(s: &str) -> Result<(), ValidationError> {
    bounded_text("comment", "comment text", s, MAX_COMMENT_LEN, true)
}

pub fn validate_email(s: &str) -> Result<(), ValidationError> {
    let valid = s.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    }) && !s.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new(
            "email",
            s,
            "must look like name@domain.tld",
            "check the email address",
            ErrorCode::InvalidText,
        ))
    }
}
