//! Fixed demo records used when nothing has been stored yet.

use crate::clock::from_millis;
use crate::model::{Category, Role, Status, Ticket, TicketComment, TicketPriority, User};

/// The two tickets a fresh service desk starts with.
#[must_use]
pub fn tickets() -> Vec<Ticket> {
    vec![
        Ticket {
            id: "1".into(),
            title: "Computer won't start".into(),
            description: "My computer is not turning on when I press the power button. \
                          I've checked the power cable and it seems to be connected properly."
                .into(),
            category: Category::Hardware,
            priority: TicketPriority::High,
            status: Status::InProgress,
            user_id: "2".into(),
            assigned_to: Some("1".into()),
            created_at: from_millis(1_705_744_800_000),
            updated_at: from_millis(1_705_761_000_000),
            resolved_at: None,
            comments: vec![TicketComment {
                id: "1".into(),
                ticket_id: "1".into(),
                user_id: "1".into(),
                user_name: "Admin User".into(),
                content: "I've assigned this ticket to myself. Can you please check if the \
                          power LED on the computer is lighting up?"
                    .into(),
                is_internal: false,
                created_at: from_millis(1_705_761_000_000),
            }],
        },
        Ticket {
            id: "2".into(),
            title: "Email not working".into(),
            description: "I cannot send or receive emails. \
                          Getting error message \"Connection timeout\"."
                .into(),
            category: Category::Email,
            priority: TicketPriority::Medium,
            status: Status::Open,
            user_id: "2".into(),
            assigned_to: None,
            created_at: from_millis(1_705_828_500_000),
            updated_at: from_millis(1_705_828_500_000),
            resolved_at: None,
            comments: Vec::new(),
        },
    ]
}

/// Demo accounts paired with their (plain-text, demo-only) passwords.
#[must_use]
pub fn accounts() -> Vec<(User, String)> {
    vec![
        (
            User {
                id: "1".into(),
                email: "admin@company.com".into(),
                name: "Admin User".into(),
                role: Role::Admin,
                department: Some("IT".into()),
                created_at: from_millis(1_704_067_200_000),
            },
            "admin123".into(),
        ),
        (
            User {
                id: "2".into(),
                email: "user@company.com".into(),
                name: "John Doe".into(),
                role: Role::User,
                department: Some("Marketing".into()),
                created_at: from_millis(1_705_276_800_000),
            },
            "user123".into(),
        ),
    ]
}
