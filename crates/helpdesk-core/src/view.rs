//! Derived views: scoping, filtering, sorting, and counts.
//!
//! Everything here is a pure function of borrowed records. Nothing is
//! cached or stored; callers recompute after each mutation.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::model::{
    Category, ParseEnumError, Status, Ticket, TicketComment, TicketPriority, Todo, User, normalize,
};

/// Tickets the actor may see: everything for admins, their own otherwise.
#[must_use]
pub fn scope_tickets<'a>(tickets: &'a [Ticket], actor: Option<&User>) -> Vec<&'a Ticket> {
    let Some(actor) = actor else {
        return Vec::new();
    };
    tickets
        .iter()
        .filter(|t| actor.is_admin() || t.user_id == actor.id)
        .collect()
}

/// Whether `actor` may see `ticket`.
#[must_use]
pub fn can_view(ticket: &Ticket, actor: Option<&User>) -> bool {
    actor.is_some_and(|a| a.is_admin() || a.id == ticket.user_id)
}

/// The thread as the actor may read it. Internal notes are admin-only.
#[must_use]
pub fn visible_comments<'a>(ticket: &'a Ticket, actor: Option<&User>) -> Vec<&'a TicketComment> {
    if !can_view(ticket, actor) {
        return Vec::new();
    }
    let admin = actor.is_some_and(User::is_admin);
    ticket
        .comments
        .iter()
        .filter(|c| admin || !c.is_internal)
        .collect()
}

/// Ticket list filters. `None` means "all" for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketQuery {
    pub search: String,
    pub status: Option<Status>,
    pub priority: Option<TicketPriority>,
    pub category: Option<Category>,
}

impl TicketQuery {
    /// True when any filter narrows the list.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.search.is_empty()
            || self.status.is_some()
            || self.priority.is_some()
            || self.category.is_some()
    }

    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = needle.is_empty()
            || ticket.title.to_lowercase().contains(&needle)
            || ticket.description.to_lowercase().contains(&needle);

        matches_search
            && self.status.is_none_or(|s| ticket.status == s)
            && self.priority.is_none_or(|p| ticket.priority == p)
            && self.category.is_none_or(|c| ticket.category == c)
    }
}

/// Scoped tickets that satisfy every active filter, in store order.
#[must_use]
pub fn filter_tickets<'a>(
    tickets: &'a [Ticket],
    actor: Option<&User>,
    query: &TicketQuery,
) -> Vec<&'a Ticket> {
    scope_tickets(tickets, actor)
        .into_iter()
        .filter(|t| query.matches(t))
        .collect()
}

/// Counts over the scoped collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TicketStats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub resolved: usize,
    pub closed: usize,
    pub critical: usize,
    pub high: usize,
}

impl TicketStats {
    #[must_use]
    pub fn compute(tickets: &[&Ticket]) -> Self {
        let mut stats = Self {
            total: tickets.len(),
            ..Self::default()
        };
        for ticket in tickets {
            match ticket.status {
                Status::Open => stats.open += 1,
                Status::InProgress => stats.in_progress += 1,
                Status::Pending => stats.pending += 1,
                Status::Resolved => stats.resolved += 1,
                Status::Closed => stats.closed += 1,
            }
            match ticket.priority {
                TicketPriority::Critical => stats.critical += 1,
                TicketPriority::High => stats.high += 1,
                TicketPriority::Low | TicketPriority::Medium => {}
            }
        }
        stats
    }
}

/// Stats for what `actor` can see.
#[must_use]
pub fn ticket_stats(tickets: &[Ticket], actor: Option<&User>) -> TicketStats {
    TicketStats::compute(&scope_tickets(tickets, actor))
}

/// The newest `limit` scoped tickets by creation time.
#[must_use]
pub fn recent_tickets<'a>(
    tickets: &'a [Ticket],
    actor: Option<&User>,
    limit: usize,
) -> Vec<&'a Ticket> {
    let mut scoped = scope_tickets(tickets, actor);
    scoped.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    scoped.truncate(limit);
    scoped
}

/// Ticket count per category, in category declaration order, skipping
/// categories with no tickets.
#[must_use]
pub fn category_breakdown(tickets: &[&Ticket]) -> Vec<(Category, usize)> {
    Category::ALL
        .into_iter()
        .map(|c| (c, tickets.iter().filter(|t| t.category == c).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
}

/// Which todos to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TodoFilter {
    #[must_use]
    pub const fn admits(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
        }
    }
}

/// Todo display order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoSort {
    /// Newest first.
    #[default]
    Date,
    Alphabetical,
    /// High, medium, low.
    Priority,
}

impl TodoSort {
    #[must_use]
    pub fn compare(self, a: &Todo, b: &Todo) -> Ordering {
        match self {
            Self::Date => b.created_at.cmp(&a.created_at),
            Self::Alphabetical => locale_compare(&a.text, &b.text),
            Self::Priority => b.priority.rank().cmp(&a.priority.rank()),
        }
    }
}

impl FromStr for TodoFilter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            _ => Err(ParseEnumError {
                expected: "todo filter",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for TodoSort {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "date" => Ok(Self::Date),
            "alphabetical" | "alpha" => Ok(Self::Alphabetical),
            "priority" => Ok(Self::Priority),
            _ => Err(ParseEnumError {
                expected: "todo sort",
                got: s.to_string(),
            }),
        }
    }
}

/// Filter then stably sort; equal keys keep their store order.
#[must_use]
pub fn todo_view(todos: &[Todo], filter: TodoFilter, sort: TodoSort) -> Vec<&Todo> {
    let mut shown: Vec<&Todo> = todos.iter().filter(|t| filter.admits(t)).collect();
    shown.sort_by(|a, b| sort.compare(a, b));
    shown
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodoStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl TodoStats {
    #[must_use]
    pub fn compute(todos: &[Todo]) -> Self {
        let completed = todos.iter().filter(|t| t.completed).count();
        Self {
            total: todos.len(),
            active: todos.len() - completed,
            completed,
        }
    }
}

/// Dictionary-style string order.
///
/// Three levels, each consulted only on a tie at the one before:
/// base letters with accents and case folded away, then accents
/// (unaccented first, `e < é`), then case (lowercase first,
/// `apple < Apple < banana`). Byte order breaks any remaining tie.
#[must_use]
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let base = |s: &str| base_letters(s).flat_map(char::to_lowercase).collect::<Vec<_>>();
    let accented = |s: &str| s.nfd().flat_map(char::to_lowercase).collect::<Vec<_>>();
    base(a)
        .cmp(&base(b))
        .then_with(|| accented(a).cmp(&accented(b)))
        .then_with(|| {
            base_letters(a)
                .zip(base_letters(b))
                .map(|(x, y)| case_rank(x).cmp(&case_rank(y)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.cmp(b))
}

fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().filter(|c| !is_combining_mark(*c))
}

fn case_rank(c: char) -> u8 {
    u8::from(c.is_uppercase())
}
