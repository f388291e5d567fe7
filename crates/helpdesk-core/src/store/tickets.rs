//! The service-desk ticket store.
//!
//! Holds the ticket collection newest-first and is its only writer. Every
//! successful mutation stamps `updated_at` and writes the full collection
//! through the [`Slot`]; refused or no-op mutations leave both the memory
//! copy and storage untouched.

use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::{Clock, Stamper};
use crate::model::{Category, NewTicket, Status, Ticket, TicketComment, TicketPriority, User};
use crate::storage::{SharedStore, Slot, TICKETS_KEY};
use crate::{id, seed};

/// One typed field change on a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketUpdate {
    SetStatus(Status),
    SetPriority(TicketPriority),
    SetCategory(Category),
    Assign(String),
    Unassign,
    Retitle(String),
    Describe(String),
}

impl TicketUpdate {
    /// Whether `actor` may apply this change to `ticket`.
    ///
    /// Triage fields (status, priority, assignee) belong to admins. The
    /// descriptive fields may also be edited by the ticket's owner.
    #[must_use]
    pub fn permitted(&self, actor: &User, ticket: &Ticket) -> bool {
        match self {
            Self::SetStatus(_) | Self::SetPriority(_) | Self::Assign(_) | Self::Unassign => {
                actor.is_admin()
            }
            Self::SetCategory(_) | Self::Retitle(_) | Self::Describe(_) => {
                actor.is_admin() || actor.id == ticket.user_id
            }
        }
    }
}

/// Result of [`TicketStore::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    NotFound,
    NoSession,
    Forbidden,
    InvalidTransition,
    EmptyText,
}

impl UpdateOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

pub struct TicketStore {
    tickets: Vec<Ticket>,
    slot: Slot<Vec<Ticket>>,
    clock: Arc<dyn Clock>,
    stamper: Stamper,
}

impl TicketStore {
    /// Rehydrate from `backend`, falling back to the seed tickets when the
    /// slot is empty or unreadable.
    pub fn open(backend: SharedStore, clock: Arc<dyn Clock>) -> Self {
        let slot = Slot::new(backend, TICKETS_KEY);
        let (tickets, seeded) = match slot.load() {
            Some(tickets) => (tickets, false),
            None => (seed::tickets(), true),
        };

        let mut stamper = Stamper::new();
        for ticket in &tickets {
            stamper.observe(ticket.updated_at);
            for comment in &ticket.comments {
                stamper.observe(comment.created_at);
            }
        }

        let store = Self {
            tickets,
            slot,
            clock,
            stamper,
        };
        if seeded {
            info!(count = store.tickets.len(), "no stored tickets, using seed data");
            store.persist();
        }
        store
    }

    /// All tickets, newest first.
    #[must_use]
    pub fn all(&self) -> &[Ticket] {
        &self.tickets
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    /// Tickets raised by `user_id`, in store order.
    #[must_use]
    pub fn owned_by(&self, user_id: &str) -> Vec<&Ticket> {
        self.tickets.iter().filter(|t| t.user_id == user_id).collect()
    }

    /// Raise a ticket on behalf of `actor`.
    ///
    /// Returns `None` without an actor, when the trimmed title or
    /// description is empty, or when the initial status is one an `open`
    /// ticket could not move to (a ticket is never born `closed`).
    pub fn create(&mut self, actor: Option<&User>, new: NewTicket) -> Option<Ticket> {
        let actor = actor?;
        let title = non_empty(&new.title)?;
        let description = non_empty(&new.description)?;
        if let Err(err) = Status::Open.can_transition_to(new.status) {
            debug!(%err, "refusing initial status");
            return None;
        }

        let now = self.stamper.next(self.clock.as_ref());
        let id = id::allocate(now.timestamp_millis(), |c| self.get(c).is_some());
        let ticket = Ticket {
            id,
            title,
            description,
            category: new.category,
            priority: new.priority,
            status: new.status,
            user_id: actor.id.clone(),
            assigned_to: new.assigned_to,
            created_at: now,
            updated_at: now,
            resolved_at: (new.status == Status::Resolved).then_some(now),
            comments: Vec::new(),
        };

        debug!(id = %ticket.id, user = %actor.id, "ticket created");
        self.tickets.insert(0, ticket.clone());
        self.persist();
        Some(ticket)
    }

    /// Apply a single change. See [`Self::update_many`].
    pub fn update(&mut self, id: &str, actor: Option<&User>, update: TicketUpdate) -> UpdateOutcome {
        self.update_many(id, actor, [update])
    }

    /// Apply several changes as one mutation: all are checked first, then
    /// applied together with a single `updated_at` refresh and one write.
    pub fn update_many(
        &mut self,
        id: &str,
        actor: Option<&User>,
        updates: impl IntoIterator<Item = TicketUpdate>,
    ) -> UpdateOutcome {
        let Some(actor) = actor else {
            return UpdateOutcome::NoSession;
        };
        let Some(index) = self.tickets.iter().position(|t| t.id == id) else {
            return UpdateOutcome::NotFound;
        };

        let updates: Vec<TicketUpdate> = updates.into_iter().collect();
        let current = &self.tickets[index];
        let mut status = current.status;
        for update in &updates {
            if !update.permitted(actor, current) {
                return UpdateOutcome::Forbidden;
            }
            match update {
                TicketUpdate::SetStatus(next) => {
                    if status.can_transition_to(*next).is_err() {
                        return UpdateOutcome::InvalidTransition;
                    }
                    status = *next;
                }
                TicketUpdate::Retitle(text) | TicketUpdate::Describe(text) => {
                    if text.trim().is_empty() {
                        return UpdateOutcome::EmptyText;
                    }
                }
                _ => {}
            }
        }

        let now = self.stamper.next(self.clock.as_ref());
        let ticket = &mut self.tickets[index];
        for update in updates {
            apply(ticket, update, now);
        }
        ticket.updated_at = now;
        debug!(id, by = %actor.id, status = %ticket.status, "ticket updated");
        self.persist();
        UpdateOutcome::Applied
    }

    /// Append a comment to a ticket's thread.
    ///
    /// Returns `None` without an actor, for an unknown ticket, for a ticket
    /// the actor can't see, or when the trimmed content is empty. Only
    /// admins can post internal notes; anyone else's are posted publicly.
    pub fn add_comment(
        &mut self,
        ticket_id: &str,
        actor: Option<&User>,
        content: &str,
        is_internal: bool,
    ) -> Option<TicketComment> {
        let actor = actor?;
        let content = non_empty(content)?;
        let index = self.tickets.iter().position(|t| t.id == ticket_id)?;
        if !actor.is_admin() && self.tickets[index].user_id != actor.id {
            return None;
        }

        let now = self.stamper.next(self.clock.as_ref());
        let ticket = &mut self.tickets[index];
        let id = id::allocate(now.timestamp_millis(), |c| {
            ticket.comments.iter().any(|existing| existing.id == c)
        });
        let comment = TicketComment {
            id,
            ticket_id: ticket.id.clone(),
            user_id: actor.id.clone(),
            user_name: actor.name.clone(),
            content,
            is_internal: is_internal && actor.is_admin(),
            created_at: now,
        };
        ticket.comments.push(comment.clone());
        ticket.updated_at = now;

        debug!(ticket = ticket_id, by = %actor.id, "comment added");
        self.persist();
        Some(comment)
    }

    fn persist(&self) {
        self.slot.save(&self.tickets);
    }
}

fn apply(ticket: &mut Ticket, update: TicketUpdate, now: chrono::DateTime<chrono::Utc>) {
    match update {
        TicketUpdate::SetStatus(status) => {
            ticket.status = status;
            if matches!(status, Status::Resolved | Status::Closed) && ticket.resolved_at.is_none() {
                ticket.resolved_at = Some(now);
            }
        }
        TicketUpdate::SetPriority(priority) => ticket.priority = priority,
        TicketUpdate::SetCategory(category) => ticket.category = category,
        TicketUpdate::Assign(user_id) => ticket.assigned_to = Some(user_id),
        TicketUpdate::Unassign => ticket.assigned_to = None,
        TicketUpdate::Retitle(title) => ticket.title = title.trim().to_string(),
        TicketUpdate::Describe(text) => ticket.description = text.trim().to_string(),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::Role;
    use crate::storage::{KeyValueStore, MemoryStore};

    const T0: i64 = 1_710_000_000_000;

    fn actor(id: &str, role: Role) -> User {
        User {
            id: id.into(),
            email: format!("{id}@company.com"),
            name: format!("User {id}"),
            role,
            department: None,
            created_at: crate::clock::from_millis(0),
        }
    }

    fn fresh() -> (TicketStore, SharedStore, ManualClock) {
        let backend = MemoryStore::shared();
        let clock = ManualClock::starting_at(T0);
        let store = TicketStore::open(Arc::clone(&backend), Arc::new(clock.clone()));
        (store, backend, clock)
    }

    fn printer() -> NewTicket {
        NewTicket::new(
            "Printer broken",
            "Cannot print since this morning",
            Category::Hardware,
            TicketPriority::High,
        )
    }

    #[test]
    fn empty_backend_seeds_and_persists() {
        let (store, backend, _) = fresh();
        assert_eq!(store.all().len(), 2);
        assert!(backend.get(TICKETS_KEY).unwrap().is_some());
    }

    #[test]
    fn corrupt_backend_falls_back_to_seed() {
        let backend = MemoryStore::shared();
        backend.set(TICKETS_KEY, "[{\"id\":").unwrap();
        let store = TicketStore::open(backend, Arc::new(ManualClock::starting_at(T0)));
        assert_eq!(store.all(), seed::tickets().as_slice());
    }

    #[test]
    fn create_requires_a_session() {
        let (mut store, _, _) = fresh();
        assert!(store.create(None, printer()).is_none());
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn create_refuses_an_initially_closed_ticket() {
        let (mut store, backend, _) = fresh();
        let before = backend.get(TICKETS_KEY).unwrap();
        let me = actor("1", Role::Admin);

        let closed = NewTicket {
            status: Status::Closed,
            ..printer()
        };
        assert!(store.create(Some(&me), closed).is_none());
        assert_eq!(store.all().len(), 2);
        assert_eq!(backend.get(TICKETS_KEY).unwrap(), before);

        let resolved = NewTicket {
            status: Status::Resolved,
            ..printer()
        };
        let ticket = store.create(Some(&me), resolved).expect("created");
        assert_eq!(ticket.resolved_at, Some(ticket.created_at));
    }

    #[test]
    fn create_prepends_and_stamps() {
        let (mut store, _, _) = fresh();
        let me = actor("2", Role::User);
        let ticket = store.create(Some(&me), printer()).expect("created");
        assert_eq!(store.all()[0].id, ticket.id);
        assert_eq!(ticket.status, Status::Open);
        assert_eq!(ticket.user_id, "2");
        assert_eq!(ticket.created_at, ticket.updated_at);
        assert_eq!(ticket.created_at.timestamp_millis(), T0);
        assert!(ticket.comments.is_empty());
    }

    #[test]
    fn create_trims_and_refuses_blank_text() {
        let (mut store, _, _) = fresh();
        let me = actor("2", Role::User);
        let mut blank = printer();
        blank.title = "   ".into();
        assert!(store.create(Some(&me), blank).is_none());

        let mut padded = printer();
        padded.title = "  Printer broken \n".into();
        let ticket = store.create(Some(&me), padded).expect("created");
        assert_eq!(ticket.title, "Printer broken");
    }

    #[test]
    fn update_unknown_id_is_a_silent_noop() {
        let (mut store, backend, _) = fresh();
        let admin = actor("1", Role::Admin);
        let before = store.all().to_vec();
        let stored = backend.get(TICKETS_KEY).unwrap();
        let outcome = store.update("nope", Some(&admin), TicketUpdate::SetStatus(Status::Pending));
        assert_eq!(outcome, UpdateOutcome::NotFound);
        assert_eq!(store.all(), before.as_slice());
        assert_eq!(backend.get(TICKETS_KEY).unwrap(), stored);
    }

    #[test]
    fn triage_fields_are_admin_only() {
        let (mut store, _, _) = fresh();
        let owner = actor("2", Role::User);
        let outcome = store.update("2", Some(&owner), TicketUpdate::SetPriority(TicketPriority::Critical));
        assert_eq!(outcome, UpdateOutcome::Forbidden);
        assert_eq!(store.get("2").unwrap().priority, TicketPriority::Medium);

        let outcome = store.update("2", Some(&owner), TicketUpdate::SetCategory(Category::Network));
        assert_eq!(outcome, UpdateOutcome::Applied);

        let stranger = actor("9", Role::User);
        let outcome = store.update("2", Some(&stranger), TicketUpdate::Retitle("Mine now".into()));
        assert_eq!(outcome, UpdateOutcome::Forbidden);
    }

    #[test]
    fn resolving_stamps_resolved_at_once() {
        let (mut store, _, clock) = fresh();
        let admin = actor("1", Role::Admin);

        clock.advance(1_000);
        assert!(store.update("2", Some(&admin), TicketUpdate::SetStatus(Status::Resolved)).is_applied());
        let first = store.get("2").unwrap().resolved_at.expect("stamped");

        clock.advance(1_000);
        assert!(store.update("2", Some(&admin), TicketUpdate::SetStatus(Status::Open)).is_applied());
        assert_eq!(store.get("2").unwrap().resolved_at, Some(first));

        clock.advance(1_000);
        assert!(store.update("2", Some(&admin), TicketUpdate::SetStatus(Status::Resolved)).is_applied());
        assert_eq!(store.get("2").unwrap().resolved_at, Some(first));
    }

    #[test]
    fn closing_requires_resolution() {
        let (mut store, _, _) = fresh();
        let admin = actor("1", Role::Admin);
        let outcome = store.update("2", Some(&admin), TicketUpdate::SetStatus(Status::Closed));
        assert_eq!(outcome, UpdateOutcome::InvalidTransition);

        let outcome = store.update_many(
            "2",
            Some(&admin),
            [
                TicketUpdate::SetStatus(Status::Resolved),
                TicketUpdate::SetStatus(Status::Closed),
            ],
        );
        assert_eq!(outcome, UpdateOutcome::Applied);
        let ticket = store.get("2").unwrap();
        assert_eq!(ticket.status, Status::Closed);
        assert!(ticket.resolved_at.is_some());
    }

    #[test]
    fn rejected_batch_changes_nothing() {
        let (mut store, _, _) = fresh();
        let owner = actor("2", Role::User);
        let before = store.get("2").cloned();
        let outcome = store.update_many(
            "2",
            Some(&owner),
            [
                TicketUpdate::Retitle("New title".into()),
                TicketUpdate::SetStatus(Status::Pending),
            ],
        );
        assert_eq!(outcome, UpdateOutcome::Forbidden);
        assert_eq!(store.get("2").cloned(), before);
    }

    #[test]
    fn updated_at_strictly_increases_on_a_frozen_clock() {
        let (mut store, _, _) = fresh();
        let admin = actor("1", Role::Admin);
        let mut last = store.get("2").unwrap().updated_at;
        for priority in [TicketPriority::Low, TicketPriority::High, TicketPriority::Low] {
            assert!(store.update("2", Some(&admin), TicketUpdate::SetPriority(priority)).is_applied());
            let now = store.get("2").unwrap().updated_at;
            assert!(now > last);
            last = now;
        }
    }

    #[test]
    fn comments_append_in_order_and_touch_parent() {
        let (mut store, _, clock) = fresh();
        let owner = actor("2", Role::User);
        let admin = actor("1", Role::Admin);

        clock.advance(10);
        let first = store.add_comment("2", Some(&owner), "  Still broken ", true).expect("posted");
        clock.advance(10);
        let second = store.add_comment("2", Some(&admin), "Looking", true).expect("posted");

        assert_eq!(first.content, "Still broken");
        assert!(!first.is_internal);
        assert!(second.is_internal);
        assert_eq!(second.user_name, "User 1");

        let ticket = store.get("2").unwrap();
        let ids: Vec<_> = ticket.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, [first.id.as_str(), second.id.as_str()]);
        assert_eq!(ticket.updated_at, second.created_at);
    }

    #[test]
    fn comment_noops() {
        let (mut store, _, _) = fresh();
        let owner = actor("2", Role::User);
        let stranger = actor("3", Role::User);
        assert!(store.add_comment("2", None, "hi", false).is_none());
        assert!(store.add_comment("missing", Some(&owner), "hi", false).is_none());
        assert!(store.add_comment("2", Some(&owner), "   ", false).is_none());
        assert!(store.add_comment("2", Some(&stranger), "hi", false).is_none());
        assert!(store.get("2").unwrap().comments.is_empty());
    }

    #[test]
    fn mutations_survive_reopen() {
        let (mut store, backend, clock) = fresh();
        let me = actor("2", Role::User);
        let ticket = store.create(Some(&me), printer()).expect("created");
        store.add_comment(&ticket.id, Some(&me), "Toner is full", false);

        let reopened = TicketStore::open(backend, Arc::new(clock));
        assert_eq!(reopened.all(), store.all());
        assert_eq!(reopened.owned_by("2").len(), 3);
    }
}
