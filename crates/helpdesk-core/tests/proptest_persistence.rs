use proptest::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;

use helpdesk_core::clock::ManualClock;
use helpdesk_core::model::{Category, NewTicket, Status, TicketPriority, TodoPriority};
use helpdesk_core::session::Roster;
use helpdesk_core::storage::MemoryStore;
use helpdesk_core::store::{TicketStore, TicketUpdate, TodoStore};
use helpdesk_core::view::{self, TodoFilter, TodoSort, TodoStats};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

#[derive(Debug, Clone)]
enum TicketOp {
    Create {
        title: String,
        category: Category,
        priority: TicketPriority,
        as_admin: bool,
    },
    Update {
        pick: usize,
        update: TicketUpdate,
    },
    Comment {
        pick: usize,
        content: String,
        internal: bool,
    },
}

#[derive(Debug, Clone)]
enum TodoOp {
    Add(String, TodoPriority),
    Toggle(usize),
    Remove(usize),
    Edit(usize, String),
    ClearCompleted,
}

/// Base letters only: accents stripped, case folded.
fn folded(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,24}",
        Just(String::new()),
        Just("  ".to_string()),
        "\\PC{1,12}",
    ]
}

fn arb_category() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

fn arb_ticket_priority() -> impl Strategy<Value = TicketPriority> {
    prop::sample::select(TicketPriority::ALL.to_vec())
}

fn arb_todo_priority() -> impl Strategy<Value = TodoPriority> {
    prop::sample::select(TodoPriority::ALL.to_vec())
}

fn arb_update() -> impl Strategy<Value = TicketUpdate> {
    prop_oneof![
        prop::sample::select(Status::ALL.to_vec()).prop_map(TicketUpdate::SetStatus),
        arb_ticket_priority().prop_map(TicketUpdate::SetPriority),
        arb_category().prop_map(TicketUpdate::SetCategory),
        prop::sample::select(vec!["1", "2"]).prop_map(|u| TicketUpdate::Assign(u.to_string())),
        Just(TicketUpdate::Unassign),
        arb_text().prop_map(TicketUpdate::Retitle),
        arb_text().prop_map(TicketUpdate::Describe),
    ]
}

fn arb_ticket_op() -> impl Strategy<Value = TicketOp> {
    prop_oneof![
        (arb_text(), arb_category(), arb_ticket_priority(), any::<bool>()).prop_map(
            |(title, category, priority, as_admin)| TicketOp::Create {
                title,
                category,
                priority,
                as_admin,
            }
        ),
        (any::<usize>(), arb_update()).prop_map(|(pick, update)| TicketOp::Update { pick, update }),
        (any::<usize>(), arb_text(), any::<bool>()).prop_map(|(pick, content, internal)| {
            TicketOp::Comment {
                pick,
                content,
                internal,
            }
        }),
    ]
}

fn arb_todo_op() -> impl Strategy<Value = TodoOp> {
    prop_oneof![
        (arb_text(), arb_todo_priority()).prop_map(|(t, p)| TodoOp::Add(t, p)),
        any::<usize>().prop_map(TodoOp::Toggle),
        any::<usize>().prop_map(TodoOp::Remove),
        (any::<usize>(), arb_text()).prop_map(|(i, t)| TodoOp::Edit(i, t)),
        Just(TodoOp::ClearCompleted),
    ]
}

fn pick_id<T>(items: &[T], pick: usize, id: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        "missing".to_string()
    } else {
        id(&items[pick % items.len()])
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn ticket_collection_round_trips_after_every_op(ops in prop::collection::vec(arb_ticket_op(), 1..24)) {
        let backend = MemoryStore::shared();
        let clock = Arc::new(ManualClock::starting_at(1_710_000_000_000));
        let roster = Roster::demo();
        let admin = roster.users().find(|u| u.is_admin()).cloned().expect("admin");
        let user = roster.users().find(|u| !u.is_admin()).cloned().expect("user");
        let mut store = TicketStore::open(Arc::clone(&backend), clock.clone());

        for op in ops {
            clock.advance(1_000);
            match op {
                TicketOp::Create { title, category, priority, as_admin } => {
                    let actor = if as_admin { &admin } else { &user };
                    let _ = store.create(
                        Some(actor),
                        NewTicket::new(title, "details", category, priority),
                    );
                }
                TicketOp::Update { pick, update } => {
                    let id = pick_id(store.all(), pick, |t| t.id.clone());
                    let _ = store.update(&id, Some(&admin), update);
                }
                TicketOp::Comment { pick, content, internal } => {
                    let id = pick_id(store.all(), pick, |t| t.id.clone());
                    let _ = store.add_comment(&id, Some(&user), &content, internal);
                }
            }

            let reopened = TicketStore::open(Arc::clone(&backend), clock.clone());
            prop_assert_eq!(reopened.all(), store.all());
        }

        for ticket in store.all() {
            prop_assert!(!ticket.title.trim().is_empty());
            prop_assert!(ticket.updated_at >= ticket.created_at);
            prop_assert!(ticket.comments.iter().all(|c| !c.content.trim().is_empty()));
            if matches!(ticket.status, Status::Resolved | Status::Closed) {
                prop_assert!(ticket.resolved_at.is_some());
            }
        }
    }

    #[test]
    fn todo_collection_round_trips_after_every_op(ops in prop::collection::vec(arb_todo_op(), 1..32)) {
        let backend = MemoryStore::shared();
        let clock = Arc::new(ManualClock::starting_at(1_710_000_000_000));
        let mut store = TodoStore::open(Arc::clone(&backend), clock.clone());

        for op in ops {
            match op {
                TodoOp::Add(text, priority) => {
                    let _ = store.add(&text, priority);
                }
                TodoOp::Toggle(pick) => {
                    let id = pick_id(store.all(), pick, |t| t.id.clone());
                    store.toggle(&id);
                }
                TodoOp::Remove(pick) => {
                    let id = pick_id(store.all(), pick, |t| t.id.clone());
                    store.remove(&id);
                }
                TodoOp::Edit(pick, text) => {
                    let id = pick_id(store.all(), pick, |t| t.id.clone());
                    store.edit(&id, &text);
                }
                TodoOp::ClearCompleted => {
                    store.clear_completed();
                }
            }

            let reopened = TodoStore::open(Arc::clone(&backend), clock.clone());
            prop_assert_eq!(reopened.all(), store.all());
        }

        let stats = TodoStats::compute(store.all());
        prop_assert_eq!(stats.total, stats.active + stats.completed);
        prop_assert_eq!(
            view::todo_view(store.all(), TodoFilter::Active, TodoSort::Date).len(),
            stats.active
        );
    }

    #[test]
    fn priority_sort_is_ordered_and_stable(
        items in prop::collection::vec((arb_text(), arb_todo_priority()), 0..24)
    ) {
        let clock = Arc::new(ManualClock::starting_at(0));
        let mut store = TodoStore::open(MemoryStore::shared(), clock);
        for (text, priority) in &items {
            let _ = store.add(&format!("item {text}"), *priority);
        }

        let sorted = view::todo_view(store.all(), TodoFilter::All, TodoSort::Priority);
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].priority.rank() >= pair[1].priority.rank());
            if pair[0].priority == pair[1].priority {
                let pos = |id: &str| store.all().iter().position(|t| t.id == id);
                prop_assert!(pos(&pair[0].id) < pos(&pair[1].id));
            }
        }
    }

    #[test]
    fn alphabetical_sort_is_non_decreasing(
        texts in prop::collection::vec("[a-zA-ZéÉèçÇñÑåÅüÜ]{1,8}", 0..24)
    ) {
        let clock = Arc::new(ManualClock::starting_at(0));
        let mut store = TodoStore::open(MemoryStore::shared(), clock);
        for text in &texts {
            let _ = store.add(text, TodoPriority::Medium);
        }

        let sorted = view::todo_view(store.all(), TodoFilter::All, TodoSort::Alphabetical);
        prop_assert_eq!(sorted.len(), texts.len());
        for pair in sorted.windows(2) {
            prop_assert_ne!(view::locale_compare(&pair[0].text, &pair[1].text), Ordering::Greater);
            prop_assert!(folded(&pair[0].text) <= folded(&pair[1].text));
        }
    }
}
