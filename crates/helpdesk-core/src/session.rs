//! The current actor, the account roster, and simulated authentication.
//!
//! # Auth delay
//!
//! Login and registration pause for a configurable delay before checking
//! the roster. The pause is a [`CancelToken`] wait: cancelling from another
//! thread wakes it at once and the attempt resolves as
//! [`AuthOutcome::Cancelled`] without touching any state. Attempts borrow
//! the session mutably, so two can never be in flight on the same actor
//! slot.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::model::{Role, User};
use crate::storage::{ROSTER_KEY, SESSION_KEY, SharedStore, Slot};
use crate::{id, seed};

/// A stored account: the public user record plus its demo credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

/// The set of accounts that can log in.
///
/// Built once and handed to [`Session::open`]; registration appends to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    accounts: Vec<Account>,
}

impl Roster {
    /// The admin and user demo accounts.
    #[must_use]
    pub fn demo() -> Self {
        Self {
            accounts: seed::accounts()
                .into_iter()
                .map(|(user, password)| Account { user, password })
                .collect(),
        }
    }

    /// Demo accounts plus previously registered ones from the
    /// `servicedesk_roster` slot. Stored entries whose email clashes with an
    /// existing account are skipped.
    #[must_use]
    pub fn demo_with_registered(backend: SharedStore) -> Self {
        let mut roster = Self::demo();
        let slot: Slot<Vec<Account>> = Slot::new(backend, ROSTER_KEY);
        for account in slot.load().unwrap_or_default() {
            if !roster.contains_email(&account.user.email) {
                roster.accounts.push(account);
            }
        }
        roster
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    #[must_use]
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.accounts.iter().map(|a| &a.user)
    }

    #[must_use]
    pub fn contains_email(&self, email: &str) -> bool {
        self.accounts.iter().any(|a| a.user.email == email)
    }

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&User> {
        self.users().find(|u| u.id == id)
    }

    /// Look up the user whose email and password both match.
    #[must_use]
    pub fn authenticate(&self, email: &str, password: &str) -> Option<&User> {
        self.accounts
            .iter()
            .find(|a| a.user.email == email && a.password == password)
            .map(|a| &a.user)
    }

    /// Add an account. Returns `false` if the email is already taken.
    pub fn enroll(&mut self, user: User, password: impl Into<String>) -> bool {
        if self.contains_email(&user.email) {
            return false;
        }
        self.accounts.push(Account {
            user,
            password: password.into(),
        });
        true
    }

    /// Accounts that are not part of the demo set.
    fn registered(&self) -> Vec<Account> {
        let demo = seed::accounts();
        self.accounts
            .iter()
            .filter(|a| !demo.iter().any(|(u, _)| u.email == a.user.email))
            .cloned()
            .collect()
    }
}

/// Cancellation handle for an in-flight auth attempt.
///
/// Clones share state; cancel from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the attempt and wake any waiter.
    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `delay` unless cancelled first. Returns `true` if cancelled.
    fn wait(&self, delay: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let deadline = Instant::now() + delay;
        let mut cancelled = flag.lock().unwrap_or_else(PoisonError::into_inner);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            cancelled = cvar
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *cancelled
    }
}

/// How an auth attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Accepted,
    Rejected,
    Cancelled,
}

impl AuthOutcome {
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Fields for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub department: Option<String>,
}

pub struct Session {
    roster: Roster,
    current: Option<User>,
    snapshot: Slot<User>,
    registered: Slot<Vec<Account>>,
    clock: Arc<dyn Clock>,
    auth_delay: Duration,
}

impl Session {
    /// Build a session over `roster`, restoring a stored actor snapshot if
    /// one is present and well-formed. A malformed snapshot is dropped.
    pub fn open(
        backend: SharedStore,
        roster: Roster,
        clock: Arc<dyn Clock>,
        auth_delay: Duration,
    ) -> Self {
        let snapshot: Slot<User> = Slot::new(Arc::clone(&backend), SESSION_KEY);
        let current = restore(&snapshot, &backend);
        if let Some(user) = &current {
            debug!(user = %user.id, "session restored");
        }
        Self {
            roster,
            current,
            snapshot,
            registered: Slot::new(backend, ROSTER_KEY),
            clock,
            auth_delay,
        }
    }

    /// The logged-in actor, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&User> {
        self.current.as_ref()
    }

    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Log in with demo credentials. `false` leaves the session unchanged.
    pub fn login(&mut self, email: &str, password: &str) -> bool {
        self.login_with(email, password, &CancelToken::new())
            .is_accepted()
    }

    /// [`Self::login`] with an explicit cancellation handle.
    pub fn login_with(&mut self, email: &str, password: &str, cancel: &CancelToken) -> AuthOutcome {
        if cancel.wait(self.auth_delay) {
            debug!(email, "login cancelled");
            return AuthOutcome::Cancelled;
        }

        let Some(user) = self.roster.authenticate(email, password).cloned() else {
            info!(email, "login rejected");
            return AuthOutcome::Rejected;
        };
        info!(user = %user.id, "logged in");
        self.snapshot.save(&user);
        self.current = Some(user);
        AuthOutcome::Accepted
    }

    /// Create a `user`-role account and log it in. `false` if the email is
    /// already on the roster, in which case nothing changes.
    pub fn register(&mut self, registration: Registration) -> bool {
        self.register_with(registration, &CancelToken::new())
            .is_accepted()
    }

    /// [`Self::register`] with an explicit cancellation handle.
    pub fn register_with(&mut self, registration: Registration, cancel: &CancelToken) -> AuthOutcome {
        if cancel.wait(self.auth_delay) {
            debug!(email = %registration.email, "registration cancelled");
            return AuthOutcome::Cancelled;
        }

        if self.roster.contains_email(&registration.email) {
            info!(email = %registration.email, "registration rejected, email taken");
            return AuthOutcome::Rejected;
        }

        let now = self.clock.now();
        let user = User {
            id: id::allocate(now.timestamp_millis(), |c| {
                self.roster.find_by_id(c).is_some()
            }),
            email: registration.email,
            name: registration.name,
            role: Role::User,
            department: registration.department.filter(|d| !d.trim().is_empty()),
            created_at: now,
        };
        self.roster.enroll(user.clone(), registration.password);
        self.registered.save(&self.roster.registered());
        info!(user = %user.id, "registered");
        self.snapshot.save(&user);
        self.current = Some(user);
        AuthOutcome::Accepted
    }

    /// Clear the actor and its stored snapshot.
    pub fn logout(&mut self) {
        if let Some(user) = self.current.take() {
            info!(user = %user.id, "logged out");
        }
        self.snapshot.clear();
    }
}

fn restore(snapshot: &Slot<User>, backend: &SharedStore) -> Option<User> {
    match backend.get(snapshot.key()) {
        Ok(Some(_)) => {}
        Ok(None) => return None,
        Err(err) => {
            warn!(%err, "could not read stored session");
            return None;
        }
    }
    let restored = snapshot.load();
    if restored.is_none() {
        warn!("discarding malformed stored session");
        snapshot.clear();
    }
    restored
}
