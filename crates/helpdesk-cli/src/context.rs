//! Per-invocation wiring: one backend, one clock, and the stores built on them.

use std::sync::Arc;

use helpdesk_core::clock::{Clock, SystemClock};
use helpdesk_core::config::{AppConfig, EffectiveConfig};
use helpdesk_core::error::{ErrorCode, StorageError};
use helpdesk_core::model::User;
use helpdesk_core::session::{Roster, Session};
use helpdesk_core::storage::{DirStore, SharedStore};
use helpdesk_core::store::{TicketStore, TodoStore};

use crate::output::{CliError, OutputMode, render_error};

pub struct AppContext {
    backend: SharedStore,
    clock: Arc<dyn Clock>,
    config: AppConfig,
    pub output: OutputMode,
}

impl AppContext {
    pub fn open(effective: &EffectiveConfig, output: OutputMode) -> Result<Self, StorageError> {
        let backend: SharedStore = Arc::new(DirStore::open(&effective.data_dir)?);
        Ok(Self {
            backend,
            clock: Arc::new(SystemClock),
            config: effective.app.clone(),
            output,
        })
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Session over the demo roster plus accounts registered earlier.
    pub fn session(&self) -> Session {
        Session::open(
            Arc::clone(&self.backend),
            Roster::demo_with_registered(Arc::clone(&self.backend)),
            Arc::clone(&self.clock),
            self.config.auth_delay(),
        )
    }

    pub fn tickets(&self) -> TicketStore {
        TicketStore::open(Arc::clone(&self.backend), Arc::clone(&self.clock))
    }

    pub fn todos(&self) -> TodoStore {
        TodoStore::open(Arc::clone(&self.backend), Arc::clone(&self.clock))
    }

    /// The logged-in actor, or a rendered `E1101` error.
    pub fn require_actor(&self) -> anyhow::Result<User> {
        if let Some(user) = self.session().current() {
            return Ok(user.clone());
        }
        Err(self.fail(CliError::from_code(ErrorCode::NotLoggedIn, "not logged in")))
    }

    /// Render `error` to stderr and turn it into the command's failure.
    pub fn fail(&self, error: CliError) -> anyhow::Error {
        let _ = render_error(self.output, &error);
        anyhow::anyhow!(error.message)
    }
}
