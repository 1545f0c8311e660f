//! Per-chat session contexts.
//!
//! A context is keyed by the id the decision engine resolved (chat id, or
//! the sender's user id when acting from an unauthorized chat). Command
//! handlers read and mutate it through a [`SharedSession`].

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use warden_core::config::SessionConfig;

pub const DEFAULT_COLUMNS: u16 = 40;
pub const DEFAULT_ROWS: u16 = 20;

/// Fallback when no shell candidate is configured.
const FALLBACK_SHELL: &str = "sh";

/// Pseudo-terminal dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub columns: u16,
    pub rows: u16,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
        }
    }
}

/// Marker for an in-progress privileged operation (a running shell command
/// or an open file edit). Its presence blocks revocation of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    /// Command line or file path.
    pub label: String,
    pub pid: Option<u32>,
    /// Message that started the operation.
    pub message_id: Option<i64>,
    pub started_at: DateTime<Utc>,
}

impl OperationHandle {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pid: None,
            message_id: None,
            started_at: Utc::now(),
        }
    }
}

/// Mutable per-chat state consumed by command handlers.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// The context key this record belongs to.
    pub key: i64,
    pub shell: String,
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
    pub size: TerminalSize,
    pub silent: bool,
    pub interactive: bool,
    pub link_previews: bool,
    /// Running shell command.
    pub command: Option<OperationHandle>,
    /// Open file edit.
    pub editor: Option<OperationHandle>,
}

impl SessionContext {
    /// Whether a privileged operation is in progress.
    pub fn is_busy(&self) -> bool {
        self.command.is_some() || self.editor.is_some()
    }
}

/// Shared handle to one session record.
#[derive(Debug, Clone)]
pub struct SharedSession(Arc<Mutex<SessionContext>>);

impl SharedSession {
    fn new(context: SessionContext) -> Self {
        Self(Arc::new(Mutex::new(context)))
    }

    /// Lock the record. A handler that panicked mid-update leaves the
    /// record usable; its fields are plain values.
    pub fn lock(&self) -> MutexGuard<'_, SessionContext> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionContext {
        self.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().is_busy()
    }

    /// Whether both handles point at the same record.
    pub fn same_as(&self, other: &SharedSession) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Values every new session starts from.
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub shells: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl SessionDefaults {
    pub fn new(shells: Vec<String>, cwd: PathBuf, env: BTreeMap<String, String>) -> Self {
        Self { shells, cwd, env }
    }

    /// Resolve shells and directory from config. `env` is the already
    /// sanitized environment every session inherits.
    pub fn from_config(config: &SessionConfig, env: BTreeMap<String, String>) -> Self {
        Self {
            shells: config.resolve_shells(),
            cwd: config.resolve_cwd(),
            env,
        }
    }

    /// The shell new sessions start with.
    pub fn default_shell(&self) -> &str {
        self.shells
            .first()
            .map(String::as_str)
            .unwrap_or(FALLBACK_SHELL)
    }

    /// Build a fresh context for `key`.
    pub fn build(&self, key: i64) -> SessionContext {
        SessionContext {
            key,
            shell: self.default_shell().to_string(),
            env: self.env.clone(),
            cwd: self.cwd.clone(),
            size: TerminalSize::default(),
            silent: true,
            interactive: false,
            link_previews: false,
            command: None,
            editor: None,
        }
    }
}

/// Session records by context key.
#[derive(Debug)]
pub struct SessionStore {
    defaults: SessionDefaults,
    contexts: HashMap<i64, SharedSession>,
}

impl SessionStore {
    pub fn new(defaults: SessionDefaults) -> Self {
        Self {
            defaults,
            contexts: HashMap::new(),
        }
    }

    /// Existing record for `key`, or a new one built from the defaults.
    pub fn get_or_create(&mut self, key: i64) -> SharedSession {
        let defaults = &self.defaults;
        self.contexts
            .entry(key)
            .or_insert_with(|| SharedSession::new(defaults.build(key)))
            .clone()
    }

    pub fn get(&self, key: i64) -> Option<SharedSession> {
        self.contexts.get(&key).cloned()
    }

    /// Drop the record for `key`. Returns whether one existed.
    pub fn destroy(&mut self, key: i64) -> bool {
        self.contexts.remove(&key).is_some()
    }

    pub fn defaults(&self) -> &SessionDefaults {
        &self.defaults
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
