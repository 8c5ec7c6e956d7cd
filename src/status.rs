//! Status reporting shared by every flow.
//!
//! Each panel owns one status slot. A report writes a message and severity
//! into a slot; an empty message hides it. Reports never fail: writing to a
//! slot that was not registered does nothing.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Severity tag attached to a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
        })
    }
}

/// Display regions that can show a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    News,
    Chat,
    Proxy,
    Video,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::News, Slot::Chat, Slot::Proxy, Slot::Video];
}

/// A visible status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub message: String,
    pub severity: Severity,
    pub set_at: Instant,
}

/// The set of registered status slots and what each currently shows.
#[derive(Debug)]
pub struct StatusBoard {
    slots: HashMap<Slot, Option<StatusLine>>,
    active: Slot,
}

impl StatusBoard {
    /// A board with every slot registered and News active.
    pub fn new() -> Self {
        Self::with_slots(&Slot::ALL)
    }

    /// A board with only `slots` registered. The first slot starts active.
    pub fn with_slots(slots: &[Slot]) -> Self {
        Self {
            slots: slots.iter().map(|s| (*s, None)).collect(),
            active: slots.first().copied().unwrap_or(Slot::News),
        }
    }

    /// Write `message` into `target` (or the active slot). Empty hides it.
    pub fn show(&mut self, message: &str, severity: Severity, target: Option<Slot>) {
        let slot = target.unwrap_or(self.active);
        let Some(entry) = self.slots.get_mut(&slot) else {
            return;
        };
        *entry = if message.is_empty() {
            None
        } else {
            Some(StatusLine {
                message: message.to_string(),
                severity,
                set_at: Instant::now(),
            })
        };
    }

    /// What `slot` currently shows. `None` when hidden or unregistered.
    pub fn get(&self, slot: Slot) -> Option<&StatusLine> {
        self.slots.get(&slot).and_then(Option::as_ref)
    }

    pub fn is_visible(&self, slot: Slot) -> bool {
        self.get(slot).is_some()
    }

    /// Slot used by reports that name no target.
    pub fn set_active(&mut self, slot: Slot) {
        self.active = slot;
    }

    pub fn active(&self) -> Slot {
        self.active
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle to a shared [`StatusBoard`].
///
/// Flows running in background tasks report through their own clone; the
/// render loop reads the same board.
#[derive(Debug, Clone, Default)]
pub struct StatusReporter {
    board: Arc<Mutex<StatusBoard>>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a message. Best effort: a poisoned lock still gets written.
    pub fn report(&self, message: impl AsRef<str>, severity: Severity, target: Option<Slot>) {
        let message = message.as_ref();
        match severity {
            Severity::Error => tracing::warn!(slot = ?target, %severity, "{}", message),
            _ => tracing::debug!(slot = ?target, %severity, "{}", message),
        }
        let mut board = self.board.lock().unwrap_or_else(|e| e.into_inner());
        board.show(message, severity, target);
    }

    pub fn info(&self, slot: Slot, message: impl AsRef<str>) {
        self.report(message, Severity::Info, Some(slot));
    }

    pub fn success(&self, slot: Slot, message: impl AsRef<str>) {
        self.report(message, Severity::Success, Some(slot));
    }

    pub fn error(&self, slot: Slot, message: impl AsRef<str>) {
        self.report(message, Severity::Error, Some(slot));
    }

    /// Hide whatever `slot` shows.
    pub fn clear(&self, slot: Slot) {
        self.report("", Severity::Success, Some(slot));
    }

    /// Copy of what `slot` currently shows.
    pub fn current(&self, slot: Slot) -> Option<StatusLine> {
        let board = self.board.lock().unwrap_or_else(|e| e.into_inner());
        board.get(slot).cloned()
    }

    pub fn set_active(&self, slot: Slot) {
        let mut board = self.board.lock().unwrap_or_else(|e| e.into_inner());
        board.set_active(slot);
    }
}
