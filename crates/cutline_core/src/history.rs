use crate::commands::Command;
use crate::config::EditorConfig;
use crate::error::{CoreError, Result};
use crate::types::*;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Idle,
    /// A command is running, or an external edit is mutating the timeline
    /// outside the stack.
    Busy,
}

/// Undo/redo history stack.
///
/// The undo stack is a total order of executed commands, bounded by
/// `capacity`; the oldest entries are evicted and can no longer be undone.
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    capacity: usize,
    state: HistoryState,
    total_executed: u64,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
            state: HistoryState::Idle,
            total_executed: 0,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.history_capacity)
    }

    /// Execute a command and push it onto the undo stack. Clears redo stack.
    ///
    /// A failing command is logged and dropped; both stacks stay as they were.
    pub fn execute(&mut self, mut cmd: Command, timeline: &mut Timeline) -> Result<()> {
        if self.state == HistoryState::Busy {
            tracing::warn!(command = cmd.description(), "history busy, execute rejected");
            return Err(CoreError::HistoryBusy);
        }

        self.state = HistoryState::Busy;
        let result = cmd.execute(timeline);
        self.state = HistoryState::Idle;

        if let Err(e) = result {
            tracing::error!(command = cmd.description(), error = %e, "command failed, discarded");
            return Err(e);
        }

        tracing::debug!(command = cmd.description(), kind = cmd.kind_name(), "executed");
        self.record(cmd);
        Ok(())
    }

    /// Undo the last command. Returns `Ok(false)` when there is nothing to
    /// undo or the history is busy.
    pub fn undo(&mut self, timeline: &mut Timeline) -> Result<bool> {
        if self.state == HistoryState::Busy {
            tracing::warn!("history busy, undo ignored");
            return Ok(false);
        }
        let Some(mut cmd) = self.undo_stack.pop_back() else {
            return Ok(false);
        };

        self.state = HistoryState::Busy;
        let result = cmd.undo(timeline);
        self.state = HistoryState::Idle;

        if let Err(e) = result {
            tracing::error!(command = cmd.description(), error = %e, "undo failed, command discarded");
            return Err(e);
        }

        tracing::debug!(command = cmd.description(), "undone");
        self.redo_stack.push(cmd);
        Ok(true)
    }

    /// Redo the last undone command. Returns `Ok(false)` when there is
    /// nothing to redo or the history is busy.
    pub fn redo(&mut self, timeline: &mut Timeline) -> Result<bool> {
        if self.state == HistoryState::Busy {
            tracing::warn!("history busy, redo ignored");
            return Ok(false);
        }
        let Some(mut cmd) = self.redo_stack.pop() else {
            return Ok(false);
        };

        self.state = HistoryState::Busy;
        let result = cmd.execute(timeline);
        self.state = HistoryState::Idle;

        if let Err(e) = result {
            tracing::error!(command = cmd.description(), error = %e, "redo failed, command discarded");
            return Err(e);
        }

        tracing::debug!(command = cmd.description(), "redone");
        self.push_undo(cmd);
        Ok(true)
    }

    /// Hold the history busy while an external editor mutates the timeline
    /// directly. Undo and redo are ignored until the edit is recorded with
    /// [`History::add_without_execute`] or abandoned.
    pub fn begin_external_edit(&mut self) -> Result<()> {
        if self.state == HistoryState::Busy {
            return Err(CoreError::HistoryBusy);
        }
        self.state = HistoryState::Busy;
        Ok(())
    }

    pub fn abort_external_edit(&mut self) {
        self.state = HistoryState::Idle;
    }

    /// Record a command whose mutation has already been applied, typically a
    /// batch edit committed by an external editor. `execute` is not called.
    pub fn add_without_execute(&mut self, cmd: Command) {
        tracing::debug!(command = cmd.description(), "recorded without execute");
        self.state = HistoryState::Idle;
        self.record(cmd);
    }

    pub fn can_undo(&self) -> bool {
        self.state == HistoryState::Idle && !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.state == HistoryState::Idle && !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|cmd| cmd.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|cmd| cmd.description())
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn state(&self) -> HistoryState {
        self.state
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of commands ever recorded, including evicted ones.
    pub fn total_executed(&self) -> u64 {
        self.total_executed
    }

    /// Forget every entry, e.g. after loading a different session.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.state = HistoryState::Idle;
    }

    fn record(&mut self, cmd: Command) {
        self.redo_stack.clear();
        self.total_executed += 1;
        self.push_undo(cmd);
    }

    fn push_undo(&mut self, cmd: Command) {
        self.undo_stack.push_back(cmd);
        while self.undo_stack.len() > self.capacity {
            if let Some(evicted) = self.undo_stack.pop_front() {
                tracing::debug!(command = evicted.description(), "evicted from history");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
