use crate::command::CommandType;
use std::collections::BTreeMap;

/// Interpreter-wide toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    /// Try enhanced rules before basic ones.
    pub enhanced_mode: bool,
    /// Derive tags for plain `remember(...)` commands.
    pub auto_tag_enabled: bool,
    pub self_edit_mode: bool,
    /// Report every execution to the debug system.
    pub debug_mode: bool,
    pub agent_mode: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            enhanced_mode: true,
            auto_tag_enabled: false,
            self_edit_mode: false,
            debug_mode: false,
            agent_mode: false,
        }
    }
}

/// Mutable state of one interpreter session.
///
/// Owned by the [`crate::Interpreter`]; the enhanced feature parser receives it by
/// mutable reference for the duration of a single call and never keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Every tracked line, in order.
    pub command_history: Vec<String>,
    /// Successful executions per command type.
    pub execution_stats: BTreeMap<CommandType, u64>,
    pub toggles: Toggles,
}

impl SessionState {
    pub fn new(toggles: Toggles) -> Self {
        Self {
            toggles,
            ..Default::default()
        }
    }

    /// Append `line` to the history unless it is blank.
    ///
    /// Returns the trimmed line when it was tracked.
    pub fn track<'a>(&mut self, line: &'a str) -> Option<&'a str> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        self.command_history.push(trimmed.to_string());
        Some(trimmed)
    }

    pub fn record_success(&mut self, command_type: CommandType) {
        *self.execution_stats.entry(command_type).or_insert(0) += 1;
    }

    /// Forget history and stats; toggles survive.
    pub fn clear(&mut self) {
        self.command_history.clear();
        self.execution_stats.clear();
    }
}
