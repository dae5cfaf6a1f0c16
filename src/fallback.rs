//! Deterministic stand-ins for every collaborator role.
//!
//! Used when the real subsystems cannot be acquired, so the interpreter stays runnable.
//! Mocks never fail and always label their output with `[demo]`.

use crate::ports::{
    Ack, AgentPort, BlockExecutorPort, ComponentSet, DebugPort, ExecutorContext, FixSuggestion,
    FunctionsPort, GoalPort, MemoryPort, MetaPluginPort,
};
use anyhow::Result;
use tracing::debug;

pub struct MockMemory;

impl MemoryPort for MockMemory {
    fn remember(&self, content: &str, tags: &[String], category: Option<&str>) -> Result<Ack> {
        let mut ack = format!("[demo] memory stored: {content}");
        if !tags.is_empty() {
            ack.push_str(&format!(" (tags: {})", tags.join(", ")));
        }
        if let Some(category) = category {
            ack.push_str(&format!(" [category: {category}]"));
        }
        Ok(ack)
    }

    fn recall(&self, _query: &str, _tags: &[String], _category: Option<&str>) -> Result<Vec<Ack>> {
        Ok(Vec::new())
    }
}

pub struct MockFunctions;

impl FunctionsPort for MockFunctions {
    fn define_function(&self, name: &str, params: &[String], _body: &str) -> Result<Ack> {
        Ok(format!(
            "[demo] function '{name}' registered ({} parameter(s))",
            params.len()
        ))
    }

    fn call_function(&self, name: &str, args: &[String]) -> Result<String> {
        Ok(format!("[demo] function '{name}' called with ({})", args.join(", ")))
    }
}

pub struct MockAgent;

impl AgentPort for MockAgent {
    fn activate(&self) -> Result<String> {
        Ok("[demo] agent activated".to_string())
    }

    fn deactivate(&self) -> Result<()> {
        Ok(())
    }
}

pub struct MockGoals;

impl GoalPort for MockGoals {
    fn set_goal(&self, text: &str, priority: Option<&str>) -> Result<String> {
        Ok(format!(
            "[demo] goal set: {text} (priority: {})",
            priority.unwrap_or("medium")
        ))
    }

    fn set_agent_mode(&self, enabled: bool) -> Result<String> {
        Ok(format!(
            "[demo] goal agent mode {}",
            if enabled { "enabled" } else { "disabled" }
        ))
    }

    fn get_active_goals(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

pub struct MockDebug;

impl DebugPort for MockDebug {
    fn debug(&self, message: &str) -> Result<()> {
        debug!(target: "aetherra::demo", "{message}");
        Ok(())
    }

    fn detect_and_store_error(&self, _error: &str, _context: &str) -> Result<()> {
        Ok(())
    }

    fn suggest_fix(&self, _error_info: &str) -> Result<FixSuggestion> {
        Ok(FixSuggestion {
            fix: "[demo] no fix available".to_string(),
            confidence: 0.0,
            risk: "none".to_string(),
        })
    }
}

pub struct MockMetaPlugins;

impl MetaPluginPort for MockMetaPlugins {
    fn execute_meta_plugin(&self, command: &str) -> Result<String> {
        Ok(format!("[demo] meta plugin executed: {command}"))
    }
}

pub struct MockBlockExecutor;

impl BlockExecutorPort for MockBlockExecutor {
    fn execute_block(&self, _block_text: &str, context: &ExecutorContext) -> Result<String> {
        Ok(format!(
            "[demo] {} block of {} line(s) accepted",
            context.block_type, context.line_count
        ))
    }
}

/// Hands out the complete fallback set and remembers whether it is in use.
#[derive(Debug, Default)]
pub struct FallbackSystemManager {
    demo_mode: bool,
}

impl FallbackSystemManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to demo mode and return one mock per role.
    pub fn enable_demo_mode(&mut self) -> ComponentSet {
        self.demo_mode = true;
        ComponentSet {
            memory: Some(Box::new(MockMemory)),
            functions: Some(Box::new(MockFunctions)),
            agent: Some(Box::new(MockAgent)),
            goal_system: Some(Box::new(MockGoals)),
            debug_system: Some(Box::new(MockDebug)),
            meta_plugins: Some(Box::new(MockMetaPlugins)),
            block_executor: Some(Box::new(MockBlockExecutor)),
        }
    }

    /// Record that real components are wired instead.
    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }

    pub fn is_demo_mode(&self) -> bool {
        self.demo_mode
    }
}
