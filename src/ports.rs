//! Capability contracts of the external collaborators and the registry that holds them.
//!
//! Each collaborator role is a small trait. The [`Registry`] has one optional field per
//! role, so "component absent" is an ordinary `None` rather than a failed lookup.

use crate::block::BlockType;
use crate::error::AcquireError;
use anyhow::Result;
use std::fmt;
use tracing::{info, warn};

/// Acknowledgement returned by memory operations.
pub type Ack = String;

/// Memory subsystem.
pub trait MemoryPort {
    fn remember(&self, content: &str, tags: &[String], category: Option<&str>) -> Result<Ack>;
    fn recall(&self, query: &str, tags: &[String], category: Option<&str>) -> Result<Vec<Ack>>;
}

/// User-defined functions.
pub trait FunctionsPort {
    fn define_function(&self, name: &str, params: &[String], body: &str) -> Result<Ack>;
    fn call_function(&self, name: &str, args: &[String]) -> Result<String>;
}

/// Autonomous agent.
pub trait AgentPort {
    fn activate(&self) -> Result<String>;
    fn deactivate(&self) -> Result<()>;
}

/// Goal tracking.
pub trait GoalPort {
    fn set_goal(&self, text: &str, priority: Option<&str>) -> Result<String>;
    fn set_agent_mode(&self, enabled: bool) -> Result<String>;
    fn get_active_goals(&self) -> Result<Vec<String>>;
}

/// A proposed fix for an error, as returned by [`DebugPort::suggest_fix`].
#[derive(Debug, Clone, PartialEq)]
pub struct FixSuggestion {
    pub fix: String,
    pub confidence: f64,
    pub risk: String,
}

/// Debugging and error memory.
pub trait DebugPort {
    fn debug(&self, message: &str) -> Result<()>;
    fn detect_and_store_error(&self, error: &str, context: &str) -> Result<()>;
    fn suggest_fix(&self, error_info: &str) -> Result<FixSuggestion>;
}

/// Meta plugins.
pub trait MetaPluginPort {
    fn execute_meta_plugin(&self, command: &str) -> Result<String>;
}

/// Context handed to the block executor alongside the block text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorContext {
    pub block_type: BlockType,
    pub indent: usize,
    pub line_count: usize,
}

/// Semantic execution of multi-line blocks.
pub trait BlockExecutorPort {
    fn execute_block(&self, block_text: &str, context: &ExecutorContext) -> Result<String>;
}

/// Logical collaborator roles, in the tier order the registry is built in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Memory,
    Functions,
    GoalSystem,
    DebugSystem,
    BlockExecutor,
    Agent,
    MetaPlugins,
}

impl Role {
    /// All roles, leaves first.
    pub const TIERED: [Role; 7] = [
        Role::Memory,
        Role::Functions,
        Role::GoalSystem,
        Role::DebugSystem,
        Role::BlockExecutor,
        Role::Agent,
        Role::MetaPlugins,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Role::Memory => "memory",
            Role::Functions => "functions",
            Role::GoalSystem => "goal_system",
            Role::DebugSystem => "debug_system",
            Role::BlockExecutor => "block_executor",
            Role::Agent => "agent",
            Role::MetaPlugins => "meta_plugins",
        }
    }

    /// Roles that must be present for this one to be registered.
    pub fn dependencies(self) -> &'static [Role] {
        match self {
            Role::Memory | Role::Functions => &[],
            Role::GoalSystem | Role::DebugSystem => &[Role::Memory],
            Role::BlockExecutor => &[Role::Memory, Role::Functions],
            Role::Agent => &[Role::Memory, Role::Functions, Role::GoalSystem],
            Role::MetaPlugins => &[Role::Memory, Role::Functions, Role::GoalSystem, Role::Agent],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A candidate set of collaborators, either acquired from real subsystems or made of fallbacks.
#[derive(Default)]
pub struct ComponentSet {
    pub memory: Option<Box<dyn MemoryPort>>,
    pub functions: Option<Box<dyn FunctionsPort>>,
    pub agent: Option<Box<dyn AgentPort>>,
    pub goal_system: Option<Box<dyn GoalPort>>,
    pub debug_system: Option<Box<dyn DebugPort>>,
    pub meta_plugins: Option<Box<dyn MetaPluginPort>>,
    pub block_executor: Option<Box<dyn BlockExecutorPort>>,
}

impl ComponentSet {
    fn has(&self, role: Role) -> bool {
        match role {
            Role::Memory => self.memory.is_some(),
            Role::Functions => self.functions.is_some(),
            Role::GoalSystem => self.goal_system.is_some(),
            Role::DebugSystem => self.debug_system.is_some(),
            Role::BlockExecutor => self.block_executor.is_some(),
            Role::Agent => self.agent.is_some(),
            Role::MetaPlugins => self.meta_plugins.is_some(),
        }
    }

    fn drop_role(&mut self, role: Role) {
        match role {
            Role::Memory => self.memory = None,
            Role::Functions => self.functions = None,
            Role::GoalSystem => self.goal_system = None,
            Role::DebugSystem => self.debug_system = None,
            Role::BlockExecutor => self.block_executor = None,
            Role::Agent => self.agent = None,
            Role::MetaPlugins => self.meta_plugins = None,
        }
    }
}

/// Source of real collaborators.
///
/// Acquisition is all-or-nothing: an `Err` makes the interpreter discard everything
/// and take the full fallback set instead.
pub trait ComponentProvider {
    fn acquire(&self) -> Result<ComponentSet, AcquireError>;
}

/// Provider used when the host wires no real subsystems.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRealComponents;

impl ComponentProvider for NoRealComponents {
    fn acquire(&self) -> Result<ComponentSet, AcquireError> {
        Err(AcquireError::NotConfigured)
    }
}

/// Why a role is absent from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Omission {
    /// The chosen component set did not supply it.
    NotProvided,
    /// Supplied, but a dependency is absent.
    MissingDependencies(Vec<Role>),
}

impl fmt::Display for Omission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Omission::NotProvided => f.write_str("not provided"),
            Omission::MissingDependencies(deps) => {
                let names: Vec<_> = deps.iter().map(|r| r.name()).collect();
                write!(f, "missing dependencies: {}", names.join(", "))
            }
        }
    }
}

/// The collaborators actually wired into an interpreter.
///
/// Built once from a [`ComponentSet`]; roles whose dependencies are absent are
/// omitted and recorded in [`Registry::omitted`].
#[derive(Default)]
pub struct Registry {
    pub memory: Option<Box<dyn MemoryPort>>,
    pub functions: Option<Box<dyn FunctionsPort>>,
    pub agent: Option<Box<dyn AgentPort>>,
    pub goal_system: Option<Box<dyn GoalPort>>,
    pub debug_system: Option<Box<dyn DebugPort>>,
    pub meta_plugins: Option<Box<dyn MetaPluginPort>>,
    pub block_executor: Option<Box<dyn BlockExecutorPort>>,
    omitted: Vec<(Role, Omission)>,
}

impl Registry {
    /// Build the registry tier by tier.
    pub fn build(mut set: ComponentSet) -> Self {
        let mut omitted = Vec::new();
        for role in Role::TIERED {
            if !set.has(role) {
                omitted.push((role, Omission::NotProvided));
                continue;
            }
            // Earlier tiers have already been pruned, so `set` reflects what is registered.
            let missing: Vec<Role> = role
                .dependencies()
                .iter()
                .copied()
                .filter(|dep| !set.has(*dep))
                .collect();
            if !missing.is_empty() {
                set.drop_role(role);
                omitted.push((role, Omission::MissingDependencies(missing)));
            }
        }

        for (role, why) in &omitted {
            warn!(role = role.name(), reason = %why, "collaborator omitted from registry");
        }

        let registry = Self {
            memory: set.memory,
            functions: set.functions,
            agent: set.agent,
            goal_system: set.goal_system,
            debug_system: set.debug_system,
            meta_plugins: set.meta_plugins,
            block_executor: set.block_executor,
            omitted,
        };
        info!(available = ?registry.available(), "component registry built");
        registry
    }

    pub fn has(&self, role: Role) -> bool {
        match role {
            Role::Memory => self.memory.is_some(),
            Role::Functions => self.functions.is_some(),
            Role::GoalSystem => self.goal_system.is_some(),
            Role::DebugSystem => self.debug_system.is_some(),
            Role::BlockExecutor => self.block_executor.is_some(),
            Role::Agent => self.agent.is_some(),
            Role::MetaPlugins => self.meta_plugins.is_some(),
        }
    }

    /// Registered roles in tier order.
    pub fn available(&self) -> Vec<Role> {
        Role::TIERED.into_iter().filter(|r| self.has(*r)).collect()
    }

    pub fn omitted(&self) -> &[(Role, Omission)] {
        &self.omitted
    }
}

/// Message used everywhere a role is missing.
pub fn not_available(role: Role) -> String {
    format!("{} not available", role.name())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Memory that records what it stores; shared with the test through an `Rc`.
    #[derive(Default, Clone)]
    pub(crate) struct RecordingMemory {
        pub stored: Rc<RefCell<Vec<(String, Vec<String>, Option<String>)>>>,
    }

    impl MemoryPort for RecordingMemory {
        fn remember(&self, content: &str, tags: &[String], category: Option<&str>) -> Result<Ack> {
            self.stored.borrow_mut().push((
                content.to_string(),
                tags.to_vec(),
                category.map(str::to_string),
            ));
            Ok(format!("stored: {content}"))
        }

        fn recall(
            &self,
            query: &str,
            _tags: &[String],
            _category: Option<&str>,
        ) -> Result<Vec<Ack>> {
            Ok(self
                .stored
                .borrow()
                .iter()
                .filter(|(c, _, _)| c.contains(query))
                .map(|(c, _, _)| c.clone())
                .collect())
        }
    }

    /// Memory whose every call fails.
    pub(crate) struct FailingMemory;

    impl MemoryPort for FailingMemory {
        fn remember(
            &self,
            _content: &str,
            _tags: &[String],
            _category: Option<&str>,
        ) -> Result<Ack> {
            anyhow::bail!("disk full")
        }

        fn recall(
            &self,
            _query: &str,
            _tags: &[String],
            _category: Option<&str>,
        ) -> Result<Vec<Ack>> {
            anyhow::bail!("disk full")
        }
    }

    /// Debug system that keeps every message and every stored `(error, context)` pair.
    #[derive(Default, Clone)]
    pub(crate) struct RecordingDebug {
        pub messages: Rc<RefCell<Vec<String>>>,
        pub errors: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl DebugPort for RecordingDebug {
        fn debug(&self, message: &str) -> Result<()> {
            self.messages.borrow_mut().push(message.to_string());
            Ok(())
        }

        fn detect_and_store_error(&self, error: &str, context: &str) -> Result<()> {
            self.errors
                .borrow_mut()
                .push((error.to_string(), context.to_string()));
            Ok(())
        }

        fn suggest_fix(&self, _error_info: &str) -> Result<FixSuggestion> {
            Ok(FixSuggestion {
                fix: "free some space".to_string(),
                confidence: 0.5,
                risk: "low".to_string(),
            })
        }
    }

    pub(crate) struct StubFunctions;

    impl FunctionsPort for StubFunctions {
        fn define_function(&self, name: &str, params: &[String], _body: &str) -> Result<Ack> {
            Ok(format!("defined {name}/{}", params.len()))
        }

        fn call_function(&self, name: &str, _args: &[String]) -> Result<String> {
            Ok(format!("called {name}"))
        }
    }

    pub(crate) struct StubAgent;

    impl AgentPort for StubAgent {
        fn activate(&self) -> Result<String> {
            Ok("agent up".into())
        }

        fn deactivate(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_omits_roles_with_missing_dependencies() {
        let set = ComponentSet {
            functions: Some(Box::new(StubFunctions)),
            agent: Some(Box::new(StubAgent)),
            ..Default::default()
        };
        let registry = Registry::build(set);

        assert_eq!(registry.available(), vec![Role::Functions]);
        assert!(registry.agent.is_none());
        assert!(registry.omitted().contains(&(
            Role::Agent,
            Omission::MissingDependencies(vec![Role::Memory, Role::GoalSystem])
        )));
        assert!(registry.omitted().contains(&(Role::Memory, Omission::NotProvided)));
    }

    #[test]
    fn test_registry_keeps_satisfied_tiers() {
        let set = ComponentSet {
            memory: Some(Box::new(RecordingMemory::default())),
            functions: Some(Box::new(StubFunctions)),
            ..Default::default()
        };
        let registry = Registry::build(set);
        assert_eq!(registry.available(), vec![Role::Memory, Role::Functions]);
        assert_eq!(registry.omitted().len(), 5);
    }

    #[test]
    fn test_default_provider_fails() {
        assert!(matches!(
            NoRealComponents.acquire(),
            Err(AcquireError::NotConfigured)
        ));
    }

    #[test]
    fn test_omission_display() {
        let why = Omission::MissingDependencies(vec![Role::Memory, Role::Agent]);
        assert_eq!(why.to_string(), "missing dependencies: memory, agent");
    }
}
