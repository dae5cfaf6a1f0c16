//! Handlers for every command type.
//!
//! Each handler is a unit struct implementing [`CommandHandler`]. A handler whose
//! collaborator is missing answers with "<role> not available" instead of failing.

use crate::command::{CommandType, ParamValue, ParseResult};
use crate::error::{CollaboratorResultExt, Fault};
use crate::lexer::split_list;
use crate::ports::{Registry, Role, not_available};
use regex::Regex;
use std::sync::LazyLock;

/// Executes one kind of parsed command against the registry.
pub(crate) trait CommandHandler {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault>;
}

/// The single handler for `command_type`.
pub(crate) fn handler_for(command_type: CommandType) -> &'static dyn CommandHandler {
    match command_type {
        CommandType::Remember => &Remember,
        CommandType::Recall => &Recall,
        CommandType::Goal => &Goal,
        CommandType::Agent => &Agent,
        CommandType::Plugin => &Plugin,
        CommandType::Define => &Define,
        CommandType::Think => &Think,
        CommandType::Analyze => &Analyze,
        CommandType::Assistant => &Assistant,
        CommandType::Debug => &DebugMessage,
        CommandType::Meta => &Meta,
        CommandType::EnhancedRemember => &EnhancedRemember,
        CommandType::EnhancedGoal => &EnhancedGoal,
        CommandType::EnhancedAgent => &EnhancedAgent,
        CommandType::EnhancedPlugin => &EnhancedPlugin,
        CommandType::Unknown => &Unknown,
    }
}

fn required<'a>(parsed: &'a ParseResult, key: &str) -> Result<&'a str, Fault> {
    parsed.text(key).ok_or_else(|| {
        Fault::invalid(
            parsed.command_type().as_str(),
            format!("missing parameter '{key}'"),
        )
    })
}

fn list<'a>(parsed: &'a ParseResult, key: &str) -> &'a [String] {
    parsed
        .param(key)
        .and_then(ParamValue::as_list)
        .unwrap_or_default()
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Interpret an on/off style switch.
pub(crate) fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "on" | "true" | "enable" | "enabled" | "activate" | "yes" => Some(true),
        "off" | "false" | "disable" | "disabled" | "deactivate" | "no" => Some(false),
        _ => None,
    }
}

struct Remember;

impl CommandHandler for Remember {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(memory) = &registry.memory else {
            return Ok(not_available(Role::Memory));
        };
        let content = required(parsed, "content")?;
        memory
            .remember(content, list(parsed, "tags"), None)
            .by(Role::Memory.name())
    }
}

struct EnhancedRemember;

impl CommandHandler for EnhancedRemember {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(memory) = &registry.memory else {
            return Ok(not_available(Role::Memory));
        };
        let content = required(parsed, "content")?;
        let mut ack = memory
            .remember(content, list(parsed, "tags"), parsed.text("category"))
            .by(Role::Memory.name())?;
        if let Some(confidence) = parsed.param("confidence").and_then(ParamValue::as_number) {
            ack.push_str(&format!(" (confidence: {confidence})"));
        }
        Ok(ack)
    }
}

struct Recall;

impl CommandHandler for Recall {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(memory) = &registry.memory else {
            return Ok(not_available(Role::Memory));
        };
        let query = required(parsed, "content")?;
        let found = memory.recall(query, &[], None).by(Role::Memory.name())?;
        if found.is_empty() {
            return Ok(format!("No memories found for '{query}'"));
        }
        Ok(format!(
            "Found {} memories for '{query}':\n{}",
            found.len(),
            bullet_list(&found)
        ))
    }
}

struct Goal;

impl CommandHandler for Goal {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(goals) = &registry.goal_system else {
            return Ok(not_available(Role::GoalSystem));
        };
        goals
            .set_goal(required(parsed, "content")?, None)
            .by(Role::GoalSystem.name())
    }
}

struct EnhancedGoal;

impl CommandHandler for EnhancedGoal {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(goals) = &registry.goal_system else {
            return Ok(not_available(Role::GoalSystem));
        };
        let mut out = goals
            .set_goal(required(parsed, "goal")?, parsed.text("priority"))
            .by(Role::GoalSystem.name())?;
        if let Some(deadline) = parsed.text("deadline") {
            out.push_str(&format!("\nDeadline: {deadline}"));
        }
        if let Some(agent) = parsed.text("agent") {
            out.push_str(&format!("\nAssigned agent: {agent}"));
        }
        Ok(out)
    }
}

/// Shared by the basic and enhanced agent handlers.
fn switch_agent(mode: &str, registry: &Registry) -> Result<String, Fault> {
    let Some(agent) = &registry.agent else {
        return Ok(not_available(Role::Agent));
    };
    match parse_switch(mode) {
        Some(true) => agent.activate().by(Role::Agent.name()),
        Some(false) => {
            agent.deactivate().by(Role::Agent.name())?;
            Ok("Agent deactivated".to_string())
        }
        None => Err(Fault::invalid(
            CommandType::Agent.as_str(),
            format!("expected on or off, got '{mode}'"),
        )),
    }
}

struct Agent;

impl CommandHandler for Agent {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        switch_agent(required(parsed, "content")?, registry)
    }
}

struct EnhancedAgent;

impl CommandHandler for EnhancedAgent {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let out = switch_agent(required(parsed, "mode")?, registry)?;
        if registry.agent.is_none() {
            return Ok(out);
        }
        Ok(format!(
            "{out}\nSpecialization: {}",
            required(parsed, "specialization")?
        ))
    }
}

struct Plugin;

impl CommandHandler for Plugin {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(plugins) = &registry.meta_plugins else {
            return Ok(not_available(Role::MetaPlugins));
        };
        plugins
            .execute_meta_plugin(required(parsed, "content")?)
            .by(Role::MetaPlugins.name())
    }
}

struct EnhancedPlugin;

impl CommandHandler for EnhancedPlugin {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(plugins) = &registry.meta_plugins else {
            return Ok(not_available(Role::MetaPlugins));
        };
        let name = required(parsed, "plugin")?;
        let args = parsed
            .param("args")
            .and_then(ParamValue::as_map)
            .cloned()
            .unwrap_or_default();
        let rendered: Vec<String> = args.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let result = plugins
            .execute_meta_plugin(&format!("{name}({})", rendered.join(", ")))
            .by(Role::MetaPlugins.name())?;
        Ok(format!(
            "Plugin '{name}' with {} argument(s): {result}",
            args.len()
        ))
    }
}

static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\w+)\s*\(([^)]*)\)")
        .unwrap_or_else(|e| panic!("invalid signature pattern: {e}"))
});

struct Define;

impl CommandHandler for Define {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(functions) = &registry.functions else {
            return Ok(not_available(Role::Functions));
        };
        let signature = required(parsed, "content")?;
        let caps = SIGNATURE
            .captures(signature)
            .ok_or_else(|| Fault::invalid("define", format!("bad signature '{signature}'")))?;
        let params = split_list(&caps[2], ',')
            .map_err(|e| Fault::invalid("define", e.to_string()))?;
        functions
            .define_function(&caps[1], &params, "")
            .by(Role::Functions.name())
    }
}

struct Think;

impl CommandHandler for Think {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(memory) = &registry.memory else {
            return Ok(not_available(Role::Memory));
        };
        let topic = required(parsed, "content")?;
        let related = memory.recall(topic, &[], None).by(Role::Memory.name())?;
        let mut out = format!(
            "Thinking about '{topic}': {} related memories",
            related.len()
        );
        if !related.is_empty() {
            out.push('\n');
            out.push_str(&bullet_list(&related));
        }
        Ok(out)
    }
}

struct Analyze;

impl CommandHandler for Analyze {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(memory) = &registry.memory else {
            return Ok(not_available(Role::Memory));
        };
        let topic = required(parsed, "content")?;
        let related = memory.recall(topic, &[], None).by(Role::Memory.name())?;
        let goals = match &registry.goal_system {
            Some(goals) => format!(
                "{} active goal(s)",
                goals.get_active_goals().by(Role::GoalSystem.name())?.len()
            ),
            None => not_available(Role::GoalSystem),
        };
        Ok(format!(
            "Analysis of '{topic}': {} related memories, {goals}",
            related.len()
        ))
    }
}

struct Assistant;

impl CommandHandler for Assistant {
    fn handle(&self, parsed: &ParseResult, _registry: &Registry) -> Result<String, Fault> {
        // No conversation backend is wired through the registry.
        Ok(format!(
            "assistant not available (query: {})",
            required(parsed, "content")?
        ))
    }
}

struct DebugMessage;

impl CommandHandler for DebugMessage {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(debug) = &registry.debug_system else {
            return Ok(not_available(Role::DebugSystem));
        };
        let message = required(parsed, "content")?;
        debug.debug(message).by(Role::DebugSystem.name())?;
        Ok(format!("Debug: {message}"))
    }
}

struct Meta;

impl CommandHandler for Meta {
    fn handle(&self, parsed: &ParseResult, registry: &Registry) -> Result<String, Fault> {
        let Some(plugins) = &registry.meta_plugins else {
            return Ok(not_available(Role::MetaPlugins));
        };
        plugins
            .execute_meta_plugin(required(parsed, "content")?)
            .by(Role::MetaPlugins.name())
    }
}

struct Unknown;

impl CommandHandler for Unknown {
    fn handle(&self, parsed: &ParseResult, _registry: &Registry) -> Result<String, Fault> {
        Ok(format!(
            "Unrecognized command: '{}'. Type 'help' to see available commands.",
            parsed.raw_line().trim()
        ))
    }
}
